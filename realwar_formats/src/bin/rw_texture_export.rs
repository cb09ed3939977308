//! Export TGC, SPT and S16 images as PNG files.
//!
//! A TGC becomes `NAME.png`; sprite files produce one `NAME_NNN.png` per
//! composed frame.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use realwar_formats::{
    Asset, CammoTarget, CammoTexture, RgbaFrame, SptLayout, Tgc, apply_cammo,
    load_companion_textures, mask_black_pixels,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Texture or sprite file (.tgc, .spt, .s16)
    #[arg(long)]
    input: PathBuf,

    /// Directory receiving the PNG files
    #[arg(long)]
    output: PathBuf,

    /// Treat pure black texels as transparent
    #[arg(long)]
    mask_black: bool,

    /// SPT frame layout (color-only, first-pixel-alpha, color-alpha,
    /// animated-alpha); guessed when omitted
    #[arg(long)]
    layout: Option<SptLayout>,

    /// Cammo TGC to blend over a TGC input; `NAMEA.tgc` siblings of the input
    /// and of the cammo are used as alpha planes when present
    #[arg(long)]
    cammo: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let asset = Asset::open(&args.input)?;
    let stem = args
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .context("input path has no file name")?;

    let is_tgc = matches!(asset, Asset::Tgc(_));
    if args.cammo.is_some() && !is_tgc {
        log::warn!("--cammo only applies to TGC textures; ignored");
    }

    let images = match asset {
        Asset::Tgc(tgc) => vec![export_tgc(&args, tgc)?],
        Asset::Spt(mut spt) => {
            if args.mask_black {
                for frame in &mut spt.frames {
                    mask_black_pixels(&mut frame.pixels);
                }
            }
            let layout = args.layout.unwrap_or_else(|| SptLayout::guess(&spt));
            log::info!("composing {} SPT frames as {layout}", spt.frames.len());
            spt.compose(layout)
                .with_context(|| format!("composing {} as {layout}", args.input.display()))?
        }
        Asset::S16(s16) => {
            if args.mask_black {
                log::warn!("--mask-black has no effect on S16 sprites");
            }
            s16.frames.iter().map(|frame| frame.to_rgba()).collect()
        }
        other => bail!(
            "{} is a {} asset, not a texture",
            args.input.display(),
            other.kind()
        ),
    };

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for (index, image) in images.iter().enumerate() {
        let name = if is_tgc {
            format!("{stem}.png")
        } else {
            format!("{stem}_{index:03}.png")
        };
        write_png(&args.output.join(name), image)?;
    }

    println!(
        "{} -> {} ({} image{})",
        args.input.display(),
        args.output.display(),
        images.len(),
        if images.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

fn export_tgc(args: &Args, mut tgc: Tgc) -> Result<RgbaFrame> {
    if let Some(cammo_path) = &args.cammo {
        let (_, base_alpha) = load_companion_textures(&args.input)?;
        let (cammo, cammo_alpha) = match load_companion_textures(cammo_path)? {
            (Some(cammo), alpha) => (cammo, alpha),
            (None, _) => bail!("cammo texture {} not found", cammo_path.display()),
        };
        apply_cammo(
            CammoTarget {
                color: &mut tgc.pixels,
                alpha: base_alpha.as_ref().map(|alpha| alpha.pixels.as_slice()),
                width: usize::from(tgc.width),
                height: usize::from(tgc.height),
            },
            &CammoTexture {
                color: &cammo.pixels,
                alpha: cammo_alpha.as_ref().map(|alpha| alpha.pixels.as_slice()),
                width: usize::from(cammo.width),
                height: usize::from(cammo.height),
            },
        )
        .with_context(|| format!("applying cammo {}", cammo_path.display()))?;
    }
    if args.mask_black {
        mask_black_pixels(&mut tgc.pixels);
    }
    Ok(tgc.to_rgba())
}

fn write_png(path: &Path, image: &RgbaFrame) -> Result<()> {
    if image.width == 0 || image.height == 0 {
        log::warn!("skipping empty {}x{} image {}", image.width, image.height, path.display());
        return Ok(());
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    image
        .write_png(BufWriter::new(file))
        .with_context(|| format!("writing PNG to {}", path.display()))
}
