//! Convert a BSE model into JSON holding both the decoded sections and the
//! render-ready vertex buffers. When `NAME.tgc` sits next to the model its
//! texture is written alongside as PNG.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use realwar_formats::{Bse, MeshBuffers, Tgc, load_companion_textures, model_texture};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input BSE file to convert
    #[arg(long)]
    input: PathBuf,

    /// Output JSON file path
    #[arg(long)]
    output: PathBuf,

    /// Cammo TGC applied to the model texture (its `A` sibling is used as
    /// the cammo alpha when present)
    #[arg(long)]
    cammo: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct ExportModel<'a> {
    source: String,
    texture: Option<String>,
    bse: &'a Bse,
    mesh: MeshBuffers,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let bytes = fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let bse = Bse::from_bytes(&bytes).with_context(|| format!("decoding {}", args.input.display()))?;
    let mesh = MeshBuffers::from_bse(&bse)
        .with_context(|| format!("expanding {}", args.input.display()))?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let (color, alpha) = load_companion_textures(&args.input)?;
    let cammo = match &args.cammo {
        Some(path) => Some(load_cammo(path)?),
        None => None,
    };
    let texture = match color {
        Some(color) => {
            let cammo_ref = cammo
                .as_ref()
                .map(|(cammo_color, cammo_alpha)| (cammo_color, cammo_alpha.as_ref()));
            let rgba = model_texture(&color, alpha.as_ref(), cammo_ref)
                .context("building model texture")?;
            let png_path = args.output.with_extension("png");
            let file = File::create(&png_path)
                .with_context(|| format!("creating {}", png_path.display()))?;
            rgba.write_png(BufWriter::new(file))
                .with_context(|| format!("writing PNG to {}", png_path.display()))?;
            Some(png_path.display().to_string())
        }
        None => {
            if cammo.is_some() {
                log::warn!("--cammo ignored: {} has no color texture", args.input.display());
            }
            None
        }
    };

    let export = ExportModel {
        source: args.input.display().to_string(),
        texture,
        bse: &bse,
        mesh,
    };

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &export)?;
    } else {
        serde_json::to_writer(&mut writer, &export)?;
    }
    writer.flush()?;

    println!(
        "{} -> {} ({} triangles, {} frames)",
        args.input.display(),
        args.output.display(),
        bse.poly_count,
        bse.frame_count
    );
    Ok(())
}

/// A cammo is loaded like model companions: `NAME.tgc` itself plus the
/// optional `NAMEA.tgc` alpha.
fn load_cammo(path: &Path) -> Result<(Tgc, Option<Tgc>)> {
    match load_companion_textures(path)? {
        (Some(color), alpha) => Ok((color, alpha)),
        (None, _) => bail!("cammo texture {} not found", path.display()),
    }
}
