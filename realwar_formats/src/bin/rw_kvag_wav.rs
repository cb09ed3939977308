use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use realwar_formats::Kvag;
use realwar_formats::kvag::LEGACY_SAMPLE_RATE;

/// Decode a KVAG (.vag) clip to a 16-bit PCM WAV file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input .vag file
    #[arg(long)]
    input: PathBuf,

    /// Output .wav path
    #[arg(long)]
    output: PathBuf,

    /// Sample rate used when the clip has no KVAG header
    #[arg(long, default_value_t = LEGACY_SAMPLE_RATE)]
    fallback_rate: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let bytes = fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let kvag = Kvag::from_bytes_with_fallback_rate(&bytes, args.fallback_rate)
        .with_context(|| format!("decoding {}", args.input.display()))?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    kvag.write_wav(&mut writer)
        .with_context(|| format!("writing {}", args.output.display()))?;
    writer.flush()?;

    println!(
        "{} -> {} ({} Hz, {} ch, {:.2}s{})",
        args.input.display(),
        args.output.display(),
        kvag.sample_rate,
        kvag.channels(),
        kvag.duration().as_secs_f64(),
        if kvag.headerless { ", headerless" } else { "" }
    );
    Ok(())
}
