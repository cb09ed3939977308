//! Print JSON summaries for Real War assets. Directories are walked and every
//! file with a known extension is decoded; a bad file is reported and skipped.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use realwar_formats::{Asset, AssetKind, AssetSummary};
use serde::Serialize;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Asset files or directories to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct DumpEntry {
    path: String,
    #[serde(flatten)]
    summary: AssetSummary,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let files = collect_files(&args.paths);
    let mut entries = Vec::with_capacity(files.len());
    let mut failures = 0usize;
    for path in &files {
        match Asset::open(path) {
            Ok(asset) => entries.push(DumpEntry {
                path: path.display().to_string(),
                summary: asset.summary(),
            }),
            Err(err) => {
                log::error!("{err:#}");
                failures += 1;
            }
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &entries)?;
    } else {
        serde_json::to_writer(&mut out, &entries)?;
    }
    writeln!(out)?;

    if failures > 0 {
        bail!("{failures} of {} assets failed to decode", files.len());
    }
    Ok(())
}

/// Files named explicitly are always attempted; files found by walking a
/// directory are kept only when their extension is recognised.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        if !root.is_dir() {
            files.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("skipping unreadable entry under {}: {err}", root.display());
                    continue;
                }
            };
            if entry.file_type().is_file() && AssetKind::from_path(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
    }
    files
}
