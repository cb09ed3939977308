use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyResult};
use memmap2::MmapOptions;
use serde::Serialize;

use crate::bse::{Bse, FLAG_TRANSPARENT};
use crate::error::Result;
use crate::kvag::Kvag;
use crate::layout::SptLayout;
use crate::pixel::is_transparent;
use crate::s16::S16;
use crate::spt::Spt;
use crate::tgc::Tgc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Tgc,
    Bse,
    Spt,
    S16,
    Kvag,
}

impl AssetKind {
    /// Picks the decoder from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<AssetKind> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "tgc" => Some(AssetKind::Tgc),
            "bse" => Some(AssetKind::Bse),
            "spt" => Some(AssetKind::Spt),
            "s16" => Some(AssetKind::S16),
            "vag" => Some(AssetKind::Kvag),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Tgc => "tgc",
            AssetKind::Bse => "bse",
            AssetKind::Spt => "spt",
            AssetKind::S16 => "s16",
            AssetKind::Kvag => "vag",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Tgc(Tgc),
    Bse(Bse),
    Spt(Spt),
    S16(S16),
    Kvag(Kvag),
}

impl Asset {
    pub fn decode(kind: AssetKind, bytes: &[u8]) -> Result<Asset> {
        Ok(match kind {
            AssetKind::Tgc => Asset::Tgc(Tgc::from_bytes(bytes)?),
            AssetKind::Bse => Asset::Bse(Bse::from_bytes(bytes)?),
            AssetKind::Spt => Asset::Spt(Spt::from_bytes(bytes)?),
            AssetKind::S16 => Asset::S16(S16::from_bytes(bytes)?),
            AssetKind::Kvag => Asset::Kvag(Kvag::from_bytes(bytes)?),
        })
    }

    /// Reads and decodes the file at `path`, choosing the decoder from its
    /// extension.
    pub fn open<P: AsRef<Path>>(path: P) -> AnyResult<Asset> {
        let path = path.as_ref();
        let kind = AssetKind::from_path(path)
            .with_context(|| format!("{} is not a known Real War asset", path.display()))?;
        let file =
            File::open(path).with_context(|| format!("opening {kind} asset {}", path.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping {}", path.display()))?;
        Asset::decode(kind, &mmap).with_context(|| format!("decoding {kind} asset {}", path.display()))
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Tgc(_) => AssetKind::Tgc,
            Asset::Bse(_) => AssetKind::Bse,
            Asset::Spt(_) => AssetKind::Spt,
            Asset::S16(_) => AssetKind::S16,
            Asset::Kvag(_) => AssetKind::Kvag,
        }
    }

    pub fn summary(&self) -> AssetSummary {
        match self {
            Asset::Tgc(tgc) => AssetSummary::Tgc {
                width: tgc.width,
                height: tgc.height,
                trailer: tgc.trailer,
                transparent_pixels: tgc.pixels.iter().filter(|&&px| is_transparent(px)).count(),
            },
            Asset::Bse(bse) => AssetSummary::Bse {
                poly_count: bse.poly_count,
                vertex_count: bse.vertex_count,
                frame_count: bse.frame_count,
                objects: bse
                    .triangles
                    .iter()
                    .map(|triangle| triangle.object_id)
                    .collect::<BTreeSet<_>>()
                    .len(),
                transparent_triangles: bse
                    .flags
                    .iter()
                    .filter(|&&flags| flags & FLAG_TRANSPARENT != 0)
                    .count(),
                scale: bse.scale,
                animated_uvs: bse.uv_frames.is_some(),
            },
            Asset::Spt(spt) => AssetSummary::Spt {
                rle: spt.rle,
                frames: spt
                    .frames
                    .iter()
                    .map(|frame| FrameSize {
                        width: frame.width,
                        height: frame.height,
                    })
                    .collect(),
                guessed_layout: SptLayout::guess(spt).as_str(),
            },
            Asset::S16(s16) => AssetSummary::S16 {
                frames: s16
                    .frames
                    .iter()
                    .map(|frame| S16FrameSummary {
                        width: frame.width,
                        height: frame.height,
                        palette_len: frame.palette.len(),
                    })
                    .collect(),
            },
            Asset::Kvag(kvag) => AssetSummary::Kvag {
                sample_rate: kvag.sample_rate,
                channels: kvag.channels(),
                headerless: kvag.headerless,
                sample_frames: kvag.frame_count(),
                duration_secs: kvag.duration().as_secs_f64(),
            },
        }
    }
}

/// Short, serialisable description of a decoded asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetSummary {
    Tgc {
        width: u16,
        height: u16,
        trailer: u32,
        transparent_pixels: usize,
    },
    Bse {
        poly_count: u32,
        vertex_count: u32,
        frame_count: u32,
        objects: usize,
        transparent_triangles: usize,
        scale: Option<f32>,
        animated_uvs: bool,
    },
    Spt {
        rle: bool,
        frames: Vec<FrameSize>,
        guessed_layout: &'static str,
    },
    S16 {
        frames: Vec<S16FrameSummary>,
    },
    Kvag {
        sample_rate: u32,
        channels: u16,
        headerless: bool,
        sample_frames: usize,
        duration_secs: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct S16FrameSummary {
    pub width: u32,
    pub height: u32,
    pub palette_len: usize,
}

/// Texture files a BSE model is drawn with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionTextures {
    /// `NAME.tgc` next to `NAME.bse`.
    pub color: PathBuf,
    /// `NAMEA.tgc`; feeds the cammo palette selector.
    pub alpha: PathBuf,
}

/// The texture extension follows the case of the model's extension so that
/// `M1A1.BSE` finds `M1A1.TGC` on case-sensitive filesystems.
pub fn companion_textures(bse_path: &Path) -> CompanionTextures {
    let stem = bse_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let uppercase = bse_path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !ext.is_empty() && ext.chars().all(|c| !c.is_ascii_lowercase()));
    let extension = if uppercase { "TGC" } else { "tgc" };
    CompanionTextures {
        color: bse_path.with_extension(extension),
        alpha: bse_path.with_file_name(format!("{stem}A.{extension}")),
    }
}

/// Decodes `NAME.tgc` and `NAMEA.tgc` next to `path`, skipping missing ones.
pub fn load_companion_textures(path: &Path) -> AnyResult<(Option<Tgc>, Option<Tgc>)> {
    let paths = companion_textures(path);
    let load = |path: &Path| -> AnyResult<Option<Tgc>> {
        if !path.is_file() {
            log::debug!("no companion texture at {}", path.display());
            return Ok(None);
        }
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let tgc = Tgc::from_bytes(&bytes)
            .with_context(|| format!("decoding companion texture {}", path.display()))?;
        Ok(Some(tgc))
    };
    Ok((load(&paths.color)?, load(&paths.alpha)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_ignores_case() {
        assert_eq!(AssetKind::from_path(Path::new("a/TANK.BSE")), Some(AssetKind::Bse));
        assert_eq!(AssetKind::from_path(Path::new("x.Tgc")), Some(AssetKind::Tgc));
        assert_eq!(AssetKind::from_path(Path::new("boom.vag")), Some(AssetKind::Kvag));
        assert_eq!(AssetKind::from_path(Path::new("icons.s16")), Some(AssetKind::S16));
        assert_eq!(AssetKind::from_path(Path::new("fx.spt")), Some(AssetKind::Spt));
        assert_eq!(AssetKind::from_path(Path::new("readme.txt")), None);
        assert_eq!(AssetKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn companion_paths_sit_next_to_mesh() {
        let paths = companion_textures(Path::new("models/M1A1.bse"));
        assert_eq!(paths.color, PathBuf::from("models/M1A1.tgc"));
        assert_eq!(paths.alpha, PathBuf::from("models/M1A1A.tgc"));

        let upper = companion_textures(Path::new("MODELS/TANK.BSE"));
        assert_eq!(upper.color, PathBuf::from("MODELS/TANK.TGC"));
        assert_eq!(upper.alpha, PathBuf::from("MODELS/TANKA.TGC"));
    }

    #[test]
    fn summary_serialises_with_type_tag() {
        let asset = Asset::Tgc(Tgc {
            width: 2,
            height: 1,
            pixels: vec![0x8000, 0x7FFF],
            trailer: 7,
        });
        assert_eq!(asset.kind(), AssetKind::Tgc);
        let json = serde_json::to_value(asset.summary()).unwrap();
        assert_eq!(json["type"], "tgc");
        assert_eq!(json["transparent_pixels"], 1);
        assert_eq!(json["trailer"], 7);
    }

    #[test]
    fn kvag_summary_reports_channels() {
        let asset = Asset::decode(AssetKind::Kvag, &[0x00, 0x00]).unwrap();
        match asset.summary() {
            AssetSummary::Kvag {
                channels,
                headerless,
                sample_frames,
                ..
            } => {
                assert_eq!(channels, 1);
                assert!(headerless);
                assert_eq!(sample_frames, 4);
            }
            other => panic!("unexpected summary {other:?}"),
        }
    }
}
