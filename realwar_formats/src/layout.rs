use std::fmt;
use std::str::FromStr;

use crate::error::{FormatError, Result};
use crate::pixel::{RgbaFrame, is_grayscale};
use crate::postprocess::{apply_first_pixel_alpha_mask, compose_alpha_plane};
use crate::spt::Spt;

/// How the frames of an SPT are meant to be combined. The file itself does
/// not say, so callers pick one or fall back to [`SptLayout::guess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SptLayout {
    /// Every frame is shown as decoded.
    ColorOnly,
    /// Every frame is keyed on the color of its first pixel.
    FirstPixelAlpha,
    /// Frames alternate color, grayscale alpha.
    ColorAlpha,
    /// Frame 0 is the color; every later frame is an alpha mask for it.
    AnimatedAlpha,
}

impl SptLayout {
    pub const ALL: [SptLayout; 4] = [
        SptLayout::ColorOnly,
        SptLayout::FirstPixelAlpha,
        SptLayout::ColorAlpha,
        SptLayout::AnimatedAlpha,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SptLayout::ColorOnly => "color-only",
            SptLayout::FirstPixelAlpha => "first-pixel-alpha",
            SptLayout::ColorAlpha => "color-alpha",
            SptLayout::AnimatedAlpha => "animated-alpha",
        }
    }

    /// An even frame count with a grayscale second frame reads as
    /// color/alpha pairs; anything else is keyed on the first pixel.
    pub fn guess(spt: &Spt) -> SptLayout {
        let frames = &spt.frames;
        if frames.len() >= 2 && frames.len() % 2 == 0 && is_grayscale(&frames[1].pixels) {
            SptLayout::ColorAlpha
        } else {
            SptLayout::FirstPixelAlpha
        }
    }
}

impl fmt::Display for SptLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SptLayout {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        SptLayout::ALL
            .into_iter()
            .find(|layout| layout.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                let known: Vec<_> = SptLayout::ALL.iter().map(|layout| layout.as_str()).collect();
                format!("unknown SPT layout '{value}' (expected one of {})", known.join(", "))
            })
    }
}

impl Spt {
    /// Renders the frames as RGBA8888 images according to `layout`.
    pub fn compose(&self, layout: SptLayout) -> Result<Vec<RgbaFrame>> {
        match layout {
            SptLayout::ColorOnly => Ok(self.frames.iter().map(|frame| frame.to_rgba()).collect()),
            SptLayout::FirstPixelAlpha => Ok(self
                .frames
                .iter()
                .map(|frame| {
                    let mut pixels = frame.pixels.clone();
                    apply_first_pixel_alpha_mask(&mut pixels);
                    RgbaFrame::from_argb1555(frame.width, frame.height, &pixels)
                })
                .collect()),
            SptLayout::ColorAlpha => {
                if self.frames.len() % 2 != 0 {
                    log::warn!(
                        "SPT has an odd frame count ({}); dropping the unpaired last frame",
                        self.frames.len()
                    );
                }
                self.frames
                    .chunks_exact(2)
                    .enumerate()
                    .map(|(pair, frames)| {
                        let (color, alpha) = (&frames[0], &frames[1]);
                        if (color.width, color.height) != (alpha.width, alpha.height) {
                            log::warn!(
                                "SPT pair {pair}: color {}x{} vs alpha {}x{}",
                                color.width,
                                color.height,
                                alpha.width,
                                alpha.height
                            );
                        }
                        compose_alpha_plane(&color.pixels, &alpha.pixels, color.width, color.height)
                    })
                    .collect()
            }
            SptLayout::AnimatedAlpha => {
                let Some((color, masks)) = self.frames.split_first() else {
                    return Err(FormatError::UnsupportedVariant(
                        "animated alpha layout needs at least one frame".into(),
                    ));
                };
                masks
                    .iter()
                    .map(|alpha| {
                        compose_alpha_plane(&color.pixels, &alpha.pixels, alpha.width, alpha.height)
                    })
                    .collect()
            }
        }
    }
}
