//! Pixel-space passes over decoded ARGB1555 textures.
//!
//! These reproduce effects the game's renderer applied at draw time: black
//! texels treated as holes, sprites keyed on their first pixel, separate
//! alpha frames, and the palette-driven camouflage overlay applied to unit
//! textures.

use crate::error::{FormatError, Result};
use crate::pixel::{ALPHA_BIT, RGB_MASK, RgbaFrame, channels, expand5, pack};
use crate::tgc::Tgc;

/// Base pixels holding this value are never overwritten by the cammo pass.
pub const CAMMO_UNTOUCHED: u16 = 0x0000;

/// Red/blue lower bound and green upper bound (5-bit) of the reserved
/// magenta range that opts a texel out of the cammo pass.
const EXCLUSION_HIGH: u8 = 224 / 8;
const EXCLUSION_LOW: u8 = 32 / 8;

/// Marks every opaque pure-black pixel transparent.
pub fn mask_black_pixels(pixels: &mut [u16]) {
    for pixel in pixels.iter_mut() {
        if *pixel & RGB_MASK == 0 {
            *pixel |= ALPHA_BIT;
        }
    }
}

/// Marks every pixel sharing the first pixel's color transparent.
pub fn apply_first_pixel_alpha_mask(pixels: &mut [u16]) {
    let Some(&first) = pixels.first() else {
        return;
    };
    let key = first & RGB_MASK;
    for pixel in pixels.iter_mut() {
        if *pixel & RGB_MASK == key {
            *pixel |= ALPHA_BIT;
        }
    }
}

fn check_plane(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(FormatError::UnsupportedVariant(format!(
            "{name} holds {len} pixels, expected {expected}"
        )));
    }
    Ok(())
}

/// Combines a color plane with a grayscale alpha plane into RGBA8888. The
/// alpha plane's red channel is the opacity.
pub fn compose_alpha_plane(
    color: &[u16],
    alpha: &[u16],
    width: u32,
    height: u32,
) -> Result<RgbaFrame> {
    let expected = width as usize * height as usize;
    check_plane("color plane", color.len(), expected)?;
    check_plane("alpha plane", alpha.len(), expected)?;

    let mut data = Vec::with_capacity(expected * 4);
    for (&color, &alpha) in color.iter().zip(alpha) {
        let [r, g, b] = channels(color);
        let [opacity, _, _] = channels(alpha);
        data.extend_from_slice(&[expand5(r), expand5(g), expand5(b), expand5(opacity)]);
    }
    Ok(RgbaFrame {
        width,
        height,
        data,
    })
}

/// Like [`compose_alpha_plane`] but folds the opacity into the 1-bit alpha:
/// texels less than half opaque become transparent.
pub fn compose_alpha_plane_1555(color: &[u16], alpha: &[u16]) -> Result<Vec<u16>> {
    check_plane("alpha plane", alpha.len(), color.len())?;
    Ok(color
        .iter()
        .zip(alpha)
        .map(|(&color, &alpha)| {
            let [opacity, _, _] = channels(alpha);
            if opacity < 16 {
                color | ALPHA_BIT
            } else {
                color & RGB_MASK
            }
        })
        .collect())
}

/// Camouflage texture. The first row of `color` is the cammo palette; the
/// rows below it are the tile stamped over the base texture.
#[derive(Debug, Clone, Copy)]
pub struct CammoTexture<'a> {
    pub color: &'a [u16],
    pub alpha: Option<&'a [u16]>,
    pub width: usize,
    /// Height including the palette row.
    pub height: usize,
}

/// Base texture the cammo is applied to. `alpha`, when present, selects the
/// palette entry (blue channel) and the blend intensity (red channel).
#[derive(Debug)]
pub struct CammoTarget<'a> {
    pub color: &'a mut [u16],
    pub alpha: Option<&'a [u16]>,
    pub width: usize,
    pub height: usize,
}

fn in_exclusion_range(pixel: u16) -> bool {
    let [r, g, b] = channels(pixel);
    r >= EXCLUSION_HIGH && g <= EXCLUSION_LOW && b >= EXCLUSION_HIGH
}

/// Tiles `cammo` across `target`, blending in place. Tiles repeat from the
/// top-left corner and the last column/row of tiles is clipped.
pub fn apply_cammo(target: CammoTarget<'_>, cammo: &CammoTexture<'_>) -> Result<()> {
    let CammoTarget {
        color,
        alpha,
        width,
        height,
    } = target;

    check_plane("base color plane", color.len(), width * height)?;
    if let Some(alpha) = alpha {
        check_plane("base alpha plane", alpha.len(), width * height)?;
    }
    if cammo.width < 2 || cammo.height < 2 {
        return Err(FormatError::UnsupportedVariant(format!(
            "cammo texture {}x{} is too small for a palette row and a tile",
            cammo.width, cammo.height
        )));
    }
    let cammo_len = cammo.width * cammo.height;
    check_plane("cammo color plane", cammo.color.len(), cammo_len)?;
    if let Some(cammo_alpha) = cammo.alpha {
        check_plane("cammo alpha plane", cammo_alpha.len(), cammo_len)?;
    }

    let palette = &cammo.color[..cammo.width];
    let tile = CammoTile {
        palette,
        mask: palette[0],
        color: &cammo.color[cammo.width..],
        alpha: cammo.alpha.map(|plane| &plane[cammo.width..]),
        width: cammo.width,
        height: cammo.height - 1,
    };

    for tile_y in (0..height).step_by(tile.height) {
        for tile_x in (0..width).step_by(tile.width) {
            let rows = tile.height.min(height - tile_y);
            let cols = tile.width.min(width - tile_x);
            for row in 0..rows {
                for col in 0..cols {
                    let index = (tile_y + row) * width + tile_x + col;
                    let base_alpha = alpha.map(|plane| plane[index]);
                    if let Some(blended) =
                        tile.blend(row * tile.width + col, color[index], base_alpha)
                    {
                        color[index] = blended;
                    }
                }
            }
        }
    }
    Ok(())
}

struct CammoTile<'a> {
    palette: &'a [u16],
    mask: u16,
    color: &'a [u16],
    alpha: Option<&'a [u16]>,
    width: usize,
    height: usize,
}

impl CammoTile<'_> {
    /// Blend result for one destination texel, or `None` to leave it as is.
    fn blend(&self, texel: usize, base: u16, base_alpha: Option<u16>) -> Option<u16> {
        let cammo_color = self.color[texel];
        let cammo_alpha = self.alpha.map_or(cammo_color, |plane| plane[texel]);
        let base_alpha_pixel = base_alpha.unwrap_or(base);

        if cammo_alpha == 0 {
            return None;
        }
        if self.alpha.is_none() && cammo_color == self.mask {
            return None;
        }
        if [cammo_color, cammo_alpha, base, base_alpha_pixel]
            .into_iter()
            .any(in_exclusion_range)
        {
            return None;
        }

        let (intensity, palette_pixel) = match base_alpha {
            // Without an alpha texture there is no palette selector, so the
            // first real palette entry is used.
            None => (0, self.palette[1]),
            Some(selector) => {
                let [r, _, b] = channels(selector);
                let entry = self.palette.get(usize::from(b)).copied().unwrap_or(0);
                (i32::from(r) + 1, entry)
            }
        };

        let tint = channels(palette_pixel).map(i32::from);
        let mut cammo = channels(cammo_color).map(i32::from);
        let mut out = channels(base).map(i32::from);
        if palette_pixel != 0 {
            for ch in 0..3 {
                cammo[ch] = ((cammo[ch] + 1) * (tint[ch] + 1)) >> 5;
                out[ch] = ((tint[ch] + 1) * out[ch]) >> 5;
            }
        }

        match self.alpha {
            None => {
                for ch in 0..3 {
                    out[ch] = (((cammo[ch] * intensity) >> 5) + out[ch]) >> 1;
                }
            }
            Some(_) => {
                let weight = channels(cammo_alpha).map(|value| (i32::from(value) * intensity) >> 5);
                for ch in 0..3 {
                    out[ch] = ((32 - weight[ch]) * out[ch] + (weight[ch] + 1) * cammo[ch]) >> 5;
                }
            }
        }

        let [r, g, b] = out.map(|value| value.clamp(0, 0x1F) as u8);
        let blended = pack(r, g, b);
        (base != CAMMO_UNTOUCHED && blended != 0).then_some(blended)
    }
}

/// Texture for a BSE model: the color TGC with the optional cammo applied,
/// then black masked. `alpha` only feeds the cammo pass.
pub fn model_texture(
    color: &Tgc,
    alpha: Option<&Tgc>,
    cammo: Option<(&Tgc, Option<&Tgc>)>,
) -> Result<RgbaFrame> {
    let mut pixels = color.pixels.clone();
    if let Some((cammo_color, cammo_alpha)) = cammo {
        apply_cammo(
            CammoTarget {
                color: &mut pixels,
                alpha: alpha.map(|tgc| tgc.pixels.as_slice()),
                width: usize::from(color.width),
                height: usize::from(color.height),
            },
            &CammoTexture {
                color: &cammo_color.pixels,
                alpha: cammo_alpha.map(|tgc| tgc.pixels.as_slice()),
                width: usize::from(cammo_color.width),
                height: usize::from(cammo_color.height),
            },
        )?;
    }
    mask_black_pixels(&mut pixels);
    Ok(RgbaFrame::from_argb1555(
        u32::from(color.width),
        u32::from(color.height),
        &pixels,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: u16 = 0x7FFF;

    fn cammo_texture(palette: &[u16], tile: &[u16]) -> Vec<u16> {
        let mut color = palette.to_vec();
        color.extend_from_slice(tile);
        color
    }

    #[test]
    fn black_pixels_become_transparent() {
        let mut pixels = [0x0000, 0x8000, 0x0001, 0x7FFF];
        mask_black_pixels(&mut pixels);
        assert_eq!(pixels, [0x8000, 0x8000, 0x0001, 0x7FFF]);
        mask_black_pixels(&mut pixels);
        assert_eq!(pixels, [0x8000, 0x8000, 0x0001, 0x7FFF]);
    }

    #[test]
    fn first_pixel_color_is_keyed_out() {
        let mut pixels = [pack(31, 0, 31), pack(1, 2, 3), pack(31, 0, 31), 0x8000 | pack(31, 0, 31)];
        apply_first_pixel_alpha_mask(&mut pixels);
        assert!(pixels[0] & ALPHA_BIT != 0);
        assert_eq!(pixels[1], pack(1, 2, 3));
        assert!(pixels[2] & ALPHA_BIT != 0);
        assert!(pixels[3] & ALPHA_BIT != 0);

        let mut empty: [u16; 0] = [];
        apply_first_pixel_alpha_mask(&mut empty);
    }

    #[test]
    fn alpha_plane_composition() {
        let color = [pack(31, 0, 0), pack(0, 31, 0)];
        let alpha = [pack(31, 31, 31), pack(4, 4, 4)];
        let rgba = compose_alpha_plane(&color, &alpha, 2, 1).unwrap();
        assert_eq!(rgba.data, vec![255, 0, 0, 255, 0, 255, 0, 32]);

        let folded = compose_alpha_plane_1555(&color, &alpha).unwrap();
        assert_eq!(folded, vec![pack(31, 0, 0), pack(0, 31, 0) | ALPHA_BIT]);

        assert!(matches!(
            compose_alpha_plane(&color, &alpha[..1], 2, 1),
            Err(FormatError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn cammo_without_alpha_planes_halves_tinted_base() {
        let cammo = cammo_texture(&[0x0000, WHITE], &[pack(1, 1, 1); 4]);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 2,
            height: 3,
        };
        // 3x3 base with 2x2 tiles: the right column and bottom row are clipped.
        let mut base = [pack(20, 20, 20); 9];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: None,
                width: 3,
                height: 3,
            },
            &texture,
        )
        .unwrap();
        assert!(base.iter().all(|&pixel| pixel == pack(10, 10, 10)));
    }

    #[test]
    fn cammo_exclusion_range_leaves_base_alone() {
        let magenta = pack(28, 4, 28);
        let cammo = cammo_texture(&[0x0000, WHITE], &[magenta, pack(1, 1, 1)]);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 2,
            height: 2,
        };
        let mut base = [pack(20, 20, 20), pack(20, 20, 20)];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: None,
                width: 2,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(base[0], pack(20, 20, 20));
        assert_eq!(base[1], pack(10, 10, 10));
    }

    #[test]
    fn cammo_too_small_is_unsupported() {
        let cammo = [0x0000, WHITE, pack(1, 1, 1)];
        for (width, height) in [(1, 3), (3, 1)] {
            let texture = CammoTexture {
                color: &cammo,
                alpha: None,
                width,
                height,
            };
            let mut base = [pack(20, 20, 20)];
            let result = apply_cammo(
                CammoTarget {
                    color: &mut base,
                    alpha: None,
                    width: 1,
                    height: 1,
                },
                &texture,
            );
            assert!(matches!(result, Err(FormatError::UnsupportedVariant(_))));
            assert_eq!(base, [pack(20, 20, 20)]);
        }
    }

    #[test]
    fn excluded_base_pixel_is_not_blended() {
        let cammo = cammo_texture(&[0x0000, WHITE], &[pack(1, 1, 1), pack(1, 1, 1)]);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 2,
            height: 2,
        };
        let mut base = [pack(31, 0, 31), pack(20, 20, 20)];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: None,
                width: 2,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(base, [pack(31, 0, 31), pack(10, 10, 10)]);
    }

    #[test]
    fn cammo_mask_value_and_untouched_sentinel_are_skipped() {
        let mask = pack(3, 3, 3);
        let cammo = cammo_texture(&[mask, WHITE], &[mask, pack(1, 1, 1)]);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 2,
            height: 2,
        };
        let mut base = [pack(20, 20, 20), CAMMO_UNTOUCHED];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: None,
                width: 2,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(base, [pack(20, 20, 20), CAMMO_UNTOUCHED]);
    }

    #[test]
    fn cammo_with_alpha_planes_uses_selected_palette_entry() {
        let palette = [0x0001, pack(1, 1, 1), WHITE, 0x0000];
        let cammo_color = cammo_texture(&palette, &[pack(10, 20, 30), 0, 0, 0]);
        let cammo_alpha = cammo_texture(&[0; 4], &[WHITE, 0, 0, 0]);
        let texture = CammoTexture {
            color: &cammo_color,
            alpha: Some(&cammo_alpha),
            width: 4,
            height: 2,
        };

        // Red 31 gives full intensity, blue 2 selects the white palette entry.
        let base_alpha = [pack(31, 0, 2)];
        let mut base = [pack(4, 4, 4)];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: Some(&base_alpha),
                width: 1,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(base[0], pack(11, 21, 31));
    }

    #[test]
    fn base_alpha_without_cammo_alpha_averages_by_intensity() {
        let palette = [0x0001, pack(1, 1, 1), WHITE];
        let cammo = cammo_texture(&palette, &[pack(10, 20, 30), 0, 0]);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 3,
            height: 2,
        };

        let base_alpha = [pack(31, 0, 2)];
        let mut base = [pack(4, 4, 4)];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: Some(&base_alpha),
                width: 1,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(channels(base[0]), [7, 12, 17]);
    }

    #[test]
    fn cammo_alpha_without_base_alpha_has_zero_intensity() {
        let cammo_color = cammo_texture(&[0x0001, WHITE], &[pack(31, 0, 10), pack(9, 9, 9)]);
        let cammo_alpha = cammo_texture(&[0, 0], &[WHITE, 0]);
        let texture = CammoTexture {
            color: &cammo_color,
            alpha: Some(&cammo_alpha),
            width: 2,
            height: 2,
        };

        // Weight is zero, so only a full-scale tinted cammo channel carries
        // into the base: (32 * base + cammo) >> 5.
        let mut base = [pack(4, 4, 4), pack(20, 20, 20)];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: None,
                width: 2,
                height: 1,
            },
            &texture,
        )
        .unwrap();
        assert_eq!(base, [pack(5, 4, 4), pack(20, 20, 20)]);
    }

    #[test]
    fn cammo_tile_repeats_across_clipped_tiles() {
        let tile = [pack(1, 1, 1), pack(3, 3, 3), pack(5, 5, 5), pack(7, 7, 7)];
        let cammo = cammo_texture(&[0x0000, WHITE], &tile);
        let texture = CammoTexture {
            color: &cammo,
            alpha: None,
            width: 2,
            height: 3,
        };

        let base_alpha = [pack(31, 0, 1); 9];
        let mut base = [pack(20, 20, 20); 9];
        apply_cammo(
            CammoTarget {
                color: &mut base,
                alpha: Some(&base_alpha),
                width: 3,
                height: 3,
            },
            &texture,
        )
        .unwrap();
        let reds: Vec<u8> = base.iter().map(|&pixel| channels(pixel)[0]).collect();
        assert_eq!(reds, [11, 12, 11, 13, 14, 13, 11, 12, 11]);
    }

    #[test]
    fn model_texture_masks_black_after_cammo() {
        let color = Tgc {
            width: 2,
            height: 1,
            pixels: vec![0x0000, pack(20, 20, 20)],
            trailer: 0,
        };
        let plain = model_texture(&color, None, None).unwrap();
        assert_eq!(plain.data[3], 0);
        assert_eq!(plain.data[7], 255);

        let cammo = Tgc {
            width: 2,
            height: 2,
            pixels: cammo_texture(&[0x0000, WHITE], &[pack(1, 1, 1), pack(1, 1, 1)]),
            trailer: 0,
        };
        let tinted = model_texture(&color, None, Some((&cammo, None))).unwrap();
        assert_eq!(&tinted.data[4..8], &[82, 82, 82, 255]);
    }
}
