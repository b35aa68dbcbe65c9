use crate::error::{ComposeError, Result};
use crate::types::{Color, Extent};
use image::{Rgba, RgbaImage};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

/// Tight pixel rectangle, `x`/`y` inclusive, `width`/`height` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Premultiplied RGBA raster of a fixed extent.
///
/// Zero-width or zero-height rasters are legal and carry no pixel storage;
/// every drawing operation on them is a no-op.
#[derive(Debug, Clone)]
pub struct Raster {
    extent: Extent,
    pixmap: Option<Pixmap>,
}

impl Raster {
    pub fn new(extent: Extent, fill: Color) -> Result<Self> {
        if extent.is_empty() {
            return Ok(Self {
                extent,
                pixmap: None,
            });
        }
        let mut pixmap = Pixmap::new(extent.width, extent.height).ok_or_else(|| {
            ComposeError::InvalidGeometry(format!("cannot allocate a {extent} raster"))
        })?;
        if fill.a > 0 {
            pixmap.fill(tiny_skia::Color::from_rgba8(fill.r, fill.g, fill.b, fill.a));
        }
        Ok(Self {
            extent,
            pixmap: Some(pixmap),
        })
    }

    pub fn transparent(extent: Extent) -> Result<Self> {
        Self::new(extent, Color::TRANSPARENT)
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let mut raster = Self::transparent(Extent::new(width, height))?;
        if let Some(pixmap) = raster.pixmap.as_mut() {
            let src = image.as_raw();
            let dst = pixmap.data_mut();
            for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                let a = src_px[3];
                dst_px[0] = premul_u8(src_px[0], a);
                dst_px[1] = premul_u8(src_px[1], a);
                dst_px[2] = premul_u8(src_px[2], a);
                dst_px[3] = a;
            }
        }
        Ok(raster)
    }

    /// Straight-alpha copy, ready for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.extent.width, self.extent.height);
        if let Some(pixmap) = self.pixmap.as_ref() {
            for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
                let c = src.demultiply();
                *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
            }
        }
        image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let pixmap = self.pixmap.as_ref()?;
        let c = pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(c.red(), c.green(), c.blue(), c.alpha()))
    }

    pub(crate) fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Alpha-over `src` with its top-left corner at (`x`, `y`), clipped to this raster.
    pub fn paste(&mut self, src: &Raster, x: i32, y: i32) {
        let (Some(dst), Some(src)) = (self.pixmap.as_mut(), src.pixmap.as_ref()) else {
            return;
        };
        dst.draw_pixmap(
            x,
            y,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Alpha-over `src` resampled to `width` x `height` at (`x`, `y`).
    pub(crate) fn paste_scaled(&mut self, src: &Raster, x: i32, y: i32, width: u32, height: u32) {
        if src.extent.is_empty() || width == 0 || height == 0 {
            return;
        }
        let (Some(dst), Some(source)) = (self.pixmap.as_mut(), src.pixmap.as_ref()) else {
            return;
        };
        let sx = width as f32 / src.extent.width as f32;
        let sy = height as f32 / src.extent.height as f32;
        let mut paint = PixmapPaint::default();
        paint.quality = if width == src.extent.width && height == src.extent.height {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bicubic
        };
        dst.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, x as f32, y as f32),
            None,
        );
    }

    /// Pastes `color` at (`x`, `y`) using `mask`'s alpha channel as coverage.
    pub fn paste_silhouette(&mut self, mask: &Raster, color: Color, x: i32, y: i32) -> Result<()> {
        let Some(mask_pixels) = mask.pixmap.as_ref() else {
            return Ok(());
        };
        let mut silhouette = Raster::transparent(mask.extent)?;
        if let Some(out) = silhouette.pixmap.as_mut() {
            for (dst, src) in out.pixels_mut().iter_mut().zip(mask_pixels.pixels()) {
                *dst = color.with_coverage(src.alpha()).premultiplied();
            }
        }
        self.paste(&silhouette, x, y);
        Ok(())
    }

    /// One pass of the 5x5 ring blur: weight 1 on the outer ring, 0 inside,
    /// divisor 16, edge pixels replicated.
    pub fn blur(&mut self) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let w = pixmap.width() as i64;
        let h = pixmap.height() as i64;
        let src = pixmap.data().to_vec();
        let dst = pixmap.data_mut();
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0u32; 4];
                for ky in -2i64..=2 {
                    for kx in -2i64..=2 {
                        if ky.abs() < 2 && kx.abs() < 2 {
                            continue;
                        }
                        let sx = (x + kx).clamp(0, w - 1);
                        let sy = (y + ky).clamp(0, h - 1);
                        let idx = ((sy * w + sx) * 4) as usize;
                        for (c, slot) in acc.iter_mut().enumerate() {
                            *slot += src[idx + c] as u32;
                        }
                    }
                }
                let out = ((y * w + x) * 4) as usize;
                for (c, total) in acc.iter().enumerate() {
                    dst[out + c] = ((total + 8) / 16) as u8;
                }
            }
        }
    }

    /// Bounding box of all pixels with non-zero alpha.
    pub fn opaque_bounds(&self) -> Option<Bounds> {
        let pixmap = self.pixmap.as_ref()?;
        let width = self.extent.width;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for (idx, px) in pixmap.pixels().iter().enumerate() {
            if px.alpha() == 0 {
                continue;
            }
            let x = idx as u32 % width;
            let y = idx as u32 / width;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            any = true;
        }
        any.then(|| Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    pub fn crop(&self, bounds: Bounds) -> Result<Raster> {
        let fits = bounds.x.checked_add(bounds.width).is_some_and(|r| r <= self.extent.width)
            && bounds.y.checked_add(bounds.height).is_some_and(|b| b <= self.extent.height);
        if !fits {
            return Err(ComposeError::InvalidGeometry(format!(
                "crop {:?} outside of {} raster",
                bounds, self.extent
            )));
        }
        let mut out = Raster::transparent(Extent::new(bounds.width, bounds.height))?;
        if let (Some(dst), Some(src)) = (out.pixmap.as_mut(), self.pixmap.as_ref()) {
            let src_width = self.extent.width as usize;
            let row = bounds.width as usize;
            let src_pixels = src.pixels();
            for (dy, dst_row) in dst.pixels_mut().chunks_exact_mut(row).enumerate() {
                let start = (bounds.y as usize + dy) * src_width + bounds.x as usize;
                dst_row.copy_from_slice(&src_pixels[start..start + row]);
            }
        }
        Ok(out)
    }
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    #[test]
    fn new_raster_is_filled() {
        let raster = Raster::new(Extent::new(4, 3), RED).unwrap();
        assert_eq!(raster.extent(), Extent::new(4, 3));
        assert_eq!(raster.pixel(3, 2), Some(RED));
        assert_eq!(raster.pixel(4, 0), None);
    }

    #[test]
    fn zero_extent_is_empty_not_an_error() {
        let mut raster = Raster::new(Extent::new(0, 10), RED).unwrap();
        let other = Raster::new(Extent::new(2, 2), BLUE).unwrap();
        raster.paste(&other, 0, 0);
        raster.blur();
        assert!(raster.opaque_bounds().is_none());
        let image = raster.to_rgba_image();
        assert_eq!(image.dimensions(), (0, 10));
    }

    #[test]
    fn transparent_pixels_leave_background_visible() {
        let mut base = Raster::new(Extent::new(4, 4), RED).unwrap();
        let mut overlay = Raster::transparent(Extent::new(4, 4)).unwrap();
        let patch = Raster::new(Extent::new(1, 1), BLUE).unwrap();
        overlay.paste(&patch, 1, 1);
        base.paste(&overlay, 0, 0);
        assert_eq!(base.pixel(0, 0), Some(RED));
        assert_eq!(base.pixel(1, 1), Some(BLUE));
    }

    #[test]
    fn paste_clips_negative_offsets() {
        let mut base = Raster::new(Extent::new(4, 4), RED).unwrap();
        let patch = Raster::new(Extent::new(3, 3), BLUE).unwrap();
        base.paste(&patch, -2, -2);
        assert_eq!(base.pixel(0, 0), Some(BLUE));
        assert_eq!(base.pixel(1, 1), Some(RED));
    }

    #[test]
    fn silhouette_uses_mask_alpha() {
        let mut mask = Raster::transparent(Extent::new(4, 4)).unwrap();
        mask.paste(&Raster::new(Extent::new(2, 2), RED).unwrap(), 0, 0);
        let mut base = Raster::new(Extent::new(6, 6), Color::WHITE).unwrap();
        base.paste_silhouette(&mask, Color::BLACK, 2, 2).unwrap();
        assert_eq!(base.pixel(2, 2), Some(Color::BLACK));
        assert_eq!(base.pixel(3, 3), Some(Color::BLACK));
        assert_eq!(base.pixel(4, 4), Some(Color::WHITE));
        assert_eq!(base.pixel(1, 1), Some(Color::WHITE));
    }

    #[test]
    fn blur_spreads_along_the_ring() {
        let mut raster = Raster::transparent(Extent::new(9, 9)).unwrap();
        raster.paste(&Raster::new(Extent::new(1, 1), Color::WHITE).unwrap(), 4, 4);
        raster.blur();
        let alpha_at = |x, y| raster.pixel(x, y).map(|c| c.a).unwrap_or(0);
        assert_eq!(alpha_at(4, 4), 0);
        assert_eq!(alpha_at(5, 4), 0);
        assert_eq!(alpha_at(6, 4), 16);
        assert_eq!(alpha_at(2, 2), 16);
        assert_eq!(alpha_at(0, 0), 0);
    }

    #[test]
    fn blur_keeps_uniform_rasters_uniform() {
        let mut raster = Raster::new(Extent::new(5, 5), Color::rgb(10, 20, 30)).unwrap();
        raster.blur();
        assert_eq!(raster.pixel(0, 0), Some(Color::rgb(10, 20, 30)));
        assert_eq!(raster.pixel(4, 2), Some(Color::rgb(10, 20, 30)));
    }

    #[test]
    fn bounds_and_crop() {
        let mut raster = Raster::transparent(Extent::new(10, 8)).unwrap();
        raster.paste(&Raster::new(Extent::new(3, 2), BLUE).unwrap(), 4, 5);
        let bounds = raster.opaque_bounds().unwrap();
        assert_eq!(
            bounds,
            Bounds {
                x: 4,
                y: 5,
                width: 3,
                height: 2
            }
        );
        let cropped = raster.crop(bounds).unwrap();
        assert_eq!(cropped.extent(), Extent::new(3, 2));
        assert_eq!(cropped.pixel(0, 0), Some(BLUE));
        assert_eq!(cropped.pixel(2, 1), Some(BLUE));
        assert!(
            raster
                .crop(Bounds {
                    x: 8,
                    y: 0,
                    width: 3,
                    height: 1
                })
                .is_err()
        );
    }

    #[test]
    fn rgba_image_round_trip_keeps_opaque_pixels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([12, 34, 56, 255]));
        let raster = Raster::from_rgba_image(&image).unwrap();
        assert_eq!(raster.pixel(0, 0), Some(Color::rgb(12, 34, 56)));
        assert_eq!(raster.pixel(1, 0), Some(Color::TRANSPARENT));
        assert_eq!(raster.to_rgba_image().get_pixel(0, 0).0, [12, 34, 56, 255]);
    }

    #[test]
    fn paste_scaled_covers_target_rectangle() {
        let mut base = Raster::new(Extent::new(20, 10), Color::WHITE).unwrap();
        let src = Raster::new(Extent::new(4, 4), BLUE).unwrap();
        base.paste_scaled(&src, 5, 0, 10, 10);
        assert_eq!(base.pixel(4, 5), Some(Color::WHITE));
        let inside = base.pixel(10, 5).unwrap();
        assert!(inside.b > 240 && inside.r < 16, "got {inside:?}");
        assert_eq!(base.pixel(15, 5), Some(Color::WHITE));
    }
}
