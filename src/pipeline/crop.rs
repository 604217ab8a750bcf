//! Fallback cropping: cut a figure out of the page raster by bounding box.

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// `(x1, y1, x2, y2)` in source-image pixel coordinates.
///
/// Values are not validated: they may be negative, past the image edge, or
/// reversed. [`crop`] makes them safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp `x1,x2` to `[0, width]` and `y1,y2` to `[0, height]`.
    ///
    /// Each coordinate is clamped on its own; reversed pairs stay reversed.
    pub fn clamp_to(&self, width: u32, height: u32) -> BoundingBox {
        let w = i64::from(width);
        let h = i64::from(height);
        BoundingBox {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    /// Width of the box, zero when reversed.
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    /// Height of the box, zero when reversed.
    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from(c: [i64; 4]) -> Self {
        BoundingBox::new(c[0], c[1], c[2], c[3])
    }
}

/// Crop `[y1:y2, x1:x2]` out of `source` after clamping `bbox` to its bounds.
///
/// A box that clamps to zero area (or is reversed) yields a 0×0 image.
pub fn crop(source: &RgbImage, bbox: BoundingBox) -> RgbImage {
    let b = bbox.clamp_to(source.width(), source.height());
    let (w, h) = (b.width(), b.height());
    if w == 0 || h == 0 {
        return RgbImage::new(0, 0);
    }
    imageops::crop_imm(source, b.x1 as u32, b.y1 as u32, w, h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn crop_inside_bounds() {
        let img = gradient(100, 50);
        let out = crop(&img, BoundingBox::new(10, 5, 30, 25));
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 5, 0]));
        assert_eq!(out.get_pixel(19, 19), &Rgb([29, 24, 0]));
    }

    #[test]
    fn crop_clamps_overflow() {
        let img = gradient(200, 200);
        let out = crop(&img, BoundingBox::new(10, 10, 5000, 5000));
        assert_eq!(out.dimensions(), (190, 190));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 10, 0]));
    }

    #[test]
    fn crop_clamps_negative() {
        let img = gradient(40, 40);
        let out = crop(&img, BoundingBox::new(-20, -5, 8, 4));
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn reversed_box_is_empty() {
        let img = gradient(40, 40);
        let out = crop(&img, BoundingBox::new(30, 30, 10, 10));
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn box_outside_image_is_empty() {
        let img = gradient(40, 40);
        let out = crop(&img, BoundingBox::new(50, 50, 90, 90));
        assert_eq!(out.dimensions(), (0, 0));
    }

    #[test]
    fn clamp_is_per_coordinate() {
        let b = BoundingBox::new(-1, 500, 500, -1).clamp_to(100, 200);
        assert_eq!(b, BoundingBox::new(0, 200, 100, 0));
    }
}
