//! Image primitives and utilities.
//!
//! The project uses a lightweight owned RGB image type (`OwnedImage`) that is
//! optimized for repeated cropping/resizing of portrait captures.
//!
//! For most operations we borrow a view (`Image<'a>`) instead of copying pixels.
//! Normalization only copies once, when the cropped view is resampled into a
//! canonical square buffer.

use std::sync::mpsc;
use std::time::Duration;

use crate::DecodeError;

/// Owned RGB image (no alpha).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an image by evaluating `f` for every pixel (row-major).
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Color) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    /// Decode an encoded raster (PNG, JPEG, WebP, BMP, ...).
    ///
    /// Zero-sized results are rejected so every later stage can assume at
    /// least one pixel.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let img = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty { width, height });
        }

        let data = img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                Color::new(r, g, b)
            })
            .collect();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode on a worker thread, giving up after `timeout`.
    ///
    /// The worker is detached on timeout; its result is dropped when it finishes.
    pub fn decode_with_timeout(bytes: Vec<u8>, timeout: Duration) -> Result<Self, DecodeError> {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(Self::decode(&bytes));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DecodeError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DecodeError::WorkerLost),
        }
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.data
    }

    /// Resample to exactly `width` x `height` using an area-averaging (box) filter.
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    /// Box convolution averages every source pixel under the destination
    /// footprint, so downsampling does not alias the way point sampling does.
    pub fn resampled(&self, width: u32, height: u32) -> Result<Self, DecodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::Empty {
                width: self.width,
                height: self.height,
            });
        }
        if self.width == width && self.height == height {
            return Ok(self.clone());
        }

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .map_err(|err| DecodeError::Resample(err.to_string()))?;

        let mut dst = fast_image_resize::images::Image::new(
            width.max(1),
            height.max(1),
            fast_image_resize::PixelType::U8x3,
        );

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Convolution(fast_image_resize::FilterType::Box),
        );

        resizer
            .resize(&src, &mut dst, &options)
            .map_err(|err| DecodeError::Resample(err.to_string()))?;

        let (width, height) = (dst.width(), dst.height());
        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image<'a>(&'a self) -> Image<'a> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Encode as PNG (used for debug snapshots and test fixtures).
    pub fn to_png(&self) -> anyhow::Result<Vec<u8>> {
        use anyhow::Context;

        let bytes = self.as_image().get_bytes();
        let img = image::RgbImage::from_raw(self.width, self.height, bytes)
            .context("RgbImage::from_raw failed")?;
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .context("encode png")?;
        Ok(out.into_inner())
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    pub fn to_owned_image(self) -> OwnedImage {
        let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                data.push(*self.pixel(x, y));
            }
        }

        OwnedImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }

    /// Gets a subimage with the same width and provided height aligned to the top with the bottom side trimmed.
    pub fn trimmed_top(&self, height: u32) -> Self {
        let size = height.min(self.height());

        Self {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y1 + size,
            true_width: self.true_width,
            data: self.data,
        }
    }

    /// Create an arbitrary subimage (relative coordinates).
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }

    /// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
    pub fn hsv(&self) -> (f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let v = max;
        let s = if max > 0.0 { delta / max } else { 0.0 };

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        (h.rem_euclid(360.0), s, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_of_primaries() {
        let (h, s, v) = Color::new(255, 0, 0).hsv();
        assert!(h.abs() < 1e-3 && (s - 1.0).abs() < 1e-6 && (v - 1.0).abs() < 1e-6);

        let (h, _, _) = Color::new(0, 255, 0).hsv();
        assert!((h - 120.0).abs() < 1e-3);

        let (h, _, _) = Color::new(0, 0, 255).hsv();
        assert!((h - 240.0).abs() < 1e-3);

        let (_, s, v) = Color::WHITE.hsv();
        assert_eq!(s, 0.0);
        assert_eq!(v, 1.0);
    }

    #[test]
    fn magenta_wraps_below_360() {
        let (h, _, _) = Color::new(255, 0, 128).hsv();
        assert!((0.0..360.0).contains(&h));
        assert!(h > 300.0);
    }

    #[test]
    fn decode_roundtrips_png_pixels() {
        let img = OwnedImage::from_fn(3, 2, |x, y| Color::new(x as u8 * 40, y as u8 * 90, 7));
        let png = img.to_png().unwrap();
        let decoded = OwnedImage::decode(&png).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            OwnedImage::decode(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
    }

    #[test]
    fn decode_with_timeout_returns_result() {
        let img = OwnedImage::from_fn(4, 4, |_, _| Color::WHITE);
        let png = img.to_png().unwrap();
        let decoded = OwnedImage::decode_with_timeout(png, Duration::from_secs(10)).unwrap();
        assert_eq!(decoded.width(), 4);
    }

    #[test]
    fn decode_gives_up_after_timeout() {
        let img = OwnedImage::from_fn(1024, 1024, |x, y| Color::new(x as u8, y as u8, (x ^ y) as u8));
        let png = img.to_png().unwrap();
        let err = OwnedImage::decode_with_timeout(png, Duration::ZERO).unwrap_err();
        assert!(matches!(err, DecodeError::Timeout(t) if t == Duration::ZERO), "{err:?}");
    }

    #[test]
    fn uniform_image_stays_uniform_after_resample() {
        let img = OwnedImage::from_fn(37, 53, |_, _| Color::new(10, 200, 30));
        for size in [8, 32, 64] {
            let out = img.resampled(size, size).unwrap();
            assert_eq!(out.width(), size);
            assert_eq!(out.height(), size);
            assert!(out.pixels().iter().all(|c| *c == Color::new(10, 200, 30)));
        }
    }

    #[test]
    fn sub_image_and_trim_are_clamped() {
        let img = OwnedImage::from_fn(10, 10, |x, y| Color::new(x as u8, y as u8, 0));
        let view = img.as_image().sub_image(8, 8, 10, 10);
        assert_eq!((view.width(), view.height()), (2, 2));
        let top = img.as_image().trimmed_top(3);
        assert_eq!(top.height(), 3);
        assert_eq!(top.to_owned_image().pixels()[10 * 2 + 4], Color::new(4, 2, 0));
    }
}
