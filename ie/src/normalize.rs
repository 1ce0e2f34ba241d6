//! Canonical portrait buffers.
//!
//! Captured portraits come in whatever size the screen produced. Before any
//! signature is derived they are cropped (the bottom of a portrait usually
//! carries level/power text) and area-resampled into a fixed square.

use crate::{DecodeError, Image, OwnedImage};

/// Side of the grayscale buffer fed to the fingerprint hasher.
pub const HASH_SIZE: u32 = 32;
/// Side of the color buffer fed to the hue histogram.
pub const HISTOGRAM_SIZE: u32 = 48;
/// Default share of the portrait height discarded from the bottom.
pub const DEFAULT_CROP_FRACTION: f32 = 0.2;

const MAX_CROP_FRACTION: f32 = 0.95;

/// Square grayscale buffer (row-major luma).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayBuffer {
	size: u32,
	data: Vec<u8>,
}

impl GrayBuffer {
	pub fn from_fn(size: u32, f: impl Fn(u32, u32) -> u8) -> Self {
		let mut data = Vec::with_capacity((size * size) as usize);
		for y in 0..size {
			for x in 0..size {
				data.push(f(x, y));
			}
		}
		Self { size, data }
	}

	pub fn from_image(image: &OwnedImage) -> Self {
		let size = image.width().min(image.height());
		let data = image
			.as_image()
			.sub_image(0, 0, size, size)
			.to_owned_image()
			.pixels()
			.iter()
			.map(|c| c.luma())
			.collect();
		Self { size, data }
	}

	#[inline(always)]
	pub fn size(&self) -> u32 {
		self.size
	}

	#[inline(always)]
	pub fn get(&self, x: u32, y: u32) -> u8 {
		self.data[(x + y * self.size) as usize]
	}
}

/// Crops and resamples portraits into canonical square buffers.
///
/// Same input and same settings always yield a bit-identical buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
	pub size: u32,
	/// Share of the height removed from the bottom; `0.0` keeps everything.
	pub crop_fraction: f32,
}

impl Normalizer {
	pub const fn new(size: u32, crop_fraction: f32) -> Self {
		Self { size, crop_fraction }
	}

	pub const fn for_hash() -> Self {
		Self::new(HASH_SIZE, DEFAULT_CROP_FRACTION)
	}

	pub const fn for_histogram() -> Self {
		Self::new(HISTOGRAM_SIZE, DEFAULT_CROP_FRACTION)
	}

	/// Rows kept from a portrait of the given height.
	pub fn kept_height(&self, height: u32) -> u32 {
		let crop = if self.crop_fraction.is_finite() {
			self.crop_fraction.clamp(0.0, MAX_CROP_FRACTION)
		} else {
			0.0
		};
		((height as f32 * (1.0 - crop)).round() as u32).clamp(1, height.max(1))
	}

	/// Full-color canonical buffer (`size` x `size`).
	pub fn color(&self, image: Image) -> Result<OwnedImage, DecodeError> {
		if image.width() == 0 || image.height() == 0 {
			return Err(DecodeError::Empty {
				width: image.width(),
				height: image.height(),
			});
		}

		let size = self.size.max(1);
		image
			.trimmed_top(self.kept_height(image.height()))
			.to_owned_image()
			.resampled(size, size)
	}

	/// Grayscale canonical buffer (`size` x `size`).
	pub fn gray(&self, image: Image) -> Result<GrayBuffer, DecodeError> {
		Ok(GrayBuffer::from_image(&self.color(image)?))
	}
}
