//! 64-bit perceptual fingerprint (mean-over-median grid hash).

use std::{fmt, str::FromStr};

use crate::{FingerprintError, GrayBuffer};

const GRID: u32 = 8;
pub const FINGERPRINT_BITS: u32 = GRID * GRID;

/// Fixed-length binary fingerprint of a portrait.
///
/// Cell `i` of the 8x8 grid (row-major) is stored in bit `63 - i`, so the hex
/// form reads left-to-right, top-to-bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(pub u64);

impl Fingerprint {
	/// Hash a canonical grayscale buffer.
	pub fn from_gray(buffer: &GrayBuffer) -> Self {
		let means = cell_means(buffer);

		let mut sorted = means;
		sorted.sort_by(f32::total_cmp);
		let median = (sorted[31] + sorted[32]) / 2.0;

		let mut bits = 0u64;
		for (i, mean) in means.iter().enumerate() {
			if *mean > median {
				bits |= 1 << (63 - i);
			}
		}
		Self(bits)
	}

	pub fn hamming(&self, other: Fingerprint) -> u32 {
		(self.0 ^ other.0).count_ones()
	}

	/// `1 - hamming / 64` as a rounded percentage.
	pub fn similarity(&self, other: Fingerprint) -> f32 {
		let same = FINGERPRINT_BITS - self.hamming(other);
		(same as f32 * 100.0 / FINGERPRINT_BITS as f32).round()
	}
}

fn cell_means(buffer: &GrayBuffer) -> [f32; FINGERPRINT_BITS as usize] {
	let size = buffer.size();
	let mut means = [0f32; FINGERPRINT_BITS as usize];

	for cy in 0..GRID {
		let y1 = cy * size / GRID;
		let y2 = ((cy + 1) * size / GRID).max(y1 + 1).min(size);
		for cx in 0..GRID {
			let x1 = cx * size / GRID;
			let x2 = ((cx + 1) * size / GRID).max(x1 + 1).min(size);

			let mut sum = 0u32;
			let mut count = 0u32;
			for y in y1..y2 {
				for x in x1..x2 {
					sum += buffer.get(x, y) as u32;
					count += 1;
				}
			}

			if count > 0 {
				means[(cy * GRID + cx) as usize] = sum as f32 / count as f32;
			}
		}
	}

	means
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:016x}", self.0)
	}
}

impl FromStr for Fingerprint {
	type Err = FingerprintError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.len() != 16 {
			return Err(FingerprintError::Length(s.len()));
		}
		if !s.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(FingerprintError::Digit(s.to_string()));
		}
		u64::from_str_radix(s, 16)
			.map(Self)
			.map_err(|_| FingerprintError::Digit(s.to_string()))
	}
}

impl TryFrom<String> for Fingerprint {
	type Error = FingerprintError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<Fingerprint> for String {
	fn from(value: Fingerprint) -> Self {
		value.to_string()
	}
}
