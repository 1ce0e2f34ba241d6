//! Saturation-weighted hue histograms.
//!
//! Portraits of different characters often share silhouette and framing but
//! differ in dominant color, which makes a hue distribution a cheap and shape
//! independent signature.

use crate::OwnedImage;

pub const HUE_BUCKETS: usize = 36;
const BUCKET_DEGREES: f32 = 360.0 / HUE_BUCKETS as f32;

/// Pixels below either threshold are background/shadow and carry no hue.
pub const MIN_SATURATION: f32 = 0.2;
pub const MIN_VALUE: f32 = 0.2;

/// Probability distribution over 36 hue buckets of 10 degrees.
///
/// Sums to 1.0 when any qualifying pixel existed, otherwise all zero.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct HueHistogram(Vec<f32>);

impl Default for HueHistogram {
	fn default() -> Self {
		Self::zero()
	}
}

impl HueHistogram {
	pub fn zero() -> Self {
		Self(vec![0.0; HUE_BUCKETS])
	}

	/// Accumulate every qualifying pixel of a canonical color buffer.
	pub fn from_image(image: &OwnedImage) -> Self {
		let mut bins = vec![0f64; HUE_BUCKETS];
		for px in image.pixels() {
			let (h, s, v) = px.hsv();
			if s < MIN_SATURATION || v < MIN_VALUE {
				continue;
			}
			let bucket = ((h / BUCKET_DEGREES) as usize).min(HUE_BUCKETS - 1);
			bins[bucket] += (s * v) as f64;
		}

		let total: f64 = bins.iter().sum();
		if total <= 0.0 {
			return Self::zero();
		}

		Self(bins.into_iter().map(|v| (v / total) as f32).collect())
	}

	pub fn bins(&self) -> &[f32] {
		&self.0
	}

	pub fn is_zero(&self) -> bool {
		self.0.iter().all(|v| *v == 0.0)
	}

	/// Bhattacharyya coefficient, bounded to `[0, 1]`.
	///
	/// Two empty histograms are identical distributions (1.0); an empty one
	/// against a populated one shares nothing (0.0).
	pub fn similarity(&self, other: &HueHistogram) -> f32 {
		match (self.is_zero(), other.is_zero()) {
			(true, true) => return 1.0,
			(true, false) | (false, true) => return 0.0,
			_ => {}
		}

		let bc: f64 = self
			.0
			.iter()
			.zip(&other.0)
			.map(|(p, q)| ((*p as f64) * (*q as f64)).sqrt())
			.sum();
		bc.clamp(0.0, 1.0) as f32
	}
}

impl TryFrom<Vec<f32>> for HueHistogram {
	type Error = String;

	fn try_from(bins: Vec<f32>) -> Result<Self, Self::Error> {
		if bins.len() != HUE_BUCKETS {
			return Err(format!("hue histogram needs {HUE_BUCKETS} buckets, got {}", bins.len()));
		}
		if bins.iter().any(|v| !v.is_finite() || *v < 0.0) {
			return Err("hue histogram buckets must be finite and non-negative".to_string());
		}

		// Stored references may be unnormalized (or on a percent scale).
		let total: f64 = bins.iter().map(|v| *v as f64).sum();
		if total <= 0.0 || (total - 1.0).abs() < 1e-6 {
			return Ok(Self(bins));
		}
		Ok(Self(bins.into_iter().map(|v| (v as f64 / total) as f32).collect()))
	}
}

impl From<HueHistogram> for Vec<f32> {
	fn from(value: HueHistogram) -> Self {
		value.0
	}
}
