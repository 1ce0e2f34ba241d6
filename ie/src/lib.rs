mod error;
pub use error::*;
mod image;
pub use self::image::*;
mod normalize;
pub use normalize::*;
mod phash;
pub use phash::*;
mod histogram;
pub use histogram::*;
pub mod text;

/// Both signatures of one portrait capture.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitSignature {
	pub fingerprint: Fingerprint,
	pub hue_histogram: HueHistogram,
}

/// Portrait signature extraction with fixed normalization settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ie {
	hash: Normalizer,
	histogram: Normalizer,
}

impl Default for Ie {
	fn default() -> Self {
		Self::new(Normalizer::for_hash(), Normalizer::for_histogram())
	}
}

impl Ie {
	pub fn new(hash: Normalizer, histogram: Normalizer) -> Self {
		Self { hash, histogram }
	}

	pub fn fingerprint(&self, image: Image) -> Result<Fingerprint, DecodeError> {
		Ok(Fingerprint::from_gray(&self.hash.gray(image)?))
	}

	pub fn hue_histogram(&self, image: Image) -> Result<HueHistogram, DecodeError> {
		Ok(HueHistogram::from_image(&self.histogram.color(image)?))
	}

	pub fn signature(&self, image: Image) -> Result<PortraitSignature, DecodeError> {
		Ok(PortraitSignature {
			fingerprint: self.fingerprint(image)?,
			hue_histogram: self.hue_histogram(image)?,
		})
	}
}
