use std::time::Duration;

/// Failure to turn a capture into pixels.
///
/// Recorded per slot by callers; never retried.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("failed to decode image: {0}")]
	Image(#[from] image::ImageError),

	#[error("image has zero dimensions ({width}x{height})")]
	Empty { width: u32, height: u32 },

	#[error("decode did not finish within {0:?}")]
	Timeout(Duration),

	#[error("decode worker exited without a result")]
	WorkerLost,

	#[error("resample failed: {0}")]
	Resample(String),
}

/// A fingerprint string that is not exactly 16 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
	#[error("fingerprint must be 16 hex digits, got {0}")]
	Length(usize),

	#[error("fingerprint contains a non-hex digit: {0:?}")]
	Digit(String),
}
