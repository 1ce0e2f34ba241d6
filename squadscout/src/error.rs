/// Why a single slot produced no identity. Never aborts the session.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
	#[error(transparent)]
	Decode(#[from] ie::DecodeError),
}
