use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::Capture;

/// Captured slots for one `analyze` run, in slot order.
///
/// ```json
/// { "slots": [{"portrait": "slot1.png"}, {"text": "Storm"}], "enemyPower": 1200000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
	pub slots: Vec<SlotInput>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub enemy_power: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotInput {
	/// Image path, relative to the manifest.
	Portrait(PathBuf),
	Text(String),
}

impl Manifest {
	pub fn load(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
		serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))
	}

	/// Read every referenced image. Decoding happens later, per slot.
	pub fn captures(&self, base_dir: &Path) -> Result<Vec<Capture>> {
		self.slots
			.iter()
			.map(|slot| match slot {
				SlotInput::Portrait(path) => {
					let path = base_dir.join(path);
					let bytes = std::fs::read(&path).with_context(|| format!("read portrait {:?}", path))?;
					Ok(Capture::Portrait(bytes))
				}
				SlotInput::Text(text) => Ok(Capture::Text(text.clone())),
			})
			.collect()
	}
}
