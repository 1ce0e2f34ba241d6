//! Wire format of the reference bundle.
//!
//! Everything here mirrors the JSON as published; `crate::Database` turns it
//! into the canonical in-memory model.

use std::collections::BTreeMap;

use ie::{Fingerprint, HueHistogram};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

/// One document holding every reference table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
	#[serde(default, deserialize_with = "portraits_by_id")]
	pub portraits: BTreeMap<String, RawPortrait>,
	#[serde(default)]
	pub teams: Vec<RawTeam>,
	#[serde(default)]
	pub meta_squads: Vec<RawMetaSquad>,
	#[serde(default)]
	pub counters: BTreeMap<String, Vec<RawCounter>>,
	/// Character id -> variant suffix token.
	#[serde(default)]
	pub modifiers: BTreeMap<String, String>,
}

/// Decodes entries one at a time so a malformed one is reported by id.
fn portraits_by_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, RawPortrait>, D::Error> {
	BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?
		.into_iter()
		.map(|(id, value)| match serde_json::from_value(value) {
			Ok(portrait) => Ok((id, portrait)),
			Err(err) => Err(D::Error::custom(format!("portrait {id:?}: {err}"))),
		})
		.collect()
}

/// A portrait reference as stored, in either of its historical shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPortrait {
	Modern {
		name: String,
		fingerprint: Fingerprint,
		#[serde(rename = "hueHistogram", default)]
		hue_histogram: HueHistogram,
	},
	/// Older corpora stored only the hash, optionally with a name.
	Legacy {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		name: Option<String>,
		hash: Fingerprint,
	},
	/// Oldest form: a bare 16 digit fingerprint string.
	Bare(Fingerprint),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeam {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub localized_name: Option<String>,
	#[serde(alias = "members")]
	pub member_ids: Vec<String>,
	#[serde(default)]
	pub is_meta_variant: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub popularity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetaSquad {
	pub squad: Vec<String>,
	#[serde(default)]
	pub popularity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCounter {
	#[serde(alias = "team")]
	pub attacking_team: String,
	pub confidence: f32,
	pub min_power_ratio: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn portrait_shapes_decode() {
		let json = r#"{
			"THOR": {"name": "Thor", "fingerprint": "abcd1234abcd1234", "hueHistogram": [
				1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]},
			"STORM": {"name": "Storm", "hash": "0000ffff0000ffff"},
			"HULK": "ffffffff00000000"
		}"#;
		let portraits: BTreeMap<String, RawPortrait> = serde_json::from_str(json).unwrap();

		assert!(matches!(&portraits["THOR"], RawPortrait::Modern { name, .. } if name == "Thor"));
		assert!(matches!(&portraits["STORM"], RawPortrait::Legacy { hash, .. } if *hash == Fingerprint(0x0000_ffff_0000_ffff)));
		assert_eq!(portraits["HULK"], RawPortrait::Bare(Fingerprint(0xffff_ffff_0000_0000)));
	}

	#[test]
	fn counter_accepts_short_team_key() {
		let c: RawCounter = serde_json::from_str(r#"{"team": "avengers", "confidence": 90, "minPowerRatio": 1.1}"#).unwrap();
		assert_eq!(c.attacking_team, "avengers");
		assert_eq!(c.notes, None);
	}

	#[test]
	fn malformed_portrait_is_named() {
		let json = r#"{"portraits": {"THOR": "00000000000000ff", "LOKI": {"name": "Loki", "fingerprint": "xyz"}}}"#;
		let err = serde_json::from_str::<Bundle>(json).unwrap_err().to_string();
		assert!(err.contains("portrait \"LOKI\""), "{err}");

		let ok: Bundle = serde_json::from_str(r#"{"portraits": {"THOR": "00000000000000ff"}}"#).unwrap();
		assert_eq!(ok.portraits["THOR"], RawPortrait::Bare(Fingerprint(0xff)));
	}

	#[test]
	fn bundle_tables_default_to_empty() {
		let b: Bundle = serde_json::from_str("{}").unwrap();
		assert!(b.portraits.is_empty() && b.teams.is_empty() && b.counters.is_empty());
	}
}
