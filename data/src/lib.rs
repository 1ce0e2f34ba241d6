use std::collections::{BTreeMap, HashMap};

use ie::{Fingerprint, HueHistogram};

pub mod schema;
mod names;
pub use names::*;
pub mod matcher;
pub use matcher::{Candidate, MatchResult, Method, SimilarityMatcher, Thresholds};
mod team;
pub use team::*;
mod counters;
pub use counters::*;
mod variant;
pub use variant::*;
mod source;
pub use source::*;

use schema::{Bundle, RawPortrait};

/// A known character portrait, whatever shape it was stored in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
	pub id: String,
	pub display_name: String,
	pub fingerprint: Fingerprint,
	/// All zero for legacy entries that only stored a hash.
	pub hue_histogram: HueHistogram,
}

impl ReferenceEntry {
	pub fn from_raw(id: String, raw: RawPortrait) -> Self {
		let (display_name, fingerprint, hue_histogram) = match raw {
			RawPortrait::Modern {
				name,
				fingerprint,
				hue_histogram,
			} => (name, fingerprint, hue_histogram),
			RawPortrait::Legacy { name, hash } => (name.unwrap_or_else(|| id.clone()), hash, HueHistogram::zero()),
			RawPortrait::Bare(fingerprint) => (id.clone(), fingerprint, HueHistogram::zero()),
		};
		Self {
			id,
			display_name,
			fingerprint,
			hue_histogram,
		}
	}

	pub fn to_raw(&self) -> RawPortrait {
		RawPortrait::Modern {
			name: self.display_name.clone(),
			fingerprint: self.fingerprint,
			hue_histogram: self.hue_histogram.clone(),
		}
	}
}

/// The loaded reference corpus. Immutable once built; share it behind an `Arc`.
pub struct Database {
	// sorted by id
	portraits: Vec<ReferenceEntry>,
	by_id: HashMap<String, usize>,
	by_fingerprint: HashMap<Fingerprint, usize>,
	names: NameIndex,

	teams: Vec<TeamDefinition>,
	meta_squads: Vec<TeamDefinition>,
	counters: CounterTable,
	modifiers: ModifierRules,
}

impl Default for Database {
	fn default() -> Self {
		Self::from_bundle(Bundle::default())
	}
}

impl Database {
	pub fn from_bundle(bundle: Bundle) -> Self {
		Self::with_custom_portraits(bundle, BTreeMap::new())
	}

	/// Build from a bundle, with user-added portraits replacing bundle
	/// entries of the same id.
	pub fn with_custom_portraits(bundle: Bundle, custom: BTreeMap<String, RawPortrait>) -> Self {
		let Bundle {
			mut portraits,
			teams,
			meta_squads,
			counters,
			modifiers,
		} = bundle;
		portraits.extend(custom);

		let portraits = portraits
			.into_iter()
			.map(|(id, raw)| ReferenceEntry::from_raw(id, raw))
			.collect::<Vec<_>>();

		let mut by_id = HashMap::with_capacity(portraits.len());
		let mut fingerprint_owners: HashMap<Fingerprint, Vec<usize>> = HashMap::new();
		for (i, entry) in portraits.iter().enumerate() {
			by_id.insert(entry.id.clone(), i);
			fingerprint_owners.entry(entry.fingerprint).or_default().push(i);
		}

		let names = NameIndex::build(portraits.iter().map(|p| (p.id.as_str(), p.display_name.as_str())));

		// Shared fingerprints cannot be an exact hit; the scan reports them as ambiguous.
		let by_fingerprint = fingerprint_owners
			.into_iter()
			.filter_map(|(fingerprint, owners)| match owners.as_slice() {
				[only] => Some((fingerprint, *only)),
				_ => {
					tracing::warn!(%fingerprint, count = owners.len(), "fingerprint shared by several portraits");
					None
				}
			})
			.collect();

		let teams = teams
			.into_iter()
			.map(|raw| {
				let member_ids = capped_members(&raw.id, raw.member_ids);
				TeamDefinition {
					id: raw.id,
					name: raw.name,
					localized_name: raw.localized_name,
					member_ids,
					is_meta_variant: raw.is_meta_variant,
					popularity: raw.popularity,
				}
			})
			.collect::<Vec<_>>();

		let meta_squads = meta_squads
			.into_iter()
			.enumerate()
			.map(|(i, raw)| {
				let id = format!("meta_{i}");
				let member_ids = capped_members(&id, raw.squad);
				TeamDefinition {
					id,
					name: format!("Meta squad {}", i + 1),
					localized_name: None,
					member_ids,
					is_meta_variant: true,
					popularity: raw.popularity,
				}
			})
			.collect::<Vec<_>>();

		let counters = CounterTable::from_raw(counters);
		let modifiers = ModifierRules::new(modifiers);

		tracing::info!(
			portraits = portraits.len(),
			teams = teams.len(),
			meta_squads = meta_squads.len(),
			counters = counters.len(),
			"reference database built"
		);

		Self {
			portraits,
			by_id,
			by_fingerprint,
			names,
			teams,
			meta_squads,
			counters,
			modifiers,
		}
	}

	pub fn portraits(&self) -> &[ReferenceEntry] {
		&self.portraits
	}

	pub fn portrait(&self, id: &str) -> Option<&ReferenceEntry> {
		self.by_id.get(id).map(|&i| &self.portraits[i])
	}

	/// Exact index hit. Fingerprints shared by several portraits are not indexed.
	pub fn portrait_by_fingerprint(&self, fingerprint: Fingerprint) -> Option<&ReferenceEntry> {
		self.by_fingerprint.get(&fingerprint).map(|&i| &self.portraits[i])
	}

	pub fn names(&self) -> &NameIndex {
		&self.names
	}

	pub fn teams(&self) -> &[TeamDefinition] {
		&self.teams
	}

	pub fn team(&self, id: &str) -> Option<&TeamDefinition> {
		self.teams.iter().chain(&self.meta_squads).find(|t| t.id == id)
	}

	pub fn meta_squads(&self) -> &[TeamDefinition] {
		&self.meta_squads
	}

	pub fn counters(&self) -> &CounterTable {
		&self.counters
	}

	pub fn modifiers(&self) -> &ModifierRules {
		&self.modifiers
	}
}

fn capped_members(team: &str, mut member_ids: Vec<String>) -> Vec<String> {
	if member_ids.len() > TEAM_SIZE {
		tracing::warn!(team, members = member_ids.len(), "team has too many members, truncating");
		member_ids.truncate(TEAM_SIZE);
	}
	member_ids
}
