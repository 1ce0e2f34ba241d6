//! Team identification from a set of recognized characters.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Nominal roster size.
pub const TEAM_SIZE: usize = 5;
/// A team is only accepted when at least this many members were seen.
pub const MIN_TEAM_OVERLAP: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDefinition {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub localized_name: Option<String>,
	/// At most `TEAM_SIZE` character ids, in roster order.
	pub member_ids: Vec<String>,
	#[serde(default)]
	pub is_meta_variant: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub popularity: Option<f32>,
}

impl TeamDefinition {
	/// Number of distinct members present in `recognized` (lowercased ids).
	fn overlap(&self, recognized: &HashSet<String>) -> usize {
		let mut seen = HashSet::new();
		self.member_ids
			.iter()
			.map(|id| id.to_lowercase())
			.filter(|id| recognized.contains(id) && seen.insert(id.clone()))
			.count()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogSource {
	Catalog,
	MetaSquad,
}

/// Outcome of aggregation. `team == None` is the normal "unresolved" result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamIdentity {
	pub team: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<CatalogSource>,
	/// Percentage in `[0, 100]`; always 0 when unresolved.
	pub confidence: u8,
	/// Best overlap found, kept even when it was too small.
	pub match_count: usize,
	/// Distinct recognized identities considered.
	pub recognized: usize,
}

pub struct TeamIdentifier<'a> {
	catalog: &'a [TeamDefinition],
	meta_squads: &'a [TeamDefinition],
}

impl<'a> TeamIdentifier<'a> {
	pub fn new(catalog: &'a [TeamDefinition], meta_squads: &'a [TeamDefinition]) -> Self {
		Self { catalog, meta_squads }
	}

	pub fn identify<S: AsRef<str>>(&self, recognized: &[S]) -> TeamIdentity {
		let recognized = recognized
			.iter()
			.map(|id| id.as_ref().trim().to_lowercase())
			.filter(|id| !id.is_empty())
			.collect::<HashSet<_>>();
		let total = recognized.len();

		let mut best = best_of(self.catalog, &recognized).map(|(team, count)| (team, count, CatalogSource::Catalog));
		let primary = best.as_ref().map_or(0, |(_, count, _)| *count);

		if primary < MIN_TEAM_OVERLAP
			&& let Some((team, count)) = best_of(self.meta_squads, &recognized)
			&& count > primary
		{
			best = Some((team, count, CatalogSource::MetaSquad));
		}

		let match_count = best.as_ref().map_or(0, |(_, count, _)| *count);
		match best {
			Some((team, count, source)) if count >= MIN_TEAM_OVERLAP => {
				let denominator = total.min(TEAM_SIZE).max(1);
				let confidence = (count as f32 / denominator as f32 * 100.0).round().min(100.0) as u8;
				TeamIdentity {
					team: Some(team.id.clone()),
					team_name: Some(team.name.clone()),
					source: Some(source),
					confidence,
					match_count,
					recognized: total,
				}
			}
			_ => {
				tracing::debug!(match_count, recognized = total, "no team overlaps enough recognized characters");
				TeamIdentity {
					team: None,
					team_name: None,
					source: None,
					confidence: 0,
					match_count,
					recognized: total,
				}
			}
		}
	}
}

/// Highest-overlap team; the first one listed wins a tie.
fn best_of<'t>(teams: &'t [TeamDefinition], recognized: &HashSet<String>) -> Option<(&'t TeamDefinition, usize)> {
	let mut best: Option<(&TeamDefinition, usize)> = None;
	for team in teams {
		let count = team.overlap(recognized);
		if best.is_none_or(|(_, best_count)| count > best_count) {
			best = Some((team, count));
		}
	}
	best
}

#[cfg(test)]
mod tests {
	use super::*;

	fn team(id: &str, members: &[&str]) -> TeamDefinition {
		TeamDefinition {
			id: id.to_string(),
			name: id.to_uppercase(),
			localized_name: None,
			member_ids: members.iter().map(|m| m.to_string()).collect(),
			is_meta_variant: false,
			popularity: None,
		}
	}

	#[test]
	fn three_of_five_gives_sixty() {
		let catalog = [team("t", &["A", "B", "C", "X", "Y"])];
		let id = TeamIdentifier::new(&catalog, &[]).identify(&["A", "B", "C", "D", "E"]);
		assert_eq!(id.team.as_deref(), Some("t"));
		assert_eq!(id.confidence, 60);
		assert_eq!(id.match_count, 3);
		assert_eq!(id.source, Some(CatalogSource::Catalog));
	}

	#[test]
	fn two_recognized_is_always_unresolved() {
		let catalog = [team("t", &["A", "B", "C", "D", "E"])];
		let meta = [team("m", &["A", "B"])];
		let id = TeamIdentifier::new(&catalog, &meta).identify(&["A", "B"]);
		assert_eq!(id.team, None);
		assert_eq!(id.confidence, 0);
		assert_eq!(id.recognized, 2);
	}

	#[test]
	fn low_overlap_everywhere_is_unresolved() {
		let catalog = [team("t1", &["A", "B", "X", "Y", "Z"]), team("t2", &["C", "D", "Q", "R", "S"])];
		let id = TeamIdentifier::new(&catalog, &[]).identify(&["A", "B", "C", "D", "E"]);
		assert_eq!(id.team, None);
		assert_eq!(id.match_count, 2);
	}

	#[test]
	fn overlap_is_case_insensitive() {
		let catalog = [team("t", &["Thor", "LOKI", "hela"])];
		let id = TeamIdentifier::new(&catalog, &[]).identify(&["THOR", "loki", "Hela"]);
		assert_eq!(id.team.as_deref(), Some("t"));
		assert_eq!(id.confidence, 100);
	}

	#[test]
	fn meta_squad_needs_strictly_more() {
		let catalog = [team("t", &["A", "B", "X", "Y", "Z"])];
		let meta = [team("m1", &["A", "B", "Q", "R", "S"]), team("m2", &["A", "B", "C", "R", "S"])];
		let id = TeamIdentifier::new(&catalog, &meta).identify(&["A", "B", "C", "D", "E"]);
		assert_eq!(id.team.as_deref(), Some("m2"));
		assert_eq!(id.source, Some(CatalogSource::MetaSquad));
		assert_eq!(id.confidence, 60);
	}

	#[test]
	fn meta_squad_is_not_consulted_when_catalog_suffices() {
		let catalog = [team("t", &["A", "B", "C", "X", "Y"])];
		let meta = [team("m", &["A", "B", "C", "D", "E"])];
		let id = TeamIdentifier::new(&catalog, &meta).identify(&["A", "B", "C", "D", "E"]);
		assert_eq!(id.team.as_deref(), Some("t"));
	}

	#[test]
	fn first_listed_team_wins_ties() {
		let catalog = [team("first", &["A", "B", "C"]), team("second", &["A", "B", "C"])];
		let id = TeamIdentifier::new(&catalog, &[]).identify(&["A", "B", "C"]);
		assert_eq!(id.team.as_deref(), Some("first"));
	}

	#[test]
	fn duplicate_recognitions_count_once() {
		let catalog = [team("t", &["A", "B", "C", "D", "E"])];
		let id = TeamIdentifier::new(&catalog, &[]).identify(&["A", "A", "a", "B"]);
		assert_eq!(id.recognized, 2);
		assert_eq!(id.team, None);
	}
}
