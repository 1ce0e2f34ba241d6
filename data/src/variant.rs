//! Tactical variants of a base team.
//!
//! Some characters change which counters work against an otherwise fixed
//! roster. Their presence is encoded by appending suffix tokens to the base
//! team id (`<base>_<token>[_<token>...]`, tokens in sorted order), and the
//! counter table is keyed by those compound ids.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{CounterEntry, CounterTable};

/// Character id -> variant suffix token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierRules {
	// keyed by lowercased character id
	tokens: BTreeMap<String, String>,
}

impl ModifierRules {
	pub fn new(rules: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			tokens: rules
				.into_iter()
				.map(|(character, token)| (character.trim().to_lowercase(), token.trim().to_string()))
				.filter(|(character, token)| !character.is_empty() && !token.is_empty())
				.collect(),
		}
	}

	pub fn token(&self, character_id: &str) -> Option<&str> {
		self.tokens.get(&character_id.trim().to_lowercase()).map(String::as_str)
	}

	/// Distinct tokens of the modifiers present, in canonical (sorted) order.
	pub fn present<S: AsRef<str>>(&self, recognized: &[S]) -> BTreeSet<String> {
		recognized
			.iter()
			.filter_map(|id| self.token(id.as_ref()))
			.map(str::to_string)
			.collect()
	}
}

/// Canonical compound id for a base team and a set of modifier tokens.
pub fn variant_id<S: AsRef<str>>(base: &str, tokens: &[S]) -> String {
	let mut sorted = tokens.iter().map(|t| t.as_ref()).collect::<Vec<&str>>();
	sorted.sort_unstable();
	sorted.dedup();

	let mut id = base.to_string();
	for token in sorted {
		id.push('_');
		id.push_str(token);
	}
	id
}

/// Priority-ordered ids to try: all modifiers, every pair, every single
/// modifier, then the base id.
pub fn variant_candidates(base: &str, tokens: &BTreeSet<String>) -> Vec<String> {
	let tokens = tokens.iter().collect::<Vec<_>>();
	let mut candidates: Vec<String> = Vec::new();
	let mut push = |id: String| {
		if !candidates.contains(&id) {
			candidates.push(id);
		}
	};

	if !tokens.is_empty() {
		push(variant_id(base, &tokens));
	}
	if tokens.len() >= 2 {
		for (i, a) in tokens.iter().enumerate() {
			for b in &tokens[i + 1..] {
				push(variant_id(base, &[a, b]));
			}
		}
	}
	for token in &tokens {
		push(variant_id(base, &[token]));
	}
	push(base.to_string());

	candidates
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariant {
	pub id: String,
	pub modifiers: Vec<String>,
	/// Counters defined for `id`; empty only when no candidate had any.
	pub counters: Vec<CounterEntry>,
}

pub struct VariantResolver<'a> {
	rules: &'a ModifierRules,
	counters: &'a CounterTable,
}

impl<'a> VariantResolver<'a> {
	pub fn new(rules: &'a ModifierRules, counters: &'a CounterTable) -> Self {
		Self { rules, counters }
	}

	/// First candidate with at least one counter, else the bare base id.
	pub fn resolve<S: AsRef<str>>(&self, base: &str, recognized: &[S]) -> ResolvedVariant {
		let modifiers = self.rules.present(recognized);
		let found = variant_candidates(base, &modifiers)
			.into_iter()
			.find(|id| self.counters.has_entries(id));

		let modifiers = modifiers.into_iter().collect();
		match found {
			Some(id) => {
				tracing::debug!(base, variant = %id, "resolved team variant");
				ResolvedVariant {
					counters: self.counters.get(&id).to_vec(),
					id,
					modifiers,
				}
			}
			None => ResolvedVariant {
				id: base.to_string(),
				modifiers,
				counters: Vec::new(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::RawCounter;

	fn tokens(list: &[&str]) -> BTreeSet<String> {
		list.iter().map(|t| t.to_string()).collect()
	}

	fn counter(team: &str) -> RawCounter {
		RawCounter {
			attacking_team: team.to_string(),
			confidence: 50.0,
			min_power_ratio: 1.0,
			notes: None,
		}
	}

	#[test]
	fn two_modifiers_give_four_candidates() {
		assert_eq!(variant_candidates("foo", &tokens(&["b", "a"])), ["foo_a_b", "foo_a", "foo_b", "foo"]);
	}

	#[test]
	fn three_modifiers_include_every_pair() {
		assert_eq!(
			variant_candidates("t", &tokens(&["c", "a", "b"])),
			["t_a_b_c", "t_a_b", "t_a_c", "t_b_c", "t_a", "t_b", "t_c", "t"]
		);
	}

	#[test]
	fn no_modifier_is_just_base() {
		assert_eq!(variant_candidates("t", &BTreeSet::new()), ["t"]);
		assert_eq!(variant_candidates("t", &tokens(&["x"])), ["t_x", "t"]);
	}

	#[test]
	fn variant_id_is_order_independent() {
		assert_eq!(variant_id("xmen", &["phoenix", "apocalypse"]), "xmen_apocalypse_phoenix");
		assert_eq!(variant_id("xmen", &["apocalypse", "phoenix"]), "xmen_apocalypse_phoenix");
		assert_eq!(variant_id::<&str>("xmen", &[]), "xmen");
	}

	#[test]
	fn resolves_most_specific_defined_variant() {
		let rules = ModifierRules::new([("PHOENIX".to_string(), "phx".to_string()), ("Storm".to_string(), "storm".to_string())]);
		let table = CounterTable::from_raw([
			("xmen".to_string(), vec![counter("base")]),
			("xmen_phx".to_string(), vec![counter("anti-phoenix")]),
		]);
		let resolved = VariantResolver::new(&rules, &table).resolve("xmen", &["phoenix", "STORM", "cyclops"]);
		assert_eq!(resolved.id, "xmen_phx");
		assert_eq!(resolved.modifiers, ["phx", "storm"]);
		assert_eq!(resolved.counters[0].attacking_team_id, "anti-phoenix");
	}

	#[test]
	fn falls_back_to_base_with_empty_list() {
		let rules = ModifierRules::default();
		let table = CounterTable::default();
		let resolved = VariantResolver::new(&rules, &table).resolve("xmen", &["a", "b"]);
		assert_eq!(resolved.id, "xmen");
		assert!(resolved.counters.is_empty());
	}
}
