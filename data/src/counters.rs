//! Counter tables and ranked recommendations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::RawCounter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterEntry {
	pub attacking_team_id: String,
	/// In `[0, 100]`.
	pub confidence: f32,
	/// Attacker power needed per unit of defender power. Always positive.
	pub min_power_ratio: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// Defending team (or variant) id -> counters, confidence-descending.
#[derive(Debug, Clone, Default)]
pub struct CounterTable {
	entries: HashMap<String, Vec<CounterEntry>>,
}

impl CounterTable {
	/// Validate and order raw entries.
	///
	/// Invalid rows are dropped with a warning; the sort is stable so equal
	/// confidences keep their published order.
	pub fn from_raw(raw: impl IntoIterator<Item = (String, Vec<RawCounter>)>) -> Self {
		let mut entries = HashMap::new();
		for (defender, counters) in raw {
			let mut list = counters
				.into_iter()
				.filter_map(|c| {
					let valid = (0.0..=100.0).contains(&c.confidence)
						&& c.min_power_ratio.is_finite()
						&& c.min_power_ratio > 0.0;
					if !valid {
						tracing::warn!(
							defender = %defender,
							attacker = %c.attacking_team,
							confidence = c.confidence,
							min_power_ratio = c.min_power_ratio,
							"dropping invalid counter entry"
						);
						return None;
					}
					Some(CounterEntry {
						attacking_team_id: c.attacking_team,
						confidence: c.confidence,
						min_power_ratio: c.min_power_ratio,
						notes: c.notes,
					})
				})
				.collect::<Vec<_>>();
			list.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
			entries.insert(defender, list);
		}
		Self { entries }
	}

	pub fn get(&self, id: &str) -> &[CounterEntry] {
		self.entries.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn has_entries(&self, id: &str) -> bool {
		!self.get(id).is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
	pub attacking_team_id: String,
	pub confidence: f32,
	pub min_power_ratio: f64,
	/// `round(enemy_power * min_power_ratio)`, when the enemy power was observed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_power: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

pub struct CounterRecommender<'a> {
	table: &'a CounterTable,
}

impl<'a> CounterRecommender<'a> {
	pub fn new(table: &'a CounterTable) -> Self {
		Self { table }
	}

	/// Ranked counters for a resolved id. Unresolved or unknown ids give an
	/// empty list, which is a normal outcome.
	pub fn recommend(&self, id: Option<&str>, enemy_power: Option<u64>) -> Vec<Recommendation> {
		let Some(id) = id else {
			return Vec::new();
		};

		self.table
			.get(id)
			.iter()
			.map(|entry| Recommendation {
				attacking_team_id: entry.attacking_team_id.clone(),
				confidence: entry.confidence,
				min_power_ratio: entry.min_power_ratio,
				min_power: enemy_power.map(|power| (power as f64 * entry.min_power_ratio).round() as u64),
				notes: entry.notes.clone(),
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(team: &str, confidence: f32, ratio: f64) -> RawCounter {
		RawCounter {
			attacking_team: team.to_string(),
			confidence,
			min_power_ratio: ratio,
			notes: None,
		}
	}

	fn table() -> CounterTable {
		CounterTable::from_raw([(
			"xmen".to_string(),
			vec![raw("inhumans", 70.0, 1.0), raw("avengers", 90.0, 1.1)],
		)])
	}

	#[test]
	fn xmen_counters_ranked_with_power() {
		let table = table();
		let recs = CounterRecommender::new(&table).recommend(Some("xmen"), Some(1_000_000));
		assert_eq!(recs.len(), 2);
		assert_eq!(recs[0].attacking_team_id, "avengers");
		assert_eq!(recs[0].min_power, Some(1_100_000));
		assert_eq!(recs[1].attacking_team_id, "inhumans");
		assert_eq!(recs[1].min_power, Some(1_000_000));
	}

	#[test]
	fn without_power_no_min_power() {
		let table = table();
		let recs = CounterRecommender::new(&table).recommend(Some("xmen"), None);
		assert!(recs.iter().all(|r| r.min_power.is_none()));
	}

	#[test]
	fn unknown_or_unresolved_is_empty() {
		let table = table();
		let rec = CounterRecommender::new(&table);
		assert!(rec.recommend(None, Some(5)).is_empty());
		assert!(rec.recommend(Some("nobody"), Some(5)).is_empty());
	}

	#[test]
	fn equal_confidence_keeps_published_order() {
		let table = CounterTable::from_raw([(
			"d".to_string(),
			vec![raw("first", 80.0, 1.0), raw("top", 95.0, 1.0), raw("second", 80.0, 1.0), raw("third", 80.0, 1.0)],
		)]);
		let order = table.get("d").iter().map(|e| e.attacking_team_id.as_str()).collect::<Vec<_>>();
		assert_eq!(order, ["top", "first", "second", "third"]);
	}

	#[test]
	fn invalid_rows_are_dropped() {
		let table = CounterTable::from_raw([(
			"d".to_string(),
			vec![raw("ok", 50.0, 1.0), raw("zero", 50.0, 0.0), raw("over", 101.0, 1.0), raw("neg", 10.0, -2.0)],
		)]);
		assert_eq!(table.get("d").len(), 1);
	}
}
