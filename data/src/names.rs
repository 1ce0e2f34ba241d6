use std::collections::HashMap;

use crate::matcher::{self, MatchResult, Method, Thresholds};

/// Default minimum normalized similarity for a fuzzy name match.
pub const DEFAULT_NAME_THRESHOLD: f32 = 0.6;

/// Known character names (ids and display names), resolving to character ids.
///
/// Names are interned once and frozen; iteration follows insertion order so
/// fuzzy ties resolve the same way on every run.
pub struct NameIndex {
	strings: lasso::RodeoReader,

	// (lowercased name, character id) in insertion order
	names: Vec<(lasso::Spur, lasso::Spur)>,
	by_name: HashMap<lasso::Spur, lasso::Spur>,
}

impl Default for NameIndex {
	fn default() -> Self {
		Self::build(std::iter::empty::<(&str, &str)>())
	}
}

impl NameIndex {
	/// Register each character under its id and its display name.
	///
	/// The first registration of a name wins; a later character cannot steal it.
	pub fn build<'n>(characters: impl IntoIterator<Item = (&'n str, &'n str)>) -> Self {
		let mut strings = lasso::Rodeo::new();
		let mut names = Vec::new();
		let mut by_name = HashMap::new();

		for (id, display_name) in characters {
			let id_key = strings.get_or_intern(id);
			for name in [id, display_name] {
				let name_key = strings.get_or_intern(name.trim().to_lowercase());
				if !by_name.contains_key(&name_key) {
					by_name.insert(name_key, id_key);
					names.push((name_key, id_key));
				}
			}
		}

		Self {
			strings: strings.into_reader(),

			names,
			by_name,
		}
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Case-insensitive exact lookup.
	pub fn get_id(&self, name: &str) -> Option<&str> {
		let key = self.strings.get(name.trim().to_lowercase())?;
		self.by_name.get(&key).map(|id| self.strings.resolve(id))
	}

	/// `(lowercased name, character id)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.names
			.iter()
			.map(|(name, id)| (self.strings.resolve(name), self.strings.resolve(id)))
	}
}

/// Normalized edit similarity: `(maxLength - distance) / maxLength`.
pub fn name_similarity(a: &str, b: &str) -> f32 {
	let max_len = a.chars().count().max(b.chars().count());
	if max_len == 0 {
		return 1.0;
	}
	let distance = levenshtein::levenshtein(a, b).min(max_len);
	(max_len - distance) as f32 / max_len as f32
}

/// Matches cleaned-up recognized text against the known names.
pub struct FuzzyNameMatcher<'a> {
	names: &'a NameIndex,
	threshold: f32,
}

impl<'a> FuzzyNameMatcher<'a> {
	pub fn new(names: &'a NameIndex) -> Self {
		Self::with_threshold(names, DEFAULT_NAME_THRESHOLD)
	}

	pub fn with_threshold(names: &'a NameIndex, threshold: f32) -> Self {
		Self { names, threshold }
	}

	/// Attempts to find the closest character for a dirty recognized string.
	///
	/// Text rejected as noise and text with no candidate above the threshold
	/// both yield `None`.
	pub fn match_text(&self, raw: &str) -> Option<MatchResult> {
		let text = ie::text::normalize_text(raw)?;
		let text = text.to_lowercase();

		if let Some(id) = self.names.get_id(&text) {
			return Some(MatchResult::exact(id, Method::FuzzyName));
		}

		// A character is reachable under several names; score it by its best one.
		let mut best_per_id: Vec<(&str, f32)> = Vec::new();
		for (name, id) in self.names.iter() {
			let score = name_similarity(&text, name) * 100.0;
			match best_per_id.iter_mut().find(|(seen, _)| *seen == id) {
				Some((_, best)) if score > *best => *best = score,
				Some(_) => {}
				None => best_per_id.push((id, score)),
			}
		}

		let thresholds = Thresholds {
			min_similarity: self.threshold * 100.0,
			min_gap: 0.0,
		};
		let result = matcher::select(best_per_id, Method::FuzzyName, thresholds);
		if result.is_none() {
			tracing::debug!(text = %text, "no known name close enough");
		}
		result
	}
}
