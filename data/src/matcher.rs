//! Nearest-neighbor search over the reference corpus.
//!
//! Every method works the same way: score every reference, sort descending,
//! and accept the winner only if it clears the method's threshold *and* leads
//! the runner-up by the method's minimum gap. A winner that clears the
//! threshold without enough lead is returned flagged as ambiguous, together
//! with the next two candidates so the caller can ask the player.

use ie::{Fingerprint, HueHistogram, PortraitSignature};
use serde::{Deserialize, Serialize};

use crate::{Database, ReferenceEntry};

/// How many runner-up candidates an ambiguous result carries.
pub const MAX_ALTERNATIVES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
	Hash,
	Histogram,
	FuzzyName,
}

/// Acceptance rule for one method. Both values are in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
	pub min_similarity: f32,
	pub min_gap: f32,
}

impl Thresholds {
	/// Histograms are the most discriminative signal and are tried first.
	pub const HISTOGRAM: Self = Self {
		min_similarity: 90.0,
		min_gap: 1.5,
	};
	pub const HASH: Self = Self {
		min_similarity: 75.0,
		min_gap: 3.0,
	};
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
	pub id: String,
	pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
	pub candidate_id: String,
	/// Percentage in `[0, 100]`.
	pub similarity: f32,
	pub method: Method,
	pub ambiguous: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub alternatives: Vec<Candidate>,
}

impl MatchResult {
	pub fn exact(id: &str, method: Method) -> Self {
		Self {
			candidate_id: id.to_string(),
			similarity: 100.0,
			method,
			ambiguous: false,
			alternatives: Vec::new(),
		}
	}
}

/// Rank scored candidates and apply the acceptance rule.
///
/// Sorting is stable: equal scores keep the order they were supplied in.
/// Returns `None` when nothing clears `min_similarity`.
pub fn select<'a>(
	scored: impl IntoIterator<Item = (&'a str, f32)>,
	method: Method,
	thresholds: Thresholds,
) -> Option<MatchResult> {
	let mut ranked = scored.into_iter().collect::<Vec<_>>();
	ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

	let (&(best_id, best), rest) = ranked.split_first()?;
	if best < thresholds.min_similarity {
		return None;
	}

	let ambiguous = rest
		.first()
		.is_some_and(|(_, second)| best - second < thresholds.min_gap);

	let alternatives = if ambiguous {
		rest.iter()
			.take(MAX_ALTERNATIVES)
			.map(|(id, similarity)| Candidate {
				id: id.to_string(),
				similarity: *similarity,
			})
			.collect()
	} else {
		Vec::new()
	};

	Some(MatchResult {
		candidate_id: best_id.to_string(),
		similarity: best,
		method,
		ambiguous,
		alternatives,
	})
}

/// Portrait matcher bound to one database.
#[derive(Clone, Copy)]
pub struct SimilarityMatcher<'a> {
	database: &'a Database,
	histogram: Thresholds,
	hash: Thresholds,
}

impl<'a> SimilarityMatcher<'a> {
	pub fn new(database: &'a Database) -> Self {
		Self::with_thresholds(database, Thresholds::HISTOGRAM, Thresholds::HASH)
	}

	pub fn with_thresholds(database: &'a Database, histogram: Thresholds, hash: Thresholds) -> Self {
		Self {
			database,
			histogram,
			hash,
		}
	}

	/// Exhaustive search with a pluggable similarity function (percentage).
	pub fn nearest<Q: ?Sized>(
		&self,
		query: &Q,
		similarity: impl Fn(&Q, &ReferenceEntry) -> Option<f32>,
		method: Method,
		thresholds: Thresholds,
	) -> Option<MatchResult> {
		let scored = self
			.database
			.portraits()
			.iter()
			.filter_map(|entry| Some((entry.id.as_str(), similarity(query, entry)?)));
		select(scored, method, thresholds)
	}

	pub fn match_fingerprint(&self, fingerprint: Fingerprint) -> Option<MatchResult> {
		if let Some(entry) = self.database.portrait_by_fingerprint(fingerprint) {
			return Some(MatchResult::exact(&entry.id, Method::Hash));
		}

		self.nearest(
			&fingerprint,
			|q, entry| Some(q.similarity(entry.fingerprint)),
			Method::Hash,
			self.hash,
		)
	}

	/// Histograms without any qualifying pixel carry no information and never match.
	pub fn match_histogram(&self, histogram: &HueHistogram) -> Option<MatchResult> {
		if histogram.is_zero() {
			return None;
		}

		self.nearest(
			histogram,
			|q, entry| {
				if entry.hue_histogram.is_zero() {
					None
				} else {
					Some(q.similarity(&entry.hue_histogram) * 100.0)
				}
			},
			Method::Histogram,
			self.histogram,
		)
	}

	/// Full portrait resolution: exact fingerprint, then histogram, then
	/// fingerprint scan. A confident result beats an ambiguous one; among
	/// ambiguous results the earlier method wins.
	pub fn match_portrait(&self, signature: &PortraitSignature) -> Option<MatchResult> {
		if let Some(entry) = self.database.portrait_by_fingerprint(signature.fingerprint) {
			return Some(MatchResult::exact(&entry.id, Method::Hash));
		}

		let by_histogram = self.match_histogram(&signature.hue_histogram);
		if let Some(result) = &by_histogram
			&& !result.ambiguous
		{
			return by_histogram;
		}

		let by_hash = self.match_fingerprint(signature.fingerprint);
		if let Some(result) = &by_hash
			&& !result.ambiguous
		{
			return by_hash;
		}

		by_histogram.or(by_hash)
	}
}
