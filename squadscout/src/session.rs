//! One analysis of an opposing roster.
//!
//! A session walks COLLECTING -> MATCHING -> AGGREGATING -> RESOLVING and
//! ends in DONE, or in FAILED when too few slots were recognized to name a
//! team. It never retries; callers start a new session with fresh captures.

use std::{sync::Arc, time::Duration};

use data::{
	CounterRecommender, Database, FuzzyNameMatcher, MIN_TEAM_OVERLAP, MatchResult, Recommendation, SimilarityMatcher, TEAM_SIZE,
	TeamIdentifier, TeamIdentity, Thresholds, VariantResolver,
};
use ie::{OwnedImage, PortraitSignature};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::SlotError;

/// Tunables for signal extraction and matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
	pub ie: ie::Ie,
	pub decode_timeout: Duration,
	pub histogram: Thresholds,
	pub hash: Thresholds,
	pub name_threshold: f32,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			ie: ie::Ie::default(),
			decode_timeout: Duration::from_secs(10),
			histogram: Thresholds::HISTOGRAM,
			hash: Thresholds::HASH,
			name_threshold: data::DEFAULT_NAME_THRESHOLD,
		}
	}
}

/// What the capture source supplied for one slot.
#[derive(Debug, Clone)]
pub enum Capture {
	/// Encoded image bytes (PNG, JPEG, WebP).
	Portrait(Vec<u8>),
	/// Already decoded pixels.
	Raster(OwnedImage),
	/// Recognized on-screen text.
	Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
	Collecting,
	Matching,
	Aggregating,
	Resolving,
	Done,
	Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SlotOutcome {
	Matched(MatchResult),
	Miss,
	Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReport {
	pub slot: usize,
	#[serde(flatten)]
	pub outcome: SlotOutcome,
}

impl SlotReport {
	pub fn matched(&self) -> Option<&MatchResult> {
		match &self.outcome {
			SlotOutcome::Matched(m) => Some(m),
			_ => None,
		}
	}
}

/// Final report of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
	pub phase: Phase,
	/// In input order.
	pub slots: Vec<SlotReport>,
	pub team: TeamIdentity,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variant: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub modifiers: Vec<String>,
	pub counters: Vec<Recommendation>,
}

impl Analysis {
	/// Slots whose top candidate was accepted without enough lead.
	pub fn ambiguous_slots(&self) -> impl Iterator<Item = &SlotReport> {
		self.slots.iter().filter(|s| s.matched().is_some_and(|m| m.ambiguous))
	}
}

/// Shared entry point: one database, one set of settings, many sessions.
#[derive(Clone)]
pub struct Engine {
	database: Arc<Database>,
	settings: Settings,
}

impl Engine {
	pub fn new(database: Arc<Database>, settings: Settings) -> Self {
		Self { database, settings }
	}

	pub fn database(&self) -> &Database {
		&self.database
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn session(&self) -> RecognitionSession<'_> {
		RecognitionSession {
			engine: self,
			phase: Phase::Collecting,
			captures: Vec::new(),
			enemy_power: None,
		}
	}

	pub fn decode(&self, bytes: Vec<u8>) -> Result<OwnedImage, SlotError> {
		Ok(OwnedImage::decode_with_timeout(bytes, self.settings.decode_timeout)?)
	}

	pub fn signature(&self, image: &OwnedImage) -> Result<PortraitSignature, SlotError> {
		Ok(self.settings.ie.signature(image.as_image())?)
	}

	/// Identify the character in one capture. `Ok(None)` is a lookup miss.
	pub fn recognize(&self, capture: Capture) -> Result<Option<MatchResult>, SlotError> {
		match capture {
			Capture::Text(text) => {
				Ok(FuzzyNameMatcher::with_threshold(self.database.names(), self.settings.name_threshold).match_text(&text))
			}
			Capture::Portrait(bytes) => {
				let image = self.decode(bytes)?;
				self.recognize_image(&image)
			}
			Capture::Raster(image) => self.recognize_image(&image),
		}
	}

	fn recognize_image(&self, image: &OwnedImage) -> Result<Option<MatchResult>, SlotError> {
		let signature = self.signature(image)?;
		let matcher = SimilarityMatcher::with_thresholds(&self.database, self.settings.histogram, self.settings.hash);
		Ok(matcher.match_portrait(&signature))
	}

	/// Counters for a known team or variant id, skipping recognition.
	pub fn counters(&self, id: &str, enemy_power: Option<u64>) -> Vec<Recommendation> {
		CounterRecommender::new(self.database.counters()).recommend(Some(id), enemy_power)
	}
}

pub struct RecognitionSession<'e> {
	engine: &'e Engine,
	phase: Phase,
	captures: Vec<Capture>,
	enemy_power: Option<u64>,
}

impl<'e> RecognitionSession<'e> {
	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn push(&mut self, capture: Capture) -> &mut Self {
		self.captures.push(capture);
		self
	}

	pub fn extend(&mut self, captures: impl IntoIterator<Item = Capture>) -> &mut Self {
		self.captures.extend(captures);
		self
	}

	pub fn set_enemy_power(&mut self, power: Option<u64>) -> &mut Self {
		self.enemy_power = power;
		self
	}

	pub fn len(&self) -> usize {
		self.captures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.captures.is_empty()
	}

	pub fn run(mut self) -> Analysis {
		if self.captures.len() > TEAM_SIZE {
			tracing::warn!(slots = self.captures.len(), "more slots than a team has; matching all of them");
		}

		self.enter(Phase::Matching);
		let engine = self.engine;
		let slots = std::mem::take(&mut self.captures)
			.into_par_iter()
			.enumerate()
			.map(|(slot, capture)| {
				let outcome = match engine.recognize(capture) {
					Ok(Some(m)) => SlotOutcome::Matched(m),
					Ok(None) => SlotOutcome::Miss,
					Err(err) => {
						tracing::warn!(slot, error = %err, "slot failed");
						SlotOutcome::Failed { error: err.to_string() }
					}
				};
				SlotReport { slot, outcome }
			})
			.collect::<Vec<_>>();

		self.enter(Phase::Aggregating);
		// Ambiguous slots still contribute their top candidate.
		let recognized = slots
			.iter()
			.filter_map(|s| s.matched())
			.map(|m| m.candidate_id.as_str())
			.collect::<Vec<_>>();
		let database = engine.database();
		let team = TeamIdentifier::new(database.teams(), database.meta_squads()).identify(&recognized);

		if team.recognized < MIN_TEAM_OVERLAP {
			self.enter(Phase::Failed);
			tracing::info!(recognized = team.recognized, "too few slots recognized to identify a team");
			return Analysis {
				phase: self.phase,
				slots,
				team,
				variant: None,
				modifiers: Vec::new(),
				counters: Vec::new(),
			};
		}

		self.enter(Phase::Resolving);
		let resolved = team
			.team
			.as_deref()
			.map(|base| VariantResolver::new(database.modifiers(), database.counters()).resolve(base, &recognized));
		let counters = CounterRecommender::new(database.counters())
			.recommend(resolved.as_ref().map(|v| v.id.as_str()), self.enemy_power);

		self.enter(Phase::Done);
		let (variant, modifiers) = match resolved {
			Some(v) => (Some(v.id), v.modifiers),
			None => (None, Vec::new()),
		};
		Analysis {
			phase: self.phase,
			slots,
			team,
			variant,
			modifiers,
			counters,
		}
	}

	fn enter(&mut self, phase: Phase) {
		tracing::debug!(from = ?self.phase, to = ?phase, "session phase");
		self.phase = phase;
	}
}
