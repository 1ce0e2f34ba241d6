//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use data::{Loader, Source, Thresholds};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Settings;

/// On-disk configuration for the application.
///
/// Every field has a default, so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Reference bundle: a local path or an `http(s)://` URL.
    pub data_source: Option<String>,

    /// Where the remote bundle cache and user-added portraits live.
    /// `None` uses `<cache_dir>/SquadScout`.
    pub cache_dir: Option<PathBuf>,

    /// Timeout (seconds) for fetching the remote bundle.
    pub load_timeout_s: f32,

    /// Timeout (seconds) for decoding one captured portrait.
    pub decode_timeout_s: f32,

    /// Share of each portrait's height dropped from the bottom (name/level text).
    pub crop_fraction: f32,

    /// Side of the canonical grayscale buffer used for fingerprints.
    pub hash_size: u32,

    /// Side of the canonical color buffer used for hue histograms.
    pub histogram_size: u32,

    /// Keys left out of either table keep that method's default.
    #[serde(deserialize_with = "histogram_thresholds")]
    pub histogram: Thresholds,
    #[serde(deserialize_with = "hash_thresholds")]
    pub hash: Thresholds,

    /// Minimum normalized name similarity in `[0, 1]`.
    pub name_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: None,
            cache_dir: None,
            load_timeout_s: data::DEFAULT_TIMEOUT.as_secs_f32(),
            decode_timeout_s: 10.0,
            crop_fraction: ie::DEFAULT_CROP_FRACTION,
            hash_size: ie::HASH_SIZE,
            histogram_size: ie::HISTOGRAM_SIZE,
            histogram: Thresholds::HISTOGRAM,
            hash: Thresholds::HASH,
            name_threshold: data::DEFAULT_NAME_THRESHOLD,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("squadscout.json"))
    }

    /// Load configuration from disk, falling back to defaults on any failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::try_load_from(path),
            None => Self::path().and_then(|path| Self::try_load_from(&path)),
        };
        match loaded {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// A missing file is the default configuration.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            ie: ie::Ie::new(
                ie::Normalizer::new(self.hash_size, self.crop_fraction),
                ie::Normalizer::new(self.histogram_size, self.crop_fraction),
            ),
            decode_timeout: seconds(self.decode_timeout_s),
            histogram: self.histogram,
            hash: self.hash,
            name_threshold: self.name_threshold,
        }
    }

    /// Loader for `source`, or for the configured data source.
    pub fn loader(&self, source: Option<Source>) -> Result<Loader> {
        let source = match source {
            Some(source) => source,
            None => self
                .data_source
                .as_deref()
                .context("no reference data configured; pass --data or set dataSource")?
                .parse()?,
        };
        let mut loader = Loader::new(source).with_timeout(seconds(self.load_timeout_s));
        if let Some(dir) = &self.cache_dir {
            loader = loader.with_cache_dir(Some(dir.clone()));
        }
        Ok(loader)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialThresholds {
    min_similarity: Option<f32>,
    min_gap: Option<f32>,
}

impl PartialThresholds {
    fn over(self, base: Thresholds) -> Thresholds {
        Thresholds {
            min_similarity: self.min_similarity.unwrap_or(base.min_similarity),
            min_gap: self.min_gap.unwrap_or(base.min_gap),
        }
    }
}

fn histogram_thresholds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Thresholds, D::Error> {
    Ok(PartialThresholds::deserialize(deserializer)?.over(Thresholds::HISTOGRAM))
}

fn hash_thresholds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Thresholds, D::Error> {
    Ok(PartialThresholds::deserialize(deserializer)?.over(Thresholds::HASH))
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::from_secs(10))
}
