use std::{
	collections::BTreeMap,
	convert::Infallible,
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
	str::FromStr,
	sync::{Arc, Mutex, PoisonError},
	time::Duration,
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
	Database, ReferenceEntry,
	schema::{Bundle, RawPortrait},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CACHE_FILE: &str = "bundle_cache.json";
const CUSTOM_FILE: &str = "custom_portraits.json";

/// Where the reference bundle comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
	File(PathBuf),
	Remote(String),
}

impl FromStr for Source {
	type Err = Infallible;

	/// `http(s)://` means remote, anything else is a local path.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.starts_with("http://") || s.starts_with("https://") {
			Ok(Self::Remote(s.to_string()))
		} else {
			Ok(Self::File(PathBuf::from(s)))
		}
	}
}

/// `<cache_dir>/SquadScout`, if the platform has a cache directory.
pub fn default_cache_dir() -> Option<PathBuf> {
	dirs::cache_dir().map(|p| p.join("SquadScout"))
}

#[derive(Debug, Clone)]
pub struct Loader {
	source: Source,
	cache_dir: Option<PathBuf>,
	timeout: Duration,
}

impl Loader {
	pub fn new(source: Source) -> Self {
		Self {
			source,
			cache_dir: default_cache_dir(),
			timeout: DEFAULT_TIMEOUT,
		}
	}

	pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
		self.cache_dir = cache_dir;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Load the bundle and merge user-added portraits over it.
	pub fn load(&self) -> Result<Database> {
		let bundle = self.load_bundle()?;
		let custom = match self.load_custom_portraits() {
			Ok(custom) => custom,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable custom portraits");
				BTreeMap::new()
			}
		};
		Ok(Database::with_custom_portraits(bundle, custom))
	}

	/// Remote loads fall back to the cached copy when the network fails.
	pub fn load_bundle(&self) -> Result<Bundle> {
		match &self.source {
			Source::File(path) => read_json(path),
			Source::Remote(url) => match self.fetch_remote(url) {
				Ok(bundle) => {
					if let Err(err) = self.save_cache(&bundle) {
						tracing::warn!(error = %format!("{err:#}"), "failed to write bundle cache");
					}
					Ok(bundle)
				}
				Err(err) => {
					if let Ok(cached) = self.load_cache() {
						tracing::warn!(error = %format!("{err:#}"), "using cached reference data due to network error");
						Ok(cached)
					} else {
						Err(err)
					}
				}
			},
		}
	}

	fn fetch_remote(&self, url: &str) -> Result<Bundle> {
		let agent: ureq::Agent = ureq::Agent::config_builder()
			.timeout_global(Some(self.timeout))
			.build()
			.into();
		let mut res = agent.get(url).call().with_context(|| format!("GET {url}"))?;
		let bundle = res
			.body_mut()
			.read_json::<Bundle>()
			.context("Decode reference bundle JSON")?;
		Ok(bundle)
	}

	fn cache_path(&self) -> Option<PathBuf> {
		self.cache_dir.as_ref().map(|dir| dir.join(CACHE_FILE))
	}

	fn custom_path(&self) -> Option<PathBuf> {
		self.cache_dir.as_ref().map(|dir| dir.join(CUSTOM_FILE))
	}

	fn load_cache(&self) -> Result<Bundle> {
		let path = self.cache_path().context("No cache_dir available")?;
		read_json(&path)
	}

	fn save_cache(&self, bundle: &Bundle) -> Result<()> {
		let Some(path) = self.cache_path() else {
			return Ok(());
		};
		write_json(&path, bundle)
	}

	/// A missing file is an empty set.
	pub fn load_custom_portraits(&self) -> Result<BTreeMap<String, RawPortrait>> {
		match self.custom_path() {
			Some(path) if path.exists() => read_json(&path),
			_ => Ok(BTreeMap::new()),
		}
	}

	/// Add (or replace) user-captured portraits; returns the file written.
	pub fn save_custom_portraits(&self, entries: &[ReferenceEntry]) -> Result<PathBuf> {
		let path = self.custom_path().context("No cache_dir available")?;
		let mut custom = self.load_custom_portraits()?;
		for entry in entries {
			custom.insert(entry.id.clone(), entry.to_raw());
		}
		write_json(&path, &custom)?;
		tracing::info!(path = %path.display(), added = entries.len(), "custom portraits saved");
		Ok(path)
	}
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
	let file = File::open(path).with_context(|| format!("Open {}", path.display()))?;
	let reader = BufReader::new(file);
	let value = serde_json::from_reader(reader).with_context(|| format!("Parse {}", path.display()))?;
	Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).with_context(|| format!("Create dir {}", parent.display()))?;
	}

	let tmp = path.with_extension("json.tmp");
	let file = File::create(&tmp).with_context(|| format!("Write temp {}", tmp.display()))?;
	let mut writer = BufWriter::new(file);
	serde_json::to_writer(&mut writer, value).context("Serialize JSON")?;
	writer.flush().context("Flush JSON")?;
	drop(writer);

	// Replace existing file (Windows-friendly).
	if std::fs::rename(&tmp, path).is_err() {
		let _ = std::fs::remove_file(path);
		std::fs::rename(&tmp, path).with_context(|| format!("Persist {}", path.display()))?;
	}
	Ok(())
}

/// Lazily loaded, shared database.
///
/// Concurrent `get` callers wait on one in-flight load and then share its
/// result. A failed load is not cached; the next caller retries.
pub struct DatabaseCell {
	loader: Loader,
	slot: Mutex<Option<Arc<Database>>>,
}

impl DatabaseCell {
	pub fn new(loader: Loader) -> Self {
		Self {
			loader,
			slot: Mutex::new(None),
		}
	}

	pub fn get(&self) -> Result<Arc<Database>> {
		let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(db) = slot.as_ref() {
			return Ok(db.clone());
		}
		let db = Arc::new(self.loader.load()?);
		*slot = Some(db.clone());
		Ok(db)
	}

	/// Rebuild from the source; callers holding the old `Arc` keep using it.
	pub fn reload(&self) -> Result<Arc<Database>> {
		let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
		let db = Arc::new(self.loader.load()?);
		*slot = Some(db.clone());
		Ok(db)
	}

	pub fn loader(&self) -> &Loader {
		&self.loader
	}
}
