//! SquadScout command line.
//!
//! Loads the reference data once and runs one subcommand against it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use data::{DatabaseCell, ReferenceEntry, Source};
use squadscout::{Config, Engine, Manifest};

#[derive(Parser)]
#[command(name = "squadscout", version)]
#[command(about = "Identify an opposing squad and recommend counters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config_dir>/squadscout.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference bundle: local path or http(s) URL (overrides the config)
    #[arg(long, global = true)]
    data: Option<Source>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the slots listed in a manifest and print the analysis as JSON
    Analyze {
        #[arg(required = true)]
        manifest: PathBuf,

        /// Observed enemy team power (overrides the manifest)
        #[arg(long)]
        power: Option<u64>,
    },

    /// Print reference entries for portrait images
    Signature {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Character id (only with a single image; default: file stem)
        #[arg(long)]
        id: Option<String>,

        /// Also add the entries to the user's custom portraits
        #[arg(long)]
        save: bool,
    },

    /// Print the ranked counters of a team or variant id
    Counters {
        #[arg(required = true)]
        team: String,

        #[arg(long)]
        power: Option<u64>,
    },
}

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref());
    let settings = config.settings();

    match cli.command {
        Commands::Analyze { manifest, power } => {
            let cell = DatabaseCell::new(config.loader(cli.data)?);
            let engine = Engine::new(cell.get()?, settings);
            analyze(&engine, &manifest, power)
        }
        Commands::Signature { images, id, save } => {
            // Signatures do not need the reference data.
            let engine = Engine::new(Arc::default(), settings);
            let entries = signatures(&engine, &images, id)?;
            if save {
                let loader = config.loader(cli.data).context("--save needs the reference data location")?;
                let path = loader.save_custom_portraits(&entries)?;
                eprintln!("saved {} portrait(s) to {}", entries.len(), path.display());
            }
            print_json(&entries)
        }
        Commands::Counters { team, power } => {
            let cell = DatabaseCell::new(config.loader(cli.data)?);
            let engine = Engine::new(cell.get()?, settings);
            if engine.database().team(&team).is_none() {
                tracing::warn!(team = %team, "not a catalog team; looking up counters anyway");
            }
            print_json(&engine.counters(&team, power))
        }
    }
}

fn analyze(engine: &Engine, manifest_path: &Path, power: Option<u64>) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let mut session = engine.session();
    session
        .extend(manifest.captures(base_dir)?)
        .set_enemy_power(power.or(manifest.enemy_power));
    let analysis = session.run();

    for report in analysis.ambiguous_slots() {
        if let Some(m) = report.matched() {
            let alternatives = m.alternatives.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
            tracing::info!(slot = report.slot, best = %m.candidate_id, ?alternatives, "ambiguous slot");
        }
    }
    print_json(&analysis)
}

fn signatures(engine: &Engine, images: &[PathBuf], id: Option<String>) -> Result<Vec<ReferenceEntry>> {
    if id.is_some() && images.len() > 1 {
        bail!("--id only applies to a single image");
    }

    images
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
            let image = engine.decode(bytes).with_context(|| format!("decode {:?}", path))?;
            let signature = engine.signature(&image).with_context(|| format!("signature of {:?}", path))?;
            let id = match &id {
                Some(id) => id.clone(),
                None => path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .with_context(|| format!("no usable file stem in {:?}", path))?
                    .to_string(),
            };
            Ok(ReferenceEntry {
                display_name: id.clone(),
                id,
                fingerprint: signature.fingerprint,
                hue_histogram: signature.hue_histogram,
            })
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
