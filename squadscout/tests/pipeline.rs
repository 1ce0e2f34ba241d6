use std::{collections::BTreeMap, path::Path, sync::Arc};

use data::{DatabaseCell, Loader, Method, Source, schema::RawPortrait};
use ie::{Color, OwnedImage};
use squadscout::{Capture, Engine, Manifest, Phase, Settings, SlotInput, SlotOutcome};

const W: u32 = 60;
const H: u32 = 80;

fn solid(color: Color) -> OwnedImage {
	OwnedImage::from_fn(W, H, |_, _| color)
}

/// Colorless, so it can only be recognized by its fingerprint.
fn split() -> OwnedImage {
	OwnedImage::from_fn(W, H, |x, _| if x < W / 2 { Color::WHITE } else { Color::BLACK })
}

fn characters() -> Vec<(&'static str, &'static str, OwnedImage)> {
	vec![
		("SCARLET", "Scarlet", solid(Color::new(255, 0, 0))),
		("GOLDIE", "Goldie", solid(Color::new(255, 255, 0))),
		("EMERALD", "Emerald", solid(Color::new(0, 255, 0))),
		("SAPPHIRE", "Sapphire", solid(Color::new(0, 0, 255))),
		("SHADOW", "Shadow", split()),
	]
}

/// Writes a bundle whose portraits are the signatures of `characters()`.
fn write_bundle(dir: &Path) -> std::path::PathBuf {
	let engine = Engine::new(Arc::default(), Settings::default());
	let portraits = characters()
		.into_iter()
		.map(|(id, name, image)| {
			let sig = engine.signature(&image).unwrap();
			(
				id.to_string(),
				RawPortrait::Modern {
					name: name.to_string(),
					fingerprint: sig.fingerprint,
					hue_histogram: sig.hue_histogram,
				},
			)
		})
		.collect::<BTreeMap<_, _>>();

	let bundle = serde_json::json!({
		"portraits": portraits,
		"teams": [
			{"id": "gems", "name": "Gems", "memberIds": ["SCARLET", "GOLDIE", "EMERALD", "ONYX", "PEARL"]},
			{"id": "blues", "name": "Blues", "memberIds": ["SAPPHIRE", "COBALT", "NAVY"]}
		],
		"counters": {
			"gems": [{"attackingTeam": "plain", "confidence": 60, "minPowerRatio": 1.0}],
			"gems_dark": [
				{"attackingTeam": "second", "confidence": 70, "minPowerRatio": 1.2},
				{"attackingTeam": "lights", "confidence": 85, "minPowerRatio": 0.9}
			]
		},
		"modifiers": {"SHADOW": "dark"}
	});
	let path = dir.join("bundle.json");
	std::fs::write(&path, serde_json::to_vec_pretty(&bundle).unwrap()).unwrap();
	path
}

fn engine(dir: &Path) -> Engine {
	let loader = Loader::new(Source::File(write_bundle(dir))).with_cache_dir(Some(dir.join("cache")));
	let cell = DatabaseCell::new(loader);
	Engine::new(cell.get().unwrap(), Settings::default())
}

fn png(image: &OwnedImage) -> Capture {
	Capture::Portrait(image.to_png().unwrap())
}

#[test]
fn mixed_slots_identify_variant_and_rank_counters() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path());
	let chars = characters();

	let mut session = engine.session();
	session
		.push(png(&chars[0].2))
		.push(png(&chars[1].2))
		.push(Capture::Text("Emera1d".to_string()))
		.push(png(&chars[4].2))
		.push(Capture::Portrait(b"\x89PNG broken".to_vec()))
		.set_enemy_power(Some(2_000_000));
	let analysis = session.run();

	assert_eq!(analysis.phase, Phase::Done);
	let slot_ids = analysis
		.slots
		.iter()
		.map(|s| s.matched().map(|m| m.candidate_id.as_str()))
		.collect::<Vec<_>>();
	assert_eq!(slot_ids, [Some("SCARLET"), Some("GOLDIE"), Some("EMERALD"), Some("SHADOW"), None]);
	assert!(matches!(analysis.slots[4].outcome, SlotOutcome::Failed { .. }));

	let methods = analysis
		.slots
		.iter()
		.filter_map(|s| s.matched().map(|m| m.method))
		.collect::<Vec<_>>();
	assert_eq!(methods, [Method::Histogram, Method::Histogram, Method::FuzzyName, Method::Hash]);

	assert_eq!(analysis.team.team.as_deref(), Some("gems"));
	assert_eq!(analysis.team.match_count, 3);
	assert_eq!(analysis.team.confidence, 75);
	assert_eq!(analysis.variant.as_deref(), Some("gems_dark"));

	let counters = analysis.counters.iter().map(|c| c.attacking_team_id.as_str()).collect::<Vec<_>>();
	assert_eq!(counters, ["lights", "second"]);
	assert_eq!(analysis.counters[0].min_power, Some(1_800_000));
	assert_eq!(analysis.counters[1].min_power, Some(2_400_000));
}

#[test]
fn identical_capture_is_an_exact_fingerprint_hit() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path());

	let result = engine.recognize(png(&split())).unwrap().unwrap();
	assert_eq!(result.candidate_id, "SHADOW");
	assert_eq!(result.similarity, 100.0);
	assert!(!result.ambiguous);
}

#[test]
fn colorless_uniform_capture_is_ambiguous() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path());

	// Every solid portrait hashes to the same fingerprint as a flat gray one.
	let result = engine
		.recognize(Capture::Raster(solid(Color::new(128, 128, 128))))
		.unwrap()
		.unwrap();
	assert_eq!(result.method, Method::Hash);
	assert!(result.ambiguous);
	assert_eq!(result.candidate_id, "EMERALD");
	let alternatives = result.alternatives.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
	assert_eq!(alternatives, ["GOLDIE", "SAPPHIRE"]);
}

#[test]
fn two_recognitions_fail_the_session() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path());

	let mut session = engine.session();
	session
		.push(Capture::Raster(solid(Color::new(255, 0, 0))))
		.push(Capture::Text("Sapphire".to_string()))
		.push(Capture::Text("Galactus".to_string()));
	let analysis = session.run();

	assert_eq!(analysis.phase, Phase::Failed);
	assert_eq!(analysis.team.team, None);
	assert_eq!(analysis.team.confidence, 0);
	assert_eq!(analysis.slots[2].outcome, SlotOutcome::Miss);
	assert!(analysis.counters.is_empty());
}

#[test]
fn manifest_drives_a_session() {
	let dir = tempfile::tempdir().unwrap();
	let engine = engine(dir.path());
	let chars = characters();
	for (id, _, image) in &chars[..3] {
		std::fs::write(dir.path().join(format!("{id}.png")), image.to_png().unwrap()).unwrap();
	}

	let manifest = Manifest {
		slots: vec![
			SlotInput::Portrait("SCARLET.png".into()),
			SlotInput::Portrait("GOLDIE.png".into()),
			SlotInput::Portrait("EMERALD.png".into()),
		],
		enemy_power: Some(100),
	};
	let mut session = engine.session();
	session
		.extend(manifest.captures(dir.path()).unwrap())
		.set_enemy_power(manifest.enemy_power);
	let analysis = session.run();

	assert_eq!(analysis.phase, Phase::Done);
	assert_eq!(analysis.team.confidence, 100);
	assert_eq!(analysis.variant.as_deref(), Some("gems"));
	assert_eq!(analysis.counters[0].min_power, Some(100));
}

#[test]
fn saved_signatures_become_references() {
	let dir = tempfile::tempdir().unwrap();
	let loader = Loader::new(Source::File(write_bundle(dir.path()))).with_cache_dir(Some(dir.path().join("cache")));
	let cell = DatabaseCell::new(loader);

	let newcomer = OwnedImage::from_fn(W, H, |_, y| if y < 32 { Color::WHITE } else { Color::BLACK });
	let engine = Engine::new(cell.get().unwrap(), Settings::default());
	let sig = engine.signature(&newcomer).unwrap();
	let entry = data::ReferenceEntry {
		id: "NEWCOMER".to_string(),
		display_name: "Newcomer".to_string(),
		fingerprint: sig.fingerprint,
		hue_histogram: sig.hue_histogram,
	};
	cell.loader().save_custom_portraits(&[entry]).unwrap();

	let engine = Engine::new(cell.reload().unwrap(), Settings::default());
	let result = engine.recognize(Capture::Raster(newcomer)).unwrap().unwrap();
	assert_eq!(result.candidate_id, "NEWCOMER");
	assert_eq!(result.similarity, 100.0);
}
