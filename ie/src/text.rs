//! Cleanup of recognized on-screen text before name matching.

use regex::Regex;

/// Below this many letters a string is recognition noise, not a name.
pub const MIN_ALPHABETIC: usize = 3;

static NOISE: std::sync::LazyLock<Regex> =
	std::sync::LazyLock::new(|| Regex::new(r#"[\[\](){}<>"'`«»“”‘’]"#).expect("regex"));

/// Glyphs the recognizer confuses with letters, as (glyph, uppercase, lowercase).
/// Only applied inside words.
const LOOKALIKES: &[(char, char, char)] = &[
	('0', 'O', 'o'),
	('1', 'I', 'l'),
	('|', 'I', 'l'),
	('5', 'S', 's'),
	('8', 'B', 'b'),
	('2', 'Z', 'z'),
	('6', 'G', 'g'),
];

/// Normalize recognized text, or `None` when it is noise.
pub fn normalize_text(raw: &str) -> Option<String> {
	let stripped = NOISE.replace_all(raw, "");
	let fixed = fix_lookalikes(&stripped);
	let fixed = collapse_repeats(&fixed);

	let text = fixed.split_whitespace().collect::<Vec<_>>().join(" ");

	let letters = text.chars().filter(|c| c.is_alphabetic()).count();
	if letters < MIN_ALPHABETIC {
		return None;
	}
	Some(text)
}

fn fix_lookalikes(s: &str) -> String {
	let chars = s.chars().collect::<Vec<_>>();
	let mut out = String::with_capacity(s.len());

	for (i, c) in chars.iter().enumerate() {
		let Some(&(_, upper, lower)) = LOOKALIKES.iter().find(|(from, _, _)| from == c) else {
			out.push(*c);
			continue;
		};

		let prev = i.checked_sub(1).and_then(|i| chars.get(i)).filter(|c| c.is_alphabetic());
		let next = chars.get(i + 1).filter(|c| c.is_alphabetic());
		match (prev, next) {
			(None, None) if *c == '|' => {}
			// Standalone digits are real numbers.
			(None, None) => out.push(*c),
			(p, n) if p.is_some_and(|c| c.is_lowercase()) || n.is_some_and(|c| c.is_lowercase()) => out.push(lower),
			_ => out.push(upper),
		}
	}

	out
}

/// Collapse runs of three or more identical letters to two.
fn collapse_repeats(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut last = None;
	let mut run = 0;

	for c in s.chars() {
		if Some(c.to_ascii_lowercase()) == last && c.is_alphabetic() {
			run += 1;
		} else {
			last = Some(c.to_ascii_lowercase());
			run = 1;
		}
		if run <= 2 {
			out.push(c);
		}
	}

	out
}
