//! Turning OCR token streams into typed fields.
//!
//! OCR output for the attribute panel is a loose sequence of words and
//! numbers. Names and values may arrive glued together ("ATK30.0%"), split
//! across several words ("Crit" "Rate" "22.0%") or with stray glyphs in
//! front. Everything that does not resolve to a catalog name is dropped.

use std::sync::LazyLock;

use data::{AttributeCatalog, CostTier};
use regex::Regex;

use crate::Attribute;

/// Main attribute plus at most six sub attributes.
pub const MAX_ATTRIBUTES: usize = 7;

static COMBINED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^\d]+?)(\d+\.?\d*%?)$").unwrap());
static VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.?\d*%?$").unwrap());
static COST_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)COST\s*(\d+)\s*\+\s*(\d+)").unwrap());
/// The echo skill description follows the attributes and is never wanted.
static SKILL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)(echo\s*skill|声骸技能).*").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostLevel {
	pub cost: u32,
	pub level: u32,
}

/// Read `COST <n> + <m>` out of the cost strip. Anything unreadable is `{0, 0}`.
pub fn parse_cost_and_level(text: &str) -> CostLevel {
	COST_REGEX
		.captures(text)
		.and_then(|caps| {
			Some(CostLevel {
				cost: caps[1].parse().ok()?,
				level: caps[2].parse().ok()?,
			})
		})
		.unwrap_or_default()
}

/// Split joined OCR lines into words, dropping the skill description.
fn tokenize<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
	let joined = lines
		.iter()
		.map(AsRef::as_ref)
		.collect::<Vec<_>>()
		.join(" ")
		.replace(['\r', '\n', '\x0c'], " ");
	SKILL_REGEX
		.replace(&joined, "")
		.split_whitespace()
		.map(str::to_owned)
		.collect()
}

/// Pair names with values, in reading order. Names are not validated yet.
fn pair_tokens(tokens: &[String]) -> Vec<(String, String)> {
	let mut pairs = Vec::new();
	let mut pending: Vec<&str> = Vec::new();

	for token in tokens {
		if let Some(caps) = COMBINED_REGEX.captures(token) {
			let prefix = caps.get(1).map_or("", |m| m.as_str());
			pending.push(prefix);
			pairs.push((pending.join(" "), caps[2].to_owned()));
			pending.clear();
		} else if VALUE_REGEX.is_match(token) {
			if pending.is_empty() {
				tracing::trace!(token, "dropping value without a name");
				continue;
			}
			pairs.push((pending.join(" "), token.clone()));
			pending.clear();
		} else {
			pending.push(token);
		}
	}

	if !pending.is_empty() {
		pairs.push((pending.join(" "), String::new()));
	}
	pairs
}

/// Find `name` (or the longest trailing run of its words) that satisfies `valid`.
fn resolve_name(name: &str, valid: impl Fn(&str) -> bool) -> Option<String> {
	let name = name.trim_matches(|c: char| c.is_ascii_punctuation() && c != '%');
	let words = name.split_whitespace().collect::<Vec<_>>();
	(0..words.len())
		.map(|start| words[start..].join(" "))
		.find(|candidate| valid(candidate))
}

/// Parse the attribute panel.
///
/// The first name valid as a main attribute for `tier` (any tier when the
/// cost is unknown) becomes `attributes[0]`; later names must be valid sub
/// attributes. Capped at [`MAX_ATTRIBUTES`].
pub fn parse_attribute_block<S: AsRef<str>>(
	lines: &[S],
	attrs: &AttributeCatalog,
	tier: Option<CostTier>,
) -> Vec<Attribute> {
	let mut primary: Option<Attribute> = None;
	let mut early = Vec::new();
	let mut secondary = Vec::new();

	for (name, value) in pair_tokens(&tokenize(lines)) {
		if primary.is_none() {
			if let Some(name) = resolve_name(&name, |n| attrs.is_primary(tier, n)) {
				primary = Some(Attribute::new(name, value));
			} else if let Some(name) = resolve_name(&name, |n| attrs.is_secondary(n)) {
				early.push(Attribute::new(name, value));
			} else {
				tracing::trace!(name, "dropping unknown attribute");
			}
		} else if let Some(name) = resolve_name(&name, |n| attrs.is_secondary(n)) {
			secondary.push(Attribute::new(name, value));
		} else {
			tracing::trace!(name, "dropping unknown attribute");
		}
	}

	let primary = match primary {
		Some(primary) => primary,
		None if !early.is_empty() => {
			let promoted = early.remove(0);
			tracing::warn!(
				attribute = %promoted.name,
				?tier,
				"no main attribute recognized, promoting first sub attribute"
			);
			secondary = early;
			promoted
		}
		None => return Vec::new(),
	};

	let mut out = Vec::with_capacity(MAX_ATTRIBUTES);
	out.push(primary);
	out.extend(secondary.into_iter().take(MAX_ATTRIBUTES - 1));
	out
}

/// The main attribute alone.
pub fn parse_primary_field<S: AsRef<str>>(
	lines: &[S],
	attrs: &AttributeCatalog,
	tier: Option<CostTier>,
) -> Option<Attribute> {
	parse_attribute_block(lines, attrs, tier).into_iter().next()
}
