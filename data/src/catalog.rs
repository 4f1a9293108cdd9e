use std::collections::{BTreeMap, BTreeSet};

use crate::CostTier;

/// One echo set as listed in `echo.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SetEntry {
	/// Identifier of the set icon (file stem in the set icon directory).
	pub num: String,
	#[serde(default)]
	pub cost1: Vec<String>,
	#[serde(default)]
	pub cost3: Vec<String>,
	#[serde(default)]
	pub cost4: Vec<String>,
}

impl SetEntry {
	/// Echo names that can drop with this set at the given cost.
	pub fn names(&self, tier: CostTier) -> &[String] {
		match tier {
			CostTier::Cost1 => &self.cost1,
			CostTier::Cost3 => &self.cost3,
			CostTier::Cost4 => &self.cost4,
		}
	}

	pub fn contains_name(&self, tier: CostTier, name: &str) -> bool {
		self.names(tier).iter().any(|v| v == name)
	}
}

/// Valid attribute names, as listed in `cost.json`.
///
/// Main attributes depend on the cost tier; sub attributes are shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AttributeCatalog {
	#[serde(default)]
	pub cost1: BTreeSet<String>,
	#[serde(default)]
	pub cost3: BTreeSet<String>,
	#[serde(default)]
	pub cost4: BTreeSet<String>,
	#[serde(default, rename = "attr")]
	pub secondary: BTreeSet<String>,
}

impl AttributeCatalog {
	pub fn primaries(&self, tier: CostTier) -> &BTreeSet<String> {
		match tier {
			CostTier::Cost1 => &self.cost1,
			CostTier::Cost3 => &self.cost3,
			CostTier::Cost4 => &self.cost4,
		}
	}

	/// Whether `name` is a valid main attribute. With no tier, any tier counts.
	pub fn is_primary(&self, tier: Option<CostTier>, name: &str) -> bool {
		match tier {
			Some(tier) => self.primaries(tier).contains(name),
			None => CostTier::ALL.iter().any(|t| self.primaries(*t).contains(name)),
		}
	}

	pub fn is_secondary(&self, name: &str) -> bool {
		self.secondary.contains(name)
	}
}

/// Read-only reference data for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
	pub sets: BTreeMap<String, SetEntry>,
	pub attributes: AttributeCatalog,
}

impl Catalog {
	pub fn new(sets: BTreeMap<String, SetEntry>, attributes: AttributeCatalog) -> Self {
		Self { sets, attributes }
	}

	/// Resolve a set identifier to its catalog entry.
	///
	/// Accepts the icon identifier (`num`, optionally still carrying a file
	/// extension) or the set name itself.
	pub fn resolve_set(&self, ident: &str) -> Option<(&str, &SetEntry)> {
		let ident = ident.trim();
		if ident.is_empty() {
			return None;
		}
		let stem = std::path::Path::new(ident)
			.file_stem()
			.and_then(|v| v.to_str())
			.unwrap_or(ident);

		self.sets
			.iter()
			.find(|(_, entry)| entry.num == stem)
			.or_else(|| self.sets.get_key_value(ident))
			.map(|(name, entry)| (name.as_str(), entry))
	}

	fn echo_names(&self) -> impl Iterator<Item = &str> {
		self.sets.values().flat_map(|entry| {
			CostTier::ALL
				.into_iter()
				.flat_map(move |tier| entry.names(tier).iter().map(String::as_str))
		})
	}

	/// Attempts to find the closest echo name from a dirty ocr string.
	///
	/// Returns the cleaned input unchanged when nothing is close enough, so
	/// a bad read surfaces as an unknown name instead of a wrong guess.
	pub fn find_echo_name(&self, raw: &str) -> String {
		let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
		if name.chars().count() < 2 {
			return name;
		}
		if self.echo_names().any(|v| v == name) {
			return name;
		}

		// OCR likes to pick up stray glyphs to the left of the title.
		let mut start = 0;
		while let Some(index) = name[start..].find(' ') {
			start += index + 1;
			let sub = &name[start..];
			if let Some(found) = self.echo_names().find(|v| *v == sub) {
				return found.to_owned();
			}
		}

		let compact = name.replace(' ', "");
		if let Some(found) = self.echo_names().find(|v| v.replace(' ', "") == compact) {
			return found.to_owned();
		}

		let mut best: Option<(&str, usize)> = None;
		for candidate in self.echo_names() {
			let lev = levenshtein::levenshtein(&name, candidate);
			if best.is_none_or(|(_, min)| lev < min) {
				best = Some((candidate, lev));
			}
		}

		match best {
			Some((candidate, lev)) => {
				let max_len = name.chars().count().max(candidate.chars().count());
				if lev <= (max_len / 3).max(1) {
					tracing::debug!(raw = %name, matched = candidate, distance = lev, "fuzzy echo name match");
					candidate.to_owned()
				} else {
					name
				}
			}
			None => name,
		}
	}
}
