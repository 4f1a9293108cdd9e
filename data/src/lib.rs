//! Static echo reference data: the set/attribute catalog and lock/discard rules.
//!
//! Everything here is loaded once before a run and only borrowed afterwards.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};

mod catalog;
pub use catalog::*;
mod rules;
pub use rules::*;
mod tier;
pub use tier::*;

pub const ECHO_FILE: &str = "echo.json";
pub const COST_FILE: &str = "cost.json";
pub const DEFAULT_RULES_FILE: &str = "default_rules.json";

#[derive(Debug, Clone)]
pub struct Data {
	pub catalog: Catalog,
	pub default_rules: RuleSet,
}

impl Data {
	/// Load `echo.json`, `cost.json` and `default_rules.json` from `dir`.
	///
	/// The default rules are validated against the catalog so a bad data
	/// directory fails here instead of halfway through a run.
	pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref();
		let catalog = load_catalog(dir)?;
		let default_rules = load_rules(dir.join(DEFAULT_RULES_FILE))?;
		default_rules
			.validate(&catalog)
			.with_context(|| format!("Validate {}", dir.join(DEFAULT_RULES_FILE).display()))?;

		tracing::info!(
			sets = catalog.sets.len(),
			secondary = catalog.attributes.secondary.len(),
			dir = %dir.display(),
			"loaded echo data"
		);
		Ok(Self { catalog, default_rules })
	}
}

pub fn load_catalog(dir: impl AsRef<Path>) -> Result<Catalog> {
	let dir = dir.as_ref();
	let sets = read_json(&dir.join(ECHO_FILE))?;
	let attributes = read_json(&dir.join(COST_FILE))?;
	Ok(Catalog::new(sets, attributes))
}

/// Load a rule file. Validation is left to the caller.
pub fn load_rules(path: impl AsRef<Path>) -> Result<RuleSet> {
	read_json(path.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
	let file = File::open(path).with_context(|| format!("Open {}", path.display()))?;
	let reader = BufReader::new(file);
	serde_json::from_reader(reader).with_context(|| format!("Parse {}", path.display()))
}
