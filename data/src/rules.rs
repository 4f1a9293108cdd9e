use std::collections::{BTreeMap, BTreeSet};

use crate::{Catalog, CostTier};

/// Lock/discard main attributes selected for one (set, cost) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TierRules {
	#[serde(default)]
	pub lock: BTreeSet<String>,
	#[serde(default)]
	pub discard: BTreeSet<String>,
}

impl TierRules {
	pub fn new<L, D>(lock: L, discard: D) -> Self
	where
		L: IntoIterator,
		L::Item: Into<String>,
		D: IntoIterator,
		D::Item: Into<String>,
	{
		Self {
			lock: lock.into_iter().map(Into::into).collect(),
			discard: discard.into_iter().map(Into::into).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
	#[error("rules reference unknown echo set {set:?}")]
	UnknownSet { set: String },
	#[error("{set} {tier}: {attribute:?} is not a main attribute for this cost")]
	UnknownAttribute {
		set: String,
		tier: CostTier,
		attribute: String,
	},
	#[error("{set} {tier}: {attribute:?} is listed for both lock and discard")]
	Overlap {
		set: String,
		tier: CostTier,
		attribute: String,
	},
}

/// `set name -> cost tier -> rules`, as stored in `default_rules.json`.
///
/// Owned by the caller and only ever borrowed by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct RuleSet {
	sets: BTreeMap<String, BTreeMap<CostTier, TierRules>>,
}

impl RuleSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, set: impl Into<String>, tier: CostTier, rules: TierRules) {
		self.sets.entry(set.into()).or_default().insert(tier, rules);
	}

	pub fn with(mut self, set: impl Into<String>, tier: CostTier, rules: TierRules) -> Self {
		self.insert(set, tier, rules);
		self
	}

	pub fn get(&self, set: &str, tier: CostTier) -> Option<&TierRules> {
		self.sets.get(set).and_then(|tiers| tiers.get(&tier))
	}

	pub fn is_empty(&self) -> bool {
		self.sets
			.values()
			.flat_map(|tiers| tiers.values())
			.all(|r| r.lock.is_empty() && r.discard.is_empty())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, CostTier, &TierRules)> {
		self.sets.iter().flat_map(|(set, tiers)| {
			tiers.iter().map(move |(tier, rules)| (set.as_str(), *tier, rules))
		})
	}

	/// Check the rules against the catalog before a run is allowed to start.
	pub fn validate(&self, catalog: &Catalog) -> Result<(), RuleError> {
		for (set, tier, rules) in self.iter() {
			if !catalog.sets.contains_key(set) {
				return Err(RuleError::UnknownSet { set: set.to_owned() });
			}

			let valid = catalog.attributes.primaries(tier);
			if let Some(attribute) = rules.lock.iter().chain(&rules.discard).find(|a| !valid.contains(*a)) {
				return Err(RuleError::UnknownAttribute {
					set: set.to_owned(),
					tier,
					attribute: attribute.clone(),
				});
			}

			if let Some(attribute) = rules.lock.intersection(&rules.discard).next() {
				return Err(RuleError::Overlap {
					set: set.to_owned(),
					tier,
					attribute: attribute.clone(),
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::tests::sample_catalog;

	#[test]
	fn parses_data_file_layout() {
		let json = r#"{
			"Frosty Resolve": {
				"cost1": {"lock": [], "discard": ["DEF"]},
				"cost4": {"lock": ["Crit Rate", "Crit DMG"], "discard": ["HP"]}
			}
		}"#;
		let rules: RuleSet = serde_json::from_str(json).unwrap();
		let cost4 = rules.get("Frosty Resolve", CostTier::Cost4).unwrap();
		assert!(cost4.lock.contains("Crit Rate"));
		assert!(cost4.discard.contains("HP"));
		assert!(rules.get("Frosty Resolve", CostTier::Cost3).is_none());
		assert_eq!(rules.validate(&sample_catalog()), Ok(()));
	}

	#[test]
	fn overlap_is_rejected() {
		let rules = RuleSet::new().with(
			"Frosty Resolve",
			CostTier::Cost4,
			TierRules::new(["Crit Rate"], ["Crit Rate", "HP"]),
		);
		assert_eq!(
			rules.validate(&sample_catalog()),
			Err(RuleError::Overlap {
				set: "Frosty Resolve".into(),
				tier: CostTier::Cost4,
				attribute: "Crit Rate".into(),
			})
		);
	}

	#[test]
	fn unknown_set_and_attribute_are_rejected() {
		let catalog = sample_catalog();

		let rules = RuleSet::new().with("Nope", CostTier::Cost1, TierRules::new(["HP"], Vec::<String>::new()));
		assert!(matches!(rules.validate(&catalog), Err(RuleError::UnknownSet { .. })));

		let rules = RuleSet::new().with(
			"Molten Rift",
			CostTier::Cost1,
			TierRules::new(["Crit Rate"], Vec::<String>::new()),
		);
		assert!(matches!(rules.validate(&catalog), Err(RuleError::UnknownAttribute { .. })));
	}

	#[test]
	fn empty_when_no_attribute_selected() {
		let rules = RuleSet::new().with("Molten Rift", CostTier::Cost3, TierRules::default());
		assert!(rules.is_empty());
		assert!(!RuleSet::new().with("Molten Rift", CostTier::Cost3, TierRules::new(["ATK"], ["HP"])).is_empty());
	}
}
