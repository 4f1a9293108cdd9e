//! Deciding what to do with an echo.

use std::fmt;

use data::{Catalog, RuleSet};
use ie::ItemRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
	Lock,
	Discard,
	/// Recognized fine, but no rule selects its main attribute.
	NoMatch,
	UnknownSet,
	BadCostTier,
	/// The name isn't one that drops for this set at this cost; usually a misread.
	NameNotInTier,
	/// No main attribute, or one that is impossible for the cost.
	Malformed,
}

impl Outcome {
	pub fn is_action(self) -> bool {
		matches!(self, Self::Lock | Self::Discard)
	}
}

impl fmt::Display for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Lock => "lock",
			Self::Discard => "discard",
			Self::NoMatch => "no matching rule",
			Self::UnknownSet => "unknown set",
			Self::BadCostTier => "bad cost tier",
			Self::NameNotInTier => "name not in set for this cost",
			Self::Malformed => "malformed attributes",
		})
	}
}

/// Classify a recognized echo against the rules. Lock wins over discard,
/// and a missing rule entry acts like an empty one.
pub fn classify(item: &ItemRecord, rules: &RuleSet, catalog: &Catalog) -> Outcome {
	let Some((set, entry)) = catalog.resolve_set(&item.set) else {
		return Outcome::UnknownSet;
	};
	let Some(tier) = item.tier() else {
		return Outcome::BadCostTier;
	};
	if !entry.contains_name(tier, &item.name) {
		return Outcome::NameNotInTier;
	}
	let Some(primary) = item.primary().filter(|a| catalog.attributes.is_primary(Some(tier), &a.name)) else {
		return Outcome::Malformed;
	};

	match rules.get(set, tier) {
		Some(r) if r.lock.contains(&primary.name) => Outcome::Lock,
		Some(r) if r.discard.contains(&primary.name) => Outcome::Discard,
		_ => Outcome::NoMatch,
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use std::collections::{BTreeMap, BTreeSet};

	use data::{AttributeCatalog, CostTier, SetEntry, TierRules};
	use ie::Attribute;

	use super::*;

	fn strs(v: &[&str]) -> Vec<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	fn set(v: &[&str]) -> BTreeSet<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	pub(crate) fn catalog() -> Catalog {
		let sets = BTreeMap::from([
			(
				"Frosty Resolve".to_owned(),
				SetEntry {
					num: "3".to_owned(),
					cost1: strs(&["Glacio Prism", "Cruisewing"]),
					cost3: strs(&["Lampylumen Myriad"]),
					cost4: strs(&["Sentry Construct", "Impermanence Heron"]),
				},
			),
			(
				"Molten Rift".to_owned(),
				SetEntry {
					num: "2".to_owned(),
					cost1: strs(&["Fusion Prism"]),
					cost3: strs(&["Flautist"]),
					cost4: strs(&["Inferno Rider"]),
				},
			),
		]);
		let attributes = AttributeCatalog {
			cost1: set(&["HP", "ATK", "DEF"]),
			cost3: set(&["HP", "ATK", "DEF", "Energy Regen", "Glacio DMG Bonus"]),
			cost4: set(&["HP", "ATK", "DEF", "Crit Rate", "Crit DMG", "Healing Bonus"]),
			secondary: set(&["HP", "ATK", "DEF", "Crit Rate", "Crit DMG", "Energy Regen"]),
		};
		Catalog::new(sets, attributes)
	}

	pub(crate) fn rules() -> RuleSet {
		RuleSet::new()
			.with("Frosty Resolve", CostTier::Cost4, TierRules::new(["Crit Rate", "Crit DMG"], ["HP", "DEF"]))
			.with("Frosty Resolve", CostTier::Cost1, TierRules::new(["ATK"], ["DEF"]))
	}

	pub(crate) fn echo(set: &str, cost: u32, name: &str, primary: &str) -> ItemRecord {
		ItemRecord {
			name: name.to_owned(),
			set: set.to_owned(),
			cost,
			level: 0,
			attributes: vec![Attribute::new(primary, "22.0%"), Attribute::new("ATK", "150")],
			locked: false,
			discarded: false,
		}
	}

	#[test]
	fn lock_rule_on_main_attribute() {
		let item = echo("3", 4, "Sentry Construct", "Crit Rate");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::Lock);
	}

	#[test]
	fn set_resolves_by_name_too() {
		let item = echo("Frosty Resolve", 4, "Impermanence Heron", "HP");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::Discard);
	}

	#[test]
	fn unknown_set_comes_first() {
		let item = echo("unknown", 7, "", "");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::UnknownSet);
	}

	#[test]
	fn unsupported_cost() {
		for cost in [0, 2, 5] {
			let item = echo("3", cost, "Sentry Construct", "Crit Rate");
			assert_eq!(classify(&item, &rules(), &catalog()), Outcome::BadCostTier, "cost {cost}");
		}
	}

	#[test]
	fn name_must_drop_at_that_cost() {
		// Sentry Construct is a cost 4 echo; read as cost 1 it can't be right.
		let item = echo("3", 1, "Sentry Construct", "ATK");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::NameNotInTier);

		let item = echo("2", 4, "Sentry Construct", "Crit Rate");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::NameNotInTier);
	}

	#[test]
	fn impossible_main_attribute_is_malformed() {
		let item = echo("3", 1, "Glacio Prism", "Crit Rate");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::Malformed);

		let mut item = echo("3", 1, "Glacio Prism", "ATK");
		item.attributes.clear();
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::Malformed);
	}

	#[test]
	fn no_rule_is_no_match() {
		let item = echo("3", 4, "Sentry Construct", "Healing Bonus");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::NoMatch);

		// No rules at all for this set and cost.
		let item = echo("2", 3, "Flautist", "Energy Regen");
		assert_eq!(classify(&item, &rules(), &catalog()), Outcome::NoMatch);
		assert_eq!(classify(&item, &RuleSet::new(), &catalog()), Outcome::NoMatch);
	}

	#[test]
	fn lock_wins_over_discard() {
		// Overlapping rules never pass validation, but the classifier must still be deterministic.
		let rules = RuleSet::new().with("Frosty Resolve", CostTier::Cost4, TierRules::new(["HP"], ["HP"]));
		let item = echo("3", 4, "Sentry Construct", "HP");
		assert_eq!(classify(&item, &rules, &catalog()), Outcome::Lock);
	}

	#[test]
	fn classification_is_pure() {
		let item = echo("3", 4, "Sentry Construct", "Crit DMG");
		let (rules, catalog) = (rules(), catalog());
		let before = (item.clone(), rules.clone(), catalog.clone());
		let first = classify(&item, &rules, &catalog);
		for _ in 0..5 {
			assert_eq!(classify(&item, &rules, &catalog), first);
		}
		assert_eq!((item, rules, catalog), before);
	}
}
