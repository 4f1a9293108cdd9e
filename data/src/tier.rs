use std::fmt;

/// Echo weight class. Only 1, 3 and 4 exist in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
	Cost1,
	Cost3,
	Cost4,
}

impl CostTier {
	pub const ALL: [Self; 3] = [Self::Cost1, Self::Cost3, Self::Cost4];

	/// Map an OCR'd cost to its tier. Anything other than 1/3/4 is unresolved.
	pub fn from_cost(cost: u32) -> Option<Self> {
		match cost {
			1 => Some(Self::Cost1),
			3 => Some(Self::Cost3),
			4 => Some(Self::Cost4),
			_ => None,
		}
	}

	pub fn cost(self) -> u32 {
		match self {
			Self::Cost1 => 1,
			Self::Cost3 => 3,
			Self::Cost4 => 4,
		}
	}

	/// Key used in the JSON data files.
	pub fn key(self) -> &'static str {
		match self {
			Self::Cost1 => "cost1",
			Self::Cost3 => "cost3",
			Self::Cost4 => "cost4",
		}
	}
}

impl fmt::Display for CostTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_known_costs_resolve() {
		assert_eq!(CostTier::from_cost(1), Some(CostTier::Cost1));
		assert_eq!(CostTier::from_cost(3), Some(CostTier::Cost3));
		assert_eq!(CostTier::from_cost(4), Some(CostTier::Cost4));
		for cost in [0, 2, 5, 12] {
			assert_eq!(CostTier::from_cost(cost), None, "cost {cost}");
		}
	}

	#[test]
	fn serializes_as_data_file_key() {
		let json = serde_json::to_string(&CostTier::Cost3).unwrap();
		assert_eq!(json, "\"cost3\"");
		let tier: CostTier = serde_json::from_str("\"cost4\"").unwrap();
		assert_eq!(tier, CostTier::Cost4);
		assert_eq!(tier.to_string(), "cost4");
	}
}
