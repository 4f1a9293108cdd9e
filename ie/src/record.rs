use data::CostTier;

/// Set identifier reported when no set icon matched.
pub const UNKNOWN_SET: &str = "unknown";

/// One attribute line off the detail panel, e.g. `("Crit Rate", "22.0%")`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Attribute {
	pub name: String,
	pub value: String,
}

impl Attribute {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// A single echo as read off the screen.
///
/// `attributes[0]` is the main attribute; the rest are sub attributes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemRecord {
	pub name: String,
	pub set: String,
	/// 0 when the cost could not be read.
	pub cost: u32,
	pub level: u32,
	pub attributes: Vec<Attribute>,
	pub locked: bool,
	pub discarded: bool,
}

impl ItemRecord {
	pub fn tier(&self) -> Option<CostTier> {
		CostTier::from_cost(self.cost)
	}

	pub fn primary(&self) -> Option<&Attribute> {
		self.attributes.first()
	}
}
