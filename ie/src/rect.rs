use std::fmt;

/// Screen point in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct Point {
	pub x: u32,
	pub y: u32,
}

impl Point {
	pub const fn new(x: u32, y: u32) -> Self {
		Self { x, y }
	}
}

/// Axis-aligned rectangle as `(left, top, right, bottom)`, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct Rect {
	pub left: u32,
	pub top: u32,
	pub right: u32,
	pub bottom: u32,
}

impl Rect {
	pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
		Self { left, top, right, bottom }
	}

	pub const fn from_xywh(x: u32, y: u32, width: u32, height: u32) -> Self {
		Self::new(x, y, x + width, y + height)
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.right.saturating_sub(self.left)
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.bottom.saturating_sub(self.top)
	}

	pub fn is_degenerate(&self) -> bool {
		self.right <= self.left || self.bottom <= self.top
	}
}

impl fmt::Display for Rect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {}, {}, {})", self.left, self.top, self.right, self.bottom)
	}
}
