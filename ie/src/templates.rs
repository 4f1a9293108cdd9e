//! Reference images loaded from the assets directory.

use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result};

use crate::{CaptureError, OwnedImage, Preprocess, Rect, Screen, Template, best_score, record::UNKNOWN_SET};

/// Set icon matches must score strictly above this.
pub const SET_ICON_CONFIDENCE: f32 = 0.5;

/// Every reference image the sorter needs, by logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateId {
	LockedIcon,
	DiscardIcon,
	HudReady,
	InventoryClose,
	EchoTab,
	EchoFilter,
	SortMenu,
	SortListOpen,
	SortTimeOption,
	TimeSort,
}

impl TemplateId {
	pub const ALL: [Self; 10] = [
		Self::LockedIcon,
		Self::DiscardIcon,
		Self::HudReady,
		Self::InventoryClose,
		Self::EchoTab,
		Self::EchoFilter,
		Self::SortMenu,
		Self::SortListOpen,
		Self::SortTimeOption,
		Self::TimeSort,
	];

	pub fn name(self) -> &'static str {
		match self {
			Self::LockedIcon => "locked-icon",
			Self::DiscardIcon => "discard-icon",
			Self::HudReady => "hud-ready",
			Self::InventoryClose => "inventory-close",
			Self::EchoTab => "echo-tab",
			Self::EchoFilter => "echo-filter",
			Self::SortMenu => "sort-menu",
			Self::SortListOpen => "sort-list-open",
			Self::SortTimeOption => "sort-time-option",
			Self::TimeSort => "time-sort",
		}
	}
}

impl fmt::Display for TemplateId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone)]
pub struct Templates {
	map: BTreeMap<TemplateId, Template>,
}

impl Templates {
	/// Load `<name>.png` for every [`TemplateId`] from `dir`. All of them must exist.
	pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref();
		let mut map = BTreeMap::new();
		for id in TemplateId::ALL {
			let path = dir.join(format!("{}.png", id.name()));
			let image = OwnedImage::open(&path).with_context(|| format!("Load template {id}"))?;
			map.insert(id, Template::new(id.name(), image));
		}
		tracing::debug!(dir = %dir.display(), count = map.len(), "loaded templates");
		Ok(Self { map })
	}

	/// Build from already decoded images (tests, custom asset packs).
	pub fn from_images(images: impl IntoIterator<Item = (TemplateId, OwnedImage)>) -> Self {
		Self {
			map: images
				.into_iter()
				.map(|(id, image)| (id, Template::new(id.name(), image)))
				.collect(),
		}
	}

	pub fn get(&self, id: TemplateId) -> Option<&Template> {
		self.map.get(&id)
	}
}

/// All set icons, sorted by identifier so ties resolve alphabetically.
#[derive(Debug, Clone, Default)]
pub struct SetIcons {
	icons: Vec<Template>,
}

impl SetIcons {
	/// Load every PNG in `dir`, keyed by file stem.
	pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref();
		let mut icons = Vec::new();
		for entry in std::fs::read_dir(dir).with_context(|| format!("Read set icon dir {}", dir.display()))? {
			let path = entry?.path();
			if path.extension().is_none_or(|ext| !ext.eq_ignore_ascii_case("png")) {
				continue;
			}
			let Some(stem) = path.file_stem().and_then(|v| v.to_str()) else {
				continue;
			};
			icons.push(Template::new(stem, OwnedImage::open(&path)?));
		}
		tracing::debug!(dir = %dir.display(), count = icons.len(), "loaded set icons");
		Ok(Self::new(icons))
	}

	pub fn new(mut icons: Vec<Template>) -> Self {
		icons.sort_by(|a, b| a.name.cmp(&b.name));
		Self { icons }
	}

	pub fn is_empty(&self) -> bool {
		self.icons.is_empty()
	}
}

/// Identify the echo set from its icon, or [`UNKNOWN_SET`].
///
/// Grayscale ZNCC against every icon; the best score must be strictly above
/// [`SET_ICON_CONFIDENCE`]. Equal scores keep the alphabetically first icon.
pub fn match_set_identity(screen: &impl Screen, region: Rect, icons: &SetIcons) -> Result<String, CaptureError> {
	if region.is_degenerate() {
		return Err(CaptureError::Degenerate(region));
	}
	let haystack = screen.grab(Some(region))?;

	let mut best: Option<(&str, f32)> = None;
	for icon in &icons.icons {
		let score = best_score(haystack.as_image(), icon.image.as_image(), Preprocess::Gray);
		if score > SET_ICON_CONFIDENCE && best.is_none_or(|(_, s)| score > s) {
			best = Some((&icon.name, score));
		}
	}

	match best {
		Some((name, score)) => {
			tracing::debug!(set = name, confidence = score, "set icon match");
			Ok(name.to_owned())
		}
		None => {
			tracing::debug!("no set icon matched");
			Ok(UNKNOWN_SET.to_owned())
		}
	}
}
