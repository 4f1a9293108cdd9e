//! The echo inventory screen.
//!
//! The layout is fixed: a grid of item slots on the left and a detail panel
//! on the right describing the selected echo. Coordinates default to the
//! 3440x1440 reference resolution.

use std::path::Path;

use data::Catalog;

use crate::{
	CaptureError, FrameScreen, ItemRecord, MatchOptions, MatchResult, Point, RecognitionError, Rect, Screen,
	SetIcons, Template, TemplateId, Templates, TextRecognizer, capture_region, capture_region_to, match_set_identity,
	match_template,
	parse::{parse_attribute_block, parse_cost_and_level},
};

/// Lock/discard icons must match at least this well.
pub const STATE_ICON_CONFIDENCE: f32 = 0.9;
/// The page anchor is compared after scrolling, with a lot of motion blur around.
pub const ANCHOR_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Layout {
	/// Click target of the first slot in the visible row.
	pub slot_origin: Point,
	/// Horizontal distance between two slots.
	pub slot_stride: u32,
	pub slots_per_page: u32,
	pub name: Rect,
	pub cost: Rect,
	pub set_icon: Rect,
	pub main_attributes: Rect,
	/// Where the lock and discard markers appear on the detail panel.
	pub state_icons: Rect,
	/// Captured once per run: an item that should scroll into `anchor_verify`.
	pub anchor_capture: Rect,
	pub anchor_verify: Rect,
}

impl Default for Layout {
	fn default() -> Self {
		Self {
			slot_origin: Point::new(375, 275),
			slot_stride: 220,
			slots_per_page: 10,
			name: Rect::from_xywh(2600, 150, 750, 80),
			cost: Rect::from_xywh(3135, 265, 200, 130),
			set_icon: Rect::new(2790, 400, 2850, 460),
			main_attributes: Rect::from_xywh(2600, 525, 740, 475),
			state_icons: Rect::new(3070, 400, 3350, 500),
			anchor_capture: Rect::from_xywh(275, 435, 205, 240),
			anchor_verify: Rect::new(265, 155, 480, 405),
		}
	}
}

impl Layout {
	pub fn slot_position(&self, slot: u32) -> Point {
		Point::new(self.slot_origin.x + slot * self.slot_stride, self.slot_origin.y)
	}
}

/// Whether the lock (or discard) marker of the selected echo is showing.
pub fn icon_present(
	screen: &impl Screen,
	templates: &Templates,
	id: TemplateId,
	region: Rect,
) -> Result<bool, CaptureError> {
	let Some(template) = templates.get(id) else {
		tracing::warn!(template = %id, "template not loaded, treating as absent");
		return Ok(false);
	};
	let result = match_template(screen, Some(region), template, MatchOptions::new(STATE_ICON_CONFIDENCE, true))?;
	Ok(result.found)
}

fn read_text(screen: &impl Screen, ocr: &impl TextRecognizer, rect: Rect) -> Result<Vec<String>, RecognitionError> {
	let crop = capture_region(screen, rect)?;
	ocr.recognize(crop.as_image())
}

/// Read the echo currently shown in the detail panel.
///
/// The screen is captured once and every field is read from that frame.
/// An empty name means the panel isn't showing an echo and is reported as
/// [`RecognitionError::Unreadable`].
pub fn read_echo(
	screen: &impl Screen,
	ocr: &impl TextRecognizer,
	catalog: &Catalog,
	templates: &Templates,
	set_icons: &SetIcons,
	layout: &Layout,
) -> Result<ItemRecord, RecognitionError> {
	let frame = FrameScreen::new(screen.grab_full()?);

	let raw_name = read_text(&frame, ocr, layout.name)?.join(" ");
	let name = catalog.find_echo_name(&raw_name);
	if name.is_empty() {
		return Err(RecognitionError::Unreadable("empty echo name".into()));
	}

	let cost_level = parse_cost_and_level(&read_text(&frame, ocr, layout.cost)?.join(" "));
	let set = match_set_identity(&frame, layout.set_icon, set_icons)?;
	let tier = data::CostTier::from_cost(cost_level.cost);
	let attributes = parse_attribute_block(&read_text(&frame, ocr, layout.main_attributes)?, &catalog.attributes, tier);

	let record = ItemRecord {
		name,
		set,
		cost: cost_level.cost,
		level: cost_level.level,
		attributes,
		locked: icon_present(&frame, templates, TemplateId::LockedIcon, layout.state_icons)?,
		discarded: icon_present(&frame, templates, TemplateId::DiscardIcon, layout.state_icons)?,
	};
	tracing::debug!(
		name = %record.name,
		set = %record.set,
		cost = record.cost,
		level = record.level,
		main = record.primary().map(|a| a.name.as_str()),
		locked = record.locked,
		discarded = record.discarded,
		"read echo"
	);
	Ok(record)
}

/// Capture the page anchor and persist it under `path`.
pub fn snapshot_anchor(screen: &impl Screen, layout: &Layout, path: &Path) -> Result<Template, CaptureError> {
	let image = capture_region_to(screen, layout.anchor_capture, path)?;
	Ok(Template::new("page-anchor", image))
}

/// Look for the page anchor where it should sit after one page of scrolling.
pub fn find_anchor(screen: &impl Screen, layout: &Layout, anchor: &Template) -> Result<MatchResult, CaptureError> {
	match_template(screen, Some(layout.anchor_verify), anchor, MatchOptions::new(ANCHOR_CONFIDENCE, true))
}

#[cfg(test)]
mod tests {
	use std::collections::{BTreeMap, BTreeSet};

	use data::{AttributeCatalog, SetEntry};
	use image::GrayImage;

	use super::*;
	use crate::{
		OwnedImage,
		matcher::tests::{paste, texture},
	};

	/// Small layout over a 400x300 frame.
	fn layout() -> Layout {
		Layout {
			slot_origin: Point::new(20, 20),
			slot_stride: 30,
			slots_per_page: 10,
			name: Rect::from_xywh(200, 10, 150, 20),
			cost: Rect::from_xywh(200, 40, 60, 30),
			set_icon: Rect::new(275, 75, 305, 105),
			main_attributes: Rect::from_xywh(200, 150, 180, 120),
			state_icons: Rect::new(320, 70, 390, 120),
			anchor_capture: Rect::from_xywh(20, 150, 40, 40),
			anchor_verify: Rect::new(10, 10, 80, 80),
		}
	}

	/// Answers by crop size, like a panel with fixed text.
	struct PanelOcr(BTreeMap<(u32, u32), Vec<&'static str>>);

	impl TextRecognizer for PanelOcr {
		fn recognize(&self, image: crate::Image) -> Result<Vec<String>, RecognitionError> {
			Ok(self
				.0
				.get(&(image.width(), image.height()))
				.map(|v| v.iter().map(|s| s.to_string()).collect())
				.unwrap_or_default())
		}
	}

	fn ocr(name: &'static str) -> PanelOcr {
		PanelOcr(BTreeMap::from([
			((150, 20), vec![name]),
			((60, 30), vec!["COST 4 + 25"]),
			((180, 120), vec!["Crit Rate 22.0%", "ATK 150", "Crit DMG 12.6%"]),
		]))
	}

	fn catalog() -> Catalog {
		let set = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
		let sets = BTreeMap::from([(
			"Frosty Resolve".to_owned(),
			SetEntry {
				num: "3".to_owned(),
				cost4: vec!["Sentry Construct".to_owned()],
				..Default::default()
			},
		)]);
		Catalog::new(
			sets,
			AttributeCatalog {
				cost4: set(&["Crit Rate", "Crit DMG"]),
				secondary: set(&["ATK", "Crit DMG"]),
				..Default::default()
			},
		)
	}

	/// Icon on a border of panel background, wide enough for the binarization window.
	fn framed(inner: GrayImage) -> GrayImage {
		let mut out = GrayImage::from_pixel(inner.width() + 16, inner.height() + 16, image::Luma([60]));
		paste(&mut out, &inner, 8, 8);
		out
	}

	fn lock_icon() -> GrayImage {
		framed(texture(16, 16, 4, 41))
	}

	fn templates() -> Templates {
		Templates::from_images([
			(TemplateId::LockedIcon, OwnedImage::from_gray_as_rgb(&lock_icon())),
			(TemplateId::DiscardIcon, OwnedImage::from_gray_as_rgb(&framed(texture(16, 16, 4, 42)))),
		])
	}

	fn frame(locked: bool) -> FrameScreen {
		let mut img = GrayImage::from_pixel(400, 300, image::Luma([60]));
		paste(&mut img, &texture(20, 20, 4, 3), 280, 80);
		if locked {
			paste(&mut img, &lock_icon(), 340, 78);
		}
		FrameScreen::new(OwnedImage::from_gray_as_rgb(&img))
	}

	fn icons() -> SetIcons {
		SetIcons::new(vec![Template::new("3", OwnedImage::from_gray_as_rgb(&texture(20, 20, 4, 3)))])
	}

	#[test]
	fn reads_the_detail_panel() {
		let record = read_echo(
			&frame(true),
			&ocr("Sentry Constuct"),
			&catalog(),
			&templates(),
			&icons(),
			&layout(),
		)
		.unwrap();

		assert_eq!(record.name, "Sentry Construct");
		assert_eq!(record.set, "3");
		assert_eq!((record.cost, record.level), (4, 25));
		let names = record.attributes.iter().map(|a| a.name.as_str()).collect::<Vec<_>>();
		assert_eq!(names, vec!["Crit Rate", "ATK", "Crit DMG"]);
		assert!(record.locked);
		assert!(!record.discarded);
	}

	#[test]
	fn unlocked_echo_has_no_state() {
		let record = read_echo(&frame(false), &ocr("Sentry Construct"), &catalog(), &templates(), &icons(), &layout())
			.unwrap();
		assert!(!record.locked && !record.discarded);
	}

	#[test]
	fn blank_panel_is_unreadable() {
		let err = read_echo(&frame(false), &ocr(""), &catalog(), &templates(), &icons(), &layout()).unwrap_err();
		assert!(matches!(err, RecognitionError::Unreadable(_)), "{err}");
	}

	#[test]
	fn layout_outside_the_frame_is_a_capture_error() {
		let mut layout = layout();
		layout.cost = Rect::from_xywh(380, 40, 60, 30);
		let err = read_echo(&frame(false), &ocr("Sentry Construct"), &catalog(), &templates(), &icons(), &layout)
			.unwrap_err();
		assert!(matches!(err, RecognitionError::Capture(CaptureError::OutOfBounds { .. })), "{err}");
	}

	#[test]
	fn anchor_is_found_after_scrolling() {
		let dir = tempfile::tempdir().unwrap();
		let layout = layout();
		let mut img = GrayImage::from_pixel(400, 300, image::Luma([60]));
		paste(&mut img, &texture(40, 40, 5, 9), 20, 150);
		let before = FrameScreen::new(OwnedImage::from_gray_as_rgb(&img));
		let anchor = snapshot_anchor(&before, &layout, &dir.path().join("page-anchor.png")).unwrap();
		assert!(dir.path().join("page-anchor.png").is_file());

		let mut img = GrayImage::from_pixel(400, 300, image::Luma([60]));
		paste(&mut img, &texture(40, 40, 5, 9), 25, 20);
		let after = FrameScreen::new(OwnedImage::from_gray_as_rgb(&img));
		let found = find_anchor(&after, &layout, &anchor).unwrap();
		assert!(found.found, "{found:?}");
		assert_eq!(found.center, Some(Point::new(45, 40)));

		assert!(!find_anchor(&before, &layout, &anchor).unwrap().found);
	}

	#[test]
	fn slot_positions_step_right() {
		let layout = Layout::default();
		assert_eq!(layout.slot_position(0), Point::new(375, 275));
		assert_eq!(layout.slot_position(9), Point::new(375 + 9 * 220, 275));
	}
}
