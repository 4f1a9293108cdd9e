mod capture;
pub use capture::*;
mod error;
pub use error::*;
mod pixels;
pub use pixels::*;
mod matcher;
pub use matcher::*;
mod ocr;
pub use ocr::*;
pub mod parse;
mod record;
pub use record::*;
mod rect;
pub use rect::*;
mod templates;
pub use templates::*;

pub mod screen;

use std::path::Path;

use screen::inventory::{self, Layout};

/// Image extraction engine: recognizer plus the reference images and layout
/// it reads the inventory screen with.
pub struct Ie<R = Ocr> {
	ocr: R,
	templates: Templates,
	set_icons: SetIcons,
	layout: Layout,
}

impl Ie<Ocr> {
	pub fn try_new(
		ocr_detection: impl AsRef<Path>,
		ocr_recognition: impl AsRef<Path>,
		ocr_charset: impl AsRef<Path>,
		templates: Templates,
		set_icons: SetIcons,
		layout: Layout,
	) -> anyhow::Result<Self> {
		let ocr = Ocr::try_new(ocr_detection, ocr_recognition, ocr_charset)?;
		Ok(Self::with_recognizer(ocr, templates, set_icons, layout))
	}
}

impl<R: TextRecognizer> Ie<R> {
	pub fn with_recognizer(ocr: R, templates: Templates, set_icons: SetIcons, layout: Layout) -> Self {
		Self {
			ocr,
			templates,
			set_icons,
			layout,
		}
	}

	pub fn inventory_read_echo(&self, screen: &impl Screen, catalog: &data::Catalog) -> Result<ItemRecord, RecognitionError> {
		inventory::read_echo(screen, &self.ocr, catalog, &self.templates, &self.set_icons, &self.layout)
	}

	/// Lock/discard marker check on the detail panel.
	pub fn inventory_state_icon(&self, screen: &impl Screen, id: TemplateId) -> Result<bool, CaptureError> {
		inventory::icon_present(screen, &self.templates, id, self.layout.state_icons)
	}

	pub fn inventory_snapshot_anchor(&self, screen: &impl Screen, path: &Path) -> Result<Template, CaptureError> {
		inventory::snapshot_anchor(screen, &self.layout, path)
	}

	pub fn inventory_find_anchor(&self, screen: &impl Screen, anchor: &Template) -> Result<MatchResult, CaptureError> {
		inventory::find_anchor(screen, &self.layout, anchor)
	}

	/// Normalized grayscale match of a loaded template anywhere in `region`.
	///
	/// A template missing from the asset pack never matches.
	pub fn find(
		&self,
		screen: &impl Screen,
		id: TemplateId,
		region: Option<Rect>,
		confidence: f32,
	) -> Result<MatchResult, CaptureError> {
		match self.templates.get(id) {
			Some(template) => match_template(screen, region, template, MatchOptions::new(confidence, true)),
			None => {
				tracing::warn!(template = %id, "template not loaded");
				Ok(MatchResult::NOT_FOUND)
			}
		}
	}
}
