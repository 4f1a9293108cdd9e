use std::path::PathBuf;

use data::Catalog;
use ie::{CaptureError, Ie, ItemRecord, MatchResult, RecognitionError, Screen, Template, TemplateId, TextRecognizer};

/// What the sorter needs to see on screen.
pub trait Vision {
	/// Read the echo selected in the inventory.
	fn read_echo(&self) -> Result<ItemRecord, RecognitionError>;
	/// Whether the lock or discard marker shows on the detail panel.
	fn state_icon(&self, id: TemplateId) -> Result<bool, CaptureError>;
	/// Capture the current page anchor.
	fn snapshot_anchor(&self) -> Result<Template, CaptureError>;
	/// Whether `anchor` sits where one page of scrolling should have put it.
	fn anchor_visible(&self, anchor: &Template) -> Result<bool, CaptureError>;
	/// Look for a menu element anywhere on screen.
	fn find(&self, id: TemplateId, confidence: f32) -> Result<MatchResult, CaptureError>;
}

/// [`Vision`] over a real (or recorded) screen.
pub struct ScreenVision<'a, S, R> {
	ie: &'a Ie<R>,
	screen: S,
	catalog: &'a Catalog,
	anchor_path: PathBuf,
}

impl<'a, S: Screen, R: TextRecognizer> ScreenVision<'a, S, R> {
	pub fn new(ie: &'a Ie<R>, screen: S, catalog: &'a Catalog, anchor_path: PathBuf) -> Self {
		Self {
			ie,
			screen,
			catalog,
			anchor_path,
		}
	}
}

impl<S: Screen, R: TextRecognizer> Vision for ScreenVision<'_, S, R> {
	fn read_echo(&self) -> Result<ItemRecord, RecognitionError> {
		self.ie.inventory_read_echo(&self.screen, self.catalog)
	}

	fn state_icon(&self, id: TemplateId) -> Result<bool, CaptureError> {
		self.ie.inventory_state_icon(&self.screen, id)
	}

	fn snapshot_anchor(&self) -> Result<Template, CaptureError> {
		self.ie.inventory_snapshot_anchor(&self.screen, &self.anchor_path)
	}

	fn anchor_visible(&self, anchor: &Template) -> Result<bool, CaptureError> {
		Ok(self.ie.inventory_find_anchor(&self.screen, anchor)?.found)
	}

	fn find(&self, id: TemplateId, confidence: f32) -> Result<MatchResult, CaptureError> {
		self.ie.find(&self.screen, id, None, confidence)
	}
}
