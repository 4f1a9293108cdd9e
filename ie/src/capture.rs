//! Screen access.
//!
//! The engine never talks to a capture backend directly; everything goes
//! through [`Screen`] so recognition can run against a live monitor or a
//! saved screenshot alike.

use std::path::Path;

use crate::{CaptureError, OwnedImage, Rect};

/// A source of screen pixels in absolute screen coordinates.
pub trait Screen {
	/// Capture the whole screen.
	fn grab_full(&self) -> Result<OwnedImage, CaptureError>;

	/// Capture `rect` (or the whole screen for `None`).
	///
	/// The default crops a full capture; backends that can grab a region
	/// directly should override it.
	fn grab(&self, rect: Option<Rect>) -> Result<OwnedImage, CaptureError> {
		let full = self.grab_full()?;
		match rect {
			None => Ok(full),
			Some(rect) => crop(&full, rect),
		}
	}
}

impl<S: Screen + ?Sized> Screen for &S {
	fn grab_full(&self) -> Result<OwnedImage, CaptureError> {
		(**self).grab_full()
	}

	fn grab(&self, rect: Option<Rect>) -> Result<OwnedImage, CaptureError> {
		(**self).grab(rect)
	}
}

/// A still frame posing as the screen (saved screenshots, tests).
pub struct FrameScreen {
	frame: OwnedImage,
}

impl FrameScreen {
	pub fn new(frame: OwnedImage) -> Self {
		Self { frame }
	}

	pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		Ok(Self::new(OwnedImage::open(path)?))
	}
}

impl Screen for FrameScreen {
	fn grab_full(&self) -> Result<OwnedImage, CaptureError> {
		Ok(self.frame.clone())
	}

	fn grab(&self, rect: Option<Rect>) -> Result<OwnedImage, CaptureError> {
		match rect {
			None => Ok(self.frame.clone()),
			Some(rect) => crop(&self.frame, rect),
		}
	}
}

fn crop(full: &OwnedImage, rect: Rect) -> Result<OwnedImage, CaptureError> {
	if rect.is_degenerate() {
		return Err(CaptureError::Degenerate(rect));
	}
	full.as_image()
		.crop(rect)
		.map(|v| v.to_owned_image())
		.ok_or(CaptureError::OutOfBounds {
			rect,
			width: full.width(),
			height: full.height(),
		})
}

/// Capture a screen rectangle.
pub fn capture_region(screen: &impl Screen, rect: Rect) -> Result<OwnedImage, CaptureError> {
	if rect.is_degenerate() {
		return Err(CaptureError::Degenerate(rect));
	}
	screen.grab(Some(rect))
}

/// Capture a screen rectangle and persist it as PNG, creating the parent
/// directory if needed. The captured image is returned as well.
pub fn capture_region_to(
	screen: &impl Screen,
	rect: Rect,
	path: impl AsRef<Path>,
) -> Result<OwnedImage, CaptureError> {
	let path = path.as_ref();
	let image = capture_region(screen, rect)?;
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent).map_err(|source| CaptureError::CreateDir {
			path: parent.to_path_buf(),
			source,
		})?;
	}
	image.as_image().save_png(path).map_err(|source| CaptureError::Write {
		path: path.to_path_buf(),
		source,
	})?;
	tracing::debug!(%rect, path = %path.display(), "saved region capture");
	Ok(image)
}
