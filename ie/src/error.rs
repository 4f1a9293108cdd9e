use std::path::PathBuf;

use crate::Rect;

/// Failure to get pixels off the screen (or onto disk).
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
	#[error("degenerate capture region {0}")]
	Degenerate(Rect),
	#[error("capture region {rect} is outside the {width}x{height} frame")]
	OutOfBounds { rect: Rect, width: u32, height: u32 },
	#[error("screen capture failed: {0}")]
	Backend(String),
	#[error("create directory {path}: {source}")]
	CreateDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("write {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: image::ImageError,
	},
}

/// Failure to turn a screen region into text or an item record.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
	#[error("ocr engine failed: {0}")]
	Engine(String),
	#[error(transparent)]
	Capture(#[from] CaptureError),
	#[error("no echo detail panel on screen ({0})")]
	Unreadable(String),
}
