use ie::{CaptureError, OwnedImage, Screen};
use xcap::image::EncodableLayout;

/// Find the first top-level window whose title starts with `prefix`.
#[cfg(windows)]
pub fn find_window(prefix: &str) -> Option<xcap::Window> {
	let windows = xcap::Window::all().ok()?;
	windows
		.into_iter()
		.find(|window| window.title().is_ok_and(|title| title.starts_with(prefix)))
}

/// The primary monitor, captured with `xcap`.
pub struct MonitorScreen {
	monitor: xcap::Monitor,
}

impl MonitorScreen {
	pub fn primary() -> anyhow::Result<Self> {
		let monitors = xcap::Monitor::all()?;
		let monitor = monitors
			.into_iter()
			.find(|m| m.is_primary().unwrap_or(false))
			.ok_or_else(|| anyhow::anyhow!("no primary monitor"))?;
		tracing::info!(
			name = %monitor.name().unwrap_or_default(),
			width = monitor.width().unwrap_or_default(),
			height = monitor.height().unwrap_or_default(),
			"capturing primary monitor"
		);
		Ok(Self { monitor })
	}
}

impl Screen for MonitorScreen {
	fn grab_full(&self) -> Result<OwnedImage, CaptureError> {
		let img = self
			.monitor
			.capture_image()
			.map_err(|err| CaptureError::Backend(err.to_string()))?;
		Ok(OwnedImage::from_rgba(img.width() as usize, img.as_bytes()))
	}
}
