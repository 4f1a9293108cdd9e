//! Locating the OCR model files.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

pub const ASSETS_ENV: &str = "ECHOSORT_ASSETS_DIR";
const DETECTION: &str = "detection.mnn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrAssets {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

impl OcrAssets {
	/// The model files for `lang` in `base` or `base/ocr`, if all three exist.
	fn find_in(base: &Path, lang: &str) -> Result<Self, PathBuf> {
		let dir = if base.join(DETECTION).is_file() { base.to_path_buf() } else { base.join("ocr") };
		let assets = Self {
			detection: dir.join(DETECTION),
			recognition: dir.join(format!("{lang}_recognition.mnn")),
			charset: dir.join(format!("{lang}_charset.txt")),
		};
		if assets.detection.is_file() && assets.recognition.is_file() && assets.charset.is_file() {
			Ok(assets)
		} else {
			Err(dir)
		}
	}
}

/// Search `$ECHOSORT_ASSETS_DIR`, the configured assets directory, the
/// executable's directory and the working directory, in that order.
pub fn resolve_ocr_assets(lang: &str, assets_dir: &Path) -> Result<OcrAssets> {
	let mut candidates = Vec::new();
	if let Some(dir) = std::env::var_os(ASSETS_ENV) {
		candidates.push(PathBuf::from(dir));
	}
	candidates.push(assets_dir.to_path_buf());
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}
	search(lang, candidates)
}

fn search(lang: &str, candidates: impl IntoIterator<Item = PathBuf>) -> Result<OcrAssets> {
	let mut tried = Vec::new();
	for base in candidates {
		match OcrAssets::find_in(&base, lang) {
			Ok(assets) => {
				tracing::debug!(dir = %base.display(), "found OCR models");
				return Ok(assets);
			}
			Err(dir) => tried.push(dir),
		}
	}

	bail!(
		"OCR model files not found (ocr/{DETECTION}, ocr/{lang}_recognition.mnn, ocr/{lang}_charset.txt).\nSearched in:\n{}\nCopy the 'ocr/' folder next to the executable or set {ASSETS_ENV}.",
		tried
			.iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}
