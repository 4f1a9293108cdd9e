//! Template matching.
//!
//! Scores are zero-mean normalized cross-correlation (the `TM_CCOEFF_NORMED`
//! measure), in `[-1, 1]`. Game UI renders with anti-aliasing jitter between
//! frames, so icon checks usually run on blurred, adaptively binarized
//! grayscale rather than raw RGB.
//!
//! Large searches (a full 1440p screen against a menu button) go through a
//! coarse pass on a downscaled pyramid level first, and only the best coarse
//! candidates are refined at full resolution.

use image::{GrayImage, RgbImage, imageops::FilterType};

use crate::{CaptureError, Image, OwnedImage, Point, Rect, Screen};

/// Positions x template pixels above which the coarse pass kicks in.
const COARSE_BUDGET: u64 = 50_000_000;
/// Don't shrink templates below this many pixels per side.
const COARSE_MIN_SIDE: u32 = 8;
const COARSE_CANDIDATES: usize = 4;

/// Outcome of a single template match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
	pub found: bool,
	/// Template center in absolute screen coordinates, when found.
	pub center: Option<Point>,
	/// Best score seen, whether or not it passed the threshold.
	pub confidence: f32,
}

impl MatchResult {
	pub const NOT_FOUND: Self = Self {
		found: false,
		center: None,
		confidence: 0.0,
	};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
	/// Match raw RGB.
	Color,
	/// Luma only.
	Gray,
	/// Luma, 3x3 gaussian blur, then adaptive threshold.
	Binarize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
	pub confidence: f32,
	pub preprocess: Preprocess,
}

impl MatchOptions {
	/// `grayscale` selects the normalized (blurred + binarized) pipeline.
	pub const fn new(confidence: f32, grayscale: bool) -> Self {
		Self {
			confidence,
			preprocess: if grayscale { Preprocess::Binarize } else { Preprocess::Color },
		}
	}
}

/// A reference image addressed by logical name ("locked-icon", ...).
#[derive(Debug, Clone)]
pub struct Template {
	pub name: String,
	pub image: OwnedImage,
}

impl Template {
	pub fn new(name: impl Into<String>, image: OwnedImage) -> Self {
		Self { name: name.into(), image }
	}
}

/// Blur and binarize a grayscale image so that UI edges survive while
/// lighting and anti-aliasing differences are flattened out.
pub fn normalize(gray: &GrayImage) -> GrayImage {
	let blurred = imageproc::filter::gaussian_blur_f32(gray, 0.8);
	imageproc::contrast::adaptive_threshold(&blurred, 5, 2)
}

/// Capture `region` (whole screen for `None`) and look for `template` in it.
pub fn match_template(
	screen: &impl Screen,
	region: Option<Rect>,
	template: &Template,
	opts: MatchOptions,
) -> Result<MatchResult, CaptureError> {
	if let Some(rect) = region
		&& rect.is_degenerate()
	{
		return Err(CaptureError::Degenerate(rect));
	}
	let haystack = screen.grab(region)?;
	let mut result = match_image(haystack.as_image(), template.image.as_image(), opts);
	if let (Some(center), Some(rect)) = (result.center.as_mut(), region) {
		center.x += rect.left;
		center.y += rect.top;
	}
	tracing::debug!(
		template = %template.name,
		confidence = result.confidence,
		threshold = opts.confidence,
		found = result.found,
		"template match"
	);
	Ok(result)
}

/// Look for `template` inside `haystack`. Coordinates are relative to `haystack`.
pub fn match_image(haystack: Image, template: Image, opts: MatchOptions) -> MatchResult {
	let Some((x, y, score)) = best_match(haystack, template, opts.preprocess) else {
		return MatchResult::NOT_FOUND;
	};
	let confidence = score as f32;
	if confidence >= opts.confidence {
		MatchResult {
			found: true,
			center: Some(Point::new(x + template.width() / 2, y + template.height() / 2)),
			confidence,
		}
	} else {
		MatchResult {
			found: false,
			center: None,
			confidence,
		}
	}
}

/// Best score of `template` anywhere in `haystack`, or 0 if it doesn't fit.
pub fn best_score(haystack: Image, template: Image, preprocess: Preprocess) -> f32 {
	best_match(haystack, template, preprocess).map_or(0.0, |(_, _, s)| s as f32)
}

fn best_match(haystack: Image, template: Image, preprocess: Preprocess) -> Option<(u32, u32, f64)> {
	let hay = Pixels::prepare(haystack, preprocess);
	let tpl = Pixels::prepare(template, preprocess);
	let (hw, hh) = hay.dimensions();
	let (tw, th) = tpl.dimensions();
	if tw == 0 || th == 0 || tw > hw || th > hh {
		return None;
	}

	let positions = (hw - tw + 1) as u64 * (hh - th + 1) as u64;
	let factor = coarse_factor(positions * (tw * th) as u64, tw.min(th));

	let full_hay = Planes::new(&hay);
	let full_tpl = Centered::new(&tpl);

	if factor == 1 {
		return search(&full_hay, &full_tpl, 0..=hw - tw, 0..=hh - th);
	}

	let coarse_hay = Planes::new(&hay.downscaled(factor));
	let coarse_tpl = Centered::new(&tpl.downscaled(factor));
	let candidates = coarse_candidates(&coarse_hay, &coarse_tpl, COARSE_CANDIDATES);
	tracing::trace!(factor, candidates = candidates.len(), "coarse template search");

	let slack = factor * 2;
	candidates
		.into_iter()
		.filter_map(|(cx, cy)| {
			let x0 = (cx * factor).saturating_sub(slack);
			let y0 = (cy * factor).saturating_sub(slack);
			let x1 = (cx * factor + slack).min(hw - tw);
			let y1 = (cy * factor + slack).min(hh - th);
			search(&full_hay, &full_tpl, x0.min(x1)..=x1, y0.min(y1)..=y1)
		})
		.max_by(|a, b| a.2.total_cmp(&b.2))
}

fn coarse_factor(cost: u64, min_side: u32) -> u32 {
	let mut factor = 1u32;
	while cost / (factor as u64).pow(4) > COARSE_BUDGET && min_side / (factor * 2) >= COARSE_MIN_SIDE {
		factor *= 2;
	}
	factor
}

fn search(
	hay: &Planes,
	tpl: &Centered,
	xs: std::ops::RangeInclusive<u32>,
	ys: std::ops::RangeInclusive<u32>,
) -> Option<(u32, u32, f64)> {
	let mut best: Option<(u32, u32, f64)> = None;
	for y in ys {
		for x in xs.clone() {
			let score = score_at(hay, tpl, x, y);
			if best.is_none_or(|(_, _, s)| score > s) {
				best = Some((x, y, score));
			}
		}
	}
	best
}

/// Top `count` coarse positions, suppressing neighbours of a better peak.
fn coarse_candidates(hay: &Planes, tpl: &Centered, count: usize) -> Vec<(u32, u32)> {
	let mut scored = Vec::new();
	for y in 0..=hay.height - tpl.height {
		for x in 0..=hay.width - tpl.width {
			scored.push((score_at(hay, tpl, x, y), x, y));
		}
	}
	scored.sort_by(|a, b| b.0.total_cmp(&a.0));

	let radius = (tpl.width.min(tpl.height) / 2).max(1);
	let mut picked: Vec<(u32, u32)> = Vec::with_capacity(count);
	for (_, x, y) in scored {
		if picked.len() == count {
			break;
		}
		if picked.iter().all(|&(px, py)| px.abs_diff(x) > radius || py.abs_diff(y) > radius) {
			picked.push((x, y));
		}
	}
	picked
}

fn score_at(hay: &Planes, tpl: &Centered, x: u32, y: u32) -> f64 {
	let n = (tpl.width * tpl.height) as f64;
	let mut cross = 0.0;
	let mut variance = 0.0;
	for (plane, centered) in hay.planes.iter().zip(&tpl.planes) {
		let (sum, sq) = plane.window(x, y, tpl.width, tpl.height);
		variance += sq - sum * sum / n;
		for ty in 0..tpl.height {
			let row = ((y + ty) * plane.width + x) as usize;
			let trow = (ty * tpl.width) as usize;
			let hay_row = &plane.data[row..row + tpl.width as usize];
			let tpl_row = &centered[trow..trow + tpl.width as usize];
			cross += hay_row.iter().zip(tpl_row).map(|(a, b)| a * b).sum::<f64>();
		}
	}

	// Uniform window or template: correlation is undefined, treat as no match.
	if variance <= 1e-6 * n || tpl.norm_sq <= 1e-6 * n {
		return 0.0;
	}
	(cross / (variance * tpl.norm_sq).sqrt()).clamp(-1.0, 1.0)
}

// ----------

enum Pixels {
	Gray(GrayImage),
	Rgb(RgbImage),
}

impl Pixels {
	fn prepare(image: Image, preprocess: Preprocess) -> Self {
		match preprocess {
			Preprocess::Color => Self::Rgb(image.to_rgb_image()),
			Preprocess::Gray => Self::Gray(image.to_gray_image()),
			Preprocess::Binarize => Self::Gray(normalize(&image.to_gray_image())),
		}
	}

	fn dimensions(&self) -> (u32, u32) {
		match self {
			Self::Gray(v) => v.dimensions(),
			Self::Rgb(v) => v.dimensions(),
		}
	}

	fn downscaled(&self, factor: u32) -> Self {
		let (w, h) = self.dimensions();
		let (w, h) = ((w / factor).max(1), (h / factor).max(1));
		match self {
			Self::Gray(v) => Self::Gray(image::imageops::resize(v, w, h, FilterType::Triangle)),
			Self::Rgb(v) => Self::Rgb(image::imageops::resize(v, w, h, FilterType::Triangle)),
		}
	}

	fn channels(&self) -> Vec<Vec<f64>> {
		match self {
			Self::Gray(v) => vec![v.pixels().map(|p| p.0[0] as f64).collect()],
			Self::Rgb(v) => (0..3)
				.map(|c| v.pixels().map(|p| p.0[c] as f64).collect())
				.collect(),
		}
	}
}

/// One channel plus summed-area tables for O(1) window statistics.
struct Plane {
	width: u32,
	data: Vec<f64>,
	sum: Vec<f64>,
	sq: Vec<f64>,
}

impl Plane {
	fn new(width: u32, height: u32, data: Vec<f64>) -> Self {
		let stride = (width + 1) as usize;
		let mut sum = vec![0.0; stride * (height + 1) as usize];
		let mut sq = vec![0.0; stride * (height + 1) as usize];
		for y in 0..height as usize {
			let mut row_sum = 0.0;
			let mut row_sq = 0.0;
			for x in 0..width as usize {
				let v = data[y * width as usize + x];
				row_sum += v;
				row_sq += v * v;
				sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
				sq[(y + 1) * stride + x + 1] = sq[y * stride + x + 1] + row_sq;
			}
		}
		Self { width, data, sum, sq }
	}

	fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
		let stride = (self.width + 1) as usize;
		let (x0, y0, x1, y1) = (x as usize, y as usize, (x + w) as usize, (y + h) as usize);
		let at = |t: &[f64], x: usize, y: usize| t[y * stride + x];
		let sum = at(&self.sum, x1, y1) - at(&self.sum, x0, y1) - at(&self.sum, x1, y0) + at(&self.sum, x0, y0);
		let sq = at(&self.sq, x1, y1) - at(&self.sq, x0, y1) - at(&self.sq, x1, y0) + at(&self.sq, x0, y0);
		(sum, sq)
	}
}

struct Planes {
	width: u32,
	height: u32,
	planes: Vec<Plane>,
}

impl Planes {
	fn new(pixels: &Pixels) -> Self {
		let (width, height) = pixels.dimensions();
		let planes = pixels
			.channels()
			.into_iter()
			.map(|data| Plane::new(width, height, data))
			.collect();
		Self { width, height, planes }
	}
}

/// Template channels with their mean removed.
struct Centered {
	width: u32,
	height: u32,
	planes: Vec<Vec<f64>>,
	norm_sq: f64,
}

impl Centered {
	fn new(pixels: &Pixels) -> Self {
		let (width, height) = pixels.dimensions();
		let mut norm_sq = 0.0;
		let planes = pixels
			.channels()
			.into_iter()
			.map(|mut data| {
				let mean = data.iter().sum::<f64>() / data.len().max(1) as f64;
				for v in &mut data {
					*v -= mean;
					norm_sq += *v * *v;
				}
				data
			})
			.collect();
		Self {
			width,
			height,
			planes,
			norm_sq,
		}
	}
}
