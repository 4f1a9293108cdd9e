//! Pixel buffers.
//!
//! A capture is held once as an [`OwnedImage`]; the detail panel strips,
//! icons and anchors cut from it are [`Image`] views that only copy pixels
//! when a crop is handed to OCR, saved, or converted for matching.

use std::path::Path;

use anyhow::{Context, Result};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images};
use image::{GrayImage, Luma, RgbImage};

use crate::Rect;

/// Owned RGB image; alpha is dropped on the way in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    buf: RgbImage,
}

impl OwnedImage {
    /// From tightly packed RGBA rows, `width * 4` bytes each. A trailing
    /// partial row is ignored.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width.max(1) / 4;
        let rgb = bytes
            .chunks_exact(4)
            .take(width * height)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let buf = RgbImage::from_raw(width as u32, height as u32, rgb).unwrap_or_default();
        Self { buf }
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        Self { buf: img.clone() }
    }

    /// Gray pixels repeated into all three channels.
    pub fn from_gray_as_rgb(gray: &GrayImage) -> Self {
        let buf = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            image::Rgb([v, v, v])
        });
        Self { buf }
    }

    /// Decode anything the `image` crate reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buf = image::open(path)
            .with_context(|| format!("open image {}", path.display()))?
            .into_rgb8();
        Ok(Self { buf })
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Scale to `height` rows keeping the aspect ratio (Catmull-Rom, SIMD).
    pub fn resize_h(&mut self, height: u32) -> Result<()> {
        let (w, h) = self.buf.dimensions();
        if h == height || w == 0 || h == 0 {
            return Ok(());
        }
        let height = height.max(1);
        let width = ((w as u64 * height as u64 / h as u64) as u32).max(1);

        let src = images::ImageRef::new(w, h, self.buf.as_raw(), PixelType::U8x3).context("wrap source image")?;
        let mut dst = images::Image::new(width, height, PixelType::U8x3);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Interpolation(FilterType::CatmullRom));
        Resizer::new().resize(&src, &mut dst, &options).context("resize")?;

        self.buf = RgbImage::from_raw(width, height, dst.into_vec()).context("resized buffer has the wrong size")?;
        Ok(())
    }

    pub fn as_image(&self) -> Image<'_> {
        Image {
            buf: &self.buf,
            rect: Rect::new(0, 0, self.width(), self.height()),
        }
    }

    pub fn to_gray_image(&self) -> GrayImage {
        self.as_image().to_gray_image()
    }
}

/// Borrowed rectangular view into an [`OwnedImage`].
#[derive(Clone, Copy, Debug)]
pub struct Image<'a> {
    buf: &'a RgbImage,
    /// Absolute bounds inside `buf`.
    rect: Rect,
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.rect.width()
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.rect.height()
    }

    #[inline(always)]
    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.buf.get_pixel(self.rect.left + x, self.rect.top + y).0
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| image::Rgb(self.rgb(x, y)))
    }

    pub fn to_owned_image(self) -> OwnedImage {
        OwnedImage { buf: self.to_rgb_image() }
    }

    /// Luma with integer BT.601 weights.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b] = self.rgb(x, y).map(u32::from);
            Luma([((299 * r + 587 * g + 114 * b) / 1000) as u8])
        })
    }

    /// Packed RGB bytes, row by row.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width() * self.height() * 3) as usize);
        for y in 0..self.height() {
            for x in 0..self.width() {
                bytes.extend_from_slice(&self.rgb(x, y));
            }
        }
        bytes
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.to_rgb_image().save_with_format(path, image::ImageFormat::Png)
    }

    /// The part of this view covered by `rect` (view coordinates), or `None`
    /// unless it lies fully inside.
    pub fn crop(&self, rect: Rect) -> Option<Self> {
        if rect.is_degenerate() || rect.right > self.width() || rect.bottom > self.height() {
            return None;
        }
        let (x, y) = (self.rect.left, self.rect.top);
        Some(Self {
            buf: self.buf,
            rect: Rect::new(x + rect.left, y + rect.top, x + rect.right, y + rect.bottom),
        })
    }
}
