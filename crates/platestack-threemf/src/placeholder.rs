//! Placeholder images used when no thumbnail source is available.
//!
//! Tiers, tried in order:
//! 1. a configured asset (a PNG on disk),
//! 2. the default asset bundled into the crate,
//! 3. a procedurally drawn image (gradient, grid, "No Image" caption).
//!
//! The last tier is pure pixel arithmetic and cannot fail.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::{Result, ThreeMfError};

const GRADIENT_START: [u8; 3] = [0x4f, 0x46, 0xe5];
const GRADIENT_END: [u8; 3] = [0x7c, 0x3a, 0xed];
const GRID_SPACING: u32 = 20;
const GRID_ALPHA: f32 = 0.1;
const CAPTION: &str = "No Image";

/// Default placeholder shipped with the crate.
pub const BUNDLED_PLACEHOLDER: &[u8] = include_bytes!("../assets/placeholder-512.png");

/// Where a placeholder came from.
#[derive(Debug, Clone)]
pub enum PlaceholderSource {
    /// Decoded asset, configured or bundled.
    Asset(DynamicImage),
    /// Draw the placeholder at each target size.
    Synthesized,
}

/// Fallback chain for the default placeholder.
#[derive(Debug, Clone)]
pub struct PlaceholderChain {
    asset: Option<PathBuf>,
    bundled: bool,
}

impl Default for PlaceholderChain {
    /// Bundled asset, then synthesis.
    fn default() -> Self {
        Self {
            asset: None,
            bundled: true,
        }
    }
}

impl PlaceholderChain {
    /// Chain that goes straight to synthesis.
    pub fn synthesized_only() -> Self {
        Self {
            asset: None,
            bundled: false,
        }
    }

    /// Chain that tries `path`, then the bundled asset, before synthesizing.
    pub fn with_asset(path: impl Into<PathBuf>) -> Self {
        Self {
            asset: Some(path.into()),
            bundled: true,
        }
    }

    /// Enable or skip the bundled tier.
    pub fn bundled(mut self, bundled: bool) -> Self {
        self.bundled = bundled;
        self
    }

    /// Configured asset path, if any.
    pub fn asset_path(&self) -> Option<&Path> {
        self.asset.as_deref()
    }

    /// Whether the bundled tier is tried.
    pub fn uses_bundled(&self) -> bool {
        self.bundled
    }

    /// First tier: load and decode the configured asset.
    pub fn load_asset(&self) -> Result<DynamicImage> {
        let path = self.asset.as_deref().ok_or_else(|| {
            ThreeMfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no placeholder asset configured",
            ))
        })?;
        decode(&std::fs::read(path)?)
    }

    /// Walk the chain and return the first tier that produces an image.
    pub fn resolve(&self) -> PlaceholderSource {
        if let Some(path) = &self.asset {
            match self.load_asset() {
                Ok(image) => return PlaceholderSource::Asset(image),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "placeholder asset unavailable")
                }
            }
        }
        if self.bundled {
            match bundled_asset() {
                Ok(image) => return PlaceholderSource::Asset(image),
                Err(e) => tracing::warn!(error = %e, "bundled placeholder unusable"),
            }
        }
        PlaceholderSource::Synthesized
    }
}

/// Second tier: decode the bundled asset.
pub fn bundled_asset() -> Result<DynamicImage> {
    decode(BUNDLED_PLACEHOLDER)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ThreeMfError::EmptyImage(image.width(), image.height()));
    }
    Ok(image)
}

/// Draw a `width`x`height` placeholder.
pub fn synthesize(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_fn(width, height, |x, y| gradient_at(x, y, width, height));

    for x in (0..width).step_by(GRID_SPACING as usize) {
        for lx in x.saturating_sub(1)..(x + 1).min(width) {
            for y in 0..height {
                blend(&mut img, lx, y, [255, 255, 255], GRID_ALPHA);
            }
        }
    }
    for y in (0..height).step_by(GRID_SPACING as usize) {
        for ly in y.saturating_sub(1)..(y + 1).min(height) {
            for x in 0..width {
                blend(&mut img, x, ly, [255, 255, 255], GRID_ALPHA);
            }
        }
    }

    draw_caption(&mut img, CAPTION);
    img
}

/// Linear gradient along the top-left to bottom-right diagonal.
fn gradient_at(x: u32, y: u32, width: u32, height: u32) -> Rgba<u8> {
    let (w, h) = (width as f32, height as f32);
    let denom = (w * w + h * h).max(1.0);
    let t = ((x as f32 * w + y as f32 * h) / denom).clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgba([
        mix(GRADIENT_START[0], GRADIENT_END[0]),
        mix(GRADIENT_START[1], GRADIENT_END[1]),
        mix(GRADIENT_START[2], GRADIENT_END[2]),
        255,
    ])
}

fn blend(img: &mut RgbaImage, x: u32, y: u32, color: [u8; 3], alpha: f32) {
    let px = img.get_pixel_mut(x, y);
    for c in 0..3 {
        let under = px.0[c] as f32;
        px.0[c] = (under + (color[c] as f32 - under) * alpha).round() as u8;
    }
}

/// 5x7 bitmap glyphs, one byte per row, low 5 bits used (bit 4 = leftmost).
fn glyph(c: char) -> [u8; 7] {
    match c {
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'o' => [0b00000, 0b00000, 0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'm' => [0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10001, 0b10001],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'g' => [0b00000, 0b01111, 0b10001, 0b10001, 0b01111, 0b00001, 0b01110],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        _ => [0; 7],
    }
}

/// Centered caption, about a tenth of the image height, with a soft shadow.
fn draw_caption(img: &mut RgbaImage, text: &str) {
    let scale = (img.height() / 10 / 7).max(1);
    let advance = 6 * scale;
    let text_w = advance * text.chars().count() as u32 - scale;
    let text_h = 7 * scale;
    let x0 = img.width().saturating_sub(text_w) / 2;
    let y0 = img.height().saturating_sub(text_h) / 2;

    for (offset, alpha) in [(2, 0.8), (0, 1.0)] {
        for (i, c) in text.chars().enumerate() {
            let gx = x0 + i as u32 * advance + offset;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..5u32 {
                    if bits & (0b10000 >> col) == 0 {
                        continue;
                    }
                    let px = gx + col * scale;
                    let py = y0 + row as u32 * scale + offset;
                    fill_rect(img, px, py, scale, alpha);
                }
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, size: u32, alpha: f32) {
    for yy in y..(y + size).min(img.height()) {
        for xx in x..(x + size).min(img.width()) {
            blend(img, xx, yy, [255, 255, 255], alpha);
        }
    }
}
