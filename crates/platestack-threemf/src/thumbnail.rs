//! Preview thumbnails for the 3MF package.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{Result, ThreeMfError};
use crate::placeholder::{synthesize, PlaceholderChain, PlaceholderSource};

/// Edge length of the large preview (`plate_1.png`, `top_1.png`, `pick_1.png`).
pub const LARGE_SIZE: u32 = 512;
/// Edge length of the small preview (`plate_1_small.png`).
pub const SMALL_SIZE: u32 = 128;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A raster preview.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    image: RgbaImage,
}

impl Thumbnail {
    /// Wrap an RGBA raster.
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Underlying raster.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// The large/small preview pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnails {
    /// 512x512 preview.
    pub large: Thumbnail,
    /// 128x128 preview.
    pub small: Thumbnail,
}

impl Thumbnails {
    /// Drawn placeholders at both sizes.
    pub fn placeholder() -> Self {
        Self {
            large: Thumbnail::new(synthesize(LARGE_SIZE, LARGE_SIZE)),
            small: Thumbnail::new(synthesize(SMALL_SIZE, SMALL_SIZE)),
        }
    }

    /// Whether both previews have the fixed package sizes.
    pub fn has_expected_sizes(&self) -> bool {
        (self.large.width(), self.large.height()) == (LARGE_SIZE, LARGE_SIZE)
            && (self.small.width(), self.small.height()) == (SMALL_SIZE, SMALL_SIZE)
    }

    fn from_image(image: &RgbaImage) -> Self {
        Self {
            large: Thumbnail::new(fit_to_canvas(image, LARGE_SIZE, LARGE_SIZE)),
            small: Thumbnail::new(fit_to_canvas(image, SMALL_SIZE, SMALL_SIZE)),
        }
    }
}

/// Build both previews. Never fails.
///
/// With a source image, it is flattened onto white and fitted into each
/// size. Without one, the placeholder chain supplies the image. A source
/// that cannot be decoded yields drawn placeholders.
pub fn make_thumbnails(source: Option<&[u8]>, placeholder: &PlaceholderChain) -> Thumbnails {
    match source {
        Some(bytes) => thumbnails_from_image(bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "thumbnail source unusable, using placeholder");
            Thumbnails::placeholder()
        }),
        None => match placeholder.resolve() {
            PlaceholderSource::Asset(image) => Thumbnails::from_image(&flatten_on_white(&image)),
            PlaceholderSource::Synthesized => Thumbnails::placeholder(),
        },
    }
}

/// Async variant of [`make_thumbnails`]; decoding and scaling run on the
/// blocking pool.
pub async fn make_thumbnails_async(
    source: Option<Vec<u8>>,
    placeholder: PlaceholderChain,
) -> Thumbnails {
    let task = tokio::task::spawn_blocking(move || make_thumbnails(source.as_deref(), &placeholder));
    match task.await {
        Ok(thumbnails) => thumbnails,
        Err(e) => {
            tracing::warn!(error = %e, "thumbnail task failed, using placeholder");
            Thumbnails::placeholder()
        }
    }
}

/// Decode `bytes` and build both previews from it.
pub fn thumbnails_from_image(bytes: &[u8]) -> Result<Thumbnails> {
    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ThreeMfError::EmptyImage(image.width(), image.height()));
    }
    Ok(Thumbnails::from_image(&flatten_on_white(&image)))
}

/// Composite onto an opaque white background.
fn flatten_on_white(image: &DynamicImage) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), WHITE);
    imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    canvas
}

/// Scale `image` uniformly to fit `width`x`height` and center it on white.
pub fn fit_to_canvas(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, WHITE);
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
        return canvas;
    }

    let scale = f64::min(
        f64::from(width) / f64::from(src_w),
        f64::from(height) / f64::from(src_h),
    );
    let scaled_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, width);
    let scaled_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, height);
    let scaled = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);

    let x = (width - scaled_w) / 2;
    let y = (height - scaled_h) / 2;
    imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
    canvas
}
