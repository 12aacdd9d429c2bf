#![warn(missing_docs)]

//! 3MF packaging for platestack print jobs.
//!
//! This crate provides:
//! - thumbnail generation at the fixed 512x512 and 128x128 sizes
//! - placeholder images when no preview source is available
//! - 3MF (ZIP/OPC) archive assembly around compiled G-code
//! - MD5 checksums of the embedded G-code
//!
//! # Example
//!
//! ```ignore
//! use platestack_threemf::{build, make_thumbnails, PackageOptions, PlaceholderChain};
//!
//! let thumbnails = make_thumbnails(Some(&cover_png), &PlaceholderChain::default());
//! let bytes = build(&job.text, thumbnails, PackageOptions::named("Weekend batch"))?;
//! std::fs::write("weekend_batch.3mf", bytes)?;
//! ```

pub mod archive;
pub mod checksum;
pub mod error;
pub mod placeholder;
pub mod thumbnail;

pub use archive::{build, build_async, PackageOptions, ThreeMfPackage, PART_NAMES};
pub use checksum::{content_fingerprint, md5_hex};
pub use error::{Result, ThreeMfError};
pub use placeholder::{bundled_asset, synthesize, PlaceholderChain, PlaceholderSource};
pub use thumbnail::{
    make_thumbnails, make_thumbnails_async, thumbnails_from_image, Thumbnail, Thumbnails,
    LARGE_SIZE, SMALL_SIZE,
};
