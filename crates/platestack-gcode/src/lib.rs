#![warn(missing_docs)]

//! Plate G-code compilation for platestack.
//!
//! This crate turns an ordered list of sliced plates into a single print job:
//! - per-copy duplication of each plate
//! - build-plate swap sequences between consecutive physical plates
//! - print time and filament usage totals
//! - suggested export filenames
//!
//! # Example
//!
//! ```ignore
//! use platestack_gcode::{compile, CompilationSettings, SwapSystem};
//!
//! let settings = CompilationSettings::from_preset(SwapSystem::AutoBuildPlateChanger);
//! let job = compile(&files, &settings);
//!
//! println!("Plates: {}, swaps: {}", job.physical_plates, job.swap_count);
//! std::fs::write("job.gcode", &job.text)?;
//! ```

pub mod compile;
pub mod error;
pub mod export;
pub mod filament;
pub mod model;
pub mod swap;

pub use compile::{compile, compile_at, printer_models, total_time_seconds, CompiledJob};
pub use error::{GcodeError, Result};
pub use export::{
    format_cost, format_duration, format_grams, gcode_filename, sanitize_name, threemf_filename,
};
pub use filament::{aggregate, total_cost, FilamentUsage};
pub use model::{FilamentColor, PlateMetadata, PrintableFile};
pub use swap::{CompilationSettings, SwapSystem};
