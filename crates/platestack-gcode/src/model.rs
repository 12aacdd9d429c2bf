//! Plate inputs handed over by the upload/parsing collaborator.

use serde::{Deserialize, Serialize};

use crate::error::{GcodeError, Result};

/// One filament slot used by a plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilamentColor {
    /// RGBA hex color, e.g. `#FF0000FF`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Filament weight for one copy (g).
    #[serde(default)]
    pub weight_grams: f64,
    /// Filament cost for one copy.
    #[serde(default)]
    pub cost_units: f64,
    /// Material name (PLA, PETG, ...).
    #[serde(default = "default_filament_type")]
    pub filament_type: String,
}

fn default_color() -> String {
    "#FFFFFF".into()
}

fn default_filament_type() -> String {
    "Unknown".into()
}

impl FilamentColor {
    /// Create a filament slot entry.
    pub fn new(color: impl Into<String>, weight_grams: f64, cost_units: f64, filament_type: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            weight_grams,
            cost_units,
            filament_type: filament_type.into(),
        }
    }
}

/// Metadata extracted from a sliced plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateMetadata {
    /// Display name of the plate.
    pub plate_name: String,
    /// Printer model the plate was sliced for.
    #[serde(default)]
    pub printer_model: Option<String>,
    /// Slicer estimate for one copy (s).
    #[serde(default)]
    pub estimated_time_seconds: f64,
    /// Filament slots in slicer order.
    #[serde(default)]
    pub colors: Vec<FilamentColor>,
}

impl PlateMetadata {
    /// Metadata with only a name; everything else empty.
    pub fn named(plate_name: impl Into<String>) -> Self {
        Self {
            plate_name: plate_name.into(),
            printer_model: None,
            estimated_time_seconds: 0.0,
            colors: Vec::new(),
        }
    }

    /// Printer model, or `None` when missing or blank.
    pub fn printer_model(&self) -> Option<&str> {
        self.printer_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// A sliced plate plus the number of physical copies to print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintableFile {
    /// Raw G-code body.
    pub content: String,
    /// Plate metadata.
    pub metadata: PlateMetadata,
    /// Number of physical copies.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl PrintableFile {
    /// Create a plate, rejecting zero quantities and invalid times.
    pub fn new(content: impl Into<String>, metadata: PlateMetadata, quantity: u32) -> Result<Self> {
        let file = Self {
            content: content.into(),
            metadata,
            quantity,
        };
        file.validate()?;
        Ok(file)
    }

    /// Check the plate invariants.
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(GcodeError::ZeroQuantity(self.metadata.plate_name.clone()));
        }
        let seconds = self.metadata.estimated_time_seconds;
        if seconds.is_nan() || seconds < 0.0 {
            return Err(GcodeError::InvalidTime {
                plate: self.metadata.plate_name.clone(),
                seconds,
            });
        }
        Ok(())
    }

    /// Estimated time for one copy, with malformed values read as zero.
    pub fn estimated_time_seconds(&self) -> f64 {
        sanitize(self.metadata.estimated_time_seconds)
    }
}

/// Malformed numbers (NaN, infinite, negative) count as zero.
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
