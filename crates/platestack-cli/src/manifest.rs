//! Job manifests: which plates to print, how often, and their metadata.
//!
//! ```toml
//! name = "Weekend batch"
//!
//! [[plate]]
//! path = "bracket.gcode"
//! quantity = 2
//! printer_model = "Bambu Lab P1S"
//! estimated_time_seconds = 2700
//!
//! [[plate.colors]]
//! color = "#FF0000FF"
//! weight_grams = 12.5
//! cost_units = 0.31
//! filament_type = "PLA"
//! ```

use std::path::{Path, PathBuf};

use platestack_gcode::{FilamentColor, GcodeError, PlateMetadata, PrintableFile};
use serde::Deserialize;
use thiserror::Error;

/// Errors from reading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Plate(#[from] GcodeError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Job name, used for output filenames and the 3MF plate name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "plate")]
    pub plates: Vec<PlateEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlateEntry {
    /// G-code file, relative to the manifest.
    pub path: PathBuf,
    /// Display name; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub printer_model: Option<String>,
    #[serde(default)]
    pub estimated_time_seconds: f64,
    #[serde(default)]
    pub colors: Vec<FilamentColor>,
}

fn one() -> u32 {
    1
}

impl PlateEntry {
    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Read every plate's G-code, resolving relative paths against `base_dir`.
    pub fn read_plates(&self, base_dir: &Path) -> Result<Vec<PrintableFile>, ManifestError> {
        self.plates
            .iter()
            .map(|entry| {
                let path = base_dir.join(&entry.path);
                let content = std::fs::read_to_string(&path)
                    .map_err(|source| ManifestError::Read { path: path.clone(), source })?;
                let metadata = PlateMetadata {
                    plate_name: entry.display_name(),
                    printer_model: entry.printer_model.clone(),
                    estimated_time_seconds: entry.estimated_time_seconds,
                    colors: entry.colors.clone(),
                };
                tracing::debug!(path = %path.display(), quantity = entry.quantity, "read plate");
                Ok(PrintableFile::new(content, metadata, entry.quantity)?)
            })
            .collect()
    }
}
