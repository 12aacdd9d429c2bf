//! User configuration, read from a TOML file.
//!
//! ```toml
//! [gcode]
//! swap_system = "custom"
//! swap_gcode = "G1 Z180 F3000\nG1 Y186 F6000"
//!
//! [display]
//! empty_filaments = false
//!
//! [thumbnail]
//! placeholder = "assets/placeholder-512.png"
//! bundled = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use platestack_gcode::{CompilationSettings, SwapSystem};
use platestack_threemf::PlaceholderChain;
use serde::Deserialize;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "PLATESTACK_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gcode: GcodeConfig,
    pub display: DisplayConfig,
    pub thumbnail: ThumbnailConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GcodeConfig {
    pub swap_system: SwapSystem,
    /// Used when `swap_system = "custom"`.
    pub swap_gcode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show filament slots with zero usage.
    pub empty_filaments: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Default placeholder PNG.
    pub placeholder: Option<PathBuf>,
    /// Fall back to the built-in placeholder image before drawing one.
    pub bundled: bool,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            placeholder: None,
            bundled: true,
        }
    }
}

impl GcodeConfig {
    /// Compilation settings for this swap configuration.
    pub fn settings(&self) -> CompilationSettings {
        match self.swap_system {
            SwapSystem::Custom => CompilationSettings::custom(self.swap_gcode.clone().unwrap_or_default()),
            preset => CompilationSettings::from_preset(preset),
        }
    }
}

impl ThumbnailConfig {
    /// Placeholder chain for this configuration.
    pub fn placeholder_chain(&self) -> PlaceholderChain {
        let chain = match &self.placeholder {
            Some(path) => PlaceholderChain::with_asset(path),
            None => PlaceholderChain::default(),
        };
        chain.bundled(self.bundled)
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`, else from `$PLATESTACK_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.gcode.swap_system, SwapSystem::AutoBuildPlateChanger);
        assert!(config.gcode.settings().swaps_enabled());
        assert!(!config.display.empty_filaments);
    }

    #[test]
    fn test_custom_swap() {
        let config = Config::from_toml(
            r#"
            [gcode]
            swap_system = "custom"
            swap_gcode = "M400\nG28"
            "#,
        )
        .unwrap();
        assert_eq!(config.gcode.settings().build_plate_swap_gcode, "M400\nG28");
    }

    #[test]
    fn test_no_swap() {
        let config = Config::from_toml("[gcode]\nswap_system = \"none\"\n").unwrap();
        assert!(!config.gcode.settings().swaps_enabled());
    }

    #[test]
    fn test_unknown_swap_rejected() {
        assert!(Config::from_toml("[gcode]\nswap_system = \"lift\"\n").is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platestack.toml");
        std::fs::write(&path, "[display]\nempty_filaments = true\n[thumbnail]\nplaceholder = \"p.png\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.display.empty_filaments);
        assert_eq!(
            config.thumbnail.placeholder_chain().asset_path(),
            Some(Path::new("p.png"))
        );
    }

    #[test]
    fn test_placeholder_tiers() {
        let chain = Config::default().thumbnail.placeholder_chain();
        assert_eq!(chain.asset_path(), None);
        assert!(chain.uses_bundled());

        let config = Config::from_toml("[thumbnail]\nbundled = false\n").unwrap();
        assert!(!config.thumbnail.placeholder_chain().uses_bundled());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/platestack.toml"))).is_err());
    }
}
