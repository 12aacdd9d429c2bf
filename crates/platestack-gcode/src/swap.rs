//! Build-plate swap systems and compilation settings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GcodeError;

/// Hardware used to eject a finished plate and load the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapSystem {
    /// No swap hardware; plates are changed by hand.
    None,
    /// SwapMod / Swap-Systems plate lift.
    #[serde(rename = "swapmod")]
    SwapMod,
    /// Auto Build Plate Changer.
    #[default]
    #[serde(rename = "abpc")]
    AutoBuildPlateChanger,
    /// User-supplied sequence.
    Custom,
}

impl SwapSystem {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            SwapSystem::None => "No Swap System",
            SwapSystem::SwapMod => "SwapMod / Swap-Systems",
            SwapSystem::AutoBuildPlateChanger => "Auto Build Plate Changer",
            SwapSystem::Custom => "Custom",
        }
    }

    /// Preset swap G-code. Empty for `None` and `Custom`.
    pub fn gcode(&self) -> &'static str {
        match self {
            SwapSystem::None | SwapSystem::Custom => "",
            SwapSystem::SwapMod => {
                "G0 X-10 F5000 ; park extruder\n\
                 G0 Z175 ; move Z to the top\n\
                 G0 Y182 F10000 ; move plate to ejecting position\n\
                 G0 Z180 ; prepare the lift\n\
                 G4 P1000 ; wait\n\
                 G0 Z186 ; trigger lift\n\
                 G0 Y120 F500 ; lift the plate\n\
                 G0 Y-4 Z175 F5000 ; slide previous plate and hook new plate\n\
                 G0 Y145 ; pull and fix the new plate\n\
                 G0 Y115 F1000 ; jump over the hook\n\
                 G0 Y25 F500 ; slide down previous plate\n\
                 G0 Y85 F1000 ; gently push the old plate\n\
                 G0 Y180 F5000 ; pull the new plate\n\
                 G4 P500 ; wait\n\
                 G0 Y186.5 F200 ; fix the new plate and release previous plate\n\
                 G4 P500 ; wait\n\
                 G0 Y3 F15000 ; prepare new plate to be snapped to the heatbed\n\
                 G0 Y-5 F200 ; snap the new plate on the front side\n\
                 G4 P500 ; wait\n\
                 G0 Y10 F1000 ; snap the new plate on the back side\n\
                 G0 Y20 F15000\n\
                 G0 Z150\n\
                 G4 P1000 ; wait"
            }
            SwapSystem::AutoBuildPlateChanger => {
                "; Auto Build Plate Changer sequence\n\
                 G1 Z180 F3000\n\
                 G1 Y186 F6000\n\
                 G1 Z185 F3000\n\
                 G1 Y-4  F6000\n\
                 G1 Y186 F6000\n\
                 G1 Y-4  F6000\n\
                 G1 Y2.5 F6000\n\
                 G1 Y-4  F6000"
            }
        }
    }

    /// All selectable systems.
    pub fn all() -> [SwapSystem; 4] {
        [
            SwapSystem::None,
            SwapSystem::SwapMod,
            SwapSystem::AutoBuildPlateChanger,
            SwapSystem::Custom,
        ]
    }
}

impl FromStr for SwapSystem {
    type Err = GcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SwapSystem::None),
            "swapmod" => Ok(SwapSystem::SwapMod),
            "abpc" => Ok(SwapSystem::AutoBuildPlateChanger),
            "custom" => Ok(SwapSystem::Custom),
            _ => Err(GcodeError::UnknownSwapSystem(s.to_string())),
        }
    }
}

/// Settings read by the compiler. Passed explicitly to every compile call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationSettings {
    /// G-code inserted between physical plates; empty disables insertion.
    #[serde(default)]
    pub build_plate_swap_gcode: String,
}

impl CompilationSettings {
    /// Settings using a preset swap sequence.
    pub fn from_preset(system: SwapSystem) -> Self {
        Self {
            build_plate_swap_gcode: system.gcode().into(),
        }
    }

    /// Settings using a custom swap sequence.
    pub fn custom(gcode: impl Into<String>) -> Self {
        Self {
            build_plate_swap_gcode: gcode.into(),
        }
    }

    /// Whether a swap sequence will be inserted.
    pub fn swaps_enabled(&self) -> bool {
        !self.build_plate_swap_gcode.is_empty()
    }
}
