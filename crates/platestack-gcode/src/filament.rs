//! Filament usage per slot across a job.

use serde::{Deserialize, Serialize};

use crate::model::{sanitize, PrintableFile};

/// Aggregated usage for one filament slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilamentUsage {
    /// 1-based slot index.
    pub slot: usize,
    /// Display color, taken from the first plate using the slot.
    pub color: String,
    /// Total weight over all copies (g).
    pub weight_grams: f64,
    /// Total cost over all copies.
    pub cost_units: f64,
    /// Material, taken from the first plate using the slot.
    pub filament_type: String,
}

impl FilamentUsage {
    /// Text color readable on top of [`FilamentUsage::color`].
    pub fn text_color(&self) -> &'static str {
        match parse_rgb(&self.color) {
            Some((r, g, b)) if brightness(r, g, b) < 128.0 => "#FFFFFF",
            _ => "#000000",
        }
    }
}

/// Sum filament usage per slot index.
///
/// Slots are keyed by their position in each plate's color list, never by
/// color value: two plates using the same red in slots 1 and 2 produce two
/// buckets. Each plate contributes `quantity` times its per-copy usage.
/// With `include_empty_slots == false`, zero-weight buckets are dropped.
pub fn aggregate(files: &[PrintableFile], include_empty_slots: bool) -> Vec<FilamentUsage> {
    // A plate introduces slots 0..n in order, so first-seen order is index order.
    let mut buckets: Vec<FilamentUsage> = Vec::new();

    for file in files {
        let copies = f64::from(file.quantity);
        for (index, color) in file.metadata.colors.iter().enumerate() {
            if index == buckets.len() {
                buckets.push(FilamentUsage {
                    slot: index + 1,
                    color: color.color.clone(),
                    weight_grams: 0.0,
                    cost_units: 0.0,
                    filament_type: color.filament_type.clone(),
                });
            }
            let bucket = &mut buckets[index];
            bucket.weight_grams += sanitize(color.weight_grams) * copies;
            bucket.cost_units += sanitize(color.cost_units) * copies;
        }
    }

    if !include_empty_slots {
        buckets.retain(|b| b.weight_grams > 0.0);
    }
    buckets
}

/// Total cost of the given buckets.
pub fn total_cost(usage: &[FilamentUsage]) -> f64 {
    usage.iter().map(|u| sanitize(u.cost_units)).sum()
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (alpha ignored).
fn parse_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Some((r * 17, g * 17, b * 17))
        }
        6 | 8 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}

fn brightness(r: u8, g: u8, b: u8) -> f64 {
    (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0
}
