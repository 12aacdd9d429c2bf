//! Export filenames and human-readable formatting.

use chrono::NaiveDate;

/// Replace every character outside `[A-Za-z0-9-_]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn filename(custom_name: Option<&str>, default_stem: &str, date: NaiveDate, ext: &str) -> String {
    match custom_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("{}.{}", sanitize_name(name), ext),
        None => format!("{}_{}.{}", default_stem, date.format("%Y-%m-%d"), ext),
    }
}

/// Suggested filename for a compiled G-code export.
pub fn gcode_filename(custom_name: Option<&str>, date: NaiveDate) -> String {
    filename(custom_name, "compiled_print_job", date, "gcode")
}

/// Suggested filename for a 3MF export.
pub fn threemf_filename(custom_name: Option<&str>, date: NaiveDate) -> String {
    filename(custom_name, "print_job", date, "3mf")
}

/// Format a duration in seconds as `"{h}h {m}m"`.
pub fn format_duration(seconds: f64) -> String {
    let minutes = if seconds.is_finite() && seconds > 0.0 {
        (seconds / 60.0).round() as u64
    } else {
        0
    };
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Two-decimal weight, e.g. `12.50`.
pub fn format_grams(grams: f64) -> String {
    format!("{:.2}", if grams.is_finite() { grams } else { 0.0 })
}

/// Two-decimal cost, e.g. `3.10`.
pub fn format_cost(cost: f64) -> String {
    format!("{:.2}", if cost.is_finite() { cost } else { 0.0 })
}
