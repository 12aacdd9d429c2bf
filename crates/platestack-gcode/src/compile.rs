//! Concatenation of plates into one print job.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::export::format_duration;
use crate::model::PrintableFile;
use crate::swap::CompilationSettings;

/// Output of [`compile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledJob {
    /// Full G-code text.
    pub text: String,
    /// Sum of `estimated_time_seconds * quantity` over all plates (s).
    pub total_estimated_time_seconds: f64,
    /// Number of physical plates printed.
    pub physical_plates: u32,
    /// Number of swap sequences inserted.
    pub swap_count: usize,
}

/// One physical plate in print order.
#[derive(Debug, Clone, Copy)]
struct PlateCopy<'a> {
    file: &'a PrintableFile,
    /// 0-based copy index within `file`.
    copy: u32,
}

/// Flatten `(file, copy)` pairs into print order.
fn plate_sequence(files: &[PrintableFile]) -> Vec<PlateCopy<'_>> {
    files
        .iter()
        .flat_map(|file| (0..file.quantity).map(move |copy| PlateCopy { file, copy }))
        .collect()
}

/// Compile plates into a single job, stamped with the current time.
pub fn compile(files: &[PrintableFile], settings: &CompilationSettings) -> CompiledJob {
    compile_at(files, settings, Utc::now())
}

/// Compile plates into a single job with an explicit generation timestamp.
///
/// Each plate is emitted `quantity` times in input order. The swap sequence
/// goes after every physical plate except the last one of the whole job.
pub fn compile_at(
    files: &[PrintableFile],
    settings: &CompilationSettings,
    generated_at: DateTime<Utc>,
) -> CompiledJob {
    let plates = plate_sequence(files);
    let mut text = String::with_capacity(
        files
            .iter()
            .map(|f| f.content.len() * f.quantity as usize)
            .sum::<usize>()
            + 256,
    );

    write_header(&mut text, files, generated_at);

    let mut swap_count = 0;
    for (index, plate) in plates.iter().enumerate() {
        write_plate(&mut text, plate);

        let is_last = index + 1 == plates.len();
        if settings.swaps_enabled() && !is_last {
            text.push_str("\n; Build Plate Swap\n");
            text.push_str(&settings.build_plate_swap_gcode);
            text.push('\n');
            swap_count += 1;
        }
    }

    let job = CompiledJob {
        text,
        total_estimated_time_seconds: total_time_seconds(files),
        physical_plates: plates.len() as u32,
        swap_count,
    };
    tracing::debug!(
        files = files.len(),
        plates = job.physical_plates,
        swaps = job.swap_count,
        bytes = job.text.len(),
        "compiled print job"
    );
    job
}

fn write_header(out: &mut String, files: &[PrintableFile], generated_at: DateTime<Utc>) {
    out.push_str("; Compiled GCode File\n");
    let _ = writeln!(out, "; Total Files: {}", files.len());

    let models = printer_models(files);
    if !models.is_empty() {
        let _ = writeln!(out, "; Printer Model(s): {}", models.join(", "));
    }

    let _ = writeln!(
        out,
        "; Generated: {}\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
}

fn write_plate(out: &mut String, plate: &PlateCopy<'_>) {
    let meta = &plate.file.metadata;
    let _ = writeln!(
        out,
        "\n; Start of {} (Copy {}/{})",
        meta.plate_name,
        plate.copy + 1,
        plate.file.quantity
    );
    let _ = writeln!(out, "; Original File: {}", meta.plate_name);
    let _ = writeln!(out, "; Printer Model: {}", meta.printer_model().unwrap_or("Unknown"));
    let _ = writeln!(
        out,
        "; Estimated Time: {}",
        format_duration(plate.file.estimated_time_seconds())
    );
    out.push_str(&plate.file.content);
    let _ = writeln!(out, "\n; End of {}", meta.plate_name);
}

/// Distinct printer models in order of first appearance, blanks removed.
pub fn printer_models(files: &[PrintableFile]) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for model in files.iter().filter_map(|f| f.metadata.printer_model()) {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models
}

/// Sum of `estimated_time_seconds * quantity` over all plates (s).
pub fn total_time_seconds(files: &[PrintableFile]) -> f64 {
    files
        .iter()
        .map(|f| f.estimated_time_seconds() * f64::from(f.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlateMetadata;
    use crate::swap::SwapSystem;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn plate(name: &str, seconds: f64, quantity: u32) -> PrintableFile {
        let mut metadata = PlateMetadata::named(name);
        metadata.estimated_time_seconds = seconds;
        PrintableFile::new(format!("; body of {name}\nG28\n"), metadata, quantity).unwrap()
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_single_plate_two_copies() {
        let files = vec![plate("Plate A", 600.0, 2)];
        let job = compile(&files, &CompilationSettings::custom("SWAP"));

        assert_eq!(job.text.matches("; Start of Plate A").count(), 2);
        assert_eq!(job.text.matches("; End of Plate A").count(), 2);
        assert!(job.text.contains("; Start of Plate A (Copy 1/2)"));
        assert!(job.text.contains("; Start of Plate A (Copy 2/2)"));
        assert_eq!(job.text.matches("SWAP").count(), 1);
        assert_relative_eq!(job.total_estimated_time_seconds, 1200.0);
        assert_eq!(job.swap_count, 1);
        assert_eq!(job.physical_plates, 2);

        // The swap sits between the two copies.
        let first_end = job.text.find("; End of Plate A").unwrap();
        let swap = job.text.find("SWAP").unwrap();
        let second_start = job.text.find("; Start of Plate A (Copy 2/2)").unwrap();
        assert!(first_end < swap && swap < second_start);
    }

    #[test]
    fn test_empty_input_is_header_only() {
        let job = compile_at(&[], &CompilationSettings::custom("SWAP"), fixed_clock());
        assert_eq!(
            job.text,
            "; Compiled GCode File\n; Total Files: 0\n; Generated: 2024-05-01T12:30:00.000Z\n\n"
        );
        assert_eq!(job.total_estimated_time_seconds, 0.0);
        assert_eq!(job.swap_count, 0);
        assert_eq!(job.physical_plates, 0);
    }

    #[test]
    fn test_swap_count_is_plates_minus_one() {
        let files = vec![plate("A", 10.0, 3), plate("B", 20.0, 1), plate("C", 30.0, 2)];
        let job = compile(&files, &CompilationSettings::from_preset(SwapSystem::AutoBuildPlateChanger));
        assert_eq!(job.swap_count, 5);
        assert_eq!(job.text.matches("; Build Plate Swap").count(), 5);
        assert!(job.text.trim_end().ends_with("; End of C"));
    }

    #[test]
    fn test_no_swaps_when_disabled() {
        let files = vec![plate("A", 10.0, 3), plate("B", 20.0, 2)];
        let job = compile(&files, &CompilationSettings::default());
        assert_eq!(job.swap_count, 0);
        assert!(!job.text.contains("; Build Plate Swap"));
        assert_eq!(job.physical_plates, 5);
    }

    #[test]
    fn test_single_plate_never_swaps() {
        let job = compile(&[plate("A", 10.0, 1)], &CompilationSettings::custom("SWAP"));
        assert_eq!(job.swap_count, 0);
        assert!(!job.text.contains("SWAP"));
    }

    #[test]
    fn test_last_copy_of_earlier_file_still_swaps() {
        let files = vec![plate("A", 10.0, 1), plate("B", 10.0, 1)];
        let job = compile(&files, &CompilationSettings::custom("SWAP"));
        let end_a = job.text.find("; End of A").unwrap();
        let start_b = job.text.find("; Start of B").unwrap();
        assert_eq!(job.text[end_a..start_b].matches("SWAP").count(), 1);
    }

    #[test]
    fn test_time_independent_of_settings() {
        let files = vec![plate("A", 90.0, 4), plate("B", 15.5, 2)];
        let with_swap = compile(&files, &CompilationSettings::custom("SWAP"));
        let without = compile(&files, &CompilationSettings::default());
        assert_relative_eq!(with_swap.total_estimated_time_seconds, 391.0);
        assert_relative_eq!(without.total_estimated_time_seconds, 391.0);
        assert_relative_eq!(total_time_seconds(&files), 391.0);
    }

    #[test]
    fn test_deterministic_with_fixed_clock() {
        let files = vec![plate("A", 10.0, 2), plate("B", 20.0, 1)];
        let settings = CompilationSettings::custom("M400");
        let first = compile_at(&files, &settings, fixed_clock());
        let second = compile_at(&files, &settings, fixed_clock());
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_verbatim_and_copy_headers() {
        let mut metadata = PlateMetadata::named("Bracket");
        metadata.printer_model = Some("Bambu Lab P1S".into());
        metadata.estimated_time_seconds = 5_400.0;
        let body = "G1 X10 Y10 ; keep ; this\r\nM400";
        let files = vec![PrintableFile::new(body, metadata, 1).unwrap()];
        let job = compile_at(&files, &CompilationSettings::default(), fixed_clock());

        assert!(job.text.contains(body));
        assert!(job.text.contains("; Printer Model(s): Bambu Lab P1S\n"));
        assert!(job.text.contains("; Printer Model: Bambu Lab P1S\n"));
        assert!(job.text.contains("; Estimated Time: 1h 30m\n"));
    }

    #[test]
    fn test_printer_models_distinct_ordered() {
        let mut files = vec![plate("A", 0.0, 1), plate("B", 0.0, 1), plate("C", 0.0, 1), plate("D", 0.0, 1)];
        files[0].metadata.printer_model = Some("P1S".into());
        files[1].metadata.printer_model = Some("".into());
        files[2].metadata.printer_model = Some("A1".into());
        files[3].metadata.printer_model = Some("P1S".into());
        assert_eq!(printer_models(&files), vec!["P1S".to_string(), "A1".to_string()]);

        let job = compile(&files, &CompilationSettings::default());
        assert!(job.text.contains("; Printer Model(s): P1S, A1\n"));
        assert!(job.text.contains("; Printer Model: Unknown\n"));
    }

    #[test]
    fn test_inputs_untouched() {
        let files = vec![plate("A", 10.0, 2)];
        let before = files.clone();
        let _ = compile(&files, &CompilationSettings::custom("SWAP"));
        assert_eq!(files, before);
    }
}
