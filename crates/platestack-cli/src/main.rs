//! platestack CLI - stack sliced plates into one print job
//!
//! Compiles the plates listed in a job manifest into a single G-code file
//! with build-plate swaps between them, or packages the result as a 3MF.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use platestack_gcode::{
    aggregate, compile, format_cost, format_duration, format_grams, gcode_filename, printer_models,
    threemf_filename, total_cost, CompilationSettings, CompiledJob, PrintableFile, SwapSystem,
};
use platestack_threemf::{build_async, PackageOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod manifest;

use config::Config;
use manifest::Manifest;

#[derive(Parser)]
#[command(name = "platestack")]
#[command(about = "Stack sliced plates into one print job with build-plate swaps", long_about = None)]
struct Cli {
    /// Config file (default: $PLATESTACK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the plates of a manifest into one G-code file
    Compile {
        /// Job manifest (.toml)
        manifest: PathBuf,
        /// Output file (default: derived from the job name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Job name, overrides the manifest
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        swap: SwapArgs,
    },
    /// Compile and package the plates of a manifest as a 3MF
    Package {
        /// Job manifest (.toml)
        manifest: PathBuf,
        /// Output file (default: derived from the job name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Job name, overrides the manifest
        #[arg(short, long)]
        name: Option<String>,
        /// Preview image for the package
        #[arg(short, long)]
        thumbnail: Option<PathBuf>,
        #[command(flatten)]
        swap: SwapArgs,
    },
    /// Print time, plate count and filament usage for a manifest
    Summary {
        /// Job manifest (.toml)
        manifest: PathBuf,
        /// Include filament slots with zero usage
        #[arg(long)]
        all_slots: bool,
    },
}

#[derive(Args, Default)]
struct SwapArgs {
    /// Swap system preset: none, swapmod, abpc, custom
    #[arg(long)]
    swap: Option<SwapSystem>,
    /// File holding a custom swap sequence
    #[arg(long, conflicts_with = "swap")]
    swap_file: Option<PathBuf>,
}

impl SwapArgs {
    /// Flags win over the config file.
    fn settings(&self, config: &Config) -> Result<CompilationSettings> {
        if let Some(path) = &self.swap_file {
            let gcode = std::fs::read_to_string(path)
                .with_context(|| format!("reading swap sequence {}", path.display()))?;
            return Ok(CompilationSettings::custom(gcode));
        }
        match self.swap {
            Some(SwapSystem::Custom) => match &config.gcode.swap_gcode {
                Some(gcode) => Ok(CompilationSettings::custom(gcode.clone())),
                None => bail!(
                    "--swap custom needs [gcode] swap_gcode in the config; pass --swap-file instead"
                ),
            },
            Some(preset) => Ok(CompilationSettings::from_preset(preset)),
            None => Ok(config.gcode.settings()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile {
            manifest,
            output,
            name,
            swap,
        } => {
            let settings = swap.settings(&config)?;
            let path = compile_job(&manifest, output, name, &settings)?;
            println!("Wrote G-code to {}", path.display());
        }
        Commands::Package {
            manifest,
            output,
            name,
            thumbnail,
            swap,
        } => {
            let settings = swap.settings(&config)?;
            let path = package_job(&manifest, output, name, thumbnail, &settings, &config).await?;
            println!("Wrote 3MF to {}", path.display());
        }
        Commands::Summary {
            manifest,
            all_slots,
        } => {
            let (_, files) = load_job(&manifest)?;
            print!("{}", summary(&files, all_slots || config.display.empty_filaments));
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_job(manifest_path: &Path) -> Result<(Manifest, Vec<PrintableFile>)> {
    let manifest = Manifest::load(manifest_path)?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let files = manifest
        .read_plates(base_dir)
        .with_context(|| format!("loading plates of {}", manifest_path.display()))?;
    Ok((manifest, files))
}

fn compile_manifest(
    manifest_path: &Path,
    name: Option<String>,
    settings: &CompilationSettings,
) -> Result<(Option<String>, CompiledJob)> {
    let (manifest, files) = load_job(manifest_path)?;
    if files.is_empty() {
        tracing::warn!(manifest = %manifest_path.display(), "manifest lists no plates");
    }
    let job = compile(&files, settings);
    Ok((name.or(manifest.name), job))
}

fn compile_job(
    manifest_path: &Path,
    output: Option<PathBuf>,
    name: Option<String>,
    settings: &CompilationSettings,
) -> Result<PathBuf> {
    let (name, job) = compile_manifest(manifest_path, name, settings)?;
    let output = output.unwrap_or_else(|| {
        PathBuf::from(gcode_filename(name.as_deref(), chrono::Utc::now().date_naive()))
    });
    std::fs::write(&output, &job.text).with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

async fn package_job(
    manifest_path: &Path,
    output: Option<PathBuf>,
    name: Option<String>,
    thumbnail: Option<PathBuf>,
    settings: &CompilationSettings,
    config: &Config,
) -> Result<PathBuf> {
    let (name, job) = compile_manifest(manifest_path, name, settings)?;

    // An unreadable preview degrades to the placeholder like an undecodable one.
    let source = thumbnail.and_then(|path| match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read thumbnail");
            None
        }
    });

    let options = PackageOptions {
        custom_name: name.clone(),
    };
    let bytes = build_async(job.text, source, config.thumbnail.placeholder_chain(), options)
        .await
        .context("building 3MF package")?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(threemf_filename(name.as_deref(), chrono::Utc::now().date_naive()))
    });
    std::fs::write(&output, bytes).with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

fn summary(files: &[PrintableFile], include_empty_slots: bool) -> String {
    let plates: u64 = files.iter().map(|f| u64::from(f.quantity)).sum();
    let seconds: f64 = platestack_gcode::total_time_seconds(files);
    let usage = aggregate(files, include_empty_slots);

    let mut out = String::new();
    out.push_str(&format!("Plates: {} ({} files)\n", plates, files.len()));
    let models = printer_models(files);
    if !models.is_empty() {
        out.push_str(&format!("Printer model(s): {}\n", models.join(", ")));
    }
    out.push_str(&format!("Total print time: {}\n", format_duration(seconds)));
    if usage.is_empty() {
        out.push_str("No filament usage\n");
    }
    for slot in &usage {
        out.push_str(&format!(
            "Slot {}: {} {} {} g, cost {}\n",
            slot.slot,
            slot.color,
            slot.filament_type,
            format_grams(slot.weight_grams),
            format_cost(slot.cost_units)
        ));
    }
    out.push_str(&format!("Total cost: {}\n", format_cost(total_cost(&usage))));
    out
}
