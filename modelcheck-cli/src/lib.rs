//! modelcheck CLI Library
//!
//! Command line driver: selects a target and a set of recipes, runs each recipe
//! through the harness, and stops at the first failure.
//! Use `modelcheck::run()` (or `modelcheck_cli::run()`) in your main function.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     modelcheck_cli::run()
//! }
//! ```

mod config;
mod harness;
mod planner;
mod runner;
mod target;

pub use config::*;
pub use harness::{
    Harness, HarnessError, HarnessSettings, PlanRun, RecipeOutcome, build_report_meta,
    execute_recipe, failed_result, format_failure, format_pass_line, format_recipe_list,
    format_summary, passed_result,
};
pub use planner::{ALL_RECIPES, ExecutionPlan, build_plan};
pub use runner::{
    Adb, DeviceBridgeRunner, DeviceEntry, InterpreterRunner, LocalBenchmarkRunner,
    parse_device_list, probe_device, select_device,
};
pub use target::TargetSelector;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use modelcheck_core::RecipeRegistry;
use modelcheck_logic::Tolerance;
use modelcheck_report::{OutputFormat, RunReport, generate_json_report};
use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use std::path::{Path, PathBuf};

/// modelcheck CLI arguments
#[derive(Parser, Debug)]
#[command(name = "modelcheck")]
#[command(
    author,
    version,
    about = "modelcheck - compare inference outputs of a target backend against the host reference"
)]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Recipe to run, or "all"
    #[arg(long, global = true, default_value = ALL_RECIPES)]
    pub model: String,

    /// Backend compared against the host reference
    #[arg(long, global = true, value_enum, default_value_t = TargetSelector::ReferenceAccelerator)]
    pub target: TargetSelector,

    /// Only run recipes whose name matches this regex
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Relative tolerance (overrides modelcheck.toml)
    #[arg(long, global = true)]
    pub rtol: Option<f64>,

    /// Absolute tolerance (overrides modelcheck.toml)
    #[arg(long, global = true)]
    pub atol: Option<f64>,

    /// Target run + compare rounds per recipe
    #[arg(long, global = true)]
    pub iteration: Option<u32>,

    /// Directory holding the compiled models
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Output format: human, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Write the JSON run report to this file
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Write the JSON run report into the configured output directory
    #[arg(long, global = true)]
    pub save_report: bool,

    /// Seed for input generation
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Configuration file (default: discover modelcheck.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run recipes (default)
    Run,
    /// List registered recipes
    List,
    /// Print a default modelcheck.toml
    Init,
}

/// Run the modelcheck CLI with the process arguments over every recipe
/// submitted to `inventory`.
///
/// # Returns
/// Returns `Ok(())` when every selected recipe passed.
pub fn run() -> anyhow::Result<()> {
    run_with_registry(RecipeRegistry::from_inventory())
}

/// Run the modelcheck CLI with the process arguments over an explicit catalog
pub fn run_with_registry(registry: RecipeRegistry) -> anyhow::Result<()> {
    run_with_cli(Cli::parse(), registry)
}

/// Run the modelcheck CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli, registry: RecipeRegistry) -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries results only
    let filter = if cli.verbose {
        "modelcheck=debug"
    } else {
        "modelcheck=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = match &cli.config {
        Some(path) => ModelCheckConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?,
        None => ModelCheckConfig::discover().unwrap_or_default(),
    };

    let filter_re = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid --filter: {}", e))?;

    match cli.command {
        Some(Commands::Init) => {
            print!("{}", ModelCheckConfig::default_toml());
        }
        Some(Commands::List) => {
            list_recipes(registry, filter_re.as_ref());
        }
        Some(Commands::Run) | None => {
            run_recipes(&cli, &config, &registry, filter_re.as_ref())?;
        }
    }

    Ok(())
}

fn list_recipes(registry: RecipeRegistry, filter: Option<&Regex>) {
    let registry = match filter {
        Some(re) => RecipeRegistry::from_defs(registry.iter().filter(|d| re.is_match(d.name))),
        None => registry,
    };
    print!("{}", format_recipe_list(&registry));
}

/// Layer CLI overrides on top of modelcheck.toml
fn build_settings(cli: &Cli, config: &ModelCheckConfig) -> HarnessSettings {
    let defaults = HarnessSettings::from_config(config);
    HarnessSettings {
        models_dir: cli.models_dir.clone().unwrap_or(defaults.models_dir),
        tolerance: Tolerance::new(
            cli.rtol.unwrap_or(defaults.tolerance.rtol),
            cli.atol.unwrap_or(defaults.tolerance.atol),
        ),
        iteration: cli.iteration.unwrap_or(defaults.iteration),
    }
}

fn run_recipes(
    cli: &Cli,
    config: &ModelCheckConfig,
    registry: &RecipeRegistry,
    filter: Option<&Regex>,
) -> anyhow::Result<()> {
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let settings = build_settings(cli, config);

    let plan = build_plan(registry, &cli.model, filter)?;
    if plan.recipes.is_empty() {
        println!("No recipes found.");
        return Ok(());
    }

    let serial_override = std::env::var(&config.device.serial_env)
        .ok()
        .filter(|s| !s.is_empty());
    let meta = build_report_meta(cli.target, &settings, cli.seed);

    let mut harness = match Harness::new(
        cli.target,
        config,
        settings,
        serial_override.as_deref(),
    ) {
        Ok(harness) => harness,
        Err(e) => {
            eprint!("{}", format_failure(cli.target.name(), &e));
            return Err(anyhow::anyhow!("Target '{}' is not usable", cli.target));
        }
    };

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!(
        "Running {} recipe(s) against {}",
        plan.recipes.len(),
        harness.target()
    );

    let pb = ProgressBar::new(plan.recipes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let run = harness.run_plan(&plan, meta, &mut rng, &pb, format == OutputFormat::Human);
    pb.finish_and_clear();
    let report = &run.report;

    if let Some((name, error)) = &run.failure {
        eprint!("{}", format_failure(name, error));
    }

    match format {
        OutputFormat::Human => println!("{}", format_summary(&report.summary)),
        OutputFormat::Json if cli.output.is_none() => {
            println!("{}", generate_json_report(report)?);
        }
        OutputFormat::Json => {}
    }

    if let Some(path) = &cli.output {
        write_report(report, path)?;
    }
    if cli.save_report {
        let path = Path::new(&config.output.directory).join("report.json");
        write_report(report, &path)?;
    }

    run.status()
}

fn write_report(report: &RunReport, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_json_report(report)?)?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
