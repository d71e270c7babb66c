use anyhow::{Context, Result, bail};
use mgc_config::Config;
use mgc_core::Report;
use mgc_engine::{Pipeline, obfuscators, omitters};
use mgc_sources::FsWriter;
use std::path::{Path, PathBuf};

use crate::cli::CleanArgs;

pub fn handle(args: CleanArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;

    let input = std::path::absolute(&args.input)
        .with_context(|| format!("Failed to resolve {}", args.input.display()))?;
    let output = std::path::absolute(&args.output)
        .with_context(|| format!("Failed to resolve {}", args.output.display()))?;
    if output.starts_with(&input) || input.starts_with(&output) {
        bail!("input and output directories must not contain each other");
    }
    let report_path = match &args.report {
        Some(path) => std::path::absolute(path)?,
        None => default_report_path(&output),
    };
    if report_path.starts_with(&output) {
        bail!("report must be written outside the output directory");
    }

    let chain = obfuscators(&config)?;
    if let Some(seed) = &args.seed_report {
        let prior = Report::load(seed)?;
        chain
            .initialize(&prior.replacements)
            .with_context(|| format!("Failed to seed from {}", seed.display()))?;
        tracing::info!(report = %seed.display(), "seeded replacements from earlier run");
    }

    let sink = FsWriter::prepare(&output, args.overwrite)?;
    let pipeline = Pipeline::new(chain, omitters(&config)?, Box::new(sink), config.workers)?;
    let outcome = pipeline
        .run(&input)
        .with_context(|| format!("Cleaning {} failed", input.display()))?;

    outcome.report.save(&report_path)?;

    println!("✓ Cleaned {}", input.display());
    println!("  Output: {}", output.display());
    println!("  Report: {}", report_path.display());
    println!(
        "  Files: {} obfuscated, {} omitted ({} lines)",
        outcome.stats.files_obfuscated, outcome.stats.files_omitted, outcome.stats.lines
    );
    println!("  Replacements: {}", outcome.report.to_map().len());

    Ok(())
}

/// `report.json` beside the output directory.
fn default_report_path(output: &Path) -> PathBuf {
    output
        .parent()
        .map(|parent| parent.join("report.json"))
        .unwrap_or_else(|| PathBuf::from("report.json"))
}
