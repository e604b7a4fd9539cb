//! imgsieve - near-duplicate image finder.
//!
//! Images are fingerprinted with a perceptual hash, files with equal
//! fingerprints are grouped, and a retention policy keeps one member of each
//! group while marking the rest for deletion.
//!
//! The library is layered:
//!
//! - [`hashing`]: decode an image and compute its fingerprint
//! - [`duplicates`]: group fingerprints, choose survivors, run the pipeline
//! - [`scanner`]: enumerate candidate files
//! - [`actions`]: confirm and delete
//! - [`output`]: text and JSON reports
//!
//! [`run_app`] wires them together for the binary.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::actions::confirm::{confirm, PROMPT};
use crate::actions::delete::{self, DeleteMode};
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{Sieve, SieveConfig};
use crate::error::ExitCode;
use crate::output::{JsonReport, RunSettings, TextReport};
use crate::progress::{Progress, ProgressCallback};
use crate::signal::ShutdownHandler;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Configuration, enumeration, strict-mode decode failures, interruption and
/// output errors, each with context.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let json_output = cli.output == OutputFormat::Json;
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply_to(&mut config);
    let resolved = config.resolve()?;
    log::debug!(
        "Using {} (size {}), keeping by {}",
        resolved.fingerprinter.algorithm(),
        resolved.fingerprinter.size(),
        resolved.policy
    );

    let root = match &cli.path {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("reading current directory")?,
    };

    let shutdown = signal::install_handler().unwrap_or_else(|e| {
        log::warn!("{}; Ctrl+C will stop the process immediately", e);
        ShutdownHandler::new()
    });
    let progress = Arc::new(Progress::new(cli.quiet || json_output));

    let sieve_config = SieveConfig::default()
        .with_threads(config.threads)
        .with_strict(config.strict)
        .with_max_distance(config.max_distance)
        .with_policy(resolved.policy)
        .with_shutdown_flag(shutdown.flag())
        .with_progress_callback(Arc::clone(&progress) as Arc<dyn ProgressCallback>);
    let sieve = Sieve::new(resolved.fingerprinter, sieve_config);

    let report = sieve
        .run_dir(&root, config.recursive)
        .with_context(|| format!("searching {}", root.display()))?;

    let settings = RunSettings::new(resolved.fingerprinter, resolved.policy)
        .with_max_distance(config.max_distance);
    {
        let mut out = io::stdout().lock();
        match cli.output {
            OutputFormat::Text => TextReport::new(&report).write_to(&mut out)?,
            OutputFormat::Json => JsonReport::new(&report, &settings).write_to(&mut out, true)?,
        }
    }

    let partial = !report.summary.skipped.is_empty();
    if !report.has_duplicates() {
        return Ok(ExitCode::NoDuplicates);
    }
    if report.deletion_set.is_empty() || cli.dry_run {
        return Ok(exit_code(partial));
    }

    let proceed = cli.yes || {
        let mut input = io::stdin().lock();
        if json_output {
            confirm(PROMPT, &mut input, &mut io::stderr())?
        } else {
            confirm(PROMPT, &mut input, &mut io::stdout())?
        }
    };
    if !proceed {
        log::info!("Nothing deleted");
        return Ok(exit_code(partial));
    }

    let result = delete::execute(
        &report.resolutions,
        &report.deletion_set,
        DeleteMode::from_permanent(config.permanent),
        Some(&*progress),
    )?;
    if !json_output && !cli.quiet {
        writeln!(io::stdout(), "{}", result.summary())?;
    }

    Ok(exit_code(partial || !result.all_succeeded()))
}

fn exit_code(partial: bool) -> ExitCode {
    if partial {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
