// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ripple`: parse, render and diff marble diagrams from the shell.
//!
//! `ripple diff` exits with status 1 when the diagrams differ, so it can
//! gate scripts.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ripple_marbles::{compare_diagrams, ConfigService, Diagram, FileConfigStore, HarnessConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ripple", author, version, about = "Parse, render and diff marble diagrams")]
struct Cli {
    /// Directory holding harness.json (defaults apply when absent)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parsed tokens as JSON
    Parse {
        /// Diagram text, e.g. "-a-(bc)-|"
        #[arg(allow_hyphen_values = true)]
        diagram: String,
        /// Milliseconds per frame for time progressions (overrides the config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        frame_ms: Option<u64>,
    },
    /// Print the canonical one-character-per-frame rendering
    Render {
        /// Diagram text
        #[arg(allow_hyphen_values = true)]
        diagram: String,
    },
    /// Compare two diagrams over their literal symbols
    Diff {
        /// Expected diagram
        #[arg(allow_hyphen_values = true)]
        expected: String,
        /// Actual diagram
        #[arg(allow_hyphen_values = true)]
        actual: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = match &cli.config_dir {
        Some(dir) => load_config(dir)?,
        None => HarnessConfig::default(),
    };
    debug!(?config, "harness config");

    let mut out = io::stdout().lock();
    let matched = execute(&cli.command, &config, &mut out)?;
    out.flush()?;
    Ok(if matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn load_config(dir: &Path) -> Result<HarnessConfig> {
    ConfigService::new(FileConfigStore::new(dir))
        .load_harness()
        .with_context(|| format!("failed to load harness config from {}", dir.display()))
}

fn parse(diagram: &str, frame_ms: u64) -> Result<Diagram> {
    Diagram::parse_with(diagram, frame_ms).with_context(|| format!("failed to parse {diagram:?}"))
}

/// Runs one command. Returns `false` only for a `diff` that found differences.
fn execute(command: &Command, config: &HarnessConfig, out: &mut impl Write) -> Result<bool> {
    match command {
        Command::Parse { diagram, frame_ms } => {
            let parsed = parse(diagram, frame_ms.unwrap_or(config.frame_duration_ms))?;
            serde_json::to_writer_pretty(&mut *out, &parsed)?;
            writeln!(out)?;
            Ok(true)
        }
        Command::Render { diagram } => {
            let parsed = parse(diagram, config.frame_duration_ms)?;
            writeln!(out, "{}", parsed.render())?;
            Ok(true)
        }
        Command::Diff { expected, actual } => {
            let mismatch = compare_diagrams(expected, actual, config.frame_duration_ms)
                .context("failed to parse diagrams")?;
            match mismatch {
                None => {
                    writeln!(out, "diagrams match")?;
                    Ok(true)
                }
                Some(mismatch) => {
                    writeln!(out, "{mismatch}")?;
                    Ok(false)
                }
            }
        }
    }
}
