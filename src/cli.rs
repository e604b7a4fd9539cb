//! Command-line interface.
//!
//! ```bash
//! # Report duplicates in the current directory, keeping the largest image
//! imgsieve
//!
//! # Walk a tree with dHash and keep the newest file of each group
//! imgsieve ~/Pictures -r --method dhash --filter newest
//!
//! # Machine-readable plan, nothing deleted
//! imgsieve ~/Pictures --output json --dry-run
//! ```
//!
//! Flags left unset fall through to the config file and `IMGSIEVE_*`
//! environment variables (see [`crate::config`]).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Config;

/// Find near-duplicate images and keep one of each set.
///
/// Images are fingerprinted with a perceptual hash; files with equal
/// fingerprints form a group, one member is kept according to the filter
/// policy and the rest are offered for deletion.
#[derive(Debug, Parser)]
#[command(name = "imgsieve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to search for images (default: current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Search for images recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Hash algorithm (average, perceptual, perceptual-simple,
    /// difference-horizontal, difference-vertical, wavelet-haar, wavelet-db4,
    /// or an alias such as phash, dhash, whash)
    #[arg(short, long, value_name = "NAME")]
    pub method: Option<String>,

    /// Hash size: side of the hash grid, 2 to 64
    #[arg(short, long, value_name = "N")]
    pub size: Option<u32>,

    /// Which file of a group to keep (resolution, newest, largest, first)
    #[arg(short, long, value_name = "POLICY")]
    pub filter: Option<String>,

    /// Worker threads for decoding and hashing (0 = all cores)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Abort on the first unreadable image instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Also group images whose fingerprints differ in at most N bits
    #[arg(long, value_name = "N")]
    pub max_distance: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Show what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Delete without asking for confirmation
    #[arg(short, long, conflicts_with = "dry_run")]
    pub yes: bool,

    /// Delete permanently instead of moving files to the trash
    #[arg(long)]
    pub permanent: bool,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "FILE", env = "IMGSIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if self.recursive {
            config.recursive = true;
        }
        if let Some(method) = &self.method {
            config.method.clone_from(method);
        }
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(filter) = &self.filter {
            config.filter.clone_from(filter);
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.strict {
            config.strict = true;
        }
        if self.max_distance.is_some() {
            config.max_distance = self.max_distance;
        }
        if self.permanent {
            config.permanent = true;
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary and deletion list
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
