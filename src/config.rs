//! Application configuration management.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. `IMGSIEVE_*` environment variables (e.g. `IMGSIEVE_METHOD=dhash`)
//! 4. Command-line flags (applied by the caller)
//!
//! Algorithm and policy names stay strings until [`Config::resolve`] turns
//! them into closed enums, once, before any image is touched.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::PolicyKind;
use crate::hashing::{Fingerprinter, HashAlgorithm, DEFAULT_HASH_SIZE};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IMGSIEVE_";

/// Invalid configuration, detected before any image is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The hash algorithm name is not one of the known families.
    #[error("unknown hash algorithm '{name}'{}", did_you_mean(.suggestion))]
    UnknownAlgorithm {
        /// The offending name
        name: String,
        /// Closest known name, if any
        suggestion: Option<&'static str>,
    },

    /// The filter policy name is not a known policy.
    #[error("unknown filter policy '{name}'{}", did_you_mean(.suggestion))]
    UnknownPolicy {
        /// The offending name
        name: String,
        /// Closest known name, if any
        suggestion: Option<&'static str>,
    },

    /// Hash size outside the supported range.
    #[error("invalid hash size {0}: must be between 2 and 64")]
    InvalidHashSize(u32),

    /// A configuration source could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

fn did_you_mean(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

/// Closest candidate to `input` by Jaro-Winkler similarity, if close enough.
#[must_use]
pub fn suggest(input: &str, candidates: &[&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .map(|c| (*c, strsim::jaro_winkler(input, c)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Walk subdirectories.
    pub recursive: bool,
    /// Hash algorithm name.
    pub method: String,
    /// Hash size (grid side length).
    pub size: u32,
    /// Retention policy name.
    pub filter: String,
    /// Worker threads for decode+hash; 0 uses every available core.
    pub threads: usize,
    /// Abort on the first undecodable image instead of skipping it.
    pub strict: bool,
    /// Opt-in near-match grouping: maximum Hamming distance.
    pub max_distance: Option<u32>,
    /// Delete permanently instead of moving to the trash.
    pub permanent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursive: false,
            method: HashAlgorithm::default().name().to_string(),
            size: DEFAULT_HASH_SIZE,
            filter: PolicyKind::default().name().to_string(),
            threads: 0,
            strict: false,
            max_distance: None,
            permanent: false,
        }
    }
}

/// Configuration with names resolved into their closed enums.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    /// Hashing capability
    pub fingerprinter: Fingerprinter,
    /// Retention policy
    pub policy: PolicyKind,
}

impl Config {
    /// Load defaults, then the config file, then the environment.
    ///
    /// `explicit` overrides the platform config path; a missing file at
    /// either location is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] on malformed TOML or ill-typed values.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match explicit.map(Path::to_path_buf).or_else(Self::config_path) {
            Some(path) => {
                log::debug!("Reading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => log::debug!("No platform config directory, skipping config file"),
        }
        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }

    /// Resolve algorithm, size and policy.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] among the three.
    pub fn resolve(&self) -> Result<Resolved, ConfigError> {
        let algorithm = HashAlgorithm::from_name(&self.method)?;
        let fingerprinter = Fingerprinter::new(algorithm, self.size)?;
        let policy = PolicyKind::from_name(&self.filter)?;
        Ok(Resolved {
            fingerprinter,
            policy,
        })
    }

    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "imgsieve", "imgsieve")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
