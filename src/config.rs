// Engine Configuration - Runtime settings from the environment
// A local .env file is honoured; real environment variables take precedence

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::monte_carlo::DEFAULT_SAMPLES;

pub const ENV_SAMPLES: &str = "IMPACTOR_SAMPLES";
pub const ENV_SEED: &str = "IMPACTOR_SEED";
pub const ENV_POPULATION_YEAR: &str = "IMPACTOR_POPULATION_YEAR";
pub const ENV_WORKER_THREADS: &str = "IMPACTOR_WORKER_THREADS";
pub const ENV_POPULATION_FILE: &str = "IMPACTOR_POPULATION_FILE";

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_POPULATION_YEAR: i32 = 2025;

/// Upper bound on samples per simulation
pub const MAX_SAMPLES: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub samples: usize,
    pub seed: u64,
    pub population_year: i32,
    /// Dedicated worker pool size. `None` uses the global rayon pool.
    pub worker_threads: Option<usize>,
    /// JSON dataset replacing the built-in population table
    pub population_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            population_year: DEFAULT_POPULATION_YEAR,
            worker_threads: None,
            population_file: None,
        }
    }
}

impl EngineConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> EngineResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let defaults = Self::default();

        let config = Self {
            samples: parse_or(&lookup, ENV_SAMPLES, defaults.samples)?,
            seed: parse_or(&lookup, ENV_SEED, defaults.seed)?,
            population_year: parse_or(&lookup, ENV_POPULATION_YEAR, defaults.population_year)?,
            worker_threads: match non_empty(&lookup, ENV_WORKER_THREADS) {
                Some(raw) => Some(parse(ENV_WORKER_THREADS, &raw)?),
                None => None,
            },
            population_file: non_empty(&lookup, ENV_POPULATION_FILE).map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.samples == 0 || self.samples > MAX_SAMPLES {
            return Err(EngineError::Config(format!(
                "{} must be within 1..={}, got {}",
                ENV_SAMPLES, MAX_SAMPLES, self.samples
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(EngineError::Config(format!(
                "{} must be at least 1",
                ENV_WORKER_THREADS
            )));
        }
        Ok(())
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> EngineResult<T> {
    raw.parse()
        .map_err(|_| EngineError::Config(format!("{} has invalid value '{}'", key, raw)))
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> EngineResult<T> {
    match non_empty(lookup, key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}
