use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Parameters of the local search.
///
/// Any missing field of a JSON configuration takes its default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of swap trials.
    pub swap_iterations: usize,
    /// Number of move trials, executed after all swap trials.
    pub move_iterations: usize,
    /// The number of servers exchanged or moved in one trial is drawn uniformly from
    /// `0..=max_group_size`.
    pub max_group_size: usize,
    /// Number of random draws after which a trial gives up looking for a suitable pool.
    pub max_pool_draws: usize,
    /// Seed of the random number generator. If `None`, the generator is seeded from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            swap_iterations: 1_000_000,
            move_iterations: 10_000_000,
            max_group_size: 6,
            max_pool_draws: 10,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, cannot be parsed, or if the configuration
    /// does not pass [`validate`](Self::validate).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive the search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `max_pool_draws` is 0, since no trial could
    /// ever select a pool.
    pub fn validate(&self) -> Result<()> {
        if self.max_pool_draws == 0 {
            return Err(Error::InvalidConfig(String::from(
                "max_pool_draws must be positive",
            )));
        }
        Ok(())
    }
}
