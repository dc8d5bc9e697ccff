//! Configuration for block bootstrap resampling.

use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};

/// Configuration options for [`Resampler`](crate::Resampler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bootstrap replicas produced per batch (default: 1,000).
    pub num_samples: usize,

    /// Number of bins the data is partitioned into.
    ///
    /// `None` derives it as `num_configs / bin_size`.
    pub num_bins: Option<usize>,

    /// Bins drawn per replica (default: `num_bins`).
    pub num_size: Option<usize>,

    /// Consecutive configurations per bin (default: 1).
    pub bin_size: usize,

    /// Optional deterministic seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,

    /// What to do with configurations that do not fill a whole bin.
    pub remainder: RemainderPolicy,
}

/// Handling of configurations left over after binning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainderPolicy {
    /// Require `num_bins * bin_size == num_configs`.
    #[default]
    Reject,

    /// Drop the leading configurations that do not fit.
    ///
    /// Early configurations of a Markov chain are the least equilibrated, so
    /// this doubles as a thermalization cutoff.
    SkipLeading,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_samples: 1_000,
            num_bins: None,
            num_size: None,
            bin_size: 1,
            seed: None,
            remainder: RemainderPolicy::Reject,
        }
    }
}

impl Config {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of replicas per batch.
    pub fn num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set the number of bins explicitly.
    pub fn num_bins(mut self, n: usize) -> Self {
        self.num_bins = Some(n);
        self
    }

    /// Set the number of bins drawn per replica.
    pub fn num_size(mut self, n: usize) -> Self {
        self.num_size = Some(n);
        self
    }

    /// Set the number of configurations per bin.
    pub fn bin_size(mut self, n: usize) -> Self {
        self.bin_size = n;
        self
    }

    /// Seed the random source for reproducible batches.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the remainder policy.
    pub fn remainder(mut self, policy: RemainderPolicy) -> Self {
        self.remainder = policy;
        self
    }

    /// Check the parameters that can be validated without data.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(ResampleError::config(
                "num_samples",
                "must be larger than zero",
            ));
        }
        if self.bin_size == 0 {
            return Err(ResampleError::config("bin_size", "must be larger than zero"));
        }
        if self.num_bins == Some(0) {
            return Err(ResampleError::config("num_bins", "must be larger than zero"));
        }
        if self.num_size == Some(0) {
            return Err(ResampleError::config("num_size", "must be larger than zero"));
        }
        Ok(())
    }
}
