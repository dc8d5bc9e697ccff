//! # bootstats
//!
//! Block bootstrap resampling for autocorrelated data.
//!
//! Measurements taken along a Markov chain (lattice Monte Carlo
//! configurations, molecular dynamics frames, ...) are correlated over
//! consecutive configurations. This crate estimates the distribution of
//! per-variable means by:
//! - averaging the data in contiguous bins of `bin_size` configurations
//! - drawing bins uniformly with replacement for each bootstrap replica
//! - averaging the drawn bins per variable
//!
//! ## Quick Start
//!
//! ```
//! use bootstats::{Config, DataMatrix, Resampler};
//!
//! // 1000 configurations of 4 observables
//! let data = DataMatrix::filled(1000, 4, 1.0_f64);
//!
//! let mut resampler = Resampler::new(
//!     &data,
//!     Config::new().num_samples(400).bin_size(5).seed(42),
//! )?;
//!
//! let samples = resampler.get_samples();
//! assert_eq!(samples.num_samples(), 400);
//! assert!(samples.as_slice().iter().all(|&x| x == 1.0));
//! # Ok::<(), bootstats::ResampleError>(())
//! ```
//!
//! ## Reproducibility
//!
//! A seeded resampler yields the same sequence of batches on every run and
//! regardless of the `parallel` feature. The bins drawn for a batch can be
//! exported as a [`BootstrapRecord`] and replayed later against the same
//! data with [`Resampler::samples_from_record`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod indices;
mod resampler;
mod thread_pool;
mod types;

pub mod output;
pub mod statistics;

pub use config::{Config, RemainderPolicy};
pub use error::{ResampleError, Result};
pub use indices::IndexSet;
pub use output::BootstrapRecord;
pub use resampler::Resampler;
pub use types::{DataMatrix, Element, Parameters, ReplicaSet};
