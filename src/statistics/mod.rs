//! Statistical building blocks for block bootstrap resampling.
//!
//! - Contiguous binning of correlated configurations
//! - Counter-based seeding of per-replica generators

mod binning;
mod seeding;

pub use binning::{bin_means, column_means};
pub use seeding::{counter_rng_seed, replica_rng};
