//! Contiguous binning of autocorrelated configurations.
//!
//! Consecutive configurations of a Markov chain are correlated. Averaging
//! them in contiguous, non-overlapping bins yields approximately independent
//! values which can then be bootstrapped individually. Since every bin has
//! the same size, averaging bin means gives exactly the mean over the
//! underlying configurations.

use crate::error::{ResampleError, Result};
use crate::types::{count_as, DataMatrix, Element};

/// Average `data` in contiguous bins.
///
/// Bin `b` covers configurations `skip + b * bin_size .. skip + (b + 1) * bin_size`.
///
/// # Arguments
///
/// * `data` - Configurations × variables
/// * `bin_size` - Configurations per bin
/// * `num_bins` - Number of bins to produce
/// * `skip` - Leading configurations to ignore
///
/// # Returns
///
/// A `num_bins × num_vars` matrix of per-bin means, keeping the variable
/// shape of `data`.
///
/// # Errors
///
/// Returns a configuration error if the bins do not fit into `data` or if
/// `bin_size` cannot be represented in the element type.
pub fn bin_means<T: Element>(
    data: &DataMatrix<T>,
    bin_size: usize,
    num_bins: usize,
    skip: usize,
) -> Result<DataMatrix<T>> {
    if bin_size == 0 {
        return Err(ResampleError::config("bin_size", "must be larger than zero"));
    }
    let num_configs = data.num_configs();
    let fits = num_bins
        .checked_mul(bin_size)
        .and_then(|n| n.checked_add(skip))
        .is_some_and(|n| n <= num_configs);
    if !fits {
        return Err(ResampleError::config(
            "num_bins",
            format!(
                "{num_bins} bins of size {bin_size} after skipping {skip} \
                 exceed {num_configs} configurations"
            ),
        ));
    }

    let divisor: T = count_as("bin_size", bin_size)?;
    let num_vars = data.num_vars();
    let mut binned = Vec::with_capacity(num_bins * num_vars);

    for b in 0..num_bins {
        let start = skip + b * bin_size;
        let mut acc = vec![T::zero(); num_vars];
        for config in start..start + bin_size {
            for (a, &x) in acc.iter_mut().zip(data.row(config)) {
                *a = *a + x;
            }
        }
        binned.extend(acc.into_iter().map(|a| a / divisor));
    }

    DataMatrix::from_vec(binned, num_bins, num_vars)?.with_var_shape(data.var_shape().to_vec())
}

/// Per-variable mean over all rows of `data`.
///
/// # Errors
///
/// Returns a configuration error if `data` has no rows or its row count
/// cannot be represented in the element type.
pub fn column_means<T: Element>(data: &DataMatrix<T>) -> Result<Vec<T>> {
    if data.num_configs() == 0 {
        return Err(ResampleError::config("num_configs", "must be larger than zero"));
    }
    let divisor: T = count_as("num_configs", data.num_configs())?;
    let mut acc = vec![T::zero(); data.num_vars()];
    for row in data.rows() {
        for (a, &x) in acc.iter_mut().zip(row) {
            *a = *a + x;
        }
    }
    Ok(acc.into_iter().map(|a| a / divisor).collect())
}
