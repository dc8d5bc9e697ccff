//! Matrix containers and the numeric element bound.

use std::fmt;
use std::ops::{Add, Div};

use num_traits::{FromPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};

/// Numeric types that can be binned and averaged.
///
/// All aggregation stays in `Self`: sums are accumulated in the element type
/// and divided by a count converted with [`FromPrimitive::from_usize`]. For
/// `f32` data with very large bins this loses precision compared to widening
/// to `f64`, which is accepted.
///
/// Averaging happens twice, once per bin and once over the drawn bins, and
/// each step rounds. Constant input `c` therefore reproduces `c` exactly only
/// when the partial sums are exact, e.g. for small integers or dyadic
/// fractions such as `0.5`. A value like `0.1` comes back within a few ulps.
///
/// Implemented for every type meeting the bounds, including `f32`, `f64`
/// and `num_complex::Complex<f64>`.
pub trait Element:
    Copy
    + Send
    + Sync
    + fmt::Debug
    + PartialEq
    + Zero
    + Add<Output = Self>
    + Div<Output = Self>
    + FromPrimitive
    + 'static
{
}

impl<T> Element for T where
    T: Copy
        + Send
        + Sync
        + fmt::Debug
        + PartialEq
        + Zero
        + Add<Output = T>
        + Div<Output = T>
        + FromPrimitive
        + 'static
{
}

/// Convert a count into the element type.
pub(crate) fn count_as<T: Element>(field: &'static str, n: usize) -> Result<T> {
    T::from_usize(n).ok_or_else(|| {
        ResampleError::config(field, format!("{n} is not representable in the element type"))
    })
}

/// Row-major position of the multi-index `index` within `shape`.
pub(crate) fn flat_index(shape: &[usize], index: &[usize]) -> Option<usize> {
    if shape.len() != index.len() {
        return None;
    }
    shape
        .iter()
        .zip(index)
        .try_fold(0usize, |acc, (&dim, &i)| (i < dim).then_some(acc * dim + i))
}

/// Configurations × variables, stored row-major.
///
/// Row `i` holds the `num_vars` observables of configuration `i`, in
/// measurement order. The variables of a row may carry a multi-dimensional
/// shape (e.g. `[momenta, channels]`), flattened row-major; it defaults to
/// `[num_vars]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix<T> {
    values: Vec<T>,
    num_configs: usize,
    num_vars: usize,
    var_shape: Vec<usize>,
}

impl<T: Copy> DataMatrix<T> {
    /// Build a matrix from a flat row-major buffer.
    pub fn from_vec(values: Vec<T>, num_configs: usize, num_vars: usize) -> Result<Self> {
        let expected = num_configs.checked_mul(num_vars);
        if expected != Some(values.len()) {
            return Err(ResampleError::Shape {
                rows: num_configs,
                cols: num_vars,
                len: values.len(),
            });
        }
        Ok(Self {
            values,
            num_configs,
            num_vars,
            var_shape: vec![num_vars],
        })
    }

    /// Build a matrix from individual rows, which must all have equal length.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let num_vars = rows.first().map_or(0, |r| r.as_ref().len());
        let mut values = Vec::with_capacity(rows.len() * num_vars);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != num_vars {
                return Err(ResampleError::RaggedRows {
                    row,
                    expected: num_vars,
                    found: r.len(),
                });
            }
            values.extend_from_slice(r);
        }
        Ok(Self {
            values,
            num_configs: rows.len(),
            num_vars,
            var_shape: vec![num_vars],
        })
    }

    /// A matrix with every entry set to `value`.
    pub fn filled(num_configs: usize, num_vars: usize, value: T) -> Self {
        Self {
            values: vec![value; num_configs * num_vars],
            num_configs,
            num_vars,
            var_shape: vec![num_vars],
        }
    }

    /// Give the variables of each row a multi-dimensional shape.
    ///
    /// # Errors
    ///
    /// Fails unless `shape` is non-empty and its product equals `num_vars`.
    pub fn with_var_shape(mut self, shape: Vec<usize>) -> Result<Self> {
        let product = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if shape.is_empty() || product != Some(self.num_vars) {
            return Err(ResampleError::config(
                "var_shape",
                format!("{shape:?} does not hold {} variables", self.num_vars),
            ));
        }
        self.var_shape = shape;
        Ok(self)
    }

    /// Number of configurations (rows).
    pub fn num_configs(&self) -> usize {
        self.num_configs
    }

    /// Number of variables (columns).
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Shape of the variables of one row.
    pub fn var_shape(&self) -> &[usize] {
        &self.var_shape
    }

    /// Observables of configuration `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_configs`.
    pub fn row(&self, i: usize) -> &[T] {
        &self.values[i * self.num_vars..(i + 1) * self.num_vars]
    }

    /// Value of the variable at multi-index `index` in configuration `config`.
    pub fn get(&self, config: usize, index: &[usize]) -> Option<T> {
        if config >= self.num_configs {
            return None;
        }
        flat_index(&self.var_shape, index).map(|v| self.row(config)[v])
    }

    /// Iterate over rows in configuration order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        (0..self.num_configs).map(move |i| self.row(i))
    }

    /// The underlying row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }
}

/// One batch of bootstrap replicas: `num_samples` rows of `num_vars` means.
///
/// Owned by the caller; nothing in the resampler refers to it after return.
/// Rows carry the variable shape of the input data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaSet<T> {
    values: Vec<T>,
    num_samples: usize,
    num_vars: usize,
    var_shape: Vec<usize>,
}

impl<T: Copy> ReplicaSet<T> {
    pub(crate) fn from_parts(values: Vec<T>, num_samples: usize, num_vars: usize) -> Self {
        debug_assert_eq!(values.len(), num_samples * num_vars);
        Self {
            values,
            num_samples,
            num_vars,
            var_shape: vec![num_vars],
        }
    }

    pub(crate) fn shaped(mut self, var_shape: &[usize]) -> Self {
        debug_assert_eq!(var_shape.iter().product::<usize>(), self.num_vars);
        self.var_shape = var_shape.to_vec();
        self
    }

    /// Number of replicas.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Number of variables per replica.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Shape of the variables of one replica.
    pub fn var_shape(&self) -> &[usize] {
        &self.var_shape
    }

    /// Means of replica `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_samples`.
    pub fn row(&self, i: usize) -> &[T] {
        &self.values[i * self.num_vars..(i + 1) * self.num_vars]
    }

    /// Mean of the variable at multi-index `index` in replica `sample`.
    pub fn get(&self, sample: usize, index: &[usize]) -> Option<T> {
        if sample >= self.num_samples {
            return None;
        }
        flat_index(&self.var_shape, index).map(|v| self.row(sample)[v])
    }

    /// Iterate over replicas in generation order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        (0..self.num_samples).map(move |i| self.row(i))
    }

    /// Bootstrap distribution of variable `var` across all replicas.
    ///
    /// # Panics
    ///
    /// Panics if `var >= num_vars`.
    pub fn column(&self, var: usize) -> impl ExactSizeIterator<Item = T> + '_ {
        assert!(var < self.num_vars, "variable index {var} out of range");
        self.rows().map(move |r| r[var])
    }

    /// The underlying row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Consume the set, returning the row-major buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }
}

/// Shape parameters of a resampler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameters {
    /// Replicas per batch.
    pub num_samples: usize,
    /// Bins drawn per replica.
    pub num_size: usize,
    /// Configurations per bin.
    pub bin_size: usize,
    /// Configurations in the input data, including skipped ones.
    pub num_configs: usize,
    /// Variables per configuration.
    pub num_vars: usize,
    /// Bins the data was partitioned into.
    pub num_bins: usize,
    /// Shape of the variables of one configuration; `[num_vars]` when flat.
    #[serde(default)]
    pub var_shape: Vec<usize>,
}

impl Parameters {
    /// Configurations dropped at the start of the data by binning.
    pub fn num_skipped(&self) -> usize {
        self.num_configs
            .saturating_sub(self.num_bins.saturating_mul(self.bin_size))
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resampler(num_samples={}, num_size={}, bin_size={}, num_configs={}, num_vars={}, \
             num_bins={})",
            self.num_samples,
            self.num_size,
            self.bin_size,
            self.num_configs,
            self.num_vars,
            self.num_bins
        )
    }
}
