//! Bootstrap bin indices.

use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};

/// The bins drawn for one batch: `num_samples` rows of `num_size` indices.
///
/// Row `i` lists, with repetition, the bins averaged into replica `i`.
/// Serialized as a list of rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<usize>>", into = "Vec<Vec<usize>>")]
pub struct IndexSet {
    indices: Vec<usize>,
    num_samples: usize,
    num_size: usize,
}

impl IndexSet {
    /// Build an index set from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Fails if either dimension is zero or the buffer length does not match.
    pub fn new(indices: Vec<usize>, num_samples: usize, num_size: usize) -> Result<Self> {
        if num_samples == 0 || num_size == 0 {
            return Err(ResampleError::Indices(format!(
                "empty index set ({num_samples}x{num_size})"
            )));
        }
        if num_samples.checked_mul(num_size) != Some(indices.len()) {
            return Err(ResampleError::Indices(format!(
                "{} indices cannot form {num_samples} rows of {num_size}",
                indices.len()
            )));
        }
        Ok(Self {
            indices,
            num_samples,
            num_size,
        })
    }

    pub(crate) fn from_parts(indices: Vec<usize>, num_samples: usize, num_size: usize) -> Self {
        debug_assert_eq!(indices.len(), num_samples * num_size);
        Self {
            indices,
            num_samples,
            num_size,
        }
    }

    /// Number of replicas described.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Bins per replica.
    pub fn num_size(&self) -> usize {
        self.num_size
    }

    /// Bins drawn for replica `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_samples`.
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[i * self.num_size..(i + 1) * self.num_size]
    }

    /// Iterate over replicas in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        (0..self.num_samples).map(move |i| self.row(i))
    }

    /// The underlying row-major buffer.
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Check that every index addresses one of `num_bins` bins.
    pub fn check_range(&self, num_bins: usize) -> Result<()> {
        match self.indices.iter().position(|&b| b >= num_bins) {
            Some(pos) => Err(ResampleError::Indices(format!(
                "index {} in replica {} is out of range for {num_bins} bins",
                self.indices[pos],
                pos / self.num_size
            ))),
            None => Ok(()),
        }
    }
}

impl TryFrom<Vec<Vec<usize>>> for IndexSet {
    type Error = ResampleError;

    fn try_from(rows: Vec<Vec<usize>>) -> Result<Self> {
        let num_samples = rows.len();
        let num_size = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().position(|r| r.len() != num_size) {
            return Err(ResampleError::Indices(format!(
                "replica {row} has {} indices, expected {num_size}",
                rows[row].len()
            )));
        }
        Self::new(rows.into_iter().flatten().collect(), num_samples, num_size)
    }
}

impl From<IndexSet> for Vec<Vec<usize>> {
    fn from(set: IndexSet) -> Self {
        set.rows().map(<[usize]>::to_vec).collect()
    }
}
