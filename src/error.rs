//! Error types for resampling.

/// Errors raised while building a [`Resampler`](crate::Resampler) or
/// replaying bootstrap indices.
///
/// Construction errors are final: a resampler is either fully built or not
/// at all. Sampling itself never fails once construction succeeded, except
/// when replaying caller-supplied indices.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    /// A size parameter is zero or the binning does not fit the data.
    #[error("invalid configuration for `{field}`: {reason}")]
    Config {
        /// Name of the offending parameter.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A row of the input has a different number of variables than the first.
    #[error("row {row} has {found} variables, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Number of variables in row 0.
        expected: usize,
        /// Number of variables in the offending row.
        found: usize,
    },

    /// A flat buffer does not match the requested matrix shape.
    #[error("buffer of length {len} cannot hold a {rows}x{cols} matrix")]
    Shape {
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        cols: usize,
        /// Actual buffer length.
        len: usize,
    },

    /// Caller-supplied bootstrap indices are malformed or out of range.
    #[error("invalid bootstrap indices: {0}")]
    Indices(String),

    /// A stored bootstrap record was produced with different parameters.
    #[error("bootstrap record does not match resampler: {field} is {found}, expected {expected}")]
    RecordMismatch {
        /// Name of the mismatched parameter.
        field: &'static str,
        /// Value held by the resampler.
        expected: usize,
        /// Value stored in the record.
        found: usize,
    },

    /// A record file already holds a record under this group name.
    #[error("bootstrap record group `{0}` already exists")]
    GroupExists(String),

    /// A record file holds no record under this group name.
    #[error("bootstrap record group `{0}` not found")]
    GroupMissing(String),

    /// The entropy source used for seeding failed.
    #[error("random source failure: {0}")]
    RandomSource(String),

    /// Reading or writing a bootstrap record failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A bootstrap record could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ResampleError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by invalid construction parameters.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::RaggedRows { .. } | Self::Shape { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ResampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_display() {
        let err = ResampleError::config("bin_size", "must be larger than zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `bin_size`: must be larger than zero"
        );
        assert!(err.is_config());
    }

    #[test]
    fn test_runtime_errors_are_not_config() {
        assert!(!ResampleError::RandomSource("boom".into()).is_config());
        assert!(!ResampleError::Indices("empty".into()).is_config());
    }
}
