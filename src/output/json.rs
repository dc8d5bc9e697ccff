//! JSON export of bootstrap records.
//!
//! A record stores the parameters and drawn bin indices of one batch, and
//! optionally the replicas computed from them. With the same input data a
//! record reproduces the batch exactly. The data itself is not stored and
//! must be persisted separately.
//!
//! Records are written either one per file ([`write_json`]) or as named
//! groups of a single file ([`write_group`]), e.g. one group per ensemble.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};
use crate::indices::IndexSet;
use crate::types::Parameters;

/// Parameters and bin indices of one bootstrap batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct BootstrapRecord<T = f64> {
    /// Shape of the resampler that drew the indices.
    pub parameters: Parameters,
    /// Bins drawn per replica.
    pub indices: IndexSet,
    /// Replicas computed from `indices`, one row per replica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<Vec<T>>>,
}

impl<T> BootstrapRecord<T> {
    /// Check that this record can be replayed by a resampler with `parameters`.
    ///
    /// Data shape and binning must agree; the number of replicas and bins
    /// per replica come from the stored indices.
    pub fn check_compatible(&self, parameters: &Parameters) -> Result<()> {
        let fields = [
            ("num_configs", parameters.num_configs, self.parameters.num_configs),
            ("num_vars", parameters.num_vars, self.parameters.num_vars),
            ("bin_size", parameters.bin_size, self.parameters.bin_size),
            ("num_bins", parameters.num_bins, self.parameters.num_bins),
        ];
        for (field, expected, found) in fields {
            if expected != found {
                return Err(ResampleError::RecordMismatch {
                    field,
                    expected,
                    found,
                });
            }
        }

        if self.indices.num_samples() != self.parameters.num_samples
            || self.indices.num_size() != self.parameters.num_size
        {
            return Err(ResampleError::Indices(format!(
                "record declares {}x{} indices but stores {}x{}",
                self.parameters.num_samples,
                self.parameters.num_size,
                self.indices.num_samples(),
                self.indices.num_size()
            )));
        }

        if let Some(samples) = &self.samples {
            let num_vars = self.parameters.num_vars;
            if samples.len() != self.parameters.num_samples
                || samples.iter().any(|row| row.len() != num_vars)
            {
                return Err(ResampleError::Shape {
                    rows: self.parameters.num_samples,
                    cols: num_vars,
                    len: samples.iter().map(Vec::len).sum(),
                });
            }
        }
        Ok(())
    }
}

/// Serialize a record to a compact JSON string.
pub fn to_json<T: Serialize>(record: &BootstrapRecord<T>) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Serialize a record to a pretty-printed JSON string.
pub fn to_json_pretty<T: Serialize>(record: &BootstrapRecord<T>) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Parse a record from JSON.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<BootstrapRecord<T>> {
    Ok(serde_json::from_str(json)?)
}

/// Write a record to `path`, refusing to overwrite an existing file.
pub fn write_json<T: Serialize>(
    record: &BootstrapRecord<T>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), record)?;
    tracing::debug!(path = %path.display(), "bootstrap record written");
    Ok(())
}

/// Read a record from `path`.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<BootstrapRecord<T>> {
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Groups of a record file; a missing file has none.
fn read_groups(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Store `record` under `group` in the record file at `path`.
///
/// Creates the file if needed and keeps the other groups it holds.
///
/// # Errors
///
/// Returns [`ResampleError::GroupExists`] if `group` is already taken; the
/// file is left untouched.
pub fn write_group<T: Serialize>(
    record: &BootstrapRecord<T>,
    path: impl AsRef<Path>,
    group: &str,
) -> Result<()> {
    let path = path.as_ref();
    let mut groups = read_groups(path)?;
    if groups.contains_key(group) {
        return Err(ResampleError::GroupExists(group.to_owned()));
    }
    groups.insert(group.to_owned(), serde_json::to_value(record)?);

    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &groups)?;
    tracing::debug!(path = %path.display(), group, "bootstrap record group written");
    Ok(())
}

/// Read the record stored under `group` in the record file at `path`.
pub fn read_group<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    group: &str,
) -> Result<BootstrapRecord<T>> {
    let mut groups = read_groups(path.as_ref())?;
    let value = groups
        .remove(group)
        .ok_or_else(|| ResampleError::GroupMissing(group.to_owned()))?;
    Ok(serde_json::from_value(value)?)
}

/// Whether the record file at `path` holds a record under `group`.
///
/// Returns `false` if the file does not exist.
pub fn record_exists(path: impl AsRef<Path>, group: &str) -> Result<bool> {
    Ok(read_groups(path.as_ref())?.contains_key(group))
}
