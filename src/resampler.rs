//! Block bootstrap resampler.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{Config, RemainderPolicy};
use crate::error::{ResampleError, Result};
use crate::indices::IndexSet;
use crate::output::BootstrapRecord;
use crate::statistics::{bin_means, column_means, replica_rng};
use crate::thread_pool;
use crate::types::{count_as, DataMatrix, Element, Parameters, ReplicaSet};

/// Generates batches of block bootstrap replicas for one dataset.
///
/// The data is averaged into contiguous bins once at construction. Each
/// replica then draws `num_size` bins uniformly with replacement and
/// averages them per variable. Because all bins have equal size this is
/// the mean over the `num_size * bin_size` underlying configurations.
///
/// Each resampler owns its random source. Successive calls to
/// [`get_samples`](Self::get_samples) advance it, so every batch is
/// independent. Use [`fork`](Self::fork) to get another resampler sharing
/// the binned data but drawing from its own generator, e.g. one per worker.
///
/// Replicas are computed in the element type, so they carry its rounding:
/// constant data `c` yields replicas equal to `c` only when `c` and its
/// partial sums are exactly representable (see [`Element`]).
///
/// Two resamplers compare equal when they have the same parameters and
/// binned data, whatever the state of their random sources.
#[derive(Debug)]
pub struct Resampler<T> {
    binned: Arc<DataMatrix<T>>,
    mean: Arc<[T]>,
    parameters: Parameters,
    config: Config,
    /// `num_size` converted to `T`.
    size_divisor: T,
    rng: Xoshiro256PlusPlus,
}

impl<T: Element> Resampler<T> {
    /// Bin `data` according to `config`.
    ///
    /// `data` is only read. `num_bins` defaults to `num_configs / bin_size`
    /// and `num_size` to `num_bins`.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::Config`] if any dimension is zero, if the
    /// bins do not fit into the data, or if `num_bins * bin_size` leaves a
    /// remainder under [`RemainderPolicy::Reject`]. Returns
    /// [`ResampleError::RandomSource`] if no seed is configured and the OS
    /// entropy source fails.
    pub fn new(data: &DataMatrix<T>, config: Config) -> Result<Self> {
        config.validate()?;

        let num_configs = data.num_configs();
        let num_vars = data.num_vars();
        if num_configs == 0 {
            return Err(ResampleError::config("num_configs", "data has no configurations"));
        }
        if num_vars == 0 {
            return Err(ResampleError::config("num_vars", "data has no variables"));
        }

        let bin_size = config.bin_size;
        let num_bins = config.num_bins.unwrap_or(num_configs / bin_size);
        if num_bins == 0 {
            return Err(ResampleError::config(
                "bin_size",
                format!("bin size {bin_size} exceeds {num_configs} configurations"),
            ));
        }
        let used = num_bins
            .checked_mul(bin_size)
            .filter(|&n| n <= num_configs)
            .ok_or_else(|| {
                ResampleError::config(
                    "num_bins",
                    format!(
                        "{num_bins} bins of size {bin_size} exceed {num_configs} configurations"
                    ),
                )
            })?;

        let skip = num_configs - used;
        if skip > 0 {
            match config.remainder {
                RemainderPolicy::Reject => {
                    return Err(ResampleError::config(
                        "num_bins",
                        format!(
                            "{num_bins} bins of size {bin_size} cover {used} of \
                             {num_configs} configurations"
                        ),
                    ));
                }
                RemainderPolicy::SkipLeading => {
                    tracing::warn!(
                        skip,
                        num_configs,
                        bin_size,
                        "skipping leading configurations"
                    );
                }
            }
        }

        let num_size = config.num_size.unwrap_or(num_bins);
        let num_samples = config.num_samples;
        for (what, n) in [("bin indices", num_size), ("replica values", num_vars)] {
            if num_samples.checked_mul(n).is_none() {
                return Err(ResampleError::config(
                    "num_samples",
                    format!("{num_samples} replicas of {n} {what} overflow usize"),
                ));
            }
        }
        let size_divisor = count_as("num_size", num_size)?;

        let binned = bin_means(data, bin_size, num_bins, skip)?;
        let mean = column_means(&binned)?;

        let rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::try_from_os_rng()
                .map_err(|err| ResampleError::RandomSource(err.to_string()))?,
        };

        let parameters = Parameters {
            num_samples,
            num_size,
            bin_size,
            num_configs,
            num_vars,
            num_bins,
            var_shape: data.var_shape().to_vec(),
        };
        tracing::debug!(%parameters, skip, seeded = config.seed.is_some(), "resampler ready");

        Ok(Self {
            binned: Arc::new(binned),
            mean: mean.into(),
            parameters,
            config,
            size_divisor,
            rng,
        })
    }

    /// Bin `data` into as many bins of `config.bin_size` as fit.
    ///
    /// Ignores `config.num_bins` and `config.remainder`; configurations that
    /// do not fill a bin are skipped at the beginning of the data.
    pub fn with_bin_size(data: &DataMatrix<T>, config: Config) -> Result<Self> {
        Self::new(
            data,
            Config {
                num_bins: None,
                remainder: RemainderPolicy::SkipLeading,
                ..config
            },
        )
    }

    /// A resampler over the same binned data with its own generator.
    ///
    /// The binned data is shared, not copied.
    pub fn fork(&self, seed: u64) -> Self {
        Self {
            binned: Arc::clone(&self.binned),
            mean: Arc::clone(&self.mean),
            parameters: self.parameters.clone(),
            config: Config {
                seed: Some(seed),
                ..self.config.clone()
            },
            size_divisor: self.size_divisor,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Generate one batch of `num_samples` replicas.
    ///
    /// Costs Θ(num_samples × num_size × num_vars) after binning.
    pub fn get_samples(&mut self) -> ReplicaSet<T> {
        let indices = self.draw_indices();
        self.replicas(&indices, self.size_divisor)
    }

    /// Like [`get_samples`](Self::get_samples), also returning the bins drawn.
    pub fn get_samples_with_indices(&mut self) -> (IndexSet, ReplicaSet<T>) {
        let indices = self.draw_indices();
        let samples = self.replicas(&indices, self.size_divisor);
        (indices, samples)
    }

    /// Draw bin indices for one batch, advancing the random source.
    ///
    /// Replica `i` draws from a generator seeded with a SplitMix64 mix of the
    /// batch seed and `i`, so the result does not depend on whether rows are
    /// filled sequentially or in parallel.
    pub fn draw_indices(&mut self) -> IndexSet {
        let batch_seed: u64 = self.rng.random();
        let &Parameters {
            num_samples,
            num_size,
            num_bins,
            ..
        } = &self.parameters;

        let mut indices = vec![0usize; num_samples * num_size];

        #[cfg(feature = "parallel")]
        thread_pool::install(|| {
            indices
                .par_chunks_exact_mut(num_size)
                .enumerate()
                .for_each(|(i, row)| fill_indices(batch_seed, i, num_bins, row));
        });

        #[cfg(not(feature = "parallel"))]
        thread_pool::install(|| {
            indices
                .chunks_exact_mut(num_size)
                .enumerate()
                .for_each(|(i, row)| fill_indices(batch_seed, i, num_bins, row));
        });

        tracing::trace!(num_samples, num_size, "drew bootstrap indices");
        IndexSet::from_parts(indices, num_samples, num_size)
    }

    /// Replicas for caller-supplied bin indices.
    ///
    /// The index set may have any number of rows and bins per row; each row
    /// yields one replica. Does not touch the random source.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::Indices`] if an index is not below `num_bins`
    /// or the batch would hold more values than fit in memory.
    pub fn samples_from(&self, indices: &IndexSet) -> Result<ReplicaSet<T>> {
        indices.check_range(self.parameters.num_bins)?;
        if indices
            .num_samples()
            .checked_mul(self.parameters.num_vars)
            .is_none()
        {
            return Err(ResampleError::Indices(format!(
                "{} replicas of {} variables overflow usize",
                indices.num_samples(),
                self.parameters.num_vars
            )));
        }
        let divisor = if indices.num_size() == self.parameters.num_size {
            self.size_divisor
        } else {
            count_as("num_size", indices.num_size())?
        };
        Ok(self.replicas(indices, divisor))
    }

    /// Replay a stored record against this resampler's data.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::RecordMismatch`] if the record was produced
    /// from data of a different shape or binning.
    pub fn samples_from_record<U>(&self, record: &BootstrapRecord<U>) -> Result<ReplicaSet<T>> {
        record.check_compatible(&self.parameters)?;
        self.samples_from(&record.indices)
    }

    /// Bundle `indices` with this resampler's parameters for export.
    pub fn record(&self, indices: &IndexSet) -> BootstrapRecord<T> {
        BootstrapRecord {
            parameters: Parameters {
                num_samples: indices.num_samples(),
                num_size: indices.num_size(),
                ..self.parameters.clone()
            },
            indices: indices.clone(),
            samples: None,
        }
    }

    /// Like [`record`](Self::record), also storing the replicas of `indices`.
    ///
    /// # Errors
    ///
    /// Same as [`samples_from`](Self::samples_from).
    pub fn record_with_samples(&self, indices: &IndexSet) -> Result<BootstrapRecord<T>> {
        let samples = self.samples_from(indices)?;
        Ok(BootstrapRecord {
            samples: Some(samples.rows().map(<[T]>::to_vec).collect()),
            ..self.record(indices)
        })
    }

    /// Shape parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Shape of the variables in each row, as given by the input data.
    pub fn var_shape(&self) -> &[usize] {
        &self.parameters.var_shape
    }

    /// The configuration this resampler was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Per-bin means, `num_bins × num_vars`.
    pub fn binned(&self) -> &DataMatrix<T> {
        &self.binned
    }

    /// Per-variable mean of the binned data.
    ///
    /// Differs from the mean of the input when leading configurations were
    /// skipped.
    pub fn mean(&self) -> &[T] {
        &self.mean
    }

    fn replicas(&self, indices: &IndexSet, divisor: T) -> ReplicaSet<T> {
        let num_vars = self.parameters.num_vars;
        let num_size = indices.num_size();
        let binned: &DataMatrix<T> = &self.binned;
        let mut values = vec![T::zero(); indices.num_samples() * num_vars];

        #[cfg(feature = "parallel")]
        thread_pool::install(|| {
            values
                .par_chunks_exact_mut(num_vars)
                .zip(indices.as_slice().par_chunks_exact(num_size))
                .for_each(|(out, bins)| average_bins(binned, bins, divisor, out));
        });

        #[cfg(not(feature = "parallel"))]
        thread_pool::install(|| {
            values
                .chunks_exact_mut(num_vars)
                .zip(indices.as_slice().chunks_exact(num_size))
                .for_each(|(out, bins)| average_bins(binned, bins, divisor, out));
        });

        ReplicaSet::from_parts(values, indices.num_samples(), num_vars)
            .shaped(&self.parameters.var_shape)
    }
}

impl<T: PartialEq> PartialEq for Resampler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters && self.binned == other.binned
    }
}

fn fill_indices(batch_seed: u64, replica: usize, num_bins: usize, row: &mut [usize]) {
    let mut rng = replica_rng(batch_seed, replica);
    for slot in row {
        *slot = rng.random_range(0..num_bins);
    }
}

fn average_bins<T: Element>(
    binned: &DataMatrix<T>,
    bins: &[usize],
    divisor: T,
    out: &mut [T],
) {
    for &bin in bins {
        for (acc, &x) in out.iter_mut().zip(binned.row(bin)) {
            *acc = *acc + x;
        }
    }
    for acc in out.iter_mut() {
        *acc = *acc / divisor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(num_configs: usize, num_vars: usize) -> DataMatrix<f64> {
        let values = (0..num_configs * num_vars).map(|x| x as f64).collect();
        DataMatrix::from_vec(values, num_configs, num_vars).unwrap()
    }

    #[test]
    fn test_resampler_is_send_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<Resampler<f64>>();
        assert_send_sync::<Resampler<f32>>();
    }

    #[test]
    fn test_parameters_derived() {
        let data = ramp(1000, 4);
        let config = Config::new().num_samples(10).bin_size(5).seed(1);
        let boot = Resampler::new(&data, config).unwrap();
        let p = boot.parameters();
        assert_eq!(p.num_bins, 200);
        assert_eq!(p.num_size, 200);
        assert_eq!(p.num_configs, 1000);
        assert_eq!(p.num_vars, 4);
        assert_eq!(boot.binned().num_configs(), 200);
    }

    #[test]
    fn test_remainder_rejected_by_default() {
        let data = ramp(1001, 2);
        let err = Resampler::new(&data, Config::new().bin_size(5).seed(1)).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("cover 1000 of 1001"), "{err}");
    }

    #[test]
    fn test_remainder_skipped_leading() {
        let data = ramp(7, 1);
        let config = Config::new()
            .bin_size(2)
            .seed(1)
            .remainder(RemainderPolicy::SkipLeading);
        let boot = Resampler::new(&data, config).unwrap();
        // configuration 0 dropped, bins {1,2} {3,4} {5,6}
        assert_eq!(boot.binned().as_slice(), &[1.5, 3.5, 5.5]);
        assert_eq!(boot.mean(), &[3.5]);
        assert_eq!(boot.parameters().num_skipped(), 1);
    }

    #[test]
    fn test_with_bin_size_overrides_policy() {
        let data = ramp(1001, 2);
        let config = Config::new().num_bins(3).bin_size(5).seed(1);
        let boot = Resampler::with_bin_size(&data, config).unwrap();
        assert_eq!(boot.parameters().num_bins, 200);
        assert_eq!(boot.config().remainder, RemainderPolicy::SkipLeading);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let data = ramp(10, 2);
        for config in [
            Config::new().num_bins(0).seed(1),
            Config::new().bin_size(0).seed(1),
            Config::new().num_samples(0).seed(1),
            Config::new().num_size(0).seed(1),
            Config::new().bin_size(11).seed(1),
            Config::new().num_bins(3).bin_size(4).seed(1),
        ] {
            let err = Resampler::new(&data, config.clone()).unwrap_err();
            assert!(err.is_config(), "{config:?}: {err}");
        }

        let empty = DataMatrix::<f64>::from_vec(vec![], 0, 3).unwrap();
        assert!(Resampler::new(&empty, Config::new().seed(1)).is_err());
        let no_vars = DataMatrix::<f64>::from_vec(vec![], 3, 0).unwrap();
        assert!(Resampler::new(&no_vars, Config::new().seed(1)).is_err());
    }

    #[test]
    fn test_indices_in_range() {
        let data = ramp(60, 2);
        let config = Config::new().num_samples(50).bin_size(3).seed(9);
        let mut boot = Resampler::new(&data, config).unwrap();
        let indices = boot.draw_indices();
        assert_eq!(indices.num_samples(), 50);
        assert_eq!(indices.num_size(), 20);
        assert!(indices.as_slice().iter().all(|&b| b < 20));
    }

    #[test]
    fn test_batches_differ() {
        let data = ramp(100, 3);
        let config = Config::new().num_samples(20).bin_size(2).seed(3);
        let mut boot = Resampler::new(&data, config).unwrap();
        let first = boot.get_samples();
        let second = boot.get_samples();
        assert_ne!(first, second);
    }

    #[test]
    fn test_samples_match_manual_average() {
        let data = ramp(40, 3);
        let config = Config::new().num_samples(8).bin_size(4).seed(11);
        let mut boot = Resampler::new(&data, config).unwrap();
        let (indices, samples) = boot.get_samples_with_indices();

        for (bins, replica) in indices.rows().zip(samples.rows()) {
            for var in 0..3 {
                let expected: f64 = bins
                    .iter()
                    .map(|&b| boot.binned().row(b)[var])
                    .sum::<f64>()
                    / bins.len() as f64;
                assert!((replica[var] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_samples_from_rejects_out_of_range() {
        let data = ramp(10, 1);
        let boot = Resampler::new(&data, Config::new().bin_size(2).seed(1)).unwrap();
        let indices = IndexSet::new(vec![0, 5], 1, 2).unwrap();
        assert!(matches!(
            boot.samples_from(&indices),
            Err(ResampleError::Indices(_))
        ));
    }

    #[test]
    fn test_samples_from_custom_size() {
        let data = ramp(10, 1);
        let boot = Resampler::new(&data, Config::new().bin_size(2).seed(1)).unwrap();
        // bins: [0.5, 2.5, 4.5, 6.5, 8.5]
        let indices = IndexSet::new(vec![0, 4, 4, 1, 1, 1], 2, 3).unwrap();
        let samples = boot.samples_from(&indices).unwrap();
        assert_eq!(samples.num_samples(), 2);
        assert_eq!(samples.row(0), &[(0.5 + 8.5 + 8.5) / 3.0]);
        assert_eq!(samples.row(1), &[2.5]);
    }

    #[test]
    fn test_fork_shares_binned_data() {
        let data = ramp(50, 2);
        let boot = Resampler::new(&data, Config::new().num_samples(5).bin_size(5).seed(1)).unwrap();
        let mut a = boot.fork(100);
        let mut b = boot.fork(100);
        let mut c = boot.fork(101);
        assert!(Arc::ptr_eq(&boot.binned, &a.binned));
        assert_eq!(a.config().seed, Some(100));
        let sa = a.get_samples();
        assert_eq!(sa, b.get_samples());
        assert_ne!(sa, c.get_samples());
    }

    #[test]
    fn test_record_carries_index_shape() {
        let data = ramp(30, 2);
        let config = Config::new().num_samples(100).bin_size(3).seed(1);
        let boot = Resampler::new(&data, config).unwrap();
        let indices = IndexSet::new(vec![1, 2, 3, 4], 2, 2).unwrap();
        let record = boot.record(&indices);
        assert_eq!(record.parameters.num_samples, 2);
        assert_eq!(record.parameters.num_size, 2);
        assert_eq!(record.parameters.num_bins, 10);
        assert_eq!(
            boot.samples_from_record(&record).unwrap(),
            boot.samples_from(&indices).unwrap()
        );
    }

    #[test]
    fn test_sample_count_overflow_rejected() {
        let data = DataMatrix::filled(10, 2, 1.0);
        let config = Config::new()
            .num_samples(usize::MAX / 2 + 1)
            .bin_size(5)
            .seed(1);
        let err = Resampler::new(&data, config).unwrap_err();
        assert!(matches!(
            err,
            ResampleError::Config {
                field: "num_samples",
                ..
            }
        ));

        let wide = DataMatrix::filled(2, 3, 1.0);
        let config = Config::new().num_samples(usize::MAX / 2).num_size(1).seed(1);
        assert!(Resampler::new(&wide, config).unwrap_err().is_config());
    }

    #[test]
    fn test_record_with_samples() {
        let data = ramp(10, 1);
        let boot = Resampler::new(&data, Config::new().bin_size(2).seed(1)).unwrap();
        // bins: [0.5, 2.5, 4.5, 6.5, 8.5]
        let indices = IndexSet::new(vec![0, 1, 4, 4], 2, 2).unwrap();
        let record = boot.record_with_samples(&indices).unwrap();
        assert_eq!(record.samples, Some(vec![vec![1.5], vec![8.5]]));
        assert_eq!(record.indices, indices);
        assert!(boot.record(&indices).samples.is_none());

        let bad = IndexSet::new(vec![0, 5], 1, 2).unwrap();
        assert!(boot.record_with_samples(&bad).is_err());
    }

    #[test]
    fn test_replicas_keep_var_shape() {
        let data = ramp(20, 6).with_var_shape(vec![2, 3]).unwrap();
        let mut boot = Resampler::new(&data, Config::new().num_samples(4).seed(2)).unwrap();
        assert_eq!(boot.var_shape(), &[2, 3]);
        assert_eq!(boot.parameters().var_shape, vec![2, 3]);

        let samples = boot.get_samples();
        assert_eq!(samples.var_shape(), &[2, 3]);
        assert_eq!(samples.get(1, &[1, 0]), Some(samples.row(1)[3]));
    }

    #[test]
    fn test_equality_ignores_random_state() {
        let data = ramp(40, 2);
        let mut a = Resampler::new(&data, Config::new().bin_size(4).seed(1)).unwrap();
        let b = Resampler::new(&data, Config::new().bin_size(4).seed(2)).unwrap();
        a.get_samples();
        assert_eq!(a, b);
        assert_eq!(a, a.fork(7));

        let rebinned = Resampler::new(&data, Config::new().bin_size(5).seed(1)).unwrap();
        assert_ne!(a, rebinned);

        let shifted = DataMatrix::filled(40, 2, 3.0);
        let other = Resampler::new(&shifted, Config::new().bin_size(4).seed(1)).unwrap();
        assert_ne!(a, other);
    }
}
