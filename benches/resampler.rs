use bootstats::{Config, DataMatrix, Resampler};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const N_SAMPLES: usize = 400;
const N_BIN_SIZE: usize = 5;
const N_CONFIGS: usize = 1000;
const N_VARS: usize = 128 * 4;

fn bench_get_samples(c: &mut Criterion) {
    let data = DataMatrix::filled(N_CONFIGS, N_VARS, 1.0_f64);
    let config = Config::new()
        .num_samples(N_SAMPLES)
        .num_bins(N_CONFIGS / N_BIN_SIZE)
        .bin_size(N_BIN_SIZE)
        .seed(42);
    let mut boot = Resampler::new(&data, config).expect("benchmark configuration is valid");

    let mut group = c.benchmark_group("resampler");
    group.sample_size(50);
    group.bench_function("get_samples_f64", |b| {
        b.iter(|| black_box(boot.get_samples()));
    });
    group.finish();
}

fn bench_num_vars(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampler_num_vars");
    group.sample_size(20);
    for num_vars in [16, 128, 512] {
        let data = DataMatrix::filled(N_CONFIGS, num_vars, 1.0_f32);
        let config = Config::new().num_samples(N_SAMPLES).bin_size(N_BIN_SIZE).seed(7);
        let mut boot = Resampler::new(&data, config).expect("benchmark configuration is valid");
        group.bench_with_input(BenchmarkId::from_parameter(num_vars), &num_vars, |b, _| {
            b.iter(|| black_box(boot.get_samples()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get_samples, bench_num_vars);
criterion_main!(benches);
