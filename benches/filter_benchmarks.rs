// benches/filter_benchmarks.rs — Per-filter timings for all three engines.
//
//   cargo bench --bench filter_benchmarks
//
// Each filter gets one group with a sequential, a rayon and (if an adapter
// is present) a GPU entry, at 640×480 and 1920×1080. The GPU entries include
// pack, upload, dispatch, readback and unpack: the same round trip the
// harness times, which is what a caller waiting on the result pays.
//
// The first GPU iterations pay driver-side pipeline compilation, so warm-up
// is set explicitly.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use dualpix::engine::Engine;
use dualpix::filter::FilterRequest;
use dualpix::gpu::{GpuDevice, GpuEngine};
use dualpix::image::RgbImage;
use dualpix::parallel::ParallelEngine;
use dualpix::sequential::SequentialEngine;

// ============================================================
// Shared helpers
// ============================================================

fn make_scene(w: usize, h: usize) -> RgbImage {
    let mut img = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set_pixel(x, y, [(x * 200 / w) as u8, (y * 180 / h) as u8, ((x + y) % 64) as u8]);
        }
    }
    for rect in 0..6 {
        let rx = (50 + rect * 100) % w;
        let ry = (40 + (rect % 3) * 120) % h;
        let bright = 180u8 + rect as u8 * 10;
        for y in ry..(ry + 60).min(h) {
            for x in rx..(rx + 80).min(w) {
                img.set_pixel(x, y, [bright, bright / 2, 255 - bright]);
            }
        }
    }
    img
}

const SIZES: [(usize, usize); 2] = [(640, 480), (1920, 1080)];

fn requests() -> [(&'static str, FilterRequest); 5] {
    [
        ("grayscale", FilterRequest::grayscale()),
        ("brightness", FilterRequest::brightness(0.2)),
        ("contrast", FilterRequest::contrast(1.5)),
        ("blur", FilterRequest::box_blur()),
        ("sobel", FilterRequest::sobel()),
    ]
}

// ============================================================
// Benchmarks
// ============================================================

fn bench_filters(c: &mut Criterion) {
    let gpu = match GpuDevice::new() {
        Ok(dev) => Some(GpuEngine::new(dev)),
        Err(e) => {
            eprintln!("GPU benchmarks skipped: {e}");
            None
        }
    };

    let mut engines: Vec<&dyn Engine> = Vec::new();
    let seq = SequentialEngine::new();
    let par = ParallelEngine::default();
    engines.push(&seq);
    engines.push(&par);
    if let Some(g) = &gpu {
        engines.push(g);
    }

    for (name, req) in requests() {
        let mut group = c.benchmark_group(name);
        group.warm_up_time(Duration::from_secs(2));
        group.sample_size(20);

        for (w, h) in SIZES {
            let img = make_scene(w, h);
            group.throughput(Throughput::Elements((w * h) as u64));
            for engine in &engines {
                group.bench_with_input(
                    BenchmarkId::new(engine.name(), format!("{w}x{h}")),
                    &img,
                    |b, img| {
                        b.iter_batched(
                            || img.clone(),
                            |input| engine.apply(&req, input).unwrap(),
                            criterion::BatchSize::LargeInput,
                        )
                    },
                );
            }
        }
        group.finish();
    }
}

// ============================================================
// Register
// ============================================================

criterion_group!(benches, bench_filters);
criterion_main!(benches);
