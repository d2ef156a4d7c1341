// demos/compare_engines.rs — Sequential vs parallel timings for every filter.
//
// Runs each filter through the benchmark harness with the sequential engine
// as reference and the rayon engine (and the GPU engine, if an adapter is
// available) as candidate, then prints timings, speedup and the largest
// per-channel difference.
//
// USAGE
// ─────
//   cargo run --release --example compare_engines                  # generated 1280×720 scene
//   cargo run --release --example compare_engines -- img.png       # any image file
//   cargo run --release --example compare_engines -- img.png 0.3 1.8
//                                                   # brightness delta, contrast factor
//   cargo run --release --example compare_engines -- img.png 0.3 1.8 out_dir
//                                                   # also write candidate outputs as PNG

use std::path::Path;

use dualpix::engine::Engine;
use dualpix::filter::FilterRequest;
use dualpix::gpu::{GpuDevice, GpuEngine};
use dualpix::harness::run_benchmark;
use dualpix::image::RgbImage;
use dualpix::parallel::ParallelEngine;
use dualpix::sequential::SequentialEngine;

const TOLERANCE: u8 = 1;

fn main() {
    env_logger::init();

    // --- Parse arguments ---
    let args: Vec<String> = std::env::args().collect();
    let delta: f32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let factor: f32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1.5);
    let out_dir = args.get(4).map(Path::new);

    // --- Load or generate source image ---
    let src = match args.get(1) {
        Some(path) => match load_image(path) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("[compare_engines] {e}");
                std::process::exit(1);
            }
        },
        None => {
            eprintln!("[compare_engines] no image path given, using generated scene");
            make_scene(1280, 720)
        }
    };
    println!("source: {}×{}", src.width(), src.height());

    // --- Engines ---
    let reference = SequentialEngine::new();
    let parallel = ParallelEngine::default();
    println!("parallel: {} rayon threads", parallel.num_threads());
    let gpu = match GpuDevice::new() {
        Ok(dev) => {
            println!("gpu: {}", dev.adapter_info);
            Some(GpuEngine::new(dev))
        }
        Err(e) => {
            println!("gpu: unavailable ({e})");
            None
        }
    };
    let mut candidates: Vec<&dyn Engine> = vec![&parallel];
    if let Some(g) = &gpu {
        candidates.push(g);
    }

    let requests = [
        FilterRequest::grayscale(),
        FilterRequest::brightness(delta),
        FilterRequest::contrast(factor),
        FilterRequest::box_blur(),
        FilterRequest::sobel(),
    ];

    // --- Run ---
    println!();
    println!(
        "{:<18} {:<10} {:>10} {:>10} {:>8} {:>8}",
        "filter", "candidate", "seq ms", "cand ms", "speedup", "maxdiff"
    );
    let mut failures = 0;
    for req in &requests {
        for candidate in &candidates {
            let report = match run_benchmark(&src, req, &reference, *candidate) {
                Ok(r) => r,
                Err(e) => {
                    println!("{:<18} {:<10} error: {e}", req.to_string(), candidate.name());
                    failures += 1;
                    continue;
                }
            };
            let cmp = match report.compare(TOLERANCE) {
                Ok(c) => c,
                Err(e) => {
                    println!("{:<18} {:<10} error: {e}", req.to_string(), candidate.name());
                    failures += 1;
                    continue;
                }
            };
            let t = report.timing;
            println!(
                "{:<18} {:<10} {:>10.3} {:>10.3} {:>7.2}x {:>8}{}",
                req.to_string(),
                report.candidate_engine,
                t.cpu_ms,
                t.gpu_ms,
                t.speedup,
                cmp.max_abs_diff,
                if cmp.within_tolerance() { "" } else { "  MISMATCH" },
            );
            if !cmp.within_tolerance() {
                failures += 1;
            }
            if let Some(dir) = out_dir {
                let name = format!("{}_{}.png", req.kind, report.candidate_engine);
                if let Err(e) = save_image(&dir.join(name), report.candidate) {
                    eprintln!("[compare_engines] {e}");
                }
            }
        }
    }

    if failures > 0 {
        eprintln!("[compare_engines] {failures} run(s) failed or exceeded ±{TOLERANCE}");
        std::process::exit(1);
    }
}

// ============================================================
// Helpers
// ============================================================

fn make_scene(w: usize, h: usize) -> RgbImage {
    let mut img = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            img.set_pixel(x, y, [(x * 200 / w) as u8, (y * 180 / h) as u8, ((x ^ y) & 63) as u8]);
        }
    }
    for rect in 0..6 {
        let rx = (50 + rect * 180) % w;
        let ry = (40 + (rect % 3) * 200) % h;
        let bright = 180u8 + rect as u8 * 10;
        for y in ry..(ry + 120).min(h) {
            for x in rx..(rx + 160).min(w) {
                img.set_pixel(x, y, [bright, 255 - bright, bright / 3]);
            }
        }
    }
    img
}

fn load_image(path: &str) -> Result<RgbImage, String> {
    let img = image::open(path)
        .map_err(|e| format!("failed to open {path}: {e}"))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    RgbImage::from_raw(w as usize, h as usize, img.into_raw()).map_err(|e| e.to_string())
}

fn save_image(path: &Path, img: RgbImage) -> Result<(), String> {
    let (w, h) = (img.width() as u32, img.height() as u32);
    let buf = image::RgbImage::from_raw(w, h, img.into_raw())
        .ok_or_else(|| format!("buffer does not match {w}x{h}"))?;
    buf.save(path).map_err(|e| format!("failed to save {}: {e}", path.display()))
}
