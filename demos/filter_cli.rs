// demos/filter_cli.rs — Apply one filter to an image file.
//
// USAGE
// ─────
//   cargo run --release --example filter_cli -- <input> <output> <filter> [param]
//       [--engine sequential|parallel|gpu]
//
//   filter:  grayscale | brightness <delta> | contrast <factor> | blur | sobel
//            delta in [-1, 1], factor >= 0 (1.0 = unchanged)
//
// Without --engine the GPU engine is used, falling back to the rayon engine
// when no adapter is available.
//
// Any format the `image` crate can read is accepted; alpha is dropped. The
// output format follows the output file extension. Set RUST_LOG=debug to see
// adapter selection and dispatch details.

use std::process::ExitCode;
use std::time::Instant;

use dualpix::engine::Engine;
use dualpix::filter::{FilterKind, FilterParams, FilterRequest};
use dualpix::gpu::{DeviceProfile, GpuEngine};
use dualpix::image::RgbImage;
use dualpix::parallel::ParallelEngine;
use dualpix::sequential::SequentialEngine;

fn print_usage() {
    println!("Usage: filter_cli <input> <output> <filter> [params] [--engine sequential|parallel|gpu]");
    println!("Filters:");
    println!("  grayscale");
    println!("  brightness <delta>    (delta in [-1.0, 1.0])");
    println!("  contrast <factor>     (factor >= 0, e.g. 0.5, 1.0, 1.5, 2.0)");
    println!("  blur");
    println!("  sobel");
    println!("Engine defaults to gpu, or parallel when no GPU adapter is found.");
}

fn main() -> ExitCode {
    env_logger::init();

    // --- Parse arguments ---
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut engine_name: Option<String> = None;
    if let Some(pos) = args.iter().position(|a| a == "--engine") {
        if pos + 1 >= args.len() {
            eprintln!("--engine requires a value");
            print_usage();
            return ExitCode::FAILURE;
        }
        engine_name = Some(args.remove(pos + 1));
        args.remove(pos);
    }
    if args.len() < 3 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let kind: FilterKind = match args[2].parse() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    let request = match parse_request(kind, args.get(3)) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(&args[0], &args[1], &request, engine_name.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("Error: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn parse_request(kind: FilterKind, param: Option<&String>) -> Result<FilterRequest, String> {
    let parse = |what: &str| -> Result<f32, String> {
        let raw = param.ok_or_else(|| format!("{kind} requires <{what}>"))?;
        raw.parse::<f32>().map_err(|e| format!("invalid {what} '{raw}': {e}"))
    };
    Ok(match kind {
        FilterKind::Brightness => FilterRequest::brightness(parse("delta")?),
        FilterKind::Contrast => FilterRequest::contrast(parse("factor")?),
        k => FilterRequest::new(k, FilterParams::default()),
    })
}

fn make_engine(name: Option<&str>) -> Result<Box<dyn Engine>, String> {
    let Some(name) = name else {
        return Ok(match GpuEngine::with_profile(DeviceProfile::Native) {
            Ok(engine) => {
                println!("GPU: {}", engine.device().adapter_info);
                Box::new(engine)
            }
            Err(e) => {
                println!("GPU unavailable ({e}), using the parallel CPU engine");
                Box::new(ParallelEngine::default())
            }
        });
    };
    match name {
        "sequential" | "cpu" => Ok(Box::new(SequentialEngine::new())),
        "parallel" | "rayon" => Ok(Box::new(ParallelEngine::default())),
        "gpu" => {
            let engine = GpuEngine::with_profile(DeviceProfile::Native).map_err(|e| e.to_string())?;
            println!("GPU: {}", engine.device().adapter_info);
            Ok(Box::new(engine))
        }
        other => Err(format!("unknown engine '{other}' (expected sequential, parallel or gpu)")),
    }
}

fn run(
    input: &str,
    output: &str,
    request: &FilterRequest,
    engine_name: Option<&str>,
) -> Result<(), String> {
    let src = load_image(input)?;
    println!("Loaded {input} ({}x{})", src.width(), src.height());

    let engine = make_engine(engine_name)?;
    let start = Instant::now();
    let out = engine.apply(request, src).map_err(|e| e.to_string())?;
    let ms = start.elapsed().as_secs_f64() * 1e3;
    println!("Filter '{request}' on {} done in {ms:.3} ms", engine.name());

    save_image(output, out)?;
    println!("Saved result to {output}");
    Ok(())
}

fn load_image(path: &str) -> Result<RgbImage, String> {
    let img = image::open(path)
        .map_err(|e| format!("failed to open {path}: {e}"))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    RgbImage::from_raw(w as usize, h as usize, img.into_raw()).map_err(|e| e.to_string())
}

fn save_image(path: &str, img: RgbImage) -> Result<(), String> {
    let (w, h) = (img.width() as u32, img.height() as u32);
    let buf = image::RgbImage::from_raw(w, h, img.into_raw())
        .ok_or_else(|| format!("buffer does not match {w}x{h}"))?;
    buf.save(path).map_err(|e| format!("failed to save {path}: {e}"))
}
