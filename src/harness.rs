// harness.rs — Time one filter on two engines and compare the results.
//
// The reference engine (normally `SequentialEngine`) is timed as `cpu_ms`,
// the candidate (`ParallelEngine` or `GpuEngine`) as `gpu_ms`, whichever of
// the two it is.
//
// Each engine gets its own deep copy of the source, cloned outside the timed
// region. The engines run one after the other, never concurrently, so
// neither timing includes contention from the other.

use std::fmt;
use std::time::Instant;

use log::debug;

use crate::engine::Engine;
use crate::error::FilterError;
use crate::filter::FilterRequest;
use crate::image::RgbImage;

/// Wall-clock timings of one benchmark run, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub cpu_ms: f64,
    pub gpu_ms: f64,
    pub speedup: f64,
}

impl Timing {
    /// `speedup = cpu_ms / gpu_ms` when `gpu_ms > 0`, otherwise `0`.
    pub fn new(cpu_ms: f64, gpu_ms: f64) -> Self {
        let speedup = if gpu_ms > 0.0 { cpu_ms / gpu_ms } else { 0.0 };
        Timing { cpu_ms, gpu_ms, speedup }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reference {:.3} ms, candidate {:.3} ms, speedup {:.2}x",
            self.cpu_ms, self.gpu_ms, self.speedup
        )
    }
}

/// Both outputs of a benchmark run plus its timings.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub reference: RgbImage,
    pub candidate: RgbImage,
    pub timing: Timing,
    pub reference_engine: String,
    pub candidate_engine: String,
}

impl BenchmarkReport {
    /// Compare the two outputs channel by channel.
    pub fn compare(&self, tolerance: u8) -> Result<Comparison, FilterError> {
        compare(&self.reference, &self.candidate, tolerance)
    }
}

/// Run `request` on `reference`, then on `candidate`, each over its own copy
/// of `src`.
///
/// # Errors
/// - `MalformedImage` if `src` is malformed; no engine is run.
/// - The first engine error, unchanged. No partial report is produced and
///   a failed candidate is not retried on the reference.
pub fn run_benchmark(
    src: &RgbImage,
    request: &FilterRequest,
    reference: &dyn Engine,
    candidate: &dyn Engine,
) -> Result<BenchmarkReport, FilterError> {
    src.validate()?;

    let input = src.clone();
    let t0 = Instant::now();
    let reference_out = reference.apply(request, input)?;
    let cpu_ms = t0.elapsed().as_secs_f64() * 1e3;

    let input = src.clone();
    let t0 = Instant::now();
    let candidate_out = candidate.apply(request, input)?;
    let gpu_ms = t0.elapsed().as_secs_f64() * 1e3;

    let timing = Timing::new(cpu_ms, gpu_ms);
    debug!(
        "{request} on {}×{}: {} {:.3} ms, {} {:.3} ms, speedup {:.2}x",
        src.width(),
        src.height(),
        reference.name(),
        cpu_ms,
        candidate.name(),
        gpu_ms,
        timing.speedup,
    );

    Ok(BenchmarkReport {
        reference: reference_out,
        candidate: candidate_out,
        timing,
        reference_engine: reference.name().to_string(),
        candidate_engine: candidate.name().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Equivalence
// ---------------------------------------------------------------------------

/// Channel-wise difference between two images of the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// Largest absolute difference over all channels.
    pub max_abs_diff: u8,
    /// Channels whose difference exceeds the tolerance.
    pub mismatched: usize,
}

impl Comparison {
    pub fn within_tolerance(&self) -> bool {
        self.mismatched == 0
    }
}

/// Compare `a` and `b` channel by channel.
///
/// # Errors
/// `ShapeMismatch` if the images differ in width or height.
pub fn compare(a: &RgbImage, b: &RgbImage, tolerance: u8) -> Result<Comparison, FilterError> {
    if !a.same_shape(b) {
        return Err(FilterError::ShapeMismatch {
            left: (a.width(), a.height()),
            right: (b.width(), b.height()),
        });
    }
    let mut cmp = Comparison { max_abs_diff: 0, mismatched: 0 };
    for (&x, &y) in a.as_slice().iter().zip(b.as_slice()) {
        let d = x.abs_diff(y);
        cmp.max_abs_diff = cmp.max_abs_diff.max(d);
        if d > tolerance {
            cmp.mismatched += 1;
        }
    }
    debug!(
        "compare {}×{}: max diff {}, {} channels over ±{tolerance}",
        a.width(),
        a.height(),
        cmp.max_abs_diff,
        cmp.mismatched
    );
    Ok(cmp)
}
