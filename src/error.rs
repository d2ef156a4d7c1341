// error.rs — Error taxonomy shared by every engine.
//
//   MalformedImage   — buffer does not match width*height*channels, or the
//                      channel count is not 3. Raised before any engine runs.
//   ExecutionFailure — a parallel engine could not allocate, build its worker
//                      pool, transfer data or dispatch. Never retried, never
//                      silently replaced by the sequential path.
//   Gpu              — the GPU device could not be opened or configured.
//   ShapeMismatch    — two images compared for equivalence have different
//                      dimensions.
//
// Out-of-range filter parameters are NOT errors: they are clamped (see
// filter.rs).

use std::fmt;

use crate::gpu::device::GpuError;

/// Errors produced by filter engines and the benchmark harness.
#[derive(Debug)]
pub enum FilterError {
    /// Pixel buffer length or channel count violates the `RgbImage` invariant.
    MalformedImage {
        width: usize,
        height: usize,
        channels: usize,
        len: usize,
    },
    /// The parallel execution domain failed (allocation, transfer, dispatch).
    ExecutionFailure(String),
    /// GPU device could not be initialised or configured.
    Gpu(GpuError),
    /// Two images expected to have identical shape do not.
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::MalformedImage { width, height, channels, len } => write!(
                f,
                "malformed image: {width}×{height}×{channels} expects {} bytes, buffer has {len}",
                width.saturating_mul(*height).saturating_mul(*channels)
            ),
            FilterError::ExecutionFailure(msg) => write!(f, "parallel execution failed: {msg}"),
            FilterError::Gpu(e) => write!(f, "gpu error: {e}"),
            FilterError::ShapeMismatch { left, right } => write!(
                f,
                "image shapes differ: {}×{} vs {}×{}",
                left.0, left.1, right.0, right.1
            ),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FilterError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl FilterError {
    /// Wrap a GPU failure that happened while running a filter, as opposed to
    /// while opening the device.
    pub fn gpu_execution(e: GpuError) -> Self {
        FilterError::ExecutionFailure(format!("gpu: {e}"))
    }
}

impl From<GpuError> for FilterError {
    fn from(e: GpuError) -> Self {
        FilterError::Gpu(e)
    }
}
