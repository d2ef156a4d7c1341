// engine.rs — The capability every filter back-end provides.
//
//   SequentialEngine  (sequential.rs)  single thread, the reference
//   ParallelEngine    (parallel.rs)    rayon worker pool over row bands
//   GpuEngine         (gpu/filters.rs) wgpu compute, one invocation per pixel
//
// An engine takes the image BY VALUE. The caller hands over exclusive
// ownership, so there is no way for two engines (or the caller) to alias the
// buffer being filtered. Pointwise filters may reuse the buffer in place;
// neighborhood filters must gather from it into a fresh output.

use crate::error::FilterError;
use crate::filter::FilterRequest;
use crate::image::RgbImage;

/// A filter back-end.
///
/// `Send + Sync` so an engine can be shared behind `&dyn Engine` by the
/// benchmark harness and by benches that reuse one compiled GPU pipeline.
pub trait Engine: Send + Sync {
    /// Short label used in logs and benchmark reports.
    fn name(&self) -> &str;

    /// Apply `request` to `image` and return the filtered image.
    ///
    /// The call is synchronous: when it returns, every output element has
    /// been computed and is visible to the caller.
    ///
    /// # Errors
    /// - `FilterError::MalformedImage` if `image` violates the shape
    ///   invariant (checked before any work starts).
    /// - `FilterError::ExecutionFailure` if a parallel back-end fails.
    fn apply(&self, request: &FilterRequest, image: RgbImage) -> Result<RgbImage, FilterError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, request: &FilterRequest, image: RgbImage) -> Result<RgbImage, FilterError> {
        (**self).apply(request, image)
    }
}
