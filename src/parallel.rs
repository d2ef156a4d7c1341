// parallel.rs — Data-parallel CPU engine on a rayon worker pool.
//
// The output buffer is cut into bands of `rows_per_task` whole rows with
// `par_chunks_mut`. Each band is one unit of work:
//
//   ┌──────────────────────────────┐
//   │ band 0   rows 0 .. R          │ ← task A writes only here
//   ├──────────────────────────────┤
//   │ band 1   rows R .. 2R         │ ← task B writes only here
//   ├──────────────────────────────┤
//   │ ...                           │
//   └──────────────────────────────┘
//
// Pointwise filters own their band of the (moved-in) input and update it in
// place: every element depends only on itself. Neighborhood filters gather
// from the shared, read-only input image and write into a freshly allocated
// output, so a band may read rows belonging to another band but never writes
// outside its own. No task waits on, or observes, any other task; the bands
// may complete in any order.
//
// The per-element math is the same `filter::*` function the sequential
// engine calls, so the result is bit-identical to the reference, not merely
// within tolerance.
//
// The call is synchronous: `par_chunks_mut(..).for_each` returns only after
// every band has finished.

use log::debug;
use rayon::prelude::*;

use crate::engine::Engine;
use crate::error::FilterError;
use crate::filter::{
    box_blur_at, brightness_value, contrast_value, grayscale_value, sobel_at, FilterKind,
    FilterRequest,
};
use crate::image::{RgbImage, CHANNELS};

/// Configuration for [`ParallelEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads for a dedicated pool. `None` uses rayon's global pool
    /// (one worker per logical CPU unless `RAYON_NUM_THREADS` says otherwise).
    pub threads: Option<usize>,
    /// Rows per unit of work. Values below 1 are treated as 1; values above
    /// the image height give a single band.
    pub rows_per_task: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig { threads: None, rows_per_task: 16 }
    }
}

/// Multi-threaded engine. Output is identical to `SequentialEngine`.
pub struct ParallelEngine {
    config: ParallelConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Default for ParallelEngine {
    fn default() -> Self {
        ParallelEngine { config: ParallelConfig::default(), pool: None }
    }
}

impl ParallelEngine {
    /// Create an engine with the given configuration.
    ///
    /// # Errors
    /// `FilterError::ExecutionFailure` if a dedicated pool was requested and
    /// rayon could not spawn its workers.
    pub fn new(config: ParallelConfig) -> Result<Self, FilterError> {
        let pool = match config.threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("dualpix-worker-{i}"))
                    .build()
                    .map_err(|e| FilterError::ExecutionFailure(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(ParallelEngine { config, pool })
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Number of workers that will execute the bands.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Band height for an image of `height` rows: at least one row, at most
    /// the whole image.
    fn band_rows(&self, height: usize) -> usize {
        self.config.rows_per_task.max(1).min(height.max(1))
    }
}

impl Engine for ParallelEngine {
    fn name(&self) -> &str {
        "parallel"
    }

    fn apply(&self, request: &FilterRequest, image: RgbImage) -> Result<RgbImage, FilterError> {
        image.validate()?;
        let rows = self.band_rows(image.height());
        debug!(
            "parallel {request}: {} px ({}×{}, {}) in {} bands of {rows} rows on {} threads",
            image.pixel_count(),
            image.width(),
            image.height(),
            if request.kind.is_neighborhood() { "gather" } else { "in place" },
            image.height().div_ceil(rows),
            self.num_threads(),
        );
        match &self.pool {
            Some(pool) => pool.install(|| run(request, image, rows)),
            None => run(request, image, rows),
        }
    }
}

// ---------------------------------------------------------------------------
// Band kernels
// ---------------------------------------------------------------------------

fn run(request: &FilterRequest, image: RgbImage, rows: usize) -> Result<RgbImage, FilterError> {
    let p = request.effective_params();
    match request.kind {
        FilterKind::Grayscale => Ok(map_pixels(image, rows, |px| {
            let g = grayscale_value(px[0], px[1], px[2]);
            px.fill(g);
        })),
        FilterKind::Brightness => Ok(map_pixels(image, rows, |px| {
            for v in px.iter_mut() {
                *v = brightness_value(*v, p.delta);
            }
        })),
        FilterKind::Contrast => Ok(map_pixels(image, rows, |px| {
            for v in px.iter_mut() {
                *v = contrast_value(*v, p.factor);
            }
        })),
        FilterKind::BoxBlur => gather(&image, rows, |src, x, y, out| {
            for (c, o) in out.iter_mut().enumerate() {
                *o = box_blur_at(src, x, y, c);
            }
        }),
        FilterKind::Sobel => gather(&image, rows, |src, x, y, out| {
            out.fill(sobel_at(src, x, y));
        }),
    }
}

/// Pointwise: each band updates its own pixels in place.
fn map_pixels<F>(mut image: RgbImage, rows: usize, f: F) -> RgbImage
where
    F: Fn(&mut [u8]) + Sync,
{
    let band_len = rows * image.width() * CHANNELS;
    image
        .as_mut_slice()
        .par_chunks_mut(band_len)
        .for_each(|band| band.chunks_exact_mut(CHANNELS).for_each(&f));
    image
}

/// Neighborhood: each band reads the shared input and writes its own rows of
/// a distinct output image.
fn gather<F>(src: &RgbImage, rows: usize, f: F) -> Result<RgbImage, FilterError>
where
    F: Fn(&RgbImage, usize, usize, &mut [u8]) + Sync,
{
    let w = src.width();
    let row_len = w * CHANNELS;
    let mut dst = alloc_output(w, src.height())?;
    dst.as_mut_slice()
        .par_chunks_mut(rows * row_len)
        .enumerate()
        .for_each(|(band_idx, band)| {
            let y0 = band_idx * rows;
            for (r, row) in band.chunks_exact_mut(row_len).enumerate() {
                let y = y0 + r;
                for (x, out) in row.chunks_exact_mut(CHANNELS).enumerate() {
                    f(src, x, y, out);
                }
            }
        });
    Ok(dst)
}

/// Allocate the output buffer, reporting allocation failure instead of
/// aborting.
fn alloc_output(width: usize, height: usize) -> Result<RgbImage, FilterError> {
    let len = width * height * CHANNELS;
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        FilterError::ExecutionFailure(format!("cannot allocate {len}-byte output: {e}"))
    })?;
    buf.resize(len, 0);
    RgbImage::from_raw(width, height, buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::SequentialEngine;

    fn noise(w: usize, h: usize, seed: u32) -> RgbImage {
        let mut rng = seed;
        let data = (0..w * h * CHANNELS)
            .map(|_| {
                rng = rng.wrapping_mul(1664525).wrapping_add(1013904223);
                (rng >> 24) as u8
            })
            .collect();
        RgbImage::from_raw(w, h, data).unwrap()
    }

    fn requests() -> Vec<FilterRequest> {
        vec![
            FilterRequest::grayscale(),
            FilterRequest::brightness(0.3),
            FilterRequest::brightness(-0.6),
            FilterRequest::contrast(1.8),
            FilterRequest::contrast(0.4),
            FilterRequest::box_blur(),
            FilterRequest::sobel(),
        ]
    }

    #[test]
    fn test_default_config() {
        let c = ParallelConfig::default();
        assert_eq!(c.threads, None);
        assert_eq!(c.rows_per_task, 16);
    }

    #[test]
    fn test_matches_sequential_exactly() {
        let src = noise(37, 23, 7);
        let seq = SequentialEngine::new();
        let par = ParallelEngine::default();
        for req in requests() {
            let a = seq.apply(&req, src.clone()).unwrap();
            let b = par.apply(&req, src.clone()).unwrap();
            assert_eq!(a, b, "mismatch for {req}");
        }
    }

    #[test]
    fn test_band_sizes_that_do_not_divide_height() {
        let src = noise(11, 13, 99);
        let seq = SequentialEngine::new();
        for rows in [0, 1, 2, 5, 12, 13, 64, usize::MAX] {
            let par = ParallelEngine::new(ParallelConfig { threads: None, rows_per_task: rows })
                .unwrap();
            for req in [
                FilterRequest::box_blur(),
                FilterRequest::sobel(),
                FilterRequest::grayscale(),
                FilterRequest::contrast(1.4),
            ] {
                let a = seq.apply(&req, src.clone()).unwrap();
                let b = par.apply(&req, src.clone()).unwrap();
                assert_eq!(a, b, "rows_per_task={rows} {req}");
            }
        }
    }

    #[test]
    fn test_band_rows_bounded_by_height() {
        let cfg = |rows| ParallelEngine::new(ParallelConfig { threads: None, rows_per_task: rows })
            .unwrap();
        assert_eq!(cfg(0).band_rows(13), 1);
        assert_eq!(cfg(5).band_rows(13), 5);
        assert_eq!(cfg(64).band_rows(13), 13);
        assert_eq!(cfg(usize::MAX).band_rows(13), 13);
        assert_eq!(cfg(usize::MAX).band_rows(1), 1);
    }

    #[test]
    fn test_one_band_for_huge_rows_per_task() {
        let par = ParallelEngine::new(ParallelConfig { threads: None, rows_per_task: usize::MAX })
            .unwrap();
        let out = par.apply(&FilterRequest::grayscale(), RgbImage::filled(4, 4, [10, 20, 30])).unwrap();
        assert_eq!(out.pixel(3, 3), [18, 18, 18]);
        let out = par.apply(&FilterRequest::box_blur(), RgbImage::filled(4, 4, [10, 20, 30])).unwrap();
        assert!(out.as_slice().chunks_exact(3).all(|px| px == [10, 20, 30]));
    }

    #[test]
    fn test_dedicated_pool() {
        let par = ParallelEngine::new(ParallelConfig { threads: Some(3), rows_per_task: 1 }).unwrap();
        assert_eq!(par.num_threads(), 3);
        let src = noise(16, 16, 3);
        let a = SequentialEngine::new().apply(&FilterRequest::sobel(), src.clone()).unwrap();
        let b = par.apply(&FilterRequest::sobel(), src).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_shapes() {
        let seq = SequentialEngine::new();
        let par = ParallelEngine::default();
        for (w, h) in [(1, 1), (1, 9), (9, 1), (2, 2)] {
            let src = noise(w, h, (w * 31 + h) as u32);
            for req in requests() {
                let a = seq.apply(&req, src.clone()).unwrap();
                let b = par.apply(&req, src.clone()).unwrap();
                assert_eq!(a, b, "{w}×{h} {req}");
            }
        }
    }

    #[test]
    fn test_white_box_blur_stays_white() {
        let src = RgbImage::filled(3, 3, [255, 255, 255]);
        let out = ParallelEngine::default().apply(&FilterRequest::box_blur(), src).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 255));
    }
}
