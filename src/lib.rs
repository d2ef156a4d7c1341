// dualpix: one set of RGB image filters, three ways to run them
//
// A single-threaded reference engine, a rayon engine over row bands and a
// wgpu compute engine, all computing the same per-element math from
// `filter`. The benchmark harness times a reference against a candidate and
// checks the two outputs agree to within ±1 per channel.

pub mod image;
pub mod error;
pub mod filter;
pub mod engine;
pub mod sequential;
pub mod parallel;
pub mod harness;
pub mod gpu;

pub use engine::Engine;
pub use error::FilterError;
pub use filter::{FilterKind, FilterParams, FilterRequest};
pub use harness::{compare, run_benchmark, BenchmarkReport, Comparison, Timing};
pub use image::RgbImage;
pub use parallel::{ParallelConfig, ParallelEngine};
pub use sequential::SequentialEngine;
