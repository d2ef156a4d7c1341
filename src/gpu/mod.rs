// gpu/mod.rs — GPU filter engine.
//
// wgpu compute kernels that mirror the CPU filters in `crate::filter`. The
// sequential engine stays the authoritative reference; every kernel is
// checked against it (±1 per channel) in the #[ignore]d tests here and in
// tests/test_equivalence.rs.
//
//   device   adapter selection, limits, workgroup geometry
//   buffer   packed-u32 RGB storage buffers, upload and readback
//   filters  compiled pipelines and the `GpuEngine`

pub mod buffer;
pub mod device;
pub mod filters;

pub use device::{DeviceProfile, GpuDevice, GpuError, WorkgroupSize};
pub use filters::{GpuEngine, GpuFilterPipeline};
