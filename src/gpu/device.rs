// gpu/device.rs — wgpu adapter/device selection and dispatch geometry.
//
// Responsibilities:
//   - Pick a hardware adapter (never a software rasterizer if a real GPU
//     exists) and open a device + queue on it.
//   - Expose a `DeviceProfile` that requests reduced limits, so a kernel that
//     would overflow a small embedded GPU fails on the workstation too.
//   - Own the `WorkgroupSize` the filter shaders are specialised with, and
//     turn an image size into a 2-D dispatch grid.
//
// ADAPTER SELECTION
// ─────────────────
// `request_adapter` happily returns llvmpipe when it is the only thing with
// the preferred power profile. We enumerate explicitly and take the first
// adapter whose type is not `Cpu`; a software adapter is used only if it is
// the sole option, and that is logged at warn level because timings from it
// say nothing about a real GPU.
//
// LIMITS
// ──────
// Under `DeviceProfile::Embedded` we ask for *lower* limits than the
// hardware has. wgpu validates every buffer and dispatch against the
// requested limits, so an image that exceeds the storage-buffer cap of the
// target is rejected here, before it is shipped.
//
// `pollster::block_on` drives wgpu's async adapter/device API to completion
// on the calling thread; every public entry point in this crate is
// synchronous.

use std::fmt;

use log::{debug, info, warn};

/// Hardware profile controlling device limits and the default workgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    /// Use the adapter's default wgpu limits.
    Native,
    /// Cap limits to what a small embedded GPU (VideoCore-class, 256
    /// invocations per workgroup) reports.
    Embedded,
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Native => write!(f, "native"),
            DeviceProfile::Embedded => write!(f, "embedded (capped limits)"),
        }
    }
}

/// 2-D workgroup dimensions baked into the filter shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Default for a profile.
    ///
    /// - `Native`: 16×8 = 128 invocations, four 32-wide warps or two 64-wide
    ///   wavefronts. 16 along x keeps a workgroup's loads on few cache lines
    ///   of a row-major image.
    /// - `Embedded`: 8×8 = 64, well under the 256-invocation cap.
    pub fn for_profile(profile: DeviceProfile) -> Self {
        match profile {
            DeviceProfile::Native => WorkgroupSize { x: 16, y: 8 },
            DeviceProfile::Embedded => WorkgroupSize { x: 8, y: 8 },
        }
    }

    /// Number of workgroups along each axis needed to cover `width × height`
    /// pixels. Ceiling division: the last group in a row or column may hang
    /// past the image edge, and the shader discards those invocations.
    pub fn dispatch_for(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.x), height.div_ceil(self.y))
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Adapter identity, kept for logs and benchmark reports.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl AdapterInfo {
    /// True for llvmpipe, SwiftShader, WARP and friends.
    pub fn is_software(&self) -> bool {
        self.device_type == wgpu::DeviceType::Cpu
    }
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// An opened GPU: device, queue and the profile it was opened with.
///
/// Opening one is expensive (instance + adapter + device). Hold one for the
/// lifetime of the program and share it by reference.
///
/// Fields drop top to bottom; `_instance` is last so the instance outlives
/// the device and queue created from it. Some Vulkan layers crash if the
/// instance goes first.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub profile: DeviceProfile,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    pub limits: wgpu::Limits,
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Open the best available adapter with `DeviceProfile::Native` limits.
    ///
    /// # Errors
    /// `GpuError::NoSuitableAdapter` if no adapter is visible at all, or
    /// `GpuError::DeviceRequest` if the driver refuses the device.
    pub fn new() -> Result<Self, GpuError> {
        Self::with_profile(DeviceProfile::Native)
    }

    pub fn with_profile(profile: DeviceProfile) -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async(profile))
    }

    async fn init_async(profile: DeviceProfile) -> Result<Self, GpuError> {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let backends = wgpu::Backends::PRIMARY;
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            flags,
            ..Default::default()
        });

        let mut adapters = instance.enumerate_adapters(backends);
        if adapters.is_empty() {
            return Err(GpuError::NoSuitableAdapter);
        }
        for a in &adapters {
            let info = a.get_info();
            debug!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        }

        // Hardware first; software only as a last resort.
        let pick = adapters
            .iter()
            .position(|a| a.get_info().device_type != wgpu::DeviceType::Cpu)
            .unwrap_or(0);
        let adapter = adapters.swap_remove(pick);

        let raw = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw.name.clone(),
            device_type: raw.device_type,
            backend: raw.backend,
        };
        if adapter_info.is_software() {
            warn!("only a software adapter is available: {adapter_info}");
        }

        // A VideoCore adapter under the default profile gets the embedded caps.
        let profile = match profile {
            DeviceProfile::Native if raw.name.to_ascii_lowercase().contains("v3d") => {
                info!("V3D adapter detected, switching to the embedded profile");
                DeviceProfile::Embedded
            }
            other => other,
        };

        let limits = limits_for_profile(profile);
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("dualpix"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        let workgroup_size = WorkgroupSize::for_profile(profile);
        info!("gpu: {adapter_info}, profile {profile}, workgroup {workgroup_size}");

        Ok(GpuDevice {
            device,
            queue,
            profile,
            adapter_info,
            workgroup_size,
            limits,
            _instance: instance,
        })
    }

    /// Override the default workgroup size.
    ///
    /// Must be called before any pipeline is built from this device; existing
    /// pipelines keep the size they were compiled with.
    pub fn set_workgroup_size(&mut self, x: u32, y: u32) -> Result<(), GpuError> {
        let total = x.saturating_mul(y);
        let max = self.limits.max_compute_invocations_per_workgroup;
        if x == 0 || y == 0 || total > max {
            return Err(GpuError::WorkgroupTooLarge { total, max });
        }
        self.workgroup_size = WorkgroupSize { x, y };
        Ok(())
    }

    /// Workgroup grid covering a `width × height` image.
    pub fn dispatch_size(&self, width: u32, height: u32) -> (u32, u32) {
        self.workgroup_size.dispatch_for(width, height)
    }

    /// Largest storage buffer this device accepts, in bytes.
    pub fn max_buffer_bytes(&self) -> u64 {
        (self.limits.max_storage_buffer_binding_size as u64).min(self.limits.max_buffer_size)
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, profile: {}, workgroup: {} }}",
            self.adapter_info, self.profile, self.workgroup_size
        )
    }
}

// ============================================================
// Limits
// ============================================================

fn limits_for_profile(profile: DeviceProfile) -> wgpu::Limits {
    match profile {
        DeviceProfile::Native => wgpu::Limits::default(),
        DeviceProfile::Embedded => wgpu::Limits {
            max_compute_invocations_per_workgroup: 256,
            max_compute_workgroup_size_x: 256,
            max_compute_workgroup_size_y: 256,
            max_compute_workgroup_size_z: 64,
            // 128 MiB; one packed 8K×4K frame is exactly that.
            max_storage_buffer_binding_size: 128 << 20,
            ..wgpu::Limits::default()
        },
    }
}

// ============================================================
// Error type
// ============================================================

/// Errors from the GPU back-end.
#[derive(Debug)]
pub enum GpuError {
    /// No adapter is visible on any primary backend.
    NoSuitableAdapter,
    /// The driver refused the device with the requested limits.
    DeviceRequest(wgpu::RequestDeviceError),
    /// Requested workgroup exceeds the device's invocation limit.
    WorkgroupTooLarge { total: u32, max: u32 },
    /// Image does not fit in one storage buffer on this device.
    ImageTooLarge { width: usize, height: usize, bytes: u64, max: u64 },
    /// Mapping the readback buffer failed.
    Readback(wgpu::BufferAsyncError),
    /// The map callback never ran (device lost before the poll completed).
    ReadbackLost,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoSuitableAdapter => write!(
                f,
                "no GPU adapter found on Vulkan, Metal, DX12 or WebGPU backends"
            ),
            GpuError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            GpuError::WorkgroupTooLarge { total, max } => write!(
                f,
                "workgroup size {total} is zero or exceeds the device limit of {max} invocations"
            ),
            GpuError::ImageTooLarge { width, height, bytes, max } => write!(
                f,
                "{width}×{height} image needs {bytes} bytes, device storage buffers hold {max}"
            ),
            GpuError::Readback(e) => write!(f, "readback map failed: {e}"),
            GpuError::ReadbackLost => write!(f, "readback callback dropped before completion"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceRequest(e) => Some(e),
            GpuError::Readback(e) => Some(e),
            _ => None,
        }
    }
}
