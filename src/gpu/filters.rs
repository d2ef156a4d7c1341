// gpu/filters.rs — wgpu compute engine for the five filters.
//
// OUTPUT STRATEGY: separate input and output buffers
// ──────────────────────────────────────────────────
// The input is uploaded once into a read-only storage buffer; every
// invocation writes its own packed word of a second buffer. No invocation
// reads the output, so pointwise and neighborhood filters share one binding
// layout and neither needs barriers or atomics.
//
// One shader module holds all five entry points. `GpuFilterPipeline` compiles
// it once per device and keeps one compute pipeline per filter; building it
// is the expensive step, so hold the pipeline (or the `GpuEngine`) across
// calls instead of recreating it per image.
//
// A call is: pack+upload → dispatch → copy → map → unpack. `apply` returns
// only after the mapped readback has completed, so the whole round trip is
// inside whatever timer wraps it.

use log::debug;
use wgpu::util::DeviceExt;

use crate::engine::Engine;
use crate::error::FilterError;
use crate::filter::{FilterKind, FilterRequest};
use crate::gpu::buffer::GpuImage;
use crate::gpu::device::{DeviceProfile, GpuDevice, GpuError};
use crate::image::RgbImage;

// ---------------------------------------------------------------------------
// Uniform params (must match WGSL struct Params exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilterUniforms {
    pub width:  u32,
    pub height: u32,
    pub delta:  f32,
    pub factor: f32,
}

impl FilterUniforms {
    /// Uniforms for `request` on a `width × height` image, parameters clamped.
    pub fn new(request: &FilterRequest, width: u32, height: u32) -> Self {
        let p = request.effective_params();
        FilterUniforms { width, height, delta: p.delta, factor: p.factor }
    }
}

/// WGSL entry point for each filter.
pub fn entry_point(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Grayscale => "grayscale",
        FilterKind::Brightness => "brightness",
        FilterKind::Contrast => "contrast",
        FilterKind::BoxBlur => "box_blur",
        FilterKind::Sobel => "sobel",
    }
}

// ---------------------------------------------------------------------------
// GpuFilterPipeline
// ---------------------------------------------------------------------------

/// Compiled filter kernels for one device.
pub struct GpuFilterPipeline {
    pipelines: Vec<wgpu::ComputePipeline>, // indexed like FilterKind::ALL
    bgl:       wgpu::BindGroupLayout,
}

impl GpuFilterPipeline {
    /// Compile `filters.wgsl` with the device's workgroup size and create one
    /// pipeline per filter.
    pub fn new(gpu: &GpuDevice) -> Self {
        // naga rejects `override` expressions in @workgroup_size, so the
        // size is substituted into the source text.
        let shader_src = include_str!("../shaders/filters.wgsl")
            .replace("{{WG_X}}", &gpu.workgroup_size.x.to_string())
            .replace("{{WG_Y}}", &gpu.workgroup_size.y.to_string());

        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label:  Some("filters.wgsl"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GpuFilter BGL"),
            entries: &[
                // 0 — packed input (read-only)
                storage(0, true),
                // 1 — packed output
                storage(1, false),
                // 2 — params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FilterUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label:                Some("GpuFilter pipeline layout"),
            bind_group_layouts:   &[&bgl],
            push_constant_ranges: &[],
        });

        let pipelines = FilterKind::ALL
            .iter()
            .map(|&kind| {
                let name = entry_point(kind);
                gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label:               Some(name),
                    layout:              Some(&layout),
                    module:              &shader,
                    entry_point:         name,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache:               None,
                })
            })
            .collect();

        GpuFilterPipeline { pipelines, bgl }
    }

    fn pipeline(&self, kind: FilterKind) -> &wgpu::ComputePipeline {
        let idx = FilterKind::ALL.iter().position(|&k| k == kind).unwrap_or(0);
        &self.pipelines[idx]
    }

    /// Run `request` on `src` and read the result back.
    pub fn run(
        &self,
        gpu: &GpuDevice,
        request: &FilterRequest,
        src: &RgbImage,
    ) -> Result<RgbImage, FilterError> {
        // Size limits, failed maps and device loss surface as
        // ExecutionFailure; there is no fallback to a CPU engine.
        let input = GpuImage::upload(gpu, src).map_err(FilterError::gpu_execution)?;
        let (w, h) = (input.width, input.height);

        let (wg_x, wg_y) = gpu.dispatch_size(w, h);
        let max_groups = gpu.limits.max_compute_workgroups_per_dimension;
        if wg_x > max_groups || wg_y > max_groups {
            return Err(FilterError::ExecutionFailure(format!(
                "gpu: {w}×{h} needs {wg_x}×{wg_y} workgroups, device allows {max_groups} per axis"
            )));
        }

        let output = GpuImage::output(gpu, w, h).map_err(FilterError::gpu_execution)?;
        let uniforms = FilterUniforms::new(request, w, h);
        let params_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some("GpuFilter params"),
            contents: bytemuck::bytes_of(&uniforms),
            usage:    wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label:  Some("GpuFilter BG"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: input.buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: output.buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: params_buf.as_entire_binding() },
            ],
        });

        let name = entry_point(request.kind);
        let mut encoder = gpu.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("GpuFilter dispatch") },
        );
        {
            let mut pass = encoder.begin_compute_pass(
                &wgpu::ComputePassDescriptor { label: Some(name), timestamp_writes: None },
            );
            pass.set_pipeline(self.pipeline(request.kind));
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(wg_x, wg_y, 1);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        debug!("gpu {request}: {w}×{h}, {wg_x}×{wg_y} workgroups of {}", gpu.workgroup_size);

        output.download(gpu)
    }
}

// ---------------------------------------------------------------------------
// GpuEngine
// ---------------------------------------------------------------------------

/// `Engine` backed by a GPU device and its compiled filter pipelines.
pub struct GpuEngine {
    gpu:      GpuDevice,
    pipeline: GpuFilterPipeline,
}

impl GpuEngine {
    /// Compile the filter kernels on an already-opened device.
    pub fn new(gpu: GpuDevice) -> Self {
        let pipeline = GpuFilterPipeline::new(&gpu);
        GpuEngine { gpu, pipeline }
    }

    /// Open a device with `profile` and compile the kernels on it.
    pub fn with_profile(profile: DeviceProfile) -> Result<Self, GpuError> {
        Ok(Self::new(GpuDevice::with_profile(profile)?))
    }

    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }
}

impl Engine for GpuEngine {
    fn name(&self) -> &str {
        "gpu"
    }

    fn apply(&self, request: &FilterRequest, image: RgbImage) -> Result<RgbImage, FilterError> {
        image.validate()?;
        self.pipeline.run(&self.gpu, request, &image)
    }
}
