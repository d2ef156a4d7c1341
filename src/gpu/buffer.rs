// gpu/buffer.rs — RGB images as packed-u32 storage buffers.
//
// PACKING
// ───────
// WGSL has no 8-bit storage type, and three bytes per pixel would put two
// pixels into one 32-bit word. Two invocations writing neighbouring pixels
// would then race on the same word. So each pixel gets its own word:
//
//   bits  0.. 7  R
//   bits  8..15  G
//   bits 16..23  B
//   bits 24..31  unused (written as 0)
//
// One invocation reads/writes exactly one word of the output buffer. The
// packing cost (one pass on upload, one on download) is part of the
// measured GPU time, as the host↔device copies are.
//
// Buffer size: width × height × 4 bytes (≈8.3 MB for 1920×1080).

use wgpu::util::DeviceExt;

use crate::error::FilterError;
use crate::gpu::device::{GpuDevice, GpuError};
use crate::image::{RgbImage, CHANNELS};

/// Pack interleaved RGB bytes into one `u32` per pixel.
pub fn pack_rgb(rgb: &[u8]) -> Vec<u32> {
    rgb.chunks_exact(CHANNELS)
        .map(|p| p[0] as u32 | (p[1] as u32) << 8 | (p[2] as u32) << 16)
        .collect()
}

/// Inverse of [`pack_rgb`]. The high byte of each word is ignored.
pub fn unpack_rgb(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * CHANNELS);
    for &w in words {
        out.extend_from_slice(&[w as u8, (w >> 8) as u8, (w >> 16) as u8]);
    }
    out
}

/// An RGB image resident in a GPU storage buffer, one packed word per pixel.
pub struct GpuImage {
    pub(crate) buffer: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
}

impl GpuImage {
    /// Bytes a `width × height` packed image occupies on the device.
    pub fn byte_len(width: usize, height: usize) -> u64 {
        (width as u64) * (height as u64) * std::mem::size_of::<u32>() as u64
    }

    /// Fail early if the image cannot be represented on this device.
    pub fn check_fits(gpu: &GpuDevice, width: usize, height: usize) -> Result<(), GpuError> {
        let bytes = Self::byte_len(width, height);
        let max = gpu.max_buffer_bytes();
        if bytes > max || u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(GpuError::ImageTooLarge { width, height, bytes, max });
        }
        Ok(())
    }

    /// Pack and upload a CPU image.
    pub fn upload(gpu: &GpuDevice, src: &RgbImage) -> Result<Self, GpuError> {
        Self::check_fits(gpu, src.width(), src.height())?;
        let packed = pack_rgb(src.as_slice());
        let buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GpuImage input"),
            contents: bytemuck::cast_slice(&packed),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });
        Ok(GpuImage { buffer, width: src.width() as u32, height: src.height() as u32 })
    }

    /// Allocate an uninitialised output image of the given size. Every word
    /// is written by the kernel before it is read back.
    pub fn output(gpu: &GpuDevice, width: u32, height: u32) -> Result<Self, GpuError> {
        Self::check_fits(gpu, width as usize, height as usize)?;
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuImage output"),
            size: Self::byte_len(width as usize, height as usize),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Ok(GpuImage { buffer, width, height })
    }

    pub fn byte_size(&self) -> u64 {
        Self::byte_len(self.width as usize, self.height as usize)
    }

    /// Copy back to the host and unpack. Blocks until the queue has drained
    /// up to and including the copy.
    pub fn download(&self, gpu: &GpuDevice) -> Result<RgbImage, FilterError> {
        let size = self.byte_size();
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuImage readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("GpuImage download") },
        );
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let words = map_read_u32(gpu, &staging).map_err(FilterError::gpu_execution)?;
        RgbImage::from_raw(self.width as usize, self.height as usize, unpack_rgb(&words))
    }
}

/// Map a MAP_READ buffer and copy its contents out as `u32` words.
pub(crate) fn map_read_u32(gpu: &GpuDevice, staging: &wgpu::Buffer) -> Result<Vec<u32>, GpuError> {
    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        // Receiver outlives the poll below; a send error cannot be acted on.
        let _ = tx.send(r);
    });
    gpu.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| GpuError::ReadbackLost)?
        .map_err(GpuError::Readback)?;

    let mapped = slice.get_mapped_range();
    let words: Vec<u32> = bytemuck::cast_slice(&mapped).to_vec();
    drop(mapped);
    staging.unmap();
    Ok(words)
}
