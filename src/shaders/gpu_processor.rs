// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU processor infrastructure
//!
//! Provides common functionality for GPU render processors:
//! - Row pitch alignment for texture-to-buffer copies
//! - Async buffer readback utilities
//! - Unpacking padded rows into tightly packed texel data

use crate::gpu::wgpu;

/// Bytes per row of a texture copy, rounded up to wgpu's copy alignment
///
/// `copy_texture_to_buffer` requires every row to start on a
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`] boundary.
#[inline]
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// This is the common pattern used by all GPU processors to read data back
/// from GPU buffers to CPU memory.
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
///
/// # Returns
/// The buffer contents as a Vec<u8>
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, String> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| format!("Failed to poll device: {:?}", e))?;

    receiver
        .await
        .map_err(|_| "Failed to receive buffer mapping".to_string())?
        .map_err(|e| format!("Failed to map buffer: {:?}", e))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Strip row padding from a readback and decode native-endian f32 texels
///
/// `padded` holds `height` rows of `padded_row` bytes, of which the first
/// `width * 4 * channels` are texel data.
pub fn unpad_f32_rows(
    padded: &[u8],
    width: u32,
    height: u32,
    channels: u32,
    padded_row: u32,
) -> Vec<f32> {
    let row_bytes = (width * channels * 4) as usize;
    let mut texels = Vec::with_capacity((width * height * channels) as usize);

    for row in padded.chunks(padded_row as usize).take(height as usize) {
        texels.extend(
            row[..row_bytes]
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
        );
    }

    texels
}
