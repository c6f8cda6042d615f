// SPDX-License-Identifier: GPL-3.0-only
//! Shader definitions and GPU processors
//!
//! The depth splat pipeline is the only GPU consumer; the readback helpers
//! in `gpu_processor` are shared by anything that copies a render target to
//! host memory.

pub mod depth_splat;
mod gpu_processor;

pub use depth_splat::GpuDepthRenderer;
pub use gpu_processor::{padded_bytes_per_row, read_buffer_async, unpad_f32_rows};
