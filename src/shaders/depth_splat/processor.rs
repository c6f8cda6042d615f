// SPDX-License-Identifier: GPL-3.0-only

//! GPU depth splat renderer
//!
//! Renders point clouds into an offscreen RGBA32F color target with a
//! Depth32Float depth attachment and reads the color target back.

use crate::calibration::CameraTransform;
use crate::errors::RenderError;
use crate::gpu::{self, wgpu};
use crate::pipelines::depth_map::{DepthReadback, DepthRenderer};
use crate::point_cloud::Point;
use crate::shaders::gpu_processor::{padded_bytes_per_row, read_buffer_async, unpad_f32_rows};
use glam::{Mat4, Vec4};
use std::sync::Arc;
use tracing::{debug, info};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// RGBA32F texel size
const BYTES_PER_PIXEL: u32 = 16;
/// Vertices emitted per patch instance
const PATCH_VERTICES: u32 = 6;

/// Uniform block shared by both vertex entry points
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SplatUniforms {
    mvp: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    patch_size: f32,
    _padding: [f32; 3],
}

/// Point capacity and byte size of a vertex buffer holding `points`
///
/// Capacity rounds up to a power of two, clamped so the buffer stays within
/// `max_size` bytes.
fn point_buffer_size(points: usize, max_size: u64) -> Result<(usize, u64), RenderError> {
    let point_bytes = std::mem::size_of::<Point>() as u64;
    let too_many = || RenderError::TooManyPoints {
        points,
        limit: max_size,
    };

    let needed = (points as u64).checked_mul(point_bytes).ok_or_else(too_many)?;
    if needed > max_size {
        return Err(too_many());
    }

    let max_points = max_size / point_bytes;
    let capacity = points
        .checked_next_power_of_two()
        .map_or(max_points, |c| c as u64)
        .min(max_points);
    Ok((capacity as usize, capacity * point_bytes))
}

/// Maps OpenGL clip space onto wgpu clip space
///
/// Depth goes from [-w, w] to [0, w]. Y is negated so NDC y = -1 lands on
/// texture row 0, which makes the readback bottom-up like a GL framebuffer.
fn gl_to_wgpu_clip() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 1.0),
    )
}

/// wgpu implementation of [`DepthRenderer`]
pub struct GpuDepthRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    patch_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    color_view: wgpu::TextureView,
    color_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
    // Grown on demand, never shrunk
    point_buffer: Option<wgpu::Buffer>,
    point_capacity: usize,
    width: u32,
    height: u32,
    padded_row: u32,
}

impl GpuDepthRenderer {
    /// Create the device, pipelines and a `width` x `height` render target
    pub async fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        info!(width, height, "Initializing GPU depth renderer");

        let (device, queue, gpu_info) = gpu::create_offscreen_device("depth_splat_gpu").await?;

        info!(
            adapter_name = %gpu_info.adapter_name,
            adapter_backend = ?gpu_info.backend,
            "GPU device created for depth rendering"
        );

        if width == 0
            || height == 0
            || width > gpu_info.max_texture_dimension
            || height > gpu_info.max_texture_dimension
        {
            return Err(RenderError::InvalidSize { width, height });
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("depth_splat_shader"),
            source: wgpu::ShaderSource::Wgsl(super::DEPTH_SPLAT_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("depth_splat_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("depth_splat_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let patch_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "depth_splat_patch_pipeline",
            "vs_patch",
            wgpu::VertexStepMode::Instance,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let point_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "depth_splat_point_pipeline",
            "vs_point",
            wgpu::VertexStepMode::Vertex,
            wgpu::PrimitiveTopology::PointList,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("depth_splat_uniform_buffer"),
            size: std::mem::size_of::<SplatUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("depth_splat_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_splat_color_target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_splat_depth_target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_row = padded_bytes_per_row(width, BYTES_PER_PIXEL);
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("depth_splat_staging_buffer"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        debug!(padded_row, "Allocated depth splat render target");

        Ok(Self {
            device,
            queue,
            patch_pipeline,
            point_pipeline,
            bind_group,
            uniform_buffer,
            color_view,
            color_texture,
            depth_view,
            staging_buffer,
            point_buffer: None,
            point_capacity: 0,
            width,
            height,
            padded_row,
        })
    }

    /// Upload points, growing the vertex buffer when it is too small
    fn upload_points(&mut self, points: &[Point]) -> Result<(), RenderError> {
        if points.len() > self.point_capacity {
            let max_size = self.device.limits().max_buffer_size;
            let (capacity, size) = point_buffer_size(points.len(), max_size)?;
            debug!(points = points.len(), capacity, "Growing point buffer");

            self.point_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("depth_splat_point_buffer"),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.point_capacity = capacity;
        }

        if let Some(buffer) = &self.point_buffer {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(points));
        }
        Ok(())
    }

    /// Render and read back asynchronously
    pub async fn render_async(
        &mut self,
        points: &[Point],
        transform: &CameraTransform,
        patch_size: f32,
    ) -> Result<DepthReadback, RenderError> {
        let densify = patch_size > 0.0;
        let clip = gl_to_wgpu_clip();
        let uniforms = SplatUniforms {
            mvp: (clip * transform.mvp).to_cols_array_2d(),
            projection: (clip * transform.projection).to_cols_array_2d(),
            view: transform.view.to_cols_array_2d(),
            patch_size: patch_size.max(0.0),
            _padding: [0.0; 3],
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        if !points.is_empty() {
            self.upload_points(points)?;
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("depth_splat_encoder"),
        });

        // The pass borrows the target only for this scope
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("depth_splat_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(buffer) = self.point_buffer.as_ref().filter(|_| !points.is_empty()) {
                let count = points.len() as u32;
                let bytes = (points.len() * std::mem::size_of::<Point>()) as u64;
                pass.set_bind_group(0, Some(&self.bind_group), &[]);
                pass.set_vertex_buffer(0, buffer.slice(..bytes));
                if densify {
                    pass.set_pipeline(&self.patch_pipeline);
                    pass.draw(0..PATCH_VERTICES, 0..count);
                } else {
                    pass.set_pipeline(&self.point_pipeline);
                    pass.draw(0..count, 0..1);
                }
            }
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let padded = read_buffer_async(&self.device, &self.staging_buffer)
            .await
            .map_err(RenderError::Readback)?;
        let rgba = unpad_f32_rows(&padded, self.width, self.height, 4, self.padded_row);

        debug!(points = points.len(), densify, "Depth splat rendered");

        Ok(DepthReadback {
            width: self.width,
            height: self.height,
            rgba,
        })
    }
}

impl DepthRenderer for GpuDepthRenderer {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_depth(
        &mut self,
        points: &[Point],
        transform: &CameraTransform,
        patch_size: f32,
    ) -> Result<DepthReadback, RenderError> {
        pollster::block_on(self.render_async(points, transform, patch_size))
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    vertex_entry: &str,
    step_mode: wgpu::VertexStepMode,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vertex_entry),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Point>() as wgpu::BufferAddress,
                step_mode,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_depth"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}
