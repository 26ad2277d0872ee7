//! Offscreen targets and fullscreen blits
//!
//! Shared pieces for screen-space passes: pooled color targets, a fullscreen
//! quad and the blend state used to composite effects onto the camera image.

use bytemuck::{Pod, Zeroable};

use super::pool::{PoolIndex, TargetDesc, TargetPool};

/// Additive compositing (`Blend One One` on color and alpha)
pub const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Pool of per-frame offscreen color targets
pub type RenderTargets = TargetPool<RenderTarget>;

/// Offscreen color target used by screen-space passes
#[derive(Debug)]
pub struct RenderTarget {
    /// Color texture
    pub texture: wgpu::Texture,
    /// Color texture view
    pub view: wgpu::TextureView,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl RenderTarget {
    /// Create a new render target
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &str, desc: &TargetDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: desc.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width: desc.width,
            height: desc.height,
        }
    }
}

impl TargetPool<RenderTarget> {
    /// Get a temporary target bound to `name` for this frame, creating the
    /// texture if no pooled one matches.
    pub fn get_temporary(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        desc: TargetDesc,
    ) -> PoolIndex {
        self.acquire_named(name, desc, |d| RenderTarget::new(device, name, d))
    }
}

/// Linear clamp-to-edge sampler used by blit passes
#[must_use]
pub fn blit_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Full-screen quad for post-processing
pub struct FullscreenQuad {
    /// Vertex buffer
    pub vertex_buffer: wgpu::Buffer,
    /// Number of vertices
    pub vertex_count: u32,
}

/// Fullscreen quad vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadVertex {
    /// Position
    pub position: [f32; 2],
    /// UV coordinates
    pub uv: [f32; 2],
}

impl FullscreenQuad {
    /// Create a fullscreen quad
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        use wgpu::util::DeviceExt;

        // UV origin is the top left, matching texture space
        let vertices: [QuadVertex; 6] = [
            QuadVertex {
                position: [-1.0, -1.0],
                uv: [0.0, 1.0],
            },
            QuadVertex {
                position: [1.0, -1.0],
                uv: [1.0, 1.0],
            },
            QuadVertex {
                position: [1.0, 1.0],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [-1.0, -1.0],
                uv: [0.0, 1.0],
            },
            QuadVertex {
                position: [1.0, 1.0],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [-1.0, 1.0],
                uv: [0.0, 0.0],
            },
        ];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen_quad_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            vertex_buffer,
            vertex_count: 6,
        }
    }

    /// Get vertex buffer layout
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }

    /// Bind the quad and draw it
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}
