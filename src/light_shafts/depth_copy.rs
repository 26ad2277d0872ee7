//! Linearized camera depth copied into a color target for inspection

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::settings::LightShaftSettings;
use crate::renderer::{
    FullscreenQuad, PassContext, RenderPass, RenderPassEvent, RenderTargets, TargetDesc,
};

/// Format of the linear depth target
pub const DEPTH_COPY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DepthUniform {
    near: f32,
    far: f32,
    _padding: [f32; 2],
}

/// Writes `near / (far - d * (far - near))` for every camera depth texel
pub struct DepthCopyPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    quad: FullscreenQuad,
    target_name: String,
}

impl DepthCopyPass {
    pub fn new(device: &wgpu::Device, settings: &LightShaftSettings) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Depth Copy Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("depth_copy.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Depth Copy Uniform Buffer"),
            contents: bytemuck::bytes_of(&DepthUniform {
                near: 0.1,
                far: 100.0,
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Copy Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Copy Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Depth Copy Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[FullscreenQuad::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: DEPTH_COPY_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!("Created depth copy pipeline");

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            quad: FullscreenQuad::new(device),
            target_name: settings.depth_target.clone(),
        }
    }

    pub fn apply_settings(&mut self, settings: &LightShaftSettings) {
        self.target_name.clone_from(&settings.depth_target);
    }
}

impl RenderPass for DepthCopyPass {
    fn name(&self) -> &'static str {
        "Depth Copy Pass"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AfterRenderingOpaques
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) {
        let desc = TargetDesc::new(ctx.size.0, ctx.size.1, DEPTH_COPY_FORMAT);
        let index = ctx.targets.get_temporary(ctx.device, &self.target_name, desc);
        let Some(target) = ctx.targets.get(index) else {
            return;
        };

        let uniform = DepthUniform {
            near: ctx.camera.near,
            far: ctx.camera.far,
            _padding: [0.0; 2],
        };
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Depth Copy Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(ctx.depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.name()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        self.quad.draw(&mut render_pass);
    }

    fn frame_cleanup(&mut self, targets: &mut RenderTargets) {
        targets.release_named(&self.target_name);
    }
}
