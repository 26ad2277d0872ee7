//! Light mask: filtered renderables drawn flat into an offscreen target

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::filter::FilterSettings;
use super::settings::LightShaftSettings;
use crate::renderer::{
    PassContext, RenderPass, RenderPassEvent, RenderTargets, TargetDesc, Vertex, DEPTH_FORMAT,
};

/// Uniform for the override draw
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MaskUniform {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
}

impl MaskUniform {
    fn new(view_proj: Mat4, color: [f32; 4]) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            color,
        }
    }
}

/// Draws the renderables accepted by the filter into the mask target,
/// cleared to transparent black
pub struct LightMaskPass {
    pipeline: wgpu::RenderPipeline,
    depth_tested_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
    filter: FilterSettings,
    target_name: String,
    override_color: [f32; 4],
    resolution_scale: f32,
    depth_test: bool,
}

impl LightMaskPass {
    /// Build the override pipeline. `model_layout` must be the layout the
    /// renderer creates model bind groups with.
    pub fn new(
        device: &wgpu::Device,
        model_layout: &wgpu::BindGroupLayout,
        settings: &LightShaftSettings,
    ) -> Self {
        let format = settings.mask_format.texture_format();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Mask Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("light_mask.wgsl").into()),
        });

        let uniform = MaskUniform::new(Mat4::IDENTITY, settings.override_color);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Mask Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Mask Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light Mask Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Mask Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout, model_layout],
            push_constant_ranges: &[],
        });

        let mask_pipeline = |label: &str, depth_stencil: Option<wgpu::DepthStencilState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        // Float32 targets are not blendable without FLOAT32_BLENDABLE
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        // Without depth every accepted object lands in the mask
        let pipeline = mask_pipeline("Light Mask Pipeline", None);
        // Read-only test against camera depth, opaque geometry hides emitters
        let depth_tested_pipeline = mask_pipeline(
            "Light Mask Depth Tested Pipeline",
            Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
        );

        log::debug!("Created light mask pipeline ({:?})", format);

        Self {
            pipeline,
            depth_tested_pipeline,
            uniform_buffer,
            bind_group,
            format,
            filter: settings.filter.clone(),
            target_name: settings.mask_target.clone(),
            override_color: settings.override_color,
            resolution_scale: settings.resolution_scale,
            depth_test: settings.depth_test,
        }
    }

    /// Take over new settings. The target format is fixed at creation.
    pub fn apply_settings(&mut self, settings: &LightShaftSettings) {
        self.filter = settings.filter.clone();
        self.target_name.clone_from(&settings.mask_target);
        self.override_color = settings.override_color;
        self.resolution_scale = settings.resolution_scale;
        self.depth_test = settings.depth_test;
    }

    /// Descriptor of the mask target for a camera of `size`.
    ///
    /// A depth-tested mask shares the camera depth buffer and stays full size.
    #[must_use]
    pub fn target_desc(&self, size: (u32, u32)) -> TargetDesc {
        if self.depth_test {
            TargetDesc::new(size.0, size.1, self.format)
        } else {
            TargetDesc::scaled(size.0, size.1, self.resolution_scale, self.format)
        }
    }
}

impl RenderPass for LightMaskPass {
    fn name(&self) -> &'static str {
        "Light Mask Pass"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AfterRenderingOpaques
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) {
        let desc = self.target_desc(ctx.size);
        let index = ctx.targets.get_temporary(ctx.device, &self.target_name, desc);
        let Some(target) = ctx.targets.get(index) else {
            return;
        };

        let uniform = MaskUniform::new(ctx.camera.view_projection_matrix(), self.override_color);
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let depth_view = ctx.depth_view;
        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.name()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: self.depth_test.then(|| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(if self.depth_test {
            &self.depth_tested_pipeline
        } else {
            &self.pipeline
        });
        render_pass.set_bind_group(0, &self.bind_group, &[]);

        let mut drawn = 0;
        for renderable in self.filter.filter(ctx.renderables) {
            renderable.draw(&mut render_pass);
            drawn += 1;
        }

        log::trace!(
            "Light mask: {} of {} renderables into {}x{}",
            drawn,
            ctx.renderables.len(),
            desc.width,
            desc.height
        );
    }

    fn frame_cleanup(&mut self, targets: &mut RenderTargets) {
        targets.release_named(&self.target_name);
    }
}
