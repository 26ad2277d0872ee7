//! Forward renderer core
//!
//! Records one camera's frame into any color target: opaque geometry plus
//! the passes contributed by [`RendererFeature`]s, ordered by
//! [`RenderPassEvent`]. The window-backed [`Renderer`](super::Renderer) and
//! offscreen users share this code.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use super::camera::Camera;
use super::draw::{Renderable, ShaderTag};
use super::lights::{LightManager, LightType, VisibleLights};
use super::mesh::Vertex;
use super::pass::{PassContext, PassQueue, RenderPassEvent, RendererFeature};
use super::postprocess::RenderTargets;

/// Format of the camera depth target
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Idle frames before a pooled target is dropped
const MAX_IDLE_FRAMES: u32 = 3;

/// Uniform buffer for camera data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    view_pos: [f32; 3],
    _padding: f32,
}

impl CameraUniform {
    fn new(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            view_pos: camera.position.into(),
            _padding: 0.0,
        }
    }
}

/// Uniform buffer for model transform
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn new() -> Self {
        Self::from_transform(Mat4::IDENTITY)
    }

    pub fn from_transform(model: Mat4) -> Self {
        let normal_matrix = model.inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Main light as the opaque shader sees it
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LightUniform {
    position: [f32; 4],
    color: [f32; 4],
    ambient: [f32; 4],
}

impl LightUniform {
    fn new(visible: &VisibleLights, ambient: Vec3) -> Self {
        let (position, color) = match visible.main_light() {
            // Directional lights carry their travel direction with w = 0
            Some(light) if light.light_type == LightType::Directional => (
                light.direction.extend(0.0),
                (light.color * light.intensity).extend(1.0),
            ),
            Some(light) => (
                light.position.extend(1.0),
                (light.color * light.intensity).extend(1.0),
            ),
            None => (Vec3::NEG_Y.extend(0.0), Vec4::ZERO),
        };

        Self {
            position: position.to_array(),
            color: color.to_array(),
            ambient: ambient.extend(1.0).to_array(),
        }
    }
}

/// What to draw this frame
pub struct SceneView<'a> {
    pub camera: &'a Camera,
    pub lights: &'a LightManager,
    /// Draw list. Only forward-tagged entries are drawn as opaques.
    pub renderables: &'a [Renderable<'a>],
}

/// Camera color and depth attachments for one frame
pub struct FrameTargets<'a> {
    pub color_view: &'a wgpu::TextureView,
    pub color_format: wgpu::TextureFormat,
    /// `DEPTH_FORMAT`, created with `TEXTURE_BINDING`
    pub depth_view: &'a wgpu::TextureView,
    pub size: (u32, u32),
}

/// Opaque pipeline, shared uniforms and the temporary target pool
pub struct ForwardRenderer {
    render_pipeline: wgpu::RenderPipeline,
    color_format: wgpu::TextureFormat,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    model_bind_group_layout: wgpu::BindGroupLayout,
    targets: RenderTargets,
    /// Clear color, which also stands in for the sky
    pub clear_color: wgpu::Color,
}

impl ForwardRenderer {
    /// Build the opaque pipeline for `color_format`
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&CameraUniform::new(&Camera::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::bytes_of(&LightUniform::new(
                &VisibleLights::default(),
                Vec3::splat(0.1),
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let global_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Global Bind Group Layout"),
                entries: &[
                    // Camera
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Light
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

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &global_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Bind Group Layout"),
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

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&global_bind_group_layout, &model_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
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
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Self {
            render_pipeline,
            color_format,
            camera_buffer,
            light_buffer,
            global_bind_group,
            model_bind_group_layout,
            targets: RenderTargets::new(),
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
        }
    }

    /// Layout of the per-object model bind group (group 1)
    pub fn model_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.model_bind_group_layout
    }

    /// Color format the opaque pipeline writes
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Pooled temporary targets
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Create a model bind group for rendering
    pub fn create_model_bind_group(
        &self,
        device: &wgpu::Device,
        transform: Mat4,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Buffer"),
            contents: bytemuck::bytes_of(&ModelUniform::from_transform(transform)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &self.model_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        (buffer, bind_group)
    }

    /// Record one frame into `frame`.
    ///
    /// Passes run in event order. Opaque geometry is drawn right before the
    /// first pass scheduled after `BeforeRenderingOpaques`, or at the end when
    /// there is none. Every pass gets `frame_cleanup` once all have executed.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameTargets<'_>,
        scene: &SceneView<'_>,
        features: &mut [&mut dyn RendererFeature],
    ) {
        let visible = scene.lights.visible_lights();

        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::new(scene.camera)),
        );
        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::bytes_of(&LightUniform::new(&visible, scene.lights.ambient)),
        );

        let mut pass_queue = PassQueue::new();
        for feature in features.iter_mut() {
            feature.add_render_passes(&mut pass_queue);
        }
        let mut passes = pass_queue.into_sorted();

        let mut opaques_drawn = false;
        for pass in passes.iter_mut() {
            if !opaques_drawn && pass.event() > RenderPassEvent::BeforeRenderingOpaques {
                self.draw_opaques(encoder, frame, scene.renderables);
                opaques_drawn = true;
            }

            log::trace!("Executing {}", pass.name());
            let mut ctx = PassContext {
                device,
                queue,
                encoder: &mut *encoder,
                camera: scene.camera,
                color_view: frame.color_view,
                color_format: frame.color_format,
                depth_view: frame.depth_view,
                size: frame.size,
                lights: &visible,
                renderables: scene.renderables,
                targets: &mut self.targets,
            };
            pass.execute(&mut ctx);
        }
        if !opaques_drawn {
            self.draw_opaques(encoder, frame, scene.renderables);
        }

        for pass in passes.iter_mut() {
            pass.frame_cleanup(&mut self.targets);
        }

        self.targets.end_frame();
        let dropped = self.targets.trim(MAX_IDLE_FRAMES);
        if dropped > 0 {
            log::debug!("Dropped {} idle render targets", dropped);
        }
    }

    fn draw_opaques(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameTargets<'_>,
        renderables: &[Renderable<'_>],
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: frame.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if frame.color_format != self.color_format {
            log::warn!(
                "Opaque pipeline built for {:?}, target is {:?}",
                self.color_format,
                frame.color_format
            );
            return;
        }

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.global_bind_group, &[]);
        for renderable in renderables
            .iter()
            .filter(|r| ShaderTag::FORWARD.contains(&r.tag))
        {
            renderable.draw(&mut render_pass);
        }
    }
}

/// Create a sampleable depth target of `DEPTH_FORMAT`
pub fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    (texture, view)
}
