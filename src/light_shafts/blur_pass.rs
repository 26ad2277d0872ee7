//! Radial blur of the light mask and the additive composite onto the camera

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use super::projection::LightCenter;
use super::settings::{BlurSettings, LightShaftSettings};
use crate::renderer::{
    blit_sampler, FullscreenQuad, PassContext, RenderPass, RenderPassEvent, RenderTargets,
    ADDITIVE_BLEND,
};

/// Blur parameters, 16 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BlurUniform {
    center: [f32; 2],
    blur_width: f32,
    intensity: f32,
}

impl BlurUniform {
    fn new(center: Vec2, blur: BlurSettings) -> Self {
        Self {
            center: center.to_array(),
            blur_width: blur.blur_width,
            intensity: blur.intensity,
        }
    }
}

/// Blurs the mask toward the main light and adds the result to the camera
/// color target
pub struct RadialBlurPass {
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    quad: FullscreenQuad,
    center: LightCenter,
    blur: BlurSettings,
    mask_target: String,
    blur_target: String,
    color_format: wgpu::TextureFormat,
}

impl RadialBlurPass {
    /// Build the blur and composite pipelines.
    ///
    /// `color_format` is the camera target format the composite writes to.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        settings: &LightShaftSettings,
    ) -> Self {
        let mask_format = settings.mask_format.texture_format();

        // Rgba32Float is only filterable with the matching feature
        let filterable = mask_format
            .guaranteed_format_features(device.features())
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Shafts Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("light_shafts.wgsl").into()),
        });

        let sampler = if filterable {
            blit_sampler(device, "Light Shafts Sampler")
        } else {
            log::warn!(
                "{:?} is not filterable here, blur falls back to nearest sampling",
                mask_format
            );
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Light Shafts Sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                ..Default::default()
            })
        };

        let uniform = BlurUniform::new(Vec2::splat(0.5), settings.blur);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Shafts Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler_type = if filterable {
            wgpu::SamplerBindingType::Filtering
        } else {
            wgpu::SamplerBindingType::NonFiltering
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Shafts Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(sampler_type),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
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
            label: Some("Light Shafts Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fullscreen_pipeline = |label: &str,
                                   entry_point: &str,
                                   format: wgpu::TextureFormat,
                                   blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[FullscreenQuad::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let blur_pipeline = fullscreen_pipeline(
            "Radial Blur Pipeline",
            "fs_radial_blur",
            mask_format,
            // Float32 targets are not blendable without FLOAT32_BLENDABLE
            None,
        );
        let composite_pipeline = fullscreen_pipeline(
            "Light Shafts Composite Pipeline",
            "fs_composite",
            color_format,
            Some(ADDITIVE_BLEND),
        );

        log::debug!(
            "Created light shaft pipelines (mask {:?}, camera {:?})",
            mask_format,
            color_format
        );

        Self {
            blur_pipeline,
            composite_pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            quad: FullscreenQuad::new(device),
            center: LightCenter::new(),
            blur: settings.blur,
            mask_target: settings.mask_target.clone(),
            blur_target: settings.blur_target.clone(),
            color_format,
        }
    }

    /// Take over new settings. Formats are fixed at creation.
    pub fn apply_settings(&mut self, settings: &LightShaftSettings) {
        self.blur = settings.blur;
        self.mask_target.clone_from(&settings.mask_target);
        self.blur_target.clone_from(&settings.blur_target);
    }

    /// Blur center used by the last executed frame, in texture coordinates
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.center.get()
    }

    fn bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }
}

impl RenderPass for RadialBlurPass {
    fn name(&self) -> &'static str {
        "Light Shafts Pass"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::AfterRenderingSkybox
    }

    fn execute(&mut self, ctx: &mut PassContext<'_>) {
        if ctx.lights.main_light().is_none() {
            log::trace!("No visible lights, skipping light shafts");
            return;
        }

        // A degenerate projection keeps last frame's center
        if !self.center.update(ctx.camera.view_projection_matrix(), ctx.lights) {
            log::trace!("Main light projection degenerate, keeping center");
        }

        if ctx.color_format != self.color_format {
            log::warn!(
                "Light shafts composite built for {:?}, camera target is {:?}",
                self.color_format,
                ctx.color_format
            );
            return;
        }

        let Some(mask_index) = ctx.targets.named(&self.mask_target) else {
            log::warn!("Light mask '{}' is not bound this frame", self.mask_target);
            return;
        };
        let Some(mask_desc) = ctx.targets.desc(mask_index) else {
            return;
        };

        let uniform = BlurUniform::new(self.center.get(), self.blur);
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let blur_index = ctx
            .targets
            .get_temporary(ctx.device, &self.blur_target, mask_desc);

        let (Some(mask), Some(blurred)) = (ctx.targets.get(mask_index), ctx.targets.get(blur_index))
        else {
            return;
        };

        let blur_bind_group = self.bind_group(ctx.device, "Radial Blur Bind Group", &mask.view);
        let composite_bind_group =
            self.bind_group(ctx.device, "Light Shafts Composite Bind Group", &blurred.view);

        {
            let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Radial Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &blurred.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.blur_pipeline);
            render_pass.set_bind_group(0, &blur_bind_group, &[]);
            self.quad.draw(&mut render_pass);
        }

        {
            let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Light Shafts Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: ctx.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.composite_pipeline);
            render_pass.set_bind_group(0, &composite_bind_group, &[]);
            self.quad.draw(&mut render_pass);
        }

        log::trace!(
            "Light shafts: center ({:.3}, {:.3}), {}x{}",
            uniform.center[0],
            uniform.center[1],
            mask_desc.width,
            mask_desc.height
        );
    }

    fn frame_cleanup(&mut self, targets: &mut RenderTargets) {
        targets.release_named(&self.blur_target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<BlurUniform>(), 16);

        let uniform = BlurUniform::new(Vec2::new(0.25, 0.75), BlurSettings::default());
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniform));
        assert_eq!(floats, &[0.25, 0.75, 0.85, 1.0]);
    }
}
