//! Light shafts (god rays)
//!
//! Objects on the configured layers are drawn flat into a mask, the mask is
//! blurred radially toward the main light's screen position, and the result
//! is added onto the camera image.
//!
//! ```no_run
//! # fn demo(device: &wgpu::Device, model_layout: &wgpu::BindGroupLayout) {
//! use light_shafts::light_shafts::{LightShaftSettings, LightShafts};
//!
//! let settings = LightShaftSettings::default();
//! let _shafts = LightShafts::new(
//!     device,
//!     model_layout,
//!     wgpu::TextureFormat::Bgra8UnormSrgb,
//!     settings,
//! );
//! # }
//! ```

mod blur_pass;
mod depth_copy;
mod filter;
mod kernel;
mod mask_pass;
mod projection;
mod settings;

pub use blur_pass::RadialBlurPass;
pub use depth_copy::{DepthCopyPass, DEPTH_COPY_FORMAT};
pub use filter::FilterSettings;
pub use kernel::{
    composite_additive, linearize_depth, luminance, sample_bilinear, sample_scale, texel_center,
    RadialBlur, SAMPLE_COUNT,
};
pub use mask_pass::LightMaskPass;
pub use projection::{light_screen_position, LightCenter};
pub use settings::{BlurSettings, LightShaftSettings, MaskFormat, SettingsError};

use glam::Vec2;

use crate::renderer::{PassQueue, RendererFeature};

/// The light-shaft renderer feature
pub struct LightShafts {
    settings: LightShaftSettings,
    mask: LightMaskPass,
    depth: DepthCopyPass,
    blur: RadialBlurPass,
}

impl LightShafts {
    /// Create the passes and their pipelines.
    ///
    /// Out-of-range settings are clamped.
    pub fn new(
        device: &wgpu::Device,
        model_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        settings: LightShaftSettings,
    ) -> Self {
        let settings = checked(settings);

        let mask = LightMaskPass::new(device, model_layout, &settings);
        let depth = DepthCopyPass::new(device, &settings);
        let blur = RadialBlurPass::new(device, color_format, &settings);

        log::info!(
            "Light shafts ready (blur width {}, intensity {}, layers {:#x})",
            settings.blur.blur_width,
            settings.blur.intensity,
            settings.filter.layer_mask.0
        );

        Self {
            settings,
            mask,
            depth,
            blur,
        }
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> &LightShaftSettings {
        &self.settings
    }

    /// Replace the settings.
    ///
    /// `mask_format` only takes effect on a feature created with [`LightShafts::new`].
    pub fn set_settings(&mut self, settings: LightShaftSettings) {
        let settings = checked(settings);
        if settings.mask_format != self.settings.mask_format {
            log::warn!(
                "Mask format change to {:?} needs a new LightShafts, keeping {:?}",
                settings.mask_format,
                self.settings.mask_format
            );
        }

        self.mask.apply_settings(&settings);
        self.depth.apply_settings(&settings);
        self.blur.apply_settings(&settings);

        let mask_format = self.settings.mask_format;
        self.settings = settings;
        self.settings.mask_format = mask_format;
        log::debug!("Light shaft settings updated");
    }

    /// Toggle the whole feature
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    /// Blur center of the last frame, in texture coordinates
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.blur.center()
    }
}

impl RendererFeature for LightShafts {
    fn add_render_passes<'a>(&'a mut self, queue: &mut PassQueue<'a>) {
        if !self.settings.enabled {
            return;
        }

        queue.enqueue(&mut self.mask);
        if self.settings.debug_depth {
            queue.enqueue(&mut self.depth);
        }
        queue.enqueue(&mut self.blur);
    }
}

fn checked(settings: LightShaftSettings) -> LightShaftSettings {
    match settings.validate() {
        Ok(()) => settings,
        Err(e) => {
            log::warn!("Invalid light shaft settings ({e}), clamping");
            settings.clamped()
        }
    }
}
