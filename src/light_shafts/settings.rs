//! Light-shaft configuration
//!
//! Settings are plain serde data and load from RON files. Every field has a
//! default, so a file only needs the values it changes:
//!
//! ```ron
//! (
//!     blur: (blur_width: 0.6),
//!     filter: (layer_mask: 256),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::filter::FilterSettings;

/// Radial blur parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurSettings {
    /// How far toward the light the last tap reaches (0..1)
    pub blur_width: f32,
    /// Output multiplier (0..1)
    pub intensity: f32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            blur_width: 0.85,
            intensity: 1.0,
        }
    }
}

/// Texel format of the mask and blur targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskFormat {
    /// Half float, filterable everywhere
    #[default]
    Rgba16Float,
    /// Full float, needs `FLOAT32_FILTERABLE` to be sampled linearly
    Rgba32Float,
}

impl MaskFormat {
    /// Matching wgpu format
    #[must_use]
    pub const fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// Light-shaft feature settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightShaftSettings {
    /// Master switch, no pass is enqueued when off
    pub enabled: bool,
    /// Name of the light mask target
    pub mask_target: String,
    /// Name of the blurred target
    pub blur_target: String,
    /// Name of the linear depth target written by the depth diagnostic
    pub depth_target: String,
    /// Which renderables are drawn into the mask
    pub filter: FilterSettings,
    /// Flat color the mask draw uses for every accepted renderable
    pub override_color: [f32; 4],
    /// Radial blur parameters
    pub blur: BlurSettings,
    /// Mask and blur target format
    pub mask_format: MaskFormat,
    /// Mask and blur target size relative to the camera target (0..1]
    pub resolution_scale: f32,
    /// Depth-test the mask draw against the camera depth so opaque geometry
    /// hides emitters. The mask is then drawn at full size.
    pub depth_test: bool,
    /// Write linearized camera depth into `depth_target`
    pub debug_depth: bool,
}

impl Default for LightShaftSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mask_target: String::from("_OcclusionMask"),
            blur_target: String::from("_LightShaftsBlur"),
            depth_target: String::from("_CameraDepthLinear"),
            filter: FilterSettings::default(),
            override_color: [1.0, 1.0, 1.0, 1.0],
            blur: BlurSettings::default(),
            mask_format: MaskFormat::default(),
            resolution_scale: 1.0,
            depth_test: false,
            debug_depth: false,
        }
    }
}

impl LightShaftSettings {
    /// Parse settings from RON and validate them
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid RON or a value is out of range
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))?;
        let settings = Self::from_ron_str(&text)?;
        log::info!("Loaded light shaft settings from {}", path.display());
        Ok(settings)
    }

    /// Serialize to pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, SettingsError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SettingsError::Serialize(e.to_string()))
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns the first value outside its range
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("blur.blur_width", self.blur.blur_width, 0.0, 1.0)?;
        check_range("blur.intensity", self.blur.intensity, 0.0, 1.0)?;
        if !(self.resolution_scale > 0.0 && self.resolution_scale <= 1.0) {
            return Err(SettingsError::OutOfRange {
                field: "resolution_scale",
                value: self.resolution_scale,
            });
        }
        Ok(())
    }

    /// Copy with every range clamped into bounds
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut settings = self.clone();
        settings.blur.blur_width = clamp_finite(settings.blur.blur_width, 0.0, 1.0, 0.85);
        settings.blur.intensity = clamp_finite(settings.blur.intensity, 0.0, 1.0, 1.0);
        settings.resolution_scale = clamp_finite(settings.resolution_scale, 0.05, 1.0, 1.0);
        settings
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), SettingsError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange { field, value })
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Errors that can occur while loading settings
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// IO error reading the file
    Io(String),
    /// Invalid RON
    Parse(String),
    /// RON serialization failed
    Serialize(String),
    /// A value outside its allowed range
    OutOfRange {
        /// Field path
        field: &'static str,
        /// Rejected value
        value: f32,
    },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Serialize(e) => write!(f, "Serialize error: {e}"),
            Self::OutOfRange { field, value } => write!(f, "{field} out of range: {value}"),
        }
    }
}

impl std::error::Error for SettingsError {}
