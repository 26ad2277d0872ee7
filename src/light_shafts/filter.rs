//! Selects which renderables end up in the light mask

use serde::{Deserialize, Serialize};

use crate::renderer::{LayerMask, Renderable, ShaderTag};

/// Layer and shader-tag filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Layers drawn into the mask
    pub layer_mask: LayerMask,
    /// Shader pass tags drawn into the mask
    pub shader_tags: Vec<ShaderTag>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            layer_mask: LayerMask::EVERYTHING,
            shader_tags: ShaderTag::FORWARD.to_vec(),
        }
    }
}

impl FilterSettings {
    /// Filter for the given layers with the default forward tags
    #[must_use]
    pub fn layers(layer_mask: LayerMask) -> Self {
        Self {
            layer_mask,
            ..Self::default()
        }
    }

    /// Whether an object on `layer` with `tag` passes
    #[must_use]
    pub fn accepts(&self, layer: u8, tag: ShaderTag) -> bool {
        self.layer_mask.contains(layer) && self.shader_tags.contains(&tag)
    }

    /// Renderables that pass, in draw-list order
    pub fn filter<'r, 'a>(
        &'r self,
        renderables: &'r [Renderable<'a>],
    ) -> impl Iterator<Item = &'r Renderable<'a>> + 'r {
        renderables
            .iter()
            .filter(move |r| self.accepts(r.layer, r.tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_forward_tags_on_all_layers() {
        let filter = FilterSettings::default();
        for tag in ShaderTag::FORWARD {
            assert!(filter.accepts(0, tag));
            assert!(filter.accepts(31, tag));
        }
        assert!(!filter.accepts(0, ShaderTag::DepthOnly));
        assert!(!filter.accepts(0, ShaderTag::ShadowCaster));
    }

    #[test]
    fn test_layer_mask_applies() {
        let filter = FilterSettings::layers(LayerMask::from_layers(&[8]));
        assert!(filter.accepts(8, ShaderTag::UniversalForward));
        assert!(!filter.accepts(0, ShaderTag::UniversalForward));
        assert!(!filter.accepts(8, ShaderTag::DepthOnly));
    }

    #[test]
    fn test_ron_partial() {
        let filter: FilterSettings = ron::from_str("(layer_mask: 6)").unwrap();
        assert_eq!(filter.layer_mask, LayerMask(6));
        assert_eq!(filter.shader_tags, ShaderTag::FORWARD.to_vec());
    }
}
