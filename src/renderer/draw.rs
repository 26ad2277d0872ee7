//! Draw-list entries and the tags passes filter them by

use serde::{Deserialize, Serialize};

use super::mesh::Mesh;

/// Bitmask over the 32 render layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer
    pub const EVERYTHING: Self = Self(u32::MAX);
    /// No layer
    pub const NOTHING: Self = Self(0);

    /// Mask containing exactly the given layers. Layers above 31 are ignored.
    #[must_use]
    pub fn from_layers(layers: &[u8]) -> Self {
        Self(
            layers
                .iter()
                .filter(|&&layer| layer < 32)
                .fold(0, |mask, &layer| mask | (1 << layer)),
        )
    }

    /// Whether `layer` is in the mask
    #[must_use]
    #[inline]
    pub const fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::EVERYTHING
    }
}

/// Pipeline pass tag a renderable's shader declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderTag {
    /// Unlit shaders without an explicit tag
    SrpDefaultUnlit,
    /// Standard forward-lit shaders
    #[default]
    UniversalForward,
    /// Forward-only lit shaders
    UniversalForwardOnly,
    /// Legacy forward-lit shaders
    LightweightForward,
    /// Depth prepass only
    DepthOnly,
    /// Shadow map rendering only
    ShadowCaster,
}

impl ShaderTag {
    /// Tags drawn by color passes
    pub const FORWARD: [Self; 4] = [
        Self::SrpDefaultUnlit,
        Self::UniversalForward,
        Self::UniversalForwardOnly,
        Self::LightweightForward,
    ];
}

/// One entry of the frame's draw list
#[derive(Debug, Clone, Copy)]
pub struct Renderable<'a> {
    /// Uploaded mesh
    pub mesh: &'a Mesh,
    /// Model bind group created by the renderer
    pub model: &'a wgpu::BindGroup,
    /// Render layer (0..32)
    pub layer: u8,
    /// Pass tag of the object's shader
    pub tag: ShaderTag,
}

impl<'a> Renderable<'a> {
    /// Renderable on layer 0 with the default forward tag
    #[must_use]
    pub fn new(mesh: &'a Mesh, model: &'a wgpu::BindGroup) -> Self {
        Self {
            mesh,
            model,
            layer: 0,
            tag: ShaderTag::default(),
        }
    }

    /// Set the render layer
    #[must_use]
    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    /// Set the shader tag
    #[must_use]
    pub fn with_tag(mut self, tag: ShaderTag) -> Self {
        self.tag = tag;
        self
    }

    /// Bind and draw the mesh. Expects pipeline and group 0 to be set, the
    /// model goes into group 1.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let (Some(vertices), Some(indices)) = (&self.mesh.vertex_buffer, &self.mesh.index_buffer)
        else {
            return;
        };

        render_pass.set_bind_group(1, self.model, &[]);
        render_pass.set_vertex_buffer(0, vertices.slice(..));
        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.index_count(), 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::from_layers(&[0, 3, 31, 40]);
        assert!(mask.contains(0));
        assert!(mask.contains(3));
        assert!(mask.contains(31));
        assert!(!mask.contains(1));
        assert!(!mask.contains(40));
        assert_eq!(mask.0, 1 | (1 << 3) | (1 << 31));

        assert!(LayerMask::EVERYTHING.contains(17));
        assert!(!LayerMask::NOTHING.contains(0));
    }
}
