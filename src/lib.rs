//! Light shafts for a wgpu forward renderer
//!
//! This crate provides:
//! - A small forward renderer with pluggable, event-ordered render passes
//! - Pooled temporary render targets
//! - A light-shaft (god ray) feature: light mask, radial blur toward the main
//!   light and an additive composite
//! - A winit engine loop to host it

pub mod core;
pub mod light_shafts;
pub mod renderer;

// Re-exports for convenience
pub use glam;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{Engine, EngineConfig, EngineContext, Game, Time};
    pub use crate::light_shafts::{LightShaftSettings, LightShafts};
    pub use crate::renderer::{
        Camera, DirectionalLight, LayerMask, LightManager, Mesh, PointLight, Renderable,
        Renderer, RendererFeature, SceneView, ShaderTag, SpotLight, Vertex,
    };
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
