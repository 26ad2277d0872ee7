//! Rendering module
//!
//! Forward rendering with wgpu, pluggable render passes and pooled
//! temporary targets.

mod camera;
mod context;
mod draw;
mod forward;
mod lights;
mod mesh;
mod pass;
mod pool;
mod postprocess;

pub use camera::Camera;
pub use context::{Renderer, RendererError};
pub use draw::{LayerMask, Renderable, ShaderTag};
pub use forward::{
    create_depth_texture, ForwardRenderer, FrameTargets, ModelUniform, SceneView, DEPTH_FORMAT,
};
pub use lights::{
    DirectionalLight, LightManager, LightType, PointLight, SpotLight, VisibleLight, VisibleLights,
};
pub use mesh::{Mesh, Vertex};
pub use pass::{PassContext, PassQueue, RenderPass, RenderPassEvent, RendererFeature};
pub use pool::{PoolIndex, TargetDesc, TargetPool};
pub use postprocess::{
    blit_sampler, FullscreenQuad, QuadVertex, RenderTarget, RenderTargets, ADDITIVE_BLEND,
};
