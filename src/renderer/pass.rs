//! Render pass scheduling hooks
//!
//! Features contribute passes each frame. The renderer runs them ordered by
//! [`RenderPassEvent`] and interleaves its own opaque geometry pass.

use smallvec::SmallVec;

use super::camera::Camera;
use super::draw::Renderable;
use super::lights::VisibleLights;
use super::postprocess::RenderTargets;

/// When a pass runs relative to the renderer's built-in stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPassEvent {
    /// Start of the frame, before any camera target is cleared
    BeforeRendering,
    /// Right before opaque geometry
    BeforeRenderingOpaques,
    /// Right after opaque geometry
    AfterRenderingOpaques,
    /// Before the sky
    BeforeRenderingSkybox,
    /// After the sky, the opaque image is complete
    AfterRenderingSkybox,
    /// Before transparent geometry
    BeforeRenderingTransparents,
    /// After transparent geometry
    AfterRenderingTransparents,
    /// End of the frame
    AfterRendering,
}

/// Everything a pass may read or record into for one camera and frame
pub struct PassContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub camera: &'a Camera,
    /// Camera color target
    pub color_view: &'a wgpu::TextureView,
    pub color_format: wgpu::TextureFormat,
    /// Camera depth target (`Depth32Float`, sampleable)
    pub depth_view: &'a wgpu::TextureView,
    /// Camera target size in pixels
    pub size: (u32, u32),
    pub lights: &'a VisibleLights,
    pub renderables: &'a [Renderable<'a>],
    pub targets: &'a mut RenderTargets,
}

/// A unit of GPU work scheduled by the renderer
pub trait RenderPass {
    /// Label for logs and GPU debuggers
    fn name(&self) -> &'static str;

    /// Execution-order hint
    fn event(&self) -> RenderPassEvent;

    /// Record the pass
    fn execute(&mut self, ctx: &mut PassContext<'_>);

    /// Release per-frame resources once every pass has executed
    fn frame_cleanup(&mut self, _targets: &mut RenderTargets) {}
}

/// Plugin that injects passes into the renderer every frame
pub trait RendererFeature {
    /// Enqueue this frame's passes
    fn add_render_passes<'a>(&'a mut self, queue: &mut PassQueue<'a>);
}

/// Passes collected for one frame
#[derive(Default)]
pub struct PassQueue<'a> {
    passes: SmallVec<[&'a mut dyn RenderPass; 8]>,
}

impl<'a> PassQueue<'a> {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            passes: SmallVec::new(),
        }
    }

    /// Add a pass
    pub fn enqueue(&mut self, pass: &'a mut dyn RenderPass) {
        self.passes.push(pass);
    }

    /// Number of queued passes
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether no pass is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Passes ordered by event. Passes sharing an event keep enqueue order.
    #[must_use]
    pub fn into_sorted(mut self) -> SmallVec<[&'a mut dyn RenderPass; 8]> {
        self.passes.sort_by_key(|pass| pass.event());
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, RenderPassEvent);

    impl RenderPass for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn event(&self) -> RenderPassEvent {
            self.1
        }

        fn execute(&mut self, _ctx: &mut PassContext<'_>) {}
    }

    #[test]
    fn test_sorted_by_event_stable() {
        let mut blur = Named("blur", RenderPassEvent::AfterRenderingSkybox);
        let mut mask = Named("mask", RenderPassEvent::AfterRenderingOpaques);
        let mut depth = Named("depth", RenderPassEvent::AfterRenderingOpaques);
        let mut early = Named("early", RenderPassEvent::BeforeRendering);

        let mut queue = PassQueue::new();
        queue.enqueue(&mut blur);
        queue.enqueue(&mut mask);
        queue.enqueue(&mut depth);
        queue.enqueue(&mut early);
        assert_eq!(queue.len(), 4);

        let order: Vec<_> = queue.into_sorted().iter().map(|p| p.name()).collect();
        assert_eq!(order, ["early", "mask", "depth", "blur"]);
    }

    #[test]
    fn test_event_order() {
        assert!(RenderPassEvent::AfterRenderingOpaques < RenderPassEvent::AfterRenderingSkybox);
        assert!(
            RenderPassEvent::AfterRenderingSkybox < RenderPassEvent::BeforeRenderingTransparents
        );
    }
}
