//! Screen-space position of the main light

use glam::{Mat4, Vec2};

use crate::renderer::{VisibleLight, VisibleLights};

/// Clip-space `w` below which a projection is treated as degenerate
const MIN_CLIP_W: f32 = 1e-6;

/// Project a light into texture coordinates (origin top left, 0..1 on screen).
///
/// Returns `None` when the light lies on the camera plane (`w == 0`).
#[must_use]
pub fn light_screen_position(view_proj: Mat4, light: &VisibleLight) -> Option<Vec2> {
    let clip = view_proj * light.homogeneous_position();
    if clip.w.abs() < MIN_CLIP_W {
        return None;
    }

    let ndc = Vec2::new(clip.x, clip.y) / clip.w;
    Some(Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5))
}

/// Blur center carried from frame to frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCenter {
    current: Vec2,
}

impl LightCenter {
    /// Center of the screen
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Vec2::splat(0.5),
        }
    }

    /// Current center in texture coordinates
    #[must_use]
    pub const fn get(&self) -> Vec2 {
        self.current
    }

    /// Re-project the main light.
    ///
    /// Returns `false` and keeps the previous center when there is no main
    /// light or its projection degenerates.
    pub fn update(&mut self, view_proj: Mat4, lights: &VisibleLights) -> bool {
        let Some(center) = lights
            .main_light()
            .and_then(|light| light_screen_position(view_proj, light))
        else {
            return false;
        };

        self.current = center;
        true
    }
}

impl Default for LightCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::renderer::{Camera, LightType};

    fn point(position: Vec3) -> VisibleLight {
        VisibleLight {
            light_type: LightType::Point,
            position,
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }

    fn camera() -> Camera {
        let mut camera = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        camera.aspect = 1.0;
        camera
    }

    #[test]
    fn test_light_in_front_projects_to_center() {
        let uv = light_screen_position(camera().view_projection_matrix(), &point(Vec3::ZERO))
            .unwrap();
        assert!((uv - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_upper_right_maps_to_small_v() {
        let uv = light_screen_position(
            camera().view_projection_matrix(),
            &point(Vec3::new(2.0, 2.0, 0.0)),
        )
        .unwrap();
        assert!(uv.x > 0.5, "right of center");
        assert!(uv.y < 0.5, "texture v grows downward");
    }

    #[test]
    fn test_directional_matches_far_point() {
        let view_proj = camera().view_projection_matrix();
        let sun = VisibleLight {
            light_type: LightType::Directional,
            direction: Vec3::new(-0.3, -0.2, 1.0).normalize(),
            ..point(Vec3::ZERO)
        };
        let far = point(-sun.direction * 1.0e5);

        let a = light_screen_position(view_proj, &sun).unwrap();
        let b = light_screen_position(view_proj, &far).unwrap();
        assert!((a - b).length() < 1e-3);
    }

    #[test]
    fn test_degenerate_projection() {
        // On the camera plane
        let light = point(Vec3::new(3.0, 0.0, 10.0));
        assert!(light_screen_position(camera().view_projection_matrix(), &light).is_none());
    }

    #[test]
    fn test_center_kept_without_lights() {
        let view_proj = camera().view_projection_matrix();
        let mut center = LightCenter::new();

        let lights = VisibleLights {
            lights: vec![point(Vec3::new(2.0, 1.0, 0.0))],
            main_light_index: Some(0),
        };
        assert!(center.update(view_proj, &lights));
        let previous = center.get();
        assert_ne!(previous, Vec2::splat(0.5));

        assert!(!center.update(view_proj, &VisibleLights::default()));
        assert_eq!(center.get(), previous);
    }
}
