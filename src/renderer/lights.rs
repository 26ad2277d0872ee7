//! Scene lights and the per-frame visible light list
//!
//! Supports point lights, directional lights, and spot lights.

use glam::{Vec3, Vec4};

/// Type of light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Point light - emits in all directions from a point
    #[default]
    Point,
    /// Directional light - parallel rays (like the sun)
    Directional,
    /// Spot light - cone of light from a point
    Spot,
}

/// High-level light configuration
#[derive(Debug, Clone)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
    /// Disabled lights are never visible
    pub enabled: bool,
}

impl PointLight {
    /// Create a new point light
    #[must_use]
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            enabled: true,
        }
    }
}

/// Directional light (like the sun)
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// Light direction (normalized), pointing from the light into the scene
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
    /// Disabled lights are never visible
    pub enabled: bool,
}

impl DirectionalLight {
    /// Create a new directional light
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize(),
            color,
            intensity,
            enabled: true,
        }
    }
}

/// Spot light
#[derive(Debug, Clone)]
pub struct SpotLight {
    /// World position
    pub position: Vec3,
    /// Light direction
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
    /// Disabled lights are never visible
    pub enabled: bool,
}

impl SpotLight {
    /// Create a new spot light
    #[must_use]
    pub fn new(position: Vec3, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            color,
            intensity,
            enabled: true,
        }
    }
}

/// A light that survived this frame's visibility test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLight {
    /// Kind of light
    pub light_type: LightType,
    /// World position (point/spot), unused for directional lights
    pub position: Vec3,
    /// Direction (directional/spot)
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
}

impl VisibleLight {
    /// Homogeneous world position.
    ///
    /// Directional lights sit at infinity opposite their direction (`w = 0`).
    #[must_use]
    pub fn homogeneous_position(&self) -> Vec4 {
        match self.light_type {
            LightType::Directional => (-self.direction).extend(0.0),
            LightType::Point | LightType::Spot => self.position.extend(1.0),
        }
    }
}

/// Visible lights for one camera and frame
#[derive(Debug, Clone, Default)]
pub struct VisibleLights {
    /// Visible lights
    pub lights: Vec<VisibleLight>,
    /// Index of the main light in `lights`
    pub main_light_index: Option<usize>,
}

impl VisibleLights {
    /// The main light, `None` when nothing is visible
    #[must_use]
    pub fn main_light(&self) -> Option<&VisibleLight> {
        self.main_light_index
            .and_then(|index| self.lights.get(index))
            .or_else(|| self.lights.first())
    }

    /// Number of visible lights
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether no light is visible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

/// Light manager for handling multiple lights
#[derive(Debug, Default)]
pub struct LightManager {
    /// Point lights
    pub point_lights: Vec<PointLight>,
    /// Directional lights
    pub directional_lights: Vec<DirectionalLight>,
    /// Spot lights
    pub spot_lights: Vec<SpotLight>,
    /// Ambient color
    pub ambient: Vec3,
}

impl LightManager {
    /// Create a new light manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            point_lights: Vec::new(),
            directional_lights: Vec::new(),
            spot_lights: Vec::new(),
            ambient: Vec3::splat(0.1),
        }
    }

    /// Add a point light
    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Add a directional light
    pub fn add_directional_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
    }

    /// Add a spot light
    pub fn add_spot_light(&mut self, light: SpotLight) {
        self.spot_lights.push(light);
    }

    /// Set ambient light color
    pub fn set_ambient(&mut self, color: Vec3) {
        self.ambient = color;
    }

    /// Get total number of lights
    #[must_use]
    pub fn light_count(&self) -> usize {
        self.point_lights.len() + self.directional_lights.len() + self.spot_lights.len()
    }

    /// Build the visible light list.
    ///
    /// Disabled and zero-intensity lights are skipped. Directional lights come
    /// first and the brightest of them is the main light; without any
    /// directional light the first visible light is used.
    #[must_use]
    pub fn visible_lights(&self) -> VisibleLights {
        let mut visible = VisibleLights::default();

        // Directional lights first (typically most important)
        for light in self
            .directional_lights
            .iter()
            .filter(|l| l.enabled && l.intensity > 0.0)
        {
            visible.lights.push(VisibleLight {
                light_type: LightType::Directional,
                position: Vec3::ZERO,
                direction: light.direction,
                color: light.color,
                intensity: light.intensity,
            });
        }

        let directional_count = visible.lights.len();
        visible.main_light_index = visible.lights[..directional_count]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.intensity.total_cmp(&b.intensity))
            .map(|(index, _)| index);

        for light in self
            .point_lights
            .iter()
            .filter(|l| l.enabled && l.intensity > 0.0)
        {
            visible.lights.push(VisibleLight {
                light_type: LightType::Point,
                position: light.position,
                direction: Vec3::NEG_Y,
                color: light.color,
                intensity: light.intensity,
            });
        }

        for light in self
            .spot_lights
            .iter()
            .filter(|l| l.enabled && l.intensity > 0.0)
        {
            visible.lights.push(VisibleLight {
                light_type: LightType::Spot,
                position: light.position,
                direction: light.direction,
                color: light.color,
                intensity: light.intensity,
            });
        }

        if visible.main_light_index.is_none() && !visible.lights.is_empty() {
            visible.main_light_index = Some(0);
        }

        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_lights_no_main_light() {
        let manager = LightManager::new();
        let visible = manager.visible_lights();
        assert!(visible.is_empty());
        assert!(visible.main_light().is_none());
    }

    #[test]
    fn test_disabled_lights_not_visible() {
        let mut manager = LightManager::new();
        let mut sun = DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 1.0);
        sun.enabled = false;
        manager.add_directional_light(sun);
        manager.add_point_light(PointLight::new(Vec3::ZERO, Vec3::ONE, 0.0));

        assert_eq!(manager.light_count(), 2);
        assert!(manager.visible_lights().is_empty());
    }

    #[test]
    fn test_brightest_directional_is_main() {
        let mut manager = LightManager::new();
        manager.add_point_light(PointLight::new(Vec3::ONE, Vec3::ONE, 5.0));
        manager.add_directional_light(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 0.5));
        manager.add_directional_light(DirectionalLight::new(Vec3::NEG_X, Vec3::ONE, 2.0));

        let visible = manager.visible_lights();
        assert_eq!(visible.len(), 3);
        let main = visible.main_light().unwrap();
        assert_eq!(main.light_type, LightType::Directional);
        assert_eq!(main.intensity, 2.0);
    }

    #[test]
    fn test_first_light_is_main_without_sun() {
        let mut manager = LightManager::new();
        manager.add_point_light(PointLight::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE, 1.0));
        manager.add_spot_light(SpotLight::new(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, 1.0));

        let visible = manager.visible_lights();
        assert_eq!(visible.main_light_index, Some(0));
        assert_eq!(
            visible.main_light().unwrap().homogeneous_position(),
            Vec4::new(1.0, 2.0, 3.0, 1.0)
        );
    }

    #[test]
    fn test_directional_at_infinity() {
        let light = VisibleLight {
            light_type: LightType::Directional,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
        };
        assert_eq!(light.homogeneous_position(), Vec4::new(0.0, 1.0, 0.0, 0.0));
    }
}
