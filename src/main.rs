//! Light shafts demo
//!
//! A bright sun disc on its own layer sits behind a row of pillars. Arrow keys
//! orbit the camera, Space toggles the shafts, F1 toggles the depth copy.
//! Settings are read from `light_shafts.ron` in the working directory when it
//! exists.

use std::path::Path;

use light_shafts::light_shafts::FilterSettings;
use light_shafts::prelude::*;

/// Layer that holds light emitters
const EMITTER_LAYER: u8 = 8;

const SETTINGS_PATH: &str = "light_shafts.ron";

struct Object {
    mesh: usize,
    model: (wgpu::Buffer, wgpu::BindGroup),
    layer: u8,
}

/// Held arrow keys
#[derive(Default)]
struct Orbit {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

struct DemoGame {
    camera: Camera,
    lights: LightManager,
    meshes: Vec<Mesh>,
    objects: Vec<Object>,
    shafts: Option<LightShafts>,
    orbit: Orbit,
    camera_yaw: f32,
    camera_pitch: f32,
}

impl DemoGame {
    fn new() -> Self {
        let mut lights = LightManager::new();
        lights.set_ambient(Vec3::splat(0.08));
        lights.add_directional_light(DirectionalLight::new(
            sun_direction(),
            Vec3::new(1.0, 0.9, 0.7),
            1.5,
        ));

        Self {
            camera: Camera::look_at(Vec3::new(0.0, 4.0, 14.0), Vec3::ZERO, Vec3::Y),
            lights,
            meshes: Vec::new(),
            objects: Vec::new(),
            shafts: None,
            orbit: Orbit::default(),
            camera_yaw: std::f32::consts::FRAC_PI_2,
            camera_pitch: 0.2,
        }
    }

    fn add_object(&mut self, renderer: &Renderer, mesh: usize, transform: Mat4, layer: u8) {
        self.objects.push(Object {
            mesh,
            model: renderer.create_model_bind_group(transform),
            layer,
        });
    }
}

/// Direction the sunlight travels
fn sun_direction() -> Vec3 {
    Vec3::new(0.0, -0.35, 1.0).normalize()
}

fn load_settings() -> LightShaftSettings {
    if !Path::new(SETTINGS_PATH).exists() {
        return LightShaftSettings {
            filter: FilterSettings::layers(LayerMask::from_layers(&[EMITTER_LAYER])),
            // Pillars hide the sun disc in the mask
            depth_test: true,
            ..LightShaftSettings::default()
        };
    }

    match LightShaftSettings::load(SETTINGS_PATH) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load {SETTINGS_PATH}: {e}, using defaults");
            LightShaftSettings::default()
        }
    }
}

impl Game for DemoGame {
    fn init(&mut self, ctx: &mut EngineContext) {
        log::info!("Initializing light shafts demo");

        if let Some(renderer) = ctx.renderer_mut() {
            renderer.set_clear_color(wgpu::Color {
                r: 0.35,
                g: 0.45,
                b: 0.6,
                a: 1.0,
            });
        }

        let Some(renderer) = ctx.renderer() else {
            return;
        };

        let mut meshes = vec![Mesh::plane(40.0), Mesh::cube(), Mesh::sphere(1.0, 32, 16)];
        for mesh in &mut meshes {
            renderer.upload_mesh(mesh);
        }
        self.meshes = meshes;

        self.add_object(renderer, 0, Mat4::IDENTITY, 0);
        for i in -3..=3 {
            let transform = Mat4::from_scale_rotation_translation(
                Vec3::new(0.6, 4.0, 0.6),
                Quat::IDENTITY,
                Vec3::new(i as f32 * 1.8, 2.0, -4.0),
            );
            self.add_object(renderer, 1, transform, 0);
        }

        // The sun disc sits far away along the light direction
        let sun = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::IDENTITY,
            -sun_direction() * 40.0,
        );
        self.add_object(renderer, 2, sun, EMITTER_LAYER);

        self.shafts = Some(LightShafts::new(
            renderer.device(),
            renderer.model_bind_group_layout(),
            renderer.color_format(),
            load_settings(),
        ));

        self.camera.far = 200.0;
        self.camera.set_aspect(ctx.width(), ctx.height());

        log::info!(
            "Demo initialized with {} objects and {} lights",
            self.objects.len(),
            self.lights.light_count()
        );
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        let dt = ctx.time.delta_seconds();
        let speed = 1.5;

        if self.orbit.left {
            self.camera_yaw -= speed * dt;
        }
        if self.orbit.right {
            self.camera_yaw += speed * dt;
        }
        if self.orbit.up {
            self.camera_pitch += speed * dt;
        }
        if self.orbit.down {
            self.camera_pitch -= speed * dt;
        }
        self.camera_pitch = self.camera_pitch.clamp(-0.2, 1.2);

        self.camera
            .orbit(Vec3::new(0.0, 2.0, 0.0), self.camera_yaw, self.camera_pitch, 14.0);
    }

    fn render(&mut self, ctx: &mut EngineContext) {
        let renderables: Vec<Renderable<'_>> = self
            .objects
            .iter()
            .filter_map(|object| {
                let mesh = self.meshes.get(object.mesh)?;
                Some(Renderable::new(mesh, &object.model.1).with_layer(object.layer))
            })
            .collect();

        let scene = SceneView {
            camera: &self.camera,
            lights: &self.lights,
            renderables: &renderables,
        };

        let Some(renderer) = ctx.renderer_mut() else {
            return;
        };

        match self.shafts.as_mut() {
            Some(shafts) => renderer.render(&scene, &mut [shafts as &mut dyn RendererFeature]),
            None => renderer.render(&scene, &mut []),
        }
    }

    fn on_key(&mut self, ctx: &mut EngineContext, key: KeyCode, pressed: bool) {
        match key {
            KeyCode::ArrowLeft => self.orbit.left = pressed,
            KeyCode::ArrowRight => self.orbit.right = pressed,
            KeyCode::ArrowUp => self.orbit.up = pressed,
            KeyCode::ArrowDown => self.orbit.down = pressed,
            KeyCode::Escape if pressed => ctx.quit(),
            KeyCode::Space if pressed => {
                if let Some(shafts) = &mut self.shafts {
                    let enabled = !shafts.settings().enabled;
                    shafts.set_enabled(enabled);
                    log::info!("Light shafts {}", if enabled { "on" } else { "off" });
                }
            }
            KeyCode::F1 if pressed => {
                if let Some(shafts) = &mut self.shafts {
                    let mut settings = shafts.settings().clone();
                    settings.debug_depth = !settings.debug_depth;
                    shafts.set_settings(settings);
                }
            }
            _ => {}
        }
    }

    fn on_resize(&mut self, _ctx: &mut EngineContext, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }
}

fn main() {
    let config = EngineConfig::default()
        .with_title("Light Shafts")
        .with_size(1280, 720)
        .with_vsync(true);

    let game = DemoGame::new();
    let engine = Engine::new(config, game);

    if let Err(e) = engine.run() {
        eprintln!("Engine error: {}", e);
    }
}
