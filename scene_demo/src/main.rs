//! Scene demo application
//!
//! Boots the engine from an optional configuration file, builds a small scene
//! (a main camera and an overhead camera on a higher layer, a few cubes, one
//! light of each type) and renders a number of frames into a recording
//! backend, logging what each frame sent to the GPU.
//!
//! ```text
//! scene_demo [config.toml|config.ron] [frames]
//! ```

use std::collections::BTreeMap;

use nazara_engine::config::{Config, ConfigError};
use nazara_engine::ecs::EcsError;
use nazara_engine::foundation::logging;
use nazara_engine::foundation::math::{Rectf, Vec3};
use nazara_engine::prelude::*;
use nazara_engine::render::{GpuCommand, RenderError, RenderTargetInfo};
use thiserror::Error;

const DEFAULT_FRAMES: u32 = 120;
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Render system missing from the world")]
    NoRenderSystem,

    #[error("Invalid frame count '{0}'")]
    FrameCount(String),
}

struct SceneDemo {
    world: World,
    target: RenderTargetInfo,
    spinner: EntityHandle,
    // Declared last so the world is gone before the engine shuts down
    _sdk: Sdk,
}

impl SceneDemo {
    fn new(config: EngineConfig) -> Result<Self, DemoError> {
        let max_lights = config.render.max_lights_per_pass;
        let sdk = Sdk::initialize(config)?;

        let mut backend = RecordingBackend::with_standard_shaders(max_lights);
        let target = backend.add_window_target(1280, 720);
        let world = sdk.create_default_world(Some(Box::new(backend)))?;

        let mut demo = Self {
            world,
            target,
            spinner: EntityHandle::default(),
            _sdk: sdk,
        };
        demo.build_scene()?;
        Ok(demo)
    }

    fn render_system(&mut self) -> Result<&mut RenderSystem, DemoError> {
        self.world.system_mut::<RenderSystem>().ok_or(DemoError::NoRenderSystem)
    }

    fn build_scene(&mut self) -> Result<(), DemoError> {
        let backend = self.render_system()?.render_backend_mut();
        let cube = backend.create_mesh(&Mesh::cube())?;
        let ball = backend.create_mesh(&Mesh::sphere(1.0, 16, 12))?;

        // Main view
        let mut eye = NodeComponent::from_position(Vec3::new(0.0, 3.0, 12.0));
        eye.look_at(Vec3::zeros(), Vec3::y());
        let main_camera = self.world.create_entity();
        self.world.add_component(main_camera, eye)?;
        self.world
            .add_component(main_camera, CameraComponent::new().with_target(self.target))?;

        // Overhead view drawn on top, in the top right corner
        let mut overhead = NodeComponent::from_position(Vec3::new(0.0, 20.0, 0.0));
        overhead.look_at(Vec3::zeros(), -Vec3::z());
        let mut map_camera = CameraComponent::new()
            .with_target(self.target)
            .with_layer(1)
            .with_projection_type(ProjectionType::Orthographic);
        map_camera.set_target_region(Rectf::new(0.75, 0.0, 0.25, 0.25));
        map_camera.set_size(nazara_engine::foundation::math::Vec2::new(24.0, 24.0));
        let overhead_camera = self.world.create_entity();
        self.world.add_component(overhead_camera, overhead)?;
        self.world.add_component(overhead_camera, map_camera)?;

        // Drawables
        let colors = [Color::rgb(200, 60, 60), Color::rgb(60, 200, 60), Color::rgb(60, 60, 200)];
        for (index, color) in colors.into_iter().enumerate() {
            let entity = self.world.create_entity();
            let x = (index as f32 - 1.0) * 3.0;
            self.world
                .add_component(entity, NodeComponent::from_position(Vec3::new(x, 0.0, 0.0)))?;
            self.world.add_component(
                entity,
                GraphicsComponent::new().with(Renderable::new(cube, Material::new().with_color(color))),
            )?;
        }

        self.spinner = self.world.create_entity();
        self.world
            .add_component(self.spinner, NodeComponent::from_position(Vec3::new(0.0, 2.5, 0.0)))?;
        self.world.add_component(
            self.spinner,
            GraphicsComponent::new().with(
                Renderable::new(ball, Material::new().with_shininess(80.0)).with_bounding_radius(1.0),
            ),
        )?;

        // Lights
        let sun = self.world.create_entity();
        let mut sun_node = NodeComponent::new();
        sun_node.look_at(Vec3::new(-0.7, -1.0, 0.3), Vec3::y());
        self.world.add_component(sun, sun_node)?;
        self.world
            .add_component(sun, LightFactory::directional(Color::rgb(255, 244, 214)))?;

        let lamp = self.world.create_entity();
        self.world
            .add_component(lamp, NodeComponent::from_position(Vec3::new(-4.0, 1.5, 2.0)))?;
        self.world
            .add_component(lamp, LightFactory::point(Color::rgb(255, 160, 60), 6.0))?;
        self.world
            .add_component(lamp, VelocityComponent::new(Vec3::new(1.0, 0.0, 0.0)))?;

        let spot = self.world.create_entity();
        let mut spot_node = NodeComponent::from_position(Vec3::new(0.0, 6.0, 2.0));
        spot_node.look_at(Vec3::zeros(), Vec3::z());
        self.world.add_component(spot, spot_node)?;
        self.world
            .add_component(spot, LightFactory::spot(Color::WHITE, 12.0, 15.0, 30.0))?;

        log::info!("Scene built with {} entities", self.world.entity_count());
        Ok(())
    }

    /// Resize the window target and let every camera follow
    fn resize(&mut self, width: u32, height: u32) -> Result<(), DemoError> {
        let (render, entities) = self
            .world
            .system_with_entities_mut::<RenderSystem>()
            .ok_or(DemoError::NoRenderSystem)?;

        let target = render
            .backend_mut::<RecordingBackend>()
            .ok_or(DemoError::NoRenderSystem)?
            .resize_target(self.target.id, width, height)?;
        let cameras = render.notify_target_resized(entities, target);
        self.target = target;

        log::info!("Window resized to {}x{}, {} cameras follow", width, height, cameras);
        Ok(())
    }

    fn run(&mut self, frames: u32) -> Result<(), DemoError> {
        let spin = Quat::from_axis_angle(&Vec3::y_axis(), FRAME_TIME * std::f32::consts::FRAC_PI_2);

        for frame in 0..frames {
            if frame == frames / 2 {
                self.resize(1920, 1080)?;
            }

            if let Some(entity) = self.world.entity_mut(self.spinner) {
                entity.component_mut::<NodeComponent>().rotate(spin);
            }

            self.world.update(FRAME_TIME);

            let commands = self
                .render_system()?
                .backend_mut::<RecordingBackend>()
                .ok_or(DemoError::NoRenderSystem)?
                .take_commands();
            log_frame(frame, &commands);
        }

        Ok(())
    }
}

fn log_frame(frame: u32, commands: &[GpuCommand]) {
    let draws = commands.iter().filter(|command| command.is_draw()).count();

    let mut shaders: BTreeMap<&str, usize> = BTreeMap::new();
    for command in commands {
        if let GpuCommand::SetShader(name) = command {
            *shaders.entry(name.as_str()).or_default() += 1;
        }
    }

    log::debug!(
        "Frame {}: {} commands, {} draws, shaders {:?}",
        frame,
        commands.len(),
        draws,
        shaders
    );
}

fn load_config(path: Option<&String>) -> Result<EngineConfig, DemoError> {
    let config = match path {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), DemoError> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match load_config(args.first()) {
        Ok(config) => config,
        Err(err) => {
            logging::init();
            log::error!("Failed to load configuration: {}", err);
            return Err(err);
        }
    };
    logging::init_with_level(&config.log_level);

    let frames = match args.get(1) {
        Some(text) => text.parse().map_err(|_| DemoError::FrameCount(text.clone()))?,
        None => DEFAULT_FRAMES,
    };

    log::info!("Starting scene demo ({:?} technique, {} frames)", config.render.technique, frames);

    let mut demo = SceneDemo::new(config)?;
    demo.run(frames)?;

    log::info!("Scene demo finished");
    Ok(())
}
