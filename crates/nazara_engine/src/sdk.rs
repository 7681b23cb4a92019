//! # Engine Context
//!
//! [`Sdk`] brings the engine up and down. Creating it initialises every
//! module (shared modules first, then client modules unless the engine runs
//! in server mode), registers the engine components and systems in a fixed
//! order and hands out worlds sharing that registry. Dropping it tears the
//! modules down in reverse order.
//!
//! ```rust,no_run
//! use nazara_engine::core::config::EngineConfig;
//! use nazara_engine::render::RecordingBackend;
//! use nazara_engine::sdk::Sdk;
//!
//! let sdk = Sdk::initialize(EngineConfig::default())?;
//! let mut world = sdk.create_default_world(Some(Box::new(RecordingBackend::with_standard_shaders(3))))?;
//! world.update(1.0 / 60.0);
//! # Ok::<(), nazara_engine::sdk::EngineError>(())
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::core::config::{ConfigError, EngineConfig};
use crate::ecs::components::{CameraComponent, GraphicsComponent, LightComponent, NodeComponent, VelocityComponent};
use crate::ecs::systems::{RenderSystem, VelocitySystem};
use crate::ecs::{EcsError, TypeRegistry, World};
use crate::render::backend::RenderBackend;

/// When a module is brought up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Needed by servers and clients alike
    Shared,
    /// Skipped in server mode
    Client,
}

/// Module bring-up failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Module {module} failed to initialize: {reason}")]
pub struct ModuleError {
    pub module: String,
    pub reason: String,
}

impl ModuleError {
    pub fn new(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Engine level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A module failed to come up
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Component or system registration failed
    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),
}

/// Engine module with an explicit init/teardown pair
///
/// `uninitialize` is only called on modules whose `initialize` succeeded.
pub trait Module {
    fn name(&self) -> &str;

    fn kind(&self) -> ModuleKind;

    fn initialize(&mut self, config: &EngineConfig) -> Result<(), ModuleError>;

    fn uninitialize(&mut self);
}

/// Logging and shared utilities
#[derive(Debug, Default)]
pub struct CoreModule;

impl Module for CoreModule {
    fn name(&self) -> &str {
        "Core"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Shared
    }

    fn initialize(&mut self, config: &EngineConfig) -> Result<(), ModuleError> {
        let level = config
            .log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| ModuleError::new(self.name(), format!("unknown log level '{}'", config.log_level)))?;

        log::debug!("Core module up, log level {}", level);
        Ok(())
    }

    fn uninitialize(&mut self) {}
}

/// Rendering, checks the render configuration before anything draws
#[derive(Debug, Default)]
pub struct GraphicsModule;

impl Module for GraphicsModule {
    fn name(&self) -> &str {
        "Graphics"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Client
    }

    fn initialize(&mut self, config: &EngineConfig) -> Result<(), ModuleError> {
        config
            .render
            .validate()
            .map_err(|err| ModuleError::new(self.name(), err.to_string()))?;

        log::debug!("Graphics module up, {:?} technique", config.render.technique);
        Ok(())
    }

    fn uninitialize(&mut self) {}
}

/// Collects the modules of an [`Sdk`] before initialising it
pub struct SdkBuilder {
    config: EngineConfig,
    modules: Vec<Box<dyn Module>>,
}

impl SdkBuilder {
    /// Builder with no module
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
        }
    }

    /// Builder pattern: Add a module
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Bring every module up and register the engine types
    pub fn build(self) -> Result<Sdk, EngineError> {
        Sdk::start(self.config, self.modules)
    }
}

/// Initialised engine
pub struct Sdk {
    config: EngineConfig,
    registry: Arc<TypeRegistry>,
    modules: Vec<Box<dyn Module>>,
}

impl Sdk {
    /// Initialise the engine with the core and graphics modules
    pub fn initialize(config: EngineConfig) -> Result<Self, EngineError> {
        SdkBuilder::new(config)
            .with_module(CoreModule)
            .with_module(GraphicsModule)
            .build()
    }

    /// Start building an engine with custom modules
    pub fn builder(config: EngineConfig) -> SdkBuilder {
        SdkBuilder::new(config)
    }

    fn start(config: EngineConfig, modules: Vec<Box<dyn Module>>) -> Result<Self, EngineError> {
        match Self::bring_up(&config, modules) {
            Ok((modules, registry)) => {
                log::info!("Initialized: SDK");
                Ok(Self {
                    config,
                    registry: Arc::new(registry),
                    modules,
                })
            }
            Err(err) => {
                log::error!("Failed to initialize SDK: {}", err);
                Err(err)
            }
        }
    }

    fn bring_up(
        config: &EngineConfig,
        modules: Vec<Box<dyn Module>>,
    ) -> Result<(Vec<Box<dyn Module>>, TypeRegistry), EngineError> {
        let (shared, client): (Vec<_>, Vec<_>) = modules
            .into_iter()
            .partition(|module| module.kind() == ModuleKind::Shared);

        let mut active: Vec<Box<dyn Module>> = Vec::new();
        let mut pending = shared;
        if config.server_mode {
            for module in &client {
                log::debug!("Server mode, skipping module {}", module.name());
            }
        } else {
            pending.extend(client);
        }

        for mut module in pending {
            if let Err(err) = module.initialize(config) {
                tear_down(&mut active);
                return Err(err.into());
            }

            log::info!("Initialized: {}", module.name());
            active.push(module);
        }

        match register_engine_types(config.server_mode) {
            Ok(registry) => Ok((active, registry)),
            Err(err) => {
                tear_down(&mut active);
                Err(err.into())
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registry shared by every world of this engine
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn is_server(&self) -> bool {
        self.config.server_mode
    }

    /// Names of the running modules, in initialisation order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name()).collect()
    }

    /// Empty world without systems
    pub fn create_world(&self) -> World {
        World::new(Arc::clone(&self.registry))
    }

    /// World running the engine systems
    ///
    /// The render system is added when a backend is given and the engine is
    /// not a server.
    pub fn create_default_world(&self, backend: Option<Box<dyn RenderBackend>>) -> Result<World, EngineError> {
        let mut world = self.create_world();
        world.add_system(VelocitySystem::new(&self.registry)?)?;

        match backend {
            Some(backend) if !self.is_server() => {
                world.add_system(RenderSystem::new(&self.registry, backend, &self.config.render)?)?;
            }
            Some(_) => log::warn!("Server mode, ignoring render backend"),
            None => log::debug!("No render backend, world runs without a render system"),
        }

        Ok(world)
    }
}

impl Drop for Sdk {
    fn drop(&mut self) {
        tear_down(&mut self.modules);
        log::info!("Uninitialized: SDK");
    }
}

fn tear_down(modules: &mut Vec<Box<dyn Module>>) {
    while let Some(mut module) = modules.pop() {
        module.uninitialize();
        log::info!("Uninitialized: {}", module.name());
    }
}

fn register_engine_types(server_mode: bool) -> Result<TypeRegistry, EcsError> {
    let mut registry = TypeRegistry::new();

    registry.register_component::<NodeComponent>("NdkNode")?;
    registry.register_component::<VelocityComponent>("NdkVeloc")?;
    if !server_mode {
        registry.register_component::<CameraComponent>("NdkCam")?;
        registry.register_component::<LightComponent>("NdkLight")?;
        registry.register_component::<GraphicsComponent>("NdkGfx")?;
    }

    registry.register_system::<VelocitySystem>()?;
    if !server_mode {
        registry.register_system::<RenderSystem>()?;
    }

    log::debug!(
        "Registered {} components and {} systems",
        registry.component_count(),
        registry.system_count()
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingBackend;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct TestModule {
        name: &'static str,
        kind: ModuleKind,
        fail: bool,
        journal: Journal,
    }

    impl TestModule {
        fn new(name: &'static str, kind: ModuleKind, journal: &Journal) -> Self {
            Self {
                name,
                kind,
                fail: false,
                journal: Arc::clone(journal),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl Module for TestModule {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> ModuleKind {
            self.kind
        }

        fn initialize(&mut self, _config: &EngineConfig) -> Result<(), ModuleError> {
            if self.fail {
                return Err(ModuleError::new(self.name, "refused"));
            }
            self.journal.lock().unwrap().push(format!("init {}", self.name));
            Ok(())
        }

        fn uninitialize(&mut self) {
            self.journal.lock().unwrap().push(format!("uninit {}", self.name));
        }
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn test_default_registration_order() {
        let sdk = Sdk::initialize(EngineConfig::default()).unwrap();
        let registry = sdk.registry();

        for (index, name) in ["NdkNode", "NdkVeloc", "NdkCam", "NdkLight", "NdkGfx"].iter().enumerate() {
            assert_eq!(registry.component_index_by_name(name), Some(index));
        }
        assert_eq!(registry.system_index::<VelocitySystem>(), Ok(0));
        assert_eq!(registry.system_index::<RenderSystem>(), Ok(1));
        assert_eq!(sdk.module_names(), vec!["Core", "Graphics"]);
    }

    #[test]
    fn test_server_mode_skips_client_parts() {
        let sdk = Sdk::initialize(EngineConfig::default().with_server_mode(true)).unwrap();
        let registry = sdk.registry();

        assert!(!registry.is_component_registered::<CameraComponent>());
        assert!(!registry.is_system_registered::<RenderSystem>());
        assert_eq!(sdk.module_names(), vec!["Core"]);

        let world = sdk
            .create_default_world(Some(Box::new(RecordingBackend::new())))
            .unwrap();
        assert!(world.has_system::<VelocitySystem>());
        assert!(!world.has_system::<RenderSystem>());
    }

    #[test]
    fn test_shared_modules_come_first_and_leave_last() {
        let journal = Journal::default();
        let sdk = Sdk::builder(EngineConfig::default())
            .with_module(TestModule::new("Audio", ModuleKind::Client, &journal))
            .with_module(TestModule::new("Physics", ModuleKind::Shared, &journal))
            .build()
            .unwrap();

        assert_eq!(entries(&journal), vec!["init Physics", "init Audio"]);

        drop(sdk);
        assert_eq!(
            entries(&journal),
            vec!["init Physics", "init Audio", "uninit Audio", "uninit Physics"]
        );
    }

    #[test]
    fn test_failed_module_tears_down_the_others() {
        let journal = Journal::default();
        let result = Sdk::builder(EngineConfig::default())
            .with_module(TestModule::new("Utility", ModuleKind::Shared, &journal))
            .with_module(TestModule::new("Physics", ModuleKind::Shared, &journal))
            .with_module(TestModule::new("Audio", ModuleKind::Client, &journal).failing())
            .build();

        assert!(matches!(result, Err(EngineError::Module(ref err)) if err.module == "Audio"));
        assert_eq!(
            entries(&journal),
            vec!["init Utility", "init Physics", "uninit Physics", "uninit Utility"]
        );
    }

    #[test]
    fn test_invalid_render_config_fails_graphics() {
        let mut config = EngineConfig::default();
        config.render.max_lights_per_pass = 0;

        assert!(matches!(Sdk::initialize(config), Err(EngineError::Module(ref err)) if err.module == "Graphics"));
    }

    #[test]
    fn test_unknown_log_level_fails_core() {
        let config = EngineConfig::default().with_log_level("loud");
        assert!(matches!(Sdk::initialize(config), Err(EngineError::Module(ref err)) if err.module == "Core"));
    }

    #[test]
    fn test_default_world_systems() {
        let sdk = Sdk::initialize(EngineConfig::default()).unwrap();

        let world = sdk
            .create_default_world(Some(Box::new(RecordingBackend::with_standard_shaders(3))))
            .unwrap();
        assert!(world.has_system::<VelocitySystem>());
        assert!(world.has_system::<RenderSystem>());

        let bare = sdk.create_default_world(None).unwrap();
        assert!(!bare.has_system::<RenderSystem>());
        assert!(Arc::ptr_eq(bare.registry(), sdk.registry()));
    }
}
