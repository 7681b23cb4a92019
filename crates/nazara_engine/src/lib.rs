//! # Nazara Engine
//!
//! Entity-component-system runtime with a render-queue pipeline on top.
//!
//! ## Features
//!
//! - **ECS**: bitset filtered systems, generation-checked entity handles,
//!   deferred validation of entity changes
//! - **Render system**: cameras drawn by layer, each through a forward or
//!   deferred technique
//! - **Deferred lighting**: G-buffer, stencil-culled light volumes and additive
//!   Phong accumulation
//! - **Backend agnostic**: GPU calls go through [`render::RenderBackend`]; a
//!   recording backend ships for tools and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nazara_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let sdk = Sdk::initialize(EngineConfig::default())?;
//!
//!     let mut backend = RecordingBackend::with_standard_shaders(3);
//!     let target = backend.add_window_target(1280, 720);
//!     let mut world = sdk.create_default_world(Some(Box::new(backend)))?;
//!
//!     let camera = world.create_entity();
//!     world.add_component(camera, NodeComponent::from_position(Vec3::new(0.0, 2.0, 10.0)))?;
//!     world.add_component(camera, CameraComponent::new().with_target(target))?;
//!
//!     world.update(1.0 / 60.0);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod render;
pub mod sdk;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{EngineConfig, RenderConfig, TechniqueKind},
        ecs::{
            components::{
                CameraComponent, GraphicsComponent, LightComponent, LightFactory, LightType, NodeComponent,
                ProjectionType, Renderable, VelocityComponent,
            },
            systems::{RenderSystem, VelocitySystem},
            Component, Entity, EntityHandle, System, World,
        },
        foundation::{
            color::Color,
            math::{Mat4, Quat, Transform, Vec3},
        },
        render::{Background, Material, Mesh, RecordingBackend, RenderBackend},
        sdk::{EngineError, Sdk},
    };
}
