//! World level tests shared by the ECS modules

mod render_integration;
mod world_integration;

use std::sync::Arc;

use crate::ecs::components::{CameraComponent, GraphicsComponent, LightComponent, NodeComponent, VelocityComponent};
use crate::ecs::systems::{RenderSystem, VelocitySystem};
use crate::ecs::{EcsError, Entities, Entity, EntityId, System, SystemBase, SystemFilter, TypeRegistry};

/// Hook call recorded by [`HookRecorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Hook {
    Added(EntityId),
    Removed(EntityId),
    Validated(EntityId, bool),
}

/// System tracking every entity with a node and recording its hooks
pub(super) struct HookRecorder {
    base: SystemBase,
    pub hooks: Vec<Hook>,
    pub updates: Vec<f32>,
}

impl HookRecorder {
    pub fn new(registry: &TypeRegistry) -> Result<Self, EcsError> {
        let mut filter = SystemFilter::new();
        filter.require_component::<NodeComponent>(registry)?;

        Ok(Self {
            base: SystemBase::for_system::<Self>(registry, filter)?,
            hooks: Vec::new(),
            updates: Vec::new(),
        })
    }
}

impl System for HookRecorder {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn on_entity_added(&mut self, entity: &Entity) {
        self.hooks.push(Hook::Added(entity.id()));
    }

    fn on_entity_removed(&mut self, entity: &Entity) {
        self.hooks.push(Hook::Removed(entity.id()));
    }

    fn on_entity_validation(&mut self, entity: &Entity, just_added: bool) {
        self.hooks.push(Hook::Validated(entity.id(), just_added));
    }

    fn on_update(&mut self, _entities: &mut Entities, elapsed: f32) {
        self.updates.push(elapsed);
    }
}

/// Registry with every engine component and system, plus the hook recorder
pub(super) fn test_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry.register_component::<NodeComponent>("NdkNode").unwrap();
    registry.register_component::<VelocityComponent>("NdkVeloc").unwrap();
    registry.register_component::<CameraComponent>("NdkCam").unwrap();
    registry.register_component::<LightComponent>("NdkLight").unwrap();
    registry.register_component::<GraphicsComponent>("NdkGfx").unwrap();
    registry.register_system::<VelocitySystem>().unwrap();
    registry.register_system::<RenderSystem>().unwrap();
    registry.register_system::<HookRecorder>().unwrap();
    Arc::new(registry)
}
