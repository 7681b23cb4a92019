//! Velocity system
//!
//! Moves every node that carries a velocity by `velocity * elapsed`.

use crate::ecs::components::{NodeComponent, VelocityComponent};
use crate::ecs::{EcsError, Entities, EntityHandle, System, SystemBase, SystemFilter, TypeRegistry};

/// Integrates linear velocities into node positions
pub struct VelocitySystem {
    base: SystemBase,
}

impl VelocitySystem {
    /// Create a velocity system tracking entities with a node and a velocity
    pub fn new(registry: &TypeRegistry) -> Result<Self, EcsError> {
        let mut filter = SystemFilter::new();
        filter
            .require_component::<NodeComponent>(registry)?
            .require_component::<VelocityComponent>(registry)?;

        Ok(Self {
            base: SystemBase::for_system::<Self>(registry, filter)?,
        })
    }
}

impl System for VelocitySystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn on_update(&mut self, entities: &mut Entities, elapsed: f32) {
        let handles: Vec<EntityHandle> = self.base.entities().iter().collect();

        for handle in handles {
            let Some(entity) = entities.get_mut(handle) else {
                continue;
            };

            let Some(velocity) = entity.try_component::<VelocityComponent>().map(|v| v.linear_velocity) else {
                continue;
            };

            if let Some(node) = entity.try_component_mut::<NodeComponent>() {
                node.translate(velocity * elapsed);
            }
        }
    }
}
