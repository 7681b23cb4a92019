//! ECS World implementation
//!
//! The world owns every entity and system. Entity changes are not forwarded to
//! systems immediately: mutable access marks the entity as touched, and the
//! next [`World::refresh`] (run at the start of [`World::update`]) first
//! destroys killed entities, then re-evaluates every invalidated entity against
//! each system filter:
//!
//! - passes and not yet tracked: the system starts tracking it,
//!   `on_entity_added` then `on_entity_validation(just_added = true)` run
//! - passes and already tracked: `on_entity_validation(just_added = false)`
//! - fails and tracked: `on_entity_removed` runs and the system drops it

use std::any::type_name;
use std::sync::Arc;

use slotmap::SlotMap;

use super::component::{AsAny, Component};
use super::entity::{Entity, EntityHandle, EntityId};
use super::error::EcsError;
use super::registry::TypeRegistry;
use super::system::{System, SystemIndex};
use crate::foundation::bitset::Bitset;

/// Entity storage handed to systems during their update
///
/// Mutable access through [`Entities::get_mut`] marks the entity as touched so
/// that component additions or removals made by a system are picked up on the
/// next refresh.
#[derive(Debug, Default)]
pub struct Entities {
    slots: SlotMap<EntityHandle, Entity>,
    id_to_handle: Vec<Option<EntityHandle>>,
    touched: Bitset,
}

impl Entities {
    /// Borrow a live entity
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.slots.get(handle)
    }

    /// Mutably borrow a live entity, marking it as touched
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        let entity = self.slots.get_mut(handle)?;
        self.touched.unbounded_set(entity.id() as usize, true);
        Some(entity)
    }

    /// Borrow the live entity with id `id`
    pub fn by_id(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(self.handle_of(id)?)
    }

    /// Handle of the live entity with id `id`
    pub fn handle_of(&self, id: EntityId) -> Option<EntityHandle> {
        self.id_to_handle.get(id as usize).copied().flatten()
    }

    /// Does the handle still refer to a live entity?
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.slots.contains_key(handle)
    }

    /// Iterate over every live entity
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.values()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Is there no live entity?
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// ECS World containing all entities and systems
pub struct World {
    registry: Arc<TypeRegistry>,
    entities: Entities,
    free_ids: Vec<EntityId>,
    next_id: EntityId,
    killed: Bitset,
    systems: Vec<Option<Box<dyn System>>>,
}

impl World {
    /// Create a new world sharing `registry`
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entities: Entities::default(),
            free_ids: Vec::new(),
            next_id: 0,
            killed: Bitset::new(),
            systems: Vec::new(),
        }
    }

    /// Registry shared by this world
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Create a new entity
    ///
    /// The entity is evaluated by the systems on the next refresh.
    pub fn create_entity(&mut self) -> EntityHandle {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });

        let registry = Arc::clone(&self.registry);
        let handle = self
            .entities
            .slots
            .insert_with_key(|handle| Entity::new(id, handle, registry));

        let slot = id as usize;
        if self.entities.id_to_handle.len() <= slot {
            self.entities.id_to_handle.resize(slot + 1, None);
        }
        self.entities.id_to_handle[slot] = Some(handle);
        self.entities.touched.unbounded_set(slot, true);

        log::trace!("Created entity {}", id);
        handle
    }

    /// Schedule an entity for destruction on the next refresh
    pub fn kill_entity(&mut self, handle: EntityHandle) -> Result<(), EcsError> {
        let entity = self.entities.get(handle).ok_or(EcsError::InvalidEntity)?;
        self.killed.unbounded_set(entity.id() as usize, true);
        Ok(())
    }

    /// Does the handle refer to a live entity?
    ///
    /// A killed entity stays valid until the next refresh.
    pub fn is_entity_valid(&self, handle: EntityHandle) -> bool {
        self.entities.contains(handle)
    }

    /// Is there a live entity with id `id`?
    pub fn is_entity_id_valid(&self, id: EntityId) -> bool {
        self.entities.handle_of(id).is_some()
    }

    /// Borrow an entity
    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Mutably borrow an entity, it is re-evaluated on the next refresh if changed
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    /// Borrow the entity with id `id`
    pub fn entity_by_id(&self, id: EntityId) -> Result<&Entity, EcsError> {
        self.entities.by_id(id).ok_or(EcsError::UnknownEntityId(id))
    }

    /// Every live entity
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Attach a component to an entity
    pub fn add_component<T: Component>(&mut self, handle: EntityHandle, component: T) -> Result<&mut T, EcsError> {
        self.entity_mut(handle)
            .ok_or(EcsError::InvalidEntity)?
            .add_component(component)
    }

    /// Destroy a component of an entity, returns whether it was present
    pub fn remove_component<T: Component>(&mut self, handle: EntityHandle) -> Result<bool, EcsError> {
        self.entity_mut(handle)
            .ok_or(EcsError::InvalidEntity)?
            .remove_component::<T>()
    }

    /// Enable or disable an entity
    pub fn enable_entity(&mut self, handle: EntityHandle, enable: bool) -> Result<(), EcsError> {
        self.entity_mut(handle).ok_or(EcsError::InvalidEntity)?.enable(enable);
        Ok(())
    }

    /// Add a system; every entity is re-evaluated against it on the next refresh
    pub fn add_system<S: System>(&mut self, system: S) -> Result<&mut S, EcsError> {
        let index = system.base().index();

        if self.systems.len() <= index {
            self.systems.resize_with(index + 1, || None);
        }
        if self.systems[index].is_some() {
            return Err(EcsError::SystemAlreadyPresent(type_name::<S>()));
        }

        self.systems[index] = Some(Box::new(system));

        for entity in self.entities.slots.values_mut() {
            entity.invalidate();
            self.entities.touched.unbounded_set(entity.id() as usize, true);
        }

        log::debug!("Added system {} at index {}", type_name::<S>(), index);

        self.systems[index]
            .as_deref_mut()
            .and_then(|system| system.as_any_mut().downcast_mut::<S>())
            .ok_or(EcsError::SystemNotFound(type_name::<S>()))
    }

    /// Borrow the system of type `S`
    pub fn system<S: System>(&self) -> Option<&S> {
        let index = self.system_index::<S>()?;
        self.systems
            .get(index)?
            .as_deref()
            .and_then(|system| system.as_any().downcast_ref::<S>())
    }

    /// Mutably borrow the system of type `S`
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        let index = self.system_index::<S>()?;
        self.systems
            .get_mut(index)?
            .as_deref_mut()
            .and_then(|system| system.as_any_mut().downcast_mut::<S>())
    }

    /// Mutably borrow the system of type `S` along with the entity storage
    pub fn system_with_entities_mut<S: System>(&mut self) -> Option<(&mut S, &mut Entities)> {
        let index = self.system_index::<S>()?;
        let system = self
            .systems
            .get_mut(index)?
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<S>()?;
        Some((system, &mut self.entities))
    }

    /// Is a system of type `S` part of the world?
    pub fn has_system<S: System>(&self) -> bool {
        self.system::<S>().is_some()
    }

    /// Remove the system of type `S`
    ///
    /// Every entity it still tracks forgets about it.
    pub fn remove_system<S: System>(&mut self) -> Result<(), EcsError> {
        let system = self
            .system_index::<S>()
            .and_then(|index| self.systems.get_mut(index)?.take())
            .ok_or(EcsError::SystemNotFound(type_name::<S>()))?;

        let index = system.base().index();
        for handle in system.base().entities().iter() {
            if let Some(entity) = self.entities.slots.get_mut(handle) {
                entity.unregister_system(index);
            }
        }

        log::debug!("Removed system {}", type_name::<S>());
        Ok(())
    }

    /// Destroy killed entities, then run invalidated entities through every system filter
    pub fn refresh(&mut self) {
        let killed = std::mem::take(&mut self.killed);
        for id in killed.iter_ones() {
            if let Some(handle) = self.entities.handle_of(id as EntityId) {
                self.destroy_entity(handle);
            }
        }

        let touched = std::mem::take(&mut self.entities.touched);
        for id in touched.iter_ones() {
            let Some(handle) = self.entities.handle_of(id as EntityId) else {
                continue;
            };

            let pending = self
                .entities
                .slots
                .get_mut(handle)
                .is_some_and(|entity| entity.take_pending_validation());

            if pending {
                self.validate_entity(handle);
            }
        }
    }

    /// Refresh, then update every system
    pub fn update(&mut self, elapsed: f32) {
        self.refresh();

        for system in self.systems.iter_mut().flatten() {
            let (steps, step) = system.base_mut().consume_elapsed(elapsed);
            for _ in 0..steps {
                system.on_update(&mut self.entities, step);
            }
        }
    }

    /// Destroy every entity, systems are kept
    pub fn clear(&mut self) {
        let handles: Vec<EntityHandle> = self.entities.slots.keys().collect();
        for handle in handles {
            self.destroy_entity(handle);
        }

        self.killed.clear();
        self.entities.touched.clear();
        self.entities.id_to_handle.clear();
        self.free_ids.clear();
        self.next_id = 0;
    }

    fn system_index<S: System>(&self) -> Option<SystemIndex> {
        self.registry.system_index::<S>().ok()
    }

    fn validate_entity(&mut self, handle: EntityHandle) {
        for system in self.systems.iter_mut().flatten() {
            let Some(entity) = self.entities.slots.get_mut(handle) else {
                return;
            };

            let index = system.base().index();
            let tracked = entity.system_bits().unbounded_test(index);

            if system.base().filters(entity) {
                if !tracked {
                    entity.register_system(index);
                    system.base_mut().entities_mut().insert(entity);
                    system.on_entity_added(entity);
                }

                system.on_entity_validation(entity, !tracked);
            } else if tracked {
                entity.unregister_system(index);
                system.on_entity_removed(entity);
                system.base_mut().entities_mut().remove(entity);
            }
        }
    }

    fn destroy_entity(&mut self, handle: EntityHandle) {
        let Some(entity) = self.entities.slots.get(handle) else {
            return;
        };

        for system in self.systems.iter_mut().flatten() {
            if entity.system_bits().unbounded_test(system.base().index()) {
                system.on_entity_removed(entity);
                system.base_mut().entities_mut().remove(entity);
            }
        }

        if let Some(mut entity) = self.entities.slots.remove(handle) {
            let id = entity.id();
            entity.destroy();

            if let Some(slot) = self.entities.id_to_handle.get_mut(id as usize) {
                *slot = None;
            }
            self.entities.touched.unbounded_reset(id as usize);
            self.free_ids.push(id);

            log::trace!("Destroyed entity {}", id);
        }
    }
}
