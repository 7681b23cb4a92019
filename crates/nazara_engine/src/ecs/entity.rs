//! Entity implementation
//!
//! An entity owns a sparse array of component slots addressed by
//! [`ComponentIndex`], a bitset of the indices that hold a live component and
//! a bitset of the systems currently tracking it.
//!
//! Entities are created and destroyed by their [`World`](super::World). Other
//! code refers to them through an [`EntityHandle`], a generation-checked slot
//! key: once the entity is destroyed the slot generation moves on and every
//! outstanding copy of the handle stops resolving.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use super::component::{downcast_mut, downcast_ref, Component, ComponentIndex};
use super::error::EcsError;
use super::registry::TypeRegistry;
use super::system::SystemIndex;
use crate::foundation::bitset::Bitset;

slotmap::new_key_type! {
    /// Generation-checked weak reference to an entity
    pub struct EntityHandle;
}

/// Entity identifier, unique among the live entities of one world
///
/// Identifiers of destroyed entities are recycled.
pub type EntityId = u32;

/// Entity owning a set of components
pub struct Entity {
    id: EntityId,
    handle: EntityHandle,
    registry: Arc<TypeRegistry>,
    components: Vec<Option<Box<dyn Component>>>,
    component_bits: Bitset,
    system_bits: Bitset,
    enabled: bool,
    valid: bool,
    pending_validation: bool,
}

impl Entity {
    pub(super) fn new(id: EntityId, handle: EntityHandle, registry: Arc<TypeRegistry>) -> Self {
        Self {
            id,
            handle,
            registry,
            components: Vec::new(),
            component_bits: Bitset::new(),
            system_bits: Bitset::new(),
            enabled: true,
            valid: true,
            pending_validation: true,
        }
    }

    /// Get the entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get the handle referring to this entity
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Attach a component, replacing any existing component of the same type
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut T, EcsError> {
        let index = self.registry.component_index::<T>()?;

        if self.components.len() <= index {
            self.components.resize_with(index + 1, || None);
        }

        self.components[index] = Some(Box::new(component));
        self.component_bits.unbounded_set(index, true);
        self.invalidate();

        log::trace!("Entity {}: added component {}", self.id, type_name::<T>());

        self.components[index]
            .as_deref_mut()
            .and_then(|component| downcast_mut::<T>(component))
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    /// Destroy the component of type `T`
    ///
    /// Returns whether a component was present.
    pub fn remove_component<T: Component>(&mut self) -> Result<bool, EcsError> {
        let index = self.registry.component_index::<T>()?;
        Ok(self.remove_component_index(index))
    }

    /// Destroy the component stored at `index`
    ///
    /// Returns whether a component was present.
    pub fn remove_component_index(&mut self, index: ComponentIndex) -> bool {
        if !self.has_component_index(index) {
            return false;
        }

        self.components[index] = None;
        self.component_bits.reset(index);
        self.invalidate();

        log::trace!("Entity {}: removed component {}", self.id, index);
        true
    }

    /// Destroy every component
    pub fn remove_all_components(&mut self) {
        let indices: Vec<ComponentIndex> = self.component_bits.iter_ones().collect();
        for index in indices {
            self.remove_component_index(index);
        }
    }

    /// Borrow the component of type `T`
    ///
    /// # Panics
    /// Panics if the entity has no such component. Use [`Entity::try_component`]
    /// when presence is not guaranteed.
    pub fn component<T: Component>(&self) -> &T {
        match self.try_component::<T>() {
            Some(component) => component,
            None => panic!("Component {} is not part of entity {}", type_name::<T>(), self.id),
        }
    }

    /// Mutably borrow the component of type `T`
    ///
    /// # Panics
    /// Panics if the entity has no such component.
    pub fn component_mut<T: Component>(&mut self) -> &mut T {
        let id = self.id;
        match self.try_component_mut::<T>() {
            Some(component) => component,
            None => panic!("Component {} is not part of entity {}", type_name::<T>(), id),
        }
    }

    /// Borrow the component of type `T` if present
    pub fn try_component<T: Component>(&self) -> Option<&T> {
        let index = self.registry.component_index::<T>().ok()?;
        self.components
            .get(index)?
            .as_deref()
            .and_then(|component| downcast_ref::<T>(component))
    }

    /// Mutably borrow the component of type `T` if present
    pub fn try_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = self.registry.component_index::<T>().ok()?;
        self.components
            .get_mut(index)?
            .as_deref_mut()
            .and_then(|component| downcast_mut::<T>(component))
    }

    /// Does the entity hold a component of type `T`?
    pub fn has_component<T: Component>(&self) -> bool {
        self.registry
            .component_index::<T>()
            .is_ok_and(|index| self.has_component_index(index))
    }

    /// Does the entity hold a component at `index`?
    pub fn has_component_index(&self, index: ComponentIndex) -> bool {
        self.component_bits.unbounded_test(index)
    }

    /// Indices of the components held by the entity
    pub fn component_bits(&self) -> &Bitset {
        &self.component_bits
    }

    /// Indices of the systems tracking the entity
    pub fn system_bits(&self) -> &Bitset {
        &self.system_bits
    }

    /// Enable or disable the entity
    ///
    /// Disabled entities keep their components but leave every system.
    /// Changing the state invalidates the entity, setting the current state
    /// again does nothing.
    pub fn enable(&mut self, enable: bool) {
        if self.enabled != enable {
            self.enabled = enable;
            self.invalidate();
        }
    }

    /// Is the entity enabled?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Is the entity alive?
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Request re-evaluation by every system on the next world refresh
    pub fn invalidate(&mut self) {
        self.pending_validation = true;
    }

    pub(super) fn register_system(&mut self, index: SystemIndex) {
        self.system_bits.unbounded_set(index, true);
    }

    pub(super) fn unregister_system(&mut self, index: SystemIndex) {
        self.system_bits.unbounded_reset(index);
    }

    /// Consume the pending validation request, including the requests raised by
    /// components themselves
    pub(super) fn take_pending_validation(&mut self) -> bool {
        let mut pending = std::mem::take(&mut self.pending_validation);
        for component in self.components.iter_mut().flatten() {
            // Every component flag must be consumed, no short-circuit
            pending |= component.take_entity_invalidation();
        }
        pending
    }

    pub(super) fn destroy(&mut self) {
        self.components.clear();
        self.component_bits.clear();
        self.system_bits.clear();
        self.valid = false;
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("components", &self.component_bits.to_string())
            .field("systems", &self.system_bits.to_string())
            .field("enabled", &self.enabled)
            .field("valid", &self.valid)
            .finish()
    }
}
