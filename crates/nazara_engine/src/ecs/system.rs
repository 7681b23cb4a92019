//! System trait and shared system state
//!
//! A system declares which entities it is interested in through a
//! [`SystemFilter`] over component indices. The owning world re-evaluates the
//! filter whenever an entity is invalidated and calls the `on_entity_*` hooks
//! as membership changes. Once per world update the system's `on_update` runs,
//! either every tick or with a fixed step (see [`SystemBase::set_update_rate`]).

use super::component::{AsAny, Component, ComponentIndex};
use super::entity::Entity;
use super::entity_list::EntityList;
use super::error::EcsError;
use super::registry::TypeRegistry;
use super::world::Entities;
use crate::foundation::bitset::Bitset;

/// Dense per-type system index assigned by the [`TypeRegistry`]
pub type SystemIndex = usize;

/// Component membership predicate
///
/// An entity passes when it holds every required component, none of the
/// excluded ones and, if any "required any" component is declared, at least
/// one of those.
#[derive(Debug, Clone, Default)]
pub struct SystemFilter {
    required: Bitset,
    excluded: Bitset,
    required_any: Bitset,
}

impl SystemFilter {
    /// Create a filter accepting every entity
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the component at `index`
    pub fn require(&mut self, index: ComponentIndex) -> &mut Self {
        self.required.unbounded_set(index, true);
        self
    }

    /// Exclude entities holding the component at `index`
    pub fn exclude(&mut self, index: ComponentIndex) -> &mut Self {
        self.excluded.unbounded_set(index, true);
        self
    }

    /// Add the component at `index` to the "at least one of" set
    pub fn require_any(&mut self, index: ComponentIndex) -> &mut Self {
        self.required_any.unbounded_set(index, true);
        self
    }

    /// Require the component type `T`
    pub fn require_component<T: Component>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, EcsError> {
        Ok(self.require(registry.component_index::<T>()?))
    }

    /// Exclude the component type `T`
    pub fn exclude_component<T: Component>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, EcsError> {
        Ok(self.exclude(registry.component_index::<T>()?))
    }

    /// Add the component type `T` to the "at least one of" set
    pub fn require_any_component<T: Component>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, EcsError> {
        Ok(self.require_any(registry.component_index::<T>()?))
    }

    /// Does a component bitset pass the filter?
    pub fn matches(&self, components: &Bitset) -> bool {
        if (&self.required & components) != self.required {
            return false;
        }

        if self.excluded.intersects(components) {
            return false;
        }

        if self.required_any.test_any() && !self.required_any.intersects(components) {
            return false;
        }

        true
    }

    /// Does the entity pass the filter?
    ///
    /// Dead and disabled entities never pass.
    pub fn filters(&self, entity: &Entity) -> bool {
        entity.is_valid() && entity.is_enabled() && self.matches(entity.component_bits())
    }
}

/// State shared by every system: index, filter, tracked entities and update rate
#[derive(Debug, Clone)]
pub struct SystemBase {
    index: SystemIndex,
    filter: SystemFilter,
    entities: EntityList,
    update_step: f32,
    update_counter: f32,
    enabled: bool,
}

impl SystemBase {
    /// Create the base state for the system registered at `index`
    pub fn new(index: SystemIndex, filter: SystemFilter) -> Self {
        Self {
            index,
            filter,
            entities: EntityList::new(),
            update_step: 0.0,
            update_counter: 0.0,
            enabled: true,
        }
    }

    /// Create the base state for the registered system type `S`
    pub fn for_system<S: System>(registry: &TypeRegistry, filter: SystemFilter) -> Result<Self, EcsError> {
        Ok(Self::new(registry.system_index::<S>()?, filter))
    }

    /// Registry index of the system
    pub fn index(&self) -> SystemIndex {
        self.index
    }

    /// Membership filter
    pub fn filter(&self) -> &SystemFilter {
        &self.filter
    }

    /// Does the entity pass the membership filter?
    pub fn filters(&self, entity: &Entity) -> bool {
        self.filter.filters(entity)
    }

    /// Entities currently tracked by the system
    pub fn entities(&self) -> &EntityList {
        &self.entities
    }

    pub(super) fn entities_mut(&mut self) -> &mut EntityList {
        &mut self.entities
    }

    /// Set how many times per second the system updates, `0` updates every tick
    pub fn set_update_rate(&mut self, updates_per_second: f32) {
        self.update_step = if updates_per_second > 0.0 { 1.0 / updates_per_second } else { 0.0 };
        self.update_counter = 0.0;
    }

    /// Updates per second, `0` when updating every tick
    pub fn update_rate(&self) -> f32 {
        if self.update_step > 0.0 { 1.0 / self.update_step } else { 0.0 }
    }

    /// Enable or disable the per-frame update
    pub fn enable(&mut self, enable: bool) {
        self.enabled = enable;
    }

    /// Is the per-frame update enabled?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Account for `elapsed` seconds and return how many updates to run and the
    /// time step to pass to each
    pub(super) fn consume_elapsed(&mut self, elapsed: f32) -> (u32, f32) {
        if !self.enabled {
            return (0, 0.0);
        }

        if self.update_step <= 0.0 {
            return (1, elapsed);
        }

        self.update_counter += elapsed;

        let mut steps = 0;
        while self.update_counter >= self.update_step {
            self.update_counter -= self.update_step;
            steps += 1;
        }

        (steps, self.update_step)
    }
}

/// Logic unit updating the entities matching its filter once per frame
pub trait System: AsAny {
    /// Shared system state
    fn base(&self) -> &SystemBase;

    /// Mutable shared system state
    fn base_mut(&mut self) -> &mut SystemBase;

    /// The entity started matching the filter
    fn on_entity_added(&mut self, _entity: &Entity) {}

    /// The entity stopped matching the filter or was destroyed
    fn on_entity_removed(&mut self, _entity: &Entity) {}

    /// The entity matches the filter after being invalidated
    ///
    /// `just_added` is true right after [`System::on_entity_added`].
    fn on_entity_validation(&mut self, _entity: &Entity, _just_added: bool) {}

    /// Per-frame update
    fn on_update(&mut self, entities: &mut Entities, elapsed: f32);
}
