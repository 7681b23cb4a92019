//! Type registry mapping component and system types to dense indices
//!
//! Every concrete component type receives a [`ComponentIndex`] and every
//! concrete system type a [`SystemIndex`]. Indices are handed out in
//! registration order, starting at zero, and never reused for another type.
//! They address entity component slots and the bits of the component and
//! system bitsets.
//!
//! The registry is filled once at startup (see [`crate::sdk::Sdk`]) and then
//! shared read-only by every world through an `Arc`.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentIndex};
use super::error::EcsError;
use super::system::{System, SystemIndex};

#[derive(Debug, Clone)]
struct ComponentInfo {
    name: String,
    type_name: &'static str,
}

/// Registry of component and system types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    components: Vec<ComponentInfo>,
    component_lookup: HashMap<TypeId, ComponentIndex>,
    component_names: HashMap<String, ComponentIndex>,
    systems: Vec<&'static str>,
    system_lookup: HashMap<TypeId, SystemIndex>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type under a human-readable name
    pub fn register_component<T: Component>(&mut self, name: &str) -> Result<ComponentIndex, EcsError> {
        let type_id = TypeId::of::<T>();
        if self.component_lookup.contains_key(&type_id) {
            return Err(EcsError::DuplicateComponentType(type_name::<T>()));
        }
        if self.component_names.contains_key(name) {
            return Err(EcsError::DuplicateComponentName(name.to_string()));
        }

        let index = self.components.len();
        self.components.push(ComponentInfo {
            name: name.to_string(),
            type_name: type_name::<T>(),
        });
        self.component_lookup.insert(type_id, index);
        self.component_names.insert(name.to_string(), index);

        log::debug!("Registered component {} ({}) at index {}", name, type_name::<T>(), index);
        Ok(index)
    }

    /// Register a system type
    pub fn register_system<S: System>(&mut self) -> Result<SystemIndex, EcsError> {
        let type_id = TypeId::of::<S>();
        if self.system_lookup.contains_key(&type_id) {
            return Err(EcsError::DuplicateSystem(type_name::<S>()));
        }

        let index = self.systems.len();
        self.systems.push(type_name::<S>());
        self.system_lookup.insert(type_id, index);

        log::debug!("Registered system {} at index {}", type_name::<S>(), index);
        Ok(index)
    }

    /// Index of a registered component type
    pub fn component_index<T: Component>(&self) -> Result<ComponentIndex, EcsError> {
        self.component_lookup
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))
    }

    /// Index of the component registered under `name`
    pub fn component_index_by_name(&self, name: &str) -> Option<ComponentIndex> {
        self.component_names.get(name).copied()
    }

    /// Index of a registered system type
    pub fn system_index<S: System>(&self) -> Result<SystemIndex, EcsError> {
        self.system_lookup
            .get(&TypeId::of::<S>())
            .copied()
            .ok_or(EcsError::UnregisteredSystem(type_name::<S>()))
    }

    /// Is the component type registered?
    pub fn is_component_registered<T: Component>(&self) -> bool {
        self.component_lookup.contains_key(&TypeId::of::<T>())
    }

    /// Is the system type registered?
    pub fn is_system_registered<S: System>(&self) -> bool {
        self.system_lookup.contains_key(&TypeId::of::<S>())
    }

    /// Registration name of a component index
    pub fn component_name(&self, index: ComponentIndex) -> Option<&str> {
        self.components.get(index).map(|info| info.name.as_str())
    }

    /// Rust type name of a component index
    pub fn component_type_name(&self, index: ComponentIndex) -> Option<&'static str> {
        self.components.get(index).map(|info| info.type_name)
    }

    /// Number of registered component types
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of registered system types
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }
}
