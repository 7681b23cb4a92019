//! Entity-Component-System implementation
//!
//! Entities own their components in slots addressed by a dense per-type
//! index. Systems select entities through bitset filters over those indices
//! and are notified by the world when membership changes.

pub mod component;
pub mod entity;
pub mod entity_list;
pub mod error;
pub mod registry;
pub mod system;
pub mod world;

pub mod components;
pub mod systems;

#[cfg(test)]
mod tests;

pub use component::{AsAny, Component, ComponentIndex};
pub use entity::{Entity, EntityHandle, EntityId};
pub use entity_list::EntityList;
pub use error::EcsError;
pub use registry::TypeRegistry;
pub use system::{System, SystemBase, SystemFilter, SystemIndex};
pub use world::{Entities, World};
