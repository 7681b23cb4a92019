//! ECS error types

use thiserror::Error;

use super::entity::EntityId;

/// Errors reported by the registry, entities and worlds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Component type was never registered
    #[error("Component type is not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// System type was never registered
    #[error("System type is not registered: {0}")]
    UnregisteredSystem(&'static str),

    /// A component with this name already exists
    #[error("Component name already registered: {0}")]
    DuplicateComponentName(String),

    /// The component type already has an index
    #[error("Component type already registered: {0}")]
    DuplicateComponentType(&'static str),

    /// The system type already has an index
    #[error("System type already registered: {0}")]
    DuplicateSystem(&'static str),

    /// The world already runs a system of this type
    #[error("System already part of the world: {0}")]
    SystemAlreadyPresent(&'static str),

    /// The world does not run a system of this type
    #[error("System not part of the world: {0}")]
    SystemNotFound(&'static str),

    /// Handle refers to a killed entity
    #[error("Invalid entity handle")]
    InvalidEntity,

    /// No live entity carries this id
    #[error("No entity with id {0}")]
    UnknownEntityId(EntityId),
}
