//! Component trait and type-erased access helpers

use std::any::Any;

/// Dense per-type component index assigned by the [`TypeRegistry`](super::registry::TypeRegistry)
pub type ComponentIndex = usize;

/// Upcast to `Any` for downcasting trait objects back to their concrete type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Data attached to at most one instance per entity
///
/// Components must be registered with the type registry before they can be
/// attached to an entity.
pub trait Component: AsAny + Send + Sync {
    /// Returns `true` once after a change that alters how systems see the owning
    /// entity (for example a camera changing its render layer)
    ///
    /// The world polls this while refreshing and re-validates the entity.
    fn take_entity_invalidation(&mut self) -> bool {
        false
    }
}

pub(crate) fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}
