//! Velocity component for entities that move at a constant speed

use crate::ecs::Component;
use crate::foundation::math::Vec3;

/// Linear velocity applied to the entity node by the velocity system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityComponent {
    /// Linear velocity in units per second
    pub linear_velocity: Vec3,
}

impl Component for VelocityComponent {}

impl VelocityComponent {
    pub fn new(linear_velocity: Vec3) -> Self {
        Self { linear_velocity }
    }
}

impl Default for VelocityComponent {
    fn default() -> Self {
        Self::new(Vec3::zeros())
    }
}
