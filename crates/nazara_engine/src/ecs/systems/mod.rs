//! ECS Systems module

pub mod render_system;
pub mod velocity_system;

pub use render_system::RenderSystem;
pub use velocity_system::VelocitySystem;
