//! ECS Components module
//!
//! Engine components consumed by the built-in systems. Each must be
//! registered with the type registry under its name (see [`crate::sdk`]).

pub mod camera;
pub mod graphics;
pub mod light;
pub mod node;
pub mod velocity;

pub use camera::{CameraComponent, ProjectionType};
pub use graphics::{GraphicsComponent, Renderable};
pub use light::{LightComponent, LightFactory, LightType};
pub use node::NodeComponent;
pub use velocity::VelocityComponent;
