//! Per-draw scene description handed to a technique

use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Recti, Vec3};

use super::backend::{RenderBackend, RenderTargetInfo};
use super::states::ClearBuffers;

/// What fills the target before models are drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Solid color
    Color(Color),
}

impl Background {
    /// Clear color and depth of the current target
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        match self {
            Self::Color(color) => backend.clear(ClearBuffers::COLOR | ClearBuffers::DEPTH, *color),
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::Color(Color::BLACK)
    }
}

/// Camera state applied for the current draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewer {
    /// World space eye position
    pub eye_position: Vec3,
    /// World space viewing direction
    pub forward: Vec3,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    /// Viewport in target pixels
    pub viewport: Recti,
    /// Target the camera renders to
    pub target: RenderTargetInfo,
    pub z_near: f32,
    pub z_far: f32,
}

/// Everything a technique needs besides its render queue
#[derive(Debug, Clone, Copy)]
pub struct SceneData<'a> {
    /// Global ambient light
    pub ambient_color: Color,
    pub background: &'a Background,
    pub viewer: &'a Viewer,
}
