//! Material system for rendering

use crate::foundation::color::Color;

use super::backend::TextureHandle;

/// Phong material properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse color
    pub diffuse_color: Color,

    /// Optional diffuse texture
    pub diffuse_map: Option<TextureHandle>,

    /// Specular exponent
    pub shininess: f32,
}

impl Material {
    /// Create a new material with default properties
    pub fn new() -> Self {
        Self {
            diffuse_color: Color::WHITE,
            diffuse_map: None,
            shininess: 50.0,
        }
    }

    /// Set the diffuse color
    pub fn with_color(mut self, color: Color) -> Self {
        self.diffuse_color = color;
        self
    }

    /// Set the diffuse texture
    pub fn with_diffuse_map(mut self, texture: TextureHandle) -> Self {
        self.diffuse_map = Some(texture);
        self
    }

    /// Set the specular exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess.max(0.0);
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}
