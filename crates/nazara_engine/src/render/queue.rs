//! # Render Queue
//!
//! Per-camera scratch container filled by the render system and drained by
//! the active technique. It holds the models to draw and the lights of the
//! frame, each light category in its own list since every category has its
//! own uniform layout.
//!
//! The queue is cleared at the start of every camera pass and never read
//! across camera iterations.

use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Sphere, Vec3};

use super::backend::MeshHandle;
use super::material::Material;

/// Directional light record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub ambient_factor: f32,
    pub diffuse_factor: f32,
    /// World space direction the light travels along
    pub direction: Vec3,
}

/// Point light record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub ambient_factor: f32,
    pub diffuse_factor: f32,
    pub position: Vec3,
    pub attenuation: f32,
    pub radius: f32,
    pub inv_radius: f32,
}

/// Spot light record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: Color,
    pub ambient_factor: f32,
    pub diffuse_factor: f32,
    pub position: Vec3,
    pub direction: Vec3,
    pub attenuation: f32,
    pub radius: f32,
    pub inv_radius: f32,
    pub inner_angle_cosine: f32,
    pub outer_angle_cosine: f32,
    pub outer_angle_tangent: f32,
}

/// Mesh instance awaiting submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEntry {
    /// Uploaded mesh
    pub mesh: MeshHandle,

    /// Material to draw with
    pub material: Material,

    /// World transform matrix
    pub transform: Mat4,

    /// World space bounding sphere, used for light culling
    pub bounding_sphere: Sphere,
}

impl ModelEntry {
    /// Create an entry, deriving the world bounding sphere from a local radius
    pub fn new(mesh: MeshHandle, material: Material, transform: Mat4, local_radius: f32) -> Self {
        let center = transform.column(3).xyz();
        let scale = (0..3)
            .map(|axis| transform.column(axis).xyz().norm())
            .fold(0.0, f32::max);

        Self {
            mesh,
            material,
            transform,
            bounding_sphere: Sphere::new(center, local_radius * scale),
        }
    }
}

/// Models and lights of one camera pass
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    models: Vec<ModelEntry>,
    directional_lights: Vec<DirectionalLight>,
    point_lights: Vec<PointLight>,
    spot_lights: Vec<SpotLight>,
}

impl RenderQueue {
    /// Create a new empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a model
    pub fn add_model(&mut self, model: ModelEntry) {
        self.models.push(model);
    }

    /// Queue a directional light
    pub fn add_directional_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
    }

    /// Queue a point light
    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Queue a spot light
    pub fn add_spot_light(&mut self, light: SpotLight) {
        self.spot_lights.push(light);
    }

    /// Sort models front-to-back relative to `eye` for early depth rejection
    pub fn sort_models(&mut self, eye: &Vec3) {
        self.models.sort_by(|a, b| {
            let da = (a.bounding_sphere.center - eye).norm_squared();
            let db = (b.bounding_sphere.center - eye).norm_squared();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Queued models
    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    /// Queued directional lights
    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    /// Queued point lights
    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Queued spot lights
    pub fn spot_lights(&self) -> &[SpotLight] {
        &self.spot_lights
    }

    /// Total number of lights
    pub fn light_count(&self) -> usize {
        self.directional_lights.len() + self.point_lights.len() + self.spot_lights.len()
    }

    /// Clear everything for the next camera pass
    pub fn clear(&mut self) {
        self.models.clear();
        self.directional_lights.clear();
        self.point_lights.clear();
        self.spot_lights.clear();
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.light_count() == 0
    }
}
