//! Mesh representation for 3D models
//!
//! CPU-side vertex and index data plus the procedural primitives the
//! techniques need: light volumes (sphere, cone), the full-screen quad used by
//! deferred passes and a test cube.
//!
//! Meshes are uploaded through [`RenderBackend::create_mesh`](super::backend::RenderBackend::create_mesh),
//! which hands back an opaque [`MeshHandle`](super::backend::MeshHandle).

use std::f32::consts::{PI, TAU};

use super::RenderError;

/// Vertex with position, normal and texture coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Triangle list mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,

    /// Index data for triangles
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Check that the mesh has vertices and that every index is in range
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.vertices.is_empty() {
            return Err(RenderError::ResourceCreationFailed("mesh has no vertices".to_string()));
        }

        if let Some(index) = self.indices.iter().find(|&&index| index as usize >= self.vertices.len()) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "index {} out of range ({} vertices)",
                index,
                self.vertices.len()
            )));
        }

        if self.indices.len() % 3 != 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }

        Ok(())
    }

    /// Largest distance from the origin to a vertex
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|vertex| {
                let [x, y, z] = vertex.position;
                (x * x + y * y + z * z).sqrt()
            })
            .fold(0.0, f32::max)
    }

    /// Unit cube centered at the origin (vertices at ±1)
    pub fn cube() -> Self {
        let vertices = vec![
            // Front face
            Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            // Back face
            Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
        ];

        let indices = vec![
            // Front
            0, 1, 2, 2, 3, 0,
            // Back
            4, 5, 6, 6, 7, 4,
            // Left
            4, 0, 3, 3, 5, 4,
            // Right
            1, 7, 6, 6, 2, 1,
            // Top
            3, 2, 6, 6, 5, 3,
            // Bottom
            4, 7, 1, 1, 0, 4,
        ];

        Self::new(vertices, indices)
    }

    /// UV sphere of the given radius centered at the origin
    ///
    /// `slices` divide the equator, `stacks` the meridians.
    pub fn sphere(radius: f32, slices: u32, stacks: u32) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(2);

        let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
        for stack in 0..=stacks {
            let v = stack as f32 / stacks as f32;
            let phi = v * PI;

            for slice in 0..=slices {
                let u = slice as f32 / slices as f32;
                let theta = u * TAU;

                let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
                let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
                vertices.push(Vertex::new(position, normal, [u, v]));
            }
        }

        let ring = slices + 1;
        let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = stack * ring + slice;
                let b = a + ring;

                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Closed cone with its apex at the origin, opening along -Z
    ///
    /// The base disc lies at `z = -length`.
    pub fn cone(length: f32, radius: f32, slices: u32) -> Self {
        let slices = slices.max(3);

        let mut vertices = Vec::with_capacity(slices as usize + 2);
        vertices.push(Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5]));

        let slant = (radius * radius + length * length).sqrt().max(f32::EPSILON);
        for slice in 0..slices {
            let theta = slice as f32 / slices as f32 * TAU;
            let (sin, cos) = theta.sin_cos();

            let normal = [cos * length / slant, sin * length / slant, -radius / slant];
            vertices.push(Vertex::new(
                [cos * radius, sin * radius, -length],
                normal,
                [0.5 + cos * 0.5, 0.5 + sin * 0.5],
            ));
        }

        let base_center = vertices.len() as u32;
        vertices.push(Vertex::new([0.0, 0.0, -length], [0.0, 0.0, -1.0], [0.5, 0.5]));

        let mut indices = Vec::with_capacity(slices as usize * 6);
        for slice in 0..slices {
            let current = 1 + slice;
            let next = 1 + (slice + 1) % slices;

            // Side
            indices.extend_from_slice(&[0, current, next]);
            // Base
            indices.extend_from_slice(&[base_center, next, current]);
        }

        Self::new(vertices, indices)
    }

    /// Two triangles covering clip space
    pub fn fullscreen_quad() -> Self {
        let vertices = vec![
            Vertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];

        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }
}
