//! Graphics component
//!
//! Holds what an entity draws. The world matrix of the entity is cached and
//! rebuilt when the node changes or when the render system invalidates it
//! after a change of the global coordinate system.

use crate::ecs::Component;
use crate::foundation::math::Mat4;
use crate::render::backend::MeshHandle;
use crate::render::material::Material;
use crate::render::queue::{ModelEntry, RenderQueue};

use super::node::NodeComponent;

/// One mesh instance attached to a graphics component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub mesh: MeshHandle,
    pub material: Material,
    /// Offset relative to the entity node
    pub local_matrix: Mat4,
    /// Radius of the mesh bounding sphere in local space
    pub bounding_radius: f32,
}

impl Renderable {
    pub fn new(mesh: MeshHandle, material: Material) -> Self {
        Self {
            mesh,
            material,
            local_matrix: Mat4::identity(),
            bounding_radius: 1.0,
        }
    }

    /// Builder pattern: Set the local offset
    pub fn with_local_matrix(mut self, local_matrix: Mat4) -> Self {
        self.local_matrix = local_matrix;
        self
    }

    /// Builder pattern: Set the bounding radius
    pub fn with_bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_radius = radius;
        self
    }
}

/// Drawable content of an entity
#[derive(Debug, Clone, Default)]
pub struct GraphicsComponent {
    renderables: Vec<Renderable>,
    transform_matrix: Option<(u64, Mat4)>,
}

impl Component for GraphicsComponent {}

impl GraphicsComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: Attach a renderable
    pub fn with(mut self, renderable: Renderable) -> Self {
        self.attach(renderable);
        self
    }

    pub fn attach(&mut self, renderable: Renderable) {
        self.renderables.push(renderable);
    }

    pub fn clear(&mut self) {
        self.renderables.clear();
    }

    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    /// Drop the cached world matrix
    pub fn invalidate_transform_matrix(&mut self) {
        self.transform_matrix = None;
    }

    /// Has the world matrix been computed since the last invalidation?
    pub fn is_transform_matrix_cached(&self) -> bool {
        self.transform_matrix.is_some()
    }

    /// World matrix: coordinate system matrix * node matrix
    pub fn transform_matrix(&mut self, node: &NodeComponent, coordinate_matrix: &Mat4) -> Mat4 {
        match self.transform_matrix {
            Some((revision, matrix)) if revision == node.revision() => matrix,
            _ => {
                let matrix = coordinate_matrix * node.transform_matrix();
                self.transform_matrix = Some((node.revision(), matrix));
                matrix
            }
        }
    }

    /// Queue every renderable with its world transform
    pub fn add_to_render_queue(&mut self, queue: &mut RenderQueue, node: &NodeComponent, coordinate_matrix: &Mat4) {
        let world = self.transform_matrix(node, coordinate_matrix);

        for renderable in &self.renderables {
            queue.add_model(ModelEntry::new(
                renderable.mesh,
                renderable.material,
                world * renderable.local_matrix,
                renderable.bounding_radius,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_queue_uses_world_transform() {
        let node = NodeComponent::from_position(Vec3::new(0.0, 1.0, 0.0));
        let mut graphics = GraphicsComponent::new()
            .with(Renderable::new(MeshHandle(0), Material::default()))
            .with(
                Renderable::new(MeshHandle(1), Material::default())
                    .with_local_matrix(Mat4::new_translation(&Vec3::new(2.0, 0.0, 0.0)))
                    .with_bounding_radius(0.5),
            );

        let mut queue = RenderQueue::new();
        graphics.add_to_render_queue(&mut queue, &node, &Mat4::identity());

        let models = queue.models();
        assert_eq!(models.len(), 2);
        assert_relative_eq!(models[0].bounding_sphere.center, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(models[1].bounding_sphere.center, Vec3::new(2.0, 1.0, 0.0));
        assert_relative_eq!(models[1].bounding_sphere.radius, 0.5);
    }

    #[test]
    fn test_transform_cache() {
        let mut node = NodeComponent::new();
        let mut graphics = GraphicsComponent::new();
        let flip = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 1.0, -1.0));

        graphics.transform_matrix(&node, &Mat4::identity());
        assert!(graphics.is_transform_matrix_cached());

        // Cached value wins while neither the node nor the cache changes
        assert_eq!(graphics.transform_matrix(&node, &flip), Mat4::identity());

        graphics.invalidate_transform_matrix();
        assert_eq!(graphics.transform_matrix(&node, &flip), flip);

        node.translate(Vec3::new(1.0, 0.0, 0.0));
        let moved = graphics.transform_matrix(&node, &flip);
        assert_relative_eq!(moved.column(3).xyz(), Vec3::new(1.0, 0.0, 0.0));
    }
}
