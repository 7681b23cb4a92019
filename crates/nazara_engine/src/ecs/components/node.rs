//! Scene node component
//!
//! Position, rotation and scale of an entity in world space. Every change
//! stamps the node with a new revision taken from a process-wide counter, so
//! caches derived from a node (camera view matrices, drawable world matrices)
//! only need to remember the revision they were built from.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ecs::Component;
use crate::foundation::math::{axis, Mat4, Quat, Transform, Vec3};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// World space transform of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct NodeComponent {
    transform: Transform,
    revision: u64,
}

impl Component for NodeComponent {}

impl Default for NodeComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeComponent {
    /// Create a node at the origin
    pub fn new() -> Self {
        Self::from_transform(Transform::identity())
    }

    /// Create a node at `position`
    pub fn from_position(position: Vec3) -> Self {
        Self::from_transform(Transform::from_position(position))
    }

    /// Create a node from a full transform
    pub fn from_transform(transform: Transform) -> Self {
        Self {
            transform,
            revision: next_revision(),
        }
    }

    /// Builder pattern: Set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.touch();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
        self.touch();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.touch();
    }

    /// Move by `offset` in world space
    pub fn translate(&mut self, offset: Vec3) {
        self.transform.position += offset;
        self.touch();
    }

    /// Apply `rotation` on top of the current rotation
    pub fn rotate(&mut self, rotation: Quat) {
        self.transform.rotation = rotation * self.transform.rotation;
        self.touch();
    }

    /// Orient the node so its forward axis points at `target`
    ///
    /// Does nothing if `target` is the node position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let direction = target - self.transform.position;
        if direction.norm_squared() <= f32::EPSILON {
            return;
        }

        // face_towards aligns +Z, the node looks down -Z
        self.set_rotation(Quat::face_towards(&(-direction), &up));
    }

    /// Translation * rotation * scale
    pub fn transform_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// World space forward direction
    pub fn forward(&self) -> Vec3 {
        self.transform.rotation * axis::forward()
    }

    /// World space up direction
    pub fn up(&self) -> Vec3 {
        self.transform.rotation * axis::up()
    }

    /// Stamp of the last change, unique across all nodes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = next_revision();
    }
}
