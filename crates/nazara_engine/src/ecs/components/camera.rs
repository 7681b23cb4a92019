//! Camera component
//!
//! A camera renders the scene seen from its entity's node into a render
//! target. Viewport, projection and view matrix are computed lazily and
//! cached until something they depend on changes:
//!
//! - viewport: target size and normalised target region
//! - projection: projection type, field of view, clip planes, orthographic
//!   size and, for perspective projections, the viewport aspect ratio
//! - view: the node transform, tracked through its revision stamp
//!
//! Changing the render layer does not touch the matrices, it asks the world
//! to re-validate the entity so the render system re-sorts its cameras.

use crate::ecs::Component;
use crate::foundation::math::{utils, Mat4, Rectf, Recti, Vec2, Vec3};
use crate::render::backend::{MatrixType, RenderBackend, RenderTargetId, RenderTargetInfo};
use crate::render::scene::Viewer;
use crate::render::{RenderError, RenderResult};

use super::node::NodeComponent;

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    /// Parallel projection, in pixels unless a size is set
    Orthographic,
    /// Perspective projection with a vertical field of view
    Perspective,
}

/// Camera rendering the scene into a target
#[derive(Debug, Clone)]
pub struct CameraComponent {
    projection_type: ProjectionType,
    target: Option<RenderTargetInfo>,
    target_region: Rectf,
    fov: f32,
    z_near: f32,
    z_far: f32,
    size: Vec2,
    layer: u32,
    layer_changed: bool,
    aspect_ratio: f32,
    viewport: Option<Recti>,
    projection_matrix: Option<Mat4>,
    view_matrix: Option<(u64, Mat4)>,
}

impl Component for CameraComponent {
    fn take_entity_invalidation(&mut self) -> bool {
        std::mem::take(&mut self.layer_changed)
    }
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraComponent {
    /// Perspective camera, 70° field of view, clip planes at 1 and 1000,
    /// covering its whole target
    pub fn new() -> Self {
        Self {
            projection_type: ProjectionType::Perspective,
            target: None,
            target_region: Rectf::new(0.0, 0.0, 1.0, 1.0),
            fov: 70.0,
            z_near: 1.0,
            z_far: 1000.0,
            size: Vec2::zeros(),
            layer: 0,
            layer_changed: false,
            aspect_ratio: 0.0,
            viewport: None,
            projection_matrix: None,
            view_matrix: None,
        }
    }

    /// Builder pattern: Set the render target
    pub fn with_target(mut self, target: RenderTargetInfo) -> Self {
        self.set_target(Some(target));
        self
    }

    /// Builder pattern: Set the render layer
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.set_layer(layer);
        self
    }

    /// Builder pattern: Set the projection type
    pub fn with_projection_type(mut self, projection_type: ProjectionType) -> Self {
        self.set_projection_type(projection_type);
        self
    }

    /// Bind the camera to a target, `None` unbinds it
    pub fn set_target(&mut self, target: Option<RenderTargetInfo>) {
        self.target = target;
        self.invalidate_viewport();
    }

    /// Bound render target, if any
    pub fn target(&self) -> Option<&RenderTargetInfo> {
        self.target.as_ref()
    }

    /// The bound target changed size
    ///
    /// A notification about another target is a logic error.
    pub fn on_target_resized(&mut self, target: RenderTargetInfo) -> RenderResult<()> {
        match &mut self.target {
            Some(current) if current.id == target.id => {
                *current = target;
                self.invalidate_viewport();
                Ok(())
            }
            _ => Err(not_listening(target.id)),
        }
    }

    /// The bound target is being destroyed
    ///
    /// A notification about another target is a logic error.
    pub fn on_target_released(&mut self, target: RenderTargetId) -> RenderResult<()> {
        match self.target {
            Some(current) if current.id == target => {
                self.target = None;
                self.invalidate_viewport();
                Ok(())
            }
            _ => Err(not_listening(target)),
        }
    }

    /// Normalised region of the target covered by the camera
    pub fn set_target_region(&mut self, region: Rectf) {
        self.target_region = region;
        self.invalidate_viewport();
    }

    /// Normalised region of the target covered by the camera
    pub fn target_region(&self) -> Rectf {
        self.target_region
    }

    /// Switch between perspective and orthographic projection
    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.invalidate_projection_matrix();
    }

    /// Current projection model
    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    /// Vertical field of view in degrees
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.invalidate_projection_matrix();
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Distance of the near clip plane
    pub fn set_z_near(&mut self, z_near: f32) {
        self.z_near = z_near;
        self.invalidate_projection_matrix();
    }

    /// Distance of the near clip plane
    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    /// Distance of the far clip plane
    pub fn set_z_far(&mut self, z_far: f32) {
        self.z_far = z_far;
        self.invalidate_projection_matrix();
    }

    /// Distance of the far clip plane
    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Orthographic extent, a non-positive size follows the viewport
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.invalidate_projection_matrix();
    }

    /// Orthographic extent
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Cameras are drawn by ascending layer
    pub fn set_layer(&mut self, layer: u32) {
        self.layer = layer;
        self.layer_changed = true;
    }

    /// Render layer, lower layers are drawn first
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Width over height of the last computed viewport
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Drop the cached projection matrix
    pub fn invalidate_projection_matrix(&mut self) {
        self.projection_matrix = None;
    }

    /// Drop the cached view matrix
    pub fn invalidate_view_matrix(&mut self) {
        self.view_matrix = None;
    }

    /// Drop the cached viewport
    pub fn invalidate_viewport(&mut self) {
        self.viewport = None;
    }

    /// Viewport in target pixels
    pub fn viewport(&mut self) -> RenderResult<Recti> {
        self.ensure_viewport()
    }

    /// Projection matrix, rebuilt when its inputs changed
    ///
    /// Fails on an empty viewport or equal clip planes.
    pub fn projection_matrix(&mut self) -> RenderResult<Mat4> {
        self.ensure_projection_matrix()
    }

    /// View matrix built from `node`, reused while the node is unchanged
    pub fn view_matrix(&mut self, node: &NodeComponent) -> Mat4 {
        match self.view_matrix {
            Some((revision, matrix)) if revision == node.revision() => matrix,
            _ => {
                let matrix = node.transform().view_matrix();
                self.view_matrix = Some((node.revision(), matrix));
                matrix
            }
        }
    }

    /// World position the camera looks from
    pub fn eye_position(&self, node: &NodeComponent) -> Vec3 {
        node.position()
    }

    /// Direction the camera looks at
    pub fn forward(&self, node: &NodeComponent) -> Vec3 {
        node.forward()
    }

    /// Bind projection, view, target and viewport on the backend
    ///
    /// Fails if the camera has no target.
    pub fn apply_view(&mut self, node: &NodeComponent, backend: &mut dyn RenderBackend) -> RenderResult<Viewer> {
        let Some(target) = self.target else {
            log::error!("Camera has no render target");
            return Err(RenderError::MissingRenderTarget("camera has no target".to_string()));
        };

        let projection_matrix = self.ensure_projection_matrix()?;
        let view_matrix = self.view_matrix(node);
        let viewport = self.ensure_viewport()?;

        backend.set_matrix(MatrixType::Projection, &projection_matrix);
        backend.set_matrix(MatrixType::View, &view_matrix);
        backend.set_target(target.id)?;
        backend.set_viewport(viewport);

        Ok(Viewer {
            eye_position: self.eye_position(node),
            forward: self.forward(node),
            view_matrix,
            projection_matrix,
            viewport,
            target,
            z_near: self.z_near,
            z_far: self.z_far,
        })
    }

    fn ensure_viewport(&mut self) -> RenderResult<Recti> {
        if let Some(viewport) = self.viewport {
            return Ok(viewport);
        }

        let target = self
            .target
            .ok_or_else(|| RenderError::MissingRenderTarget("camera has no target".to_string()))?;

        let target_width = target.width as f32;
        let target_height = target.height as f32;

        let region = self.target_region;
        let x = region.x * target_width;
        let y = region.y * target_height;
        let width = region.width * target_width;
        let height = region.height * target_height;

        let viewport = Recti::new(x as i32, y as i32, width as i32, height as i32);
        if viewport.width <= 0 || viewport.height <= 0 {
            return Err(RenderError::InvalidView(format!(
                "empty viewport {}x{} on target {:?}",
                viewport.width, viewport.height, target.id
            )));
        }

        let aspect_ratio = width / height;
        if !utils::number_equals(self.aspect_ratio, aspect_ratio, 0.001) {
            self.aspect_ratio = aspect_ratio;
            if self.projection_type == ProjectionType::Perspective {
                self.invalidate_projection_matrix();
            }
        }

        self.viewport = Some(viewport);
        Ok(viewport)
    }

    fn ensure_projection_matrix(&mut self) -> RenderResult<Mat4> {
        // Viewport first, it can change the aspect ratio and drop the cache
        if self.projection_type == ProjectionType::Perspective
            || self.size.x <= 0.0
            || self.size.y <= 0.0
        {
            self.ensure_viewport()?;
        }

        if let Some(matrix) = self.projection_matrix {
            return Ok(matrix);
        }

        if utils::number_equals(self.z_near, self.z_far, f32::EPSILON) {
            return Err(RenderError::InvalidView(format!(
                "near and far planes are both at {}",
                self.z_near
            )));
        }

        let matrix = match self.projection_type {
            ProjectionType::Orthographic => {
                let (width, height) = if self.size.x <= 0.0 || self.size.y <= 0.0 {
                    let viewport = self.ensure_viewport()?;
                    (viewport.width as f32, viewport.height as f32)
                } else {
                    (self.size.x, self.size.y)
                };

                Mat4::new_orthographic(0.0, width, height, 0.0, self.z_near, self.z_far)
            }
            ProjectionType::Perspective => {
                Mat4::new_perspective(self.aspect_ratio, utils::deg_to_rad(self.fov), self.z_near, self.z_far)
            }
        };

        self.projection_matrix = Some(matrix);
        Ok(matrix)
    }
}

fn not_listening(target: RenderTargetId) -> RenderError {
    log::error!("Camera is not listening to target {:?}", target);
    RenderError::UnknownTarget(format!("{:?}", target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::render::recording::{GpuCommand, RecordingBackend};
    use approx::assert_relative_eq;

    fn target(id: u32, width: u32, height: u32) -> RenderTargetInfo {
        RenderTargetInfo {
            id: RenderTargetId(id),
            width,
            height,
        }
    }

    #[test]
    fn test_viewport_follows_region() {
        let mut camera = CameraComponent::new().with_target(target(0, 800, 600));
        camera.set_target_region(Rectf::new(0.5, 0.0, 0.5, 1.0));

        assert_eq!(camera.viewport().unwrap(), Recti::new(400, 0, 400, 600));
        assert_relative_eq!(camera.aspect_ratio(), 400.0 / 600.0);
    }

    #[test]
    fn test_empty_viewport_is_an_error() {
        let mut camera = CameraComponent::new().with_target(target(0, 0, 600));
        assert!(matches!(camera.projection_matrix(), Err(RenderError::InvalidView(_))));
        assert!(matches!(camera.viewport(), Err(RenderError::InvalidView(_))));

        camera.on_target_resized(target(0, 800, 600)).unwrap();
        assert!(camera.projection_matrix().is_ok());

        camera.set_target_region(Rectf::new(0.0, 0.0, 0.0, 1.0));
        assert!(camera.viewport().is_err());

        let mut ortho = CameraComponent::new()
            .with_target(target(0, 800, 0))
            .with_projection_type(ProjectionType::Orthographic);
        ortho.set_size(Vec2::new(10.0, 10.0));
        let node = NodeComponent::new();
        let mut backend = RecordingBackend::new();
        assert!(ortho.apply_view(&node, &mut backend).is_err());
    }

    #[test]
    fn test_equal_clip_planes_are_an_error() {
        let mut camera = CameraComponent::new().with_target(target(0, 800, 600));
        camera.set_z_near(5.0);
        camera.set_z_far(5.0);
        assert!(matches!(camera.projection_matrix(), Err(RenderError::InvalidView(_))));

        camera.set_z_far(50.0);
        assert!(camera.projection_matrix().is_ok());
    }

    #[test]
    fn test_resize_invalidates_perspective() {
        let mut camera = CameraComponent::new().with_target(target(0, 800, 600));
        let before = camera.projection_matrix().unwrap();

        camera.on_target_resized(target(0, 600, 600)).unwrap();
        let after = camera.projection_matrix().unwrap();

        assert_ne!(before, after);
        assert_relative_eq!(camera.aspect_ratio(), 1.0);
        assert_eq!(after, Mat4::new_perspective(1.0, utils::deg_to_rad(70.0), 1.0, 1000.0));
    }

    #[test]
    fn test_orthographic_size() {
        let mut camera = CameraComponent::new()
            .with_target(target(0, 640, 480))
            .with_projection_type(ProjectionType::Orthographic);

        let from_viewport = camera.projection_matrix().unwrap();
        assert_eq!(from_viewport, Mat4::new_orthographic(0.0, 640.0, 480.0, 0.0, 1.0, 1000.0));

        camera.set_size(Vec2::new(100.0, 50.0));
        let sized = camera.projection_matrix().unwrap();
        assert_eq!(sized, Mat4::new_orthographic(0.0, 100.0, 50.0, 0.0, 1.0, 1000.0));
    }

    #[test]
    fn test_foreign_target_notifications_fail() {
        let mut camera = CameraComponent::new().with_target(target(0, 800, 600));

        assert!(matches!(camera.on_target_resized(target(1, 10, 10)), Err(RenderError::UnknownTarget(_))));
        assert!(camera.on_target_released(RenderTargetId(1)).is_err());
        assert!(camera.target().is_some());

        camera.on_target_released(RenderTargetId(0)).unwrap();
        assert!(camera.target().is_none());
        assert!(camera.on_target_released(RenderTargetId(0)).is_err());
    }

    #[test]
    fn test_apply_view() {
        let mut backend = RecordingBackend::new();
        let info = backend.add_window_target(320, 200);
        let node = NodeComponent::from_position(Vec3::new(0.0, 0.0, 5.0));

        let mut camera = CameraComponent::new();
        assert!(matches!(
            camera.apply_view(&node, &mut backend),
            Err(RenderError::MissingRenderTarget(_))
        ));

        camera.set_target(Some(info));
        let viewer = camera.apply_view(&node, &mut backend).unwrap();

        assert_eq!(viewer.eye_position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(viewer.viewport, Recti::new(0, 0, 320, 200));
        assert_eq!(
            backend.commands(),
            &[
                GpuCommand::SetMatrix(MatrixType::Projection, viewer.projection_matrix),
                GpuCommand::SetMatrix(MatrixType::View, viewer.view_matrix),
                GpuCommand::SetTarget(info.id),
                GpuCommand::SetViewport(viewer.viewport),
            ]
        );
        assert_relative_eq!(viewer.view_matrix.transform_vector(&Vec3::z()), Vec3::z());
    }

    #[test]
    fn test_view_matrix_tracks_node() {
        let mut camera = CameraComponent::new();
        let mut node = NodeComponent::new();

        let first = camera.view_matrix(&node);
        assert_eq!(first, Mat4::identity());

        node.set_rotation(Quat::from_axis_angle(&Vec3::y_axis(), 1.0));
        let second = camera.view_matrix(&node);
        assert_ne!(first, second);
    }

    #[test]
    fn test_layer_change_requests_validation() {
        let mut camera = CameraComponent::new();
        assert!(!camera.take_entity_invalidation());

        camera.set_layer(3);
        assert_eq!(camera.layer(), 3);
        assert!(camera.take_entity_invalidation());
        assert!(!camera.take_entity_invalidation());
    }
}
