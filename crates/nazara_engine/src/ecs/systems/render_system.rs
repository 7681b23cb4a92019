//! # Render System
//!
//! Sorts tracked entities into three buckets (cameras, drawables and lights)
//! and draws the scene once per camera, in ascending camera layer order.
//!
//! ## Frame Flow
//!
//! For every camera:
//! 1. Apply the camera view on the backend (projection, view, target, viewport)
//! 2. Clear the technique render queue
//! 3. Queue every drawable with its world matrix
//! 4. Queue every light with `coordinate system * node` as transform
//! 5. Let the technique draw the queue
//!
//! A camera that cannot apply its view (no target, zero sized target) is
//! logged and skipped for the frame; the other cameras are still drawn.
//!
//! ## Render Targets
//!
//! When a target changes size or goes away, the owner of the backend reports
//! it through [`RenderSystem::notify_target_resized`] or
//! [`RenderSystem::notify_target_released`]. Every camera bound to that
//! target is updated and the technique drops what it kept for it.
//!
//! ## Global Coordinate System
//!
//! The coordinate system matrix maps node space to world space. Its columns
//! are the global right, up and backward axes. Changing it invalidates the
//! cached world matrix of every drawable on the next update.

use std::collections::HashMap;

use crate::core::config::RenderConfig;
use crate::ecs::components::{CameraComponent, GraphicsComponent, LightComponent, NodeComponent};
use crate::ecs::{EcsError, Entities, Entity, EntityHandle, EntityId, EntityList, System, SystemBase, SystemFilter, TypeRegistry};
use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{RenderBackend, RenderTargetId, RenderTargetInfo};
use crate::render::scene::{Background, SceneData};
use crate::render::technique::{create_technique, RenderTechnique};

/// Draws every camera's view of the world through the configured technique
pub struct RenderSystem {
    base: SystemBase,
    cameras: EntityList,
    drawables: EntityList,
    lights: EntityList,
    camera_layers: HashMap<EntityId, u32>,
    coordinate_matrix: Mat4,
    coordinate_invalidated: bool,
    ambient_color: Color,
    background: Background,
    technique: Box<dyn RenderTechnique>,
    backend: Box<dyn RenderBackend>,
}

impl RenderSystem {
    /// Create a render system drawing through `backend`
    ///
    /// Tracks entities holding a node and at least one of a graphics, light or
    /// camera component.
    pub fn new(registry: &TypeRegistry, backend: Box<dyn RenderBackend>, config: &RenderConfig) -> Result<Self, EcsError> {
        let mut filter = SystemFilter::new();
        filter
            .require_any_component::<GraphicsComponent>(registry)?
            .require_any_component::<LightComponent>(registry)?
            .require_any_component::<CameraComponent>(registry)?
            .require_component::<NodeComponent>(registry)?;

        let mut base = SystemBase::for_system::<Self>(registry, filter)?;
        base.set_update_rate(0.0);

        let technique = create_technique(config);
        log::info!("Render system using {} technique", technique.name());

        Ok(Self {
            base,
            cameras: EntityList::new(),
            drawables: EntityList::new(),
            lights: EntityList::new(),
            camera_layers: HashMap::new(),
            coordinate_matrix: Mat4::identity(),
            coordinate_invalidated: true,
            ambient_color: config.ambient_color,
            background: Background::Color(config.background_color),
            technique,
            backend,
        })
    }

    /// Cameras in draw order
    pub fn cameras(&self) -> &EntityList {
        &self.cameras
    }

    /// Ids of the cameras in draw order
    pub fn camera_order(&self) -> Vec<EntityId> {
        self.cameras.ids().collect()
    }

    /// Entities with a node and a graphics component
    pub fn drawables(&self) -> &EntityList {
        &self.drawables
    }

    /// Entities with a node and a light component
    pub fn lights(&self) -> &EntityList {
        &self.lights
    }

    /// Background drawn by every camera
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Replace the background drawn by every camera
    pub fn set_default_background(&mut self, background: Background) {
        self.background = background;
    }

    /// Ambient color sent to the lighting shaders
    pub fn ambient_color(&self) -> Color {
        self.ambient_color
    }

    /// Set the ambient color of the scene
    pub fn set_ambient_color(&mut self, color: Color) {
        self.ambient_color = color;
    }

    /// Active render technique
    pub fn technique(&self) -> &dyn RenderTechnique {
        self.technique.as_ref()
    }

    /// Mutable access to the active technique
    pub fn technique_mut(&mut self) -> &mut dyn RenderTechnique {
        self.technique.as_mut()
    }

    /// Backend the system draws through
    pub fn render_backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Mutable access to the backend, e.g. to upload meshes
    pub fn render_backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Backend downcast to its concrete type
    pub fn backend<B: RenderBackend + 'static>(&self) -> Option<&B> {
        self.backend.as_ref().as_any().downcast_ref::<B>()
    }

    /// Mutable backend downcast to its concrete type
    pub fn backend_mut<B: RenderBackend + 'static>(&mut self) -> Option<&mut B> {
        self.backend.as_mut().as_any_mut().downcast_mut::<B>()
    }

    /// Node to world space matrix
    pub fn coordinate_system_matrix(&self) -> &Mat4 {
        &self.coordinate_matrix
    }

    /// Global right axis, `+X` with the default coordinate system
    pub fn global_right(&self) -> Vec3 {
        self.coordinate_matrix.column(0).xyz()
    }

    /// Global up axis, `+Y` with the default coordinate system
    pub fn global_up(&self) -> Vec3 {
        self.coordinate_matrix.column(1).xyz()
    }

    /// Global forward axis, `-Z` with the default coordinate system
    pub fn global_forward(&self) -> Vec3 {
        -self.coordinate_matrix.column(2).xyz()
    }

    /// Set the global right axis, drawables are re-transformed on the next update
    pub fn set_global_right(&mut self, right: Vec3) {
        self.set_axis(0, right);
    }

    /// Set the global up axis, drawables are re-transformed on the next update
    pub fn set_global_up(&mut self, up: Vec3) {
        self.set_axis(1, up);
    }

    /// Set the global forward axis, drawables are re-transformed on the next update
    pub fn set_global_forward(&mut self, forward: Vec3) {
        self.set_axis(2, -forward);
    }

    /// Has the coordinate system changed since the last update?
    pub fn is_coordinate_system_invalidated(&self) -> bool {
        self.coordinate_invalidated
    }

    /// Report a new size for `target` to every camera bound to it
    ///
    /// Returns the number of cameras updated.
    pub fn notify_target_resized(&mut self, entities: &mut Entities, target: RenderTargetInfo) -> usize {
        let mut updated = 0;
        for handle in cameras_bound_to(entities, target.id) {
            let Some(camera) = entities
                .get_mut(handle)
                .and_then(|entity| entity.try_component_mut::<CameraComponent>())
            else {
                continue;
            };

            match camera.on_target_resized(target) {
                Ok(()) => updated += 1,
                Err(err) => log::error!("Failed to resize camera target: {}", err),
            }
        }

        log::debug!(
            "Target {:?} resized to {}x{}, {} cameras updated",
            target.id,
            target.width,
            target.height,
            updated
        );
        updated
    }

    /// Unbind every camera from `target` and free what the technique kept for it
    ///
    /// Returns the number of cameras unbound.
    pub fn notify_target_released(&mut self, entities: &mut Entities, target: RenderTargetId) -> usize {
        let mut released = 0;
        for handle in cameras_bound_to(entities, target) {
            let Some(camera) = entities
                .get_mut(handle)
                .and_then(|entity| entity.try_component_mut::<CameraComponent>())
            else {
                continue;
            };

            match camera.on_target_released(target) {
                Ok(()) => released += 1,
                Err(err) => log::error!("Failed to release camera target: {}", err),
            }
        }

        self.technique.release_target(target, self.backend.as_mut());

        log::debug!("Target {:?} released, {} cameras unbound", target, released);
        released
    }

    fn set_axis(&mut self, column: usize, axis: Vec3) {
        self.coordinate_matrix.fixed_view_mut::<3, 1>(0, column).copy_from(&axis);
        self.coordinate_invalidated = true;
    }

    fn sort_cameras(&mut self) {
        let layers = &self.camera_layers;
        self.cameras
            .sort_by_key(|id| layers.get(&id).copied().unwrap_or_default());
    }

    fn draw_camera(&mut self, entities: &mut Entities, camera: EntityHandle) {
        let Some(entity) = entities.get_mut(camera) else {
            return;
        };
        let id = entity.id();

        let Some(node) = entity.try_component::<NodeComponent>().cloned() else {
            return;
        };
        let Some(camera) = entity.try_component_mut::<CameraComponent>() else {
            return;
        };

        let viewer = match camera.apply_view(&node, self.backend.as_mut()) {
            Ok(viewer) => viewer,
            Err(err) => {
                log::error!("Skipping camera {}: {}", id, err);
                return;
            }
        };

        let queue = self.technique.render_queue_mut();
        queue.clear();

        for handle in self.drawables.iter() {
            let Some(entity) = entities.get_mut(handle) else {
                continue;
            };
            let Some(node) = entity.try_component::<NodeComponent>().cloned() else {
                continue;
            };
            if let Some(graphics) = entity.try_component_mut::<GraphicsComponent>() {
                graphics.add_to_render_queue(queue, &node, &self.coordinate_matrix);
            }
        }

        for handle in self.lights.iter() {
            let Some(entity) = entities.get(handle) else {
                continue;
            };
            if let (Some(node), Some(light)) = (
                entity.try_component::<NodeComponent>(),
                entity.try_component::<LightComponent>(),
            ) {
                light.add_to_render_queue(queue, &(self.coordinate_matrix * node.transform_matrix()));
            }
        }

        log::trace!(
            "Camera {}: {} models, {} lights",
            id,
            queue.models().len(),
            queue.light_count()
        );

        let scene = SceneData {
            ambient_color: self.ambient_color,
            background: &self.background,
            viewer: &viewer,
        };

        if let Err(err) = self.technique.draw(&scene, self.backend.as_mut()) {
            log::error!("{} technique failed to draw camera {}: {}", self.technique.name(), id, err);
        }
    }
}

/// Entities holding a camera bound to `target`, enabled or not
fn cameras_bound_to(entities: &Entities, target: RenderTargetId) -> Vec<EntityHandle> {
    entities
        .iter()
        .filter(|entity| {
            entity
                .try_component::<CameraComponent>()
                .and_then(CameraComponent::target)
                .is_some_and(|bound| bound.id == target)
        })
        .map(Entity::handle)
        .collect()
}

/// Insert or remove the entity from `list` depending on `keep`
fn update_bucket(list: &mut EntityList, entity: &Entity, keep: bool) -> bool {
    if keep {
        list.insert(entity)
    } else {
        list.remove(entity)
    }
}

impl System for RenderSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn on_entity_removed(&mut self, entity: &Entity) {
        self.cameras.remove(entity);
        self.drawables.remove(entity);
        self.lights.remove(entity);
        self.camera_layers.remove(&entity.id());
    }

    fn on_entity_validation(&mut self, entity: &Entity, _just_added: bool) {
        let has_node = entity.has_component::<NodeComponent>();

        match entity.try_component::<CameraComponent>().filter(|_| has_node) {
            Some(camera) => {
                self.cameras.insert(entity);
                self.camera_layers.insert(entity.id(), camera.layer());
                self.sort_cameras();
            }
            None => {
                if self.cameras.remove(entity) {
                    self.camera_layers.remove(&entity.id());
                }
            }
        }

        if update_bucket(&mut self.drawables, entity, has_node && entity.has_component::<GraphicsComponent>()) {
            log::trace!("Entity {} drawable bucket changed", entity.id());
        }

        if update_bucket(&mut self.lights, entity, has_node && entity.has_component::<LightComponent>()) {
            log::trace!("Entity {} light bucket changed", entity.id());
        }
    }

    fn on_update(&mut self, entities: &mut Entities, _elapsed: f32) {
        if self.coordinate_invalidated {
            for handle in self.drawables.iter() {
                if let Some(graphics) = entities
                    .get_mut(handle)
                    .and_then(|entity| entity.try_component_mut::<GraphicsComponent>())
                {
                    graphics.invalidate_transform_matrix();
                }
            }

            self.coordinate_invalidated = false;
        }

        let cameras: Vec<EntityHandle> = self.cameras.iter().collect();
        for camera in cameras {
            self.draw_camera(entities, camera);
        }
    }
}
