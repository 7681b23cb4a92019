//! Deferred technique
//!
//! Three stages per camera:
//!
//! 1. geometry: models are rasterised into a G-buffer with three color
//!    attachments (diffuse, normals, depth/shininess)
//! 2. lighting: [`DeferredPhongLightingPass`] accumulates the queued lights
//!    into the first work texture
//! 3. final: the background is drawn on the camera target and the work
//!    texture is composited over it
//!
//! Each camera target gets its own offscreen textures, sized like the target.
//! They are destroyed and recreated when the target size changes, and
//! destroyed when the target is released.

use std::collections::HashMap;

use crate::foundation::color::Color;
use crate::foundation::math::Recti;

use super::lighting_pass::DeferredPhongLightingPass;
use super::{shaders, RenderTechnique};
use crate::render::backend::{
    require_uniform, MatrixType, RenderBackend, RenderTargetId, RenderTexture, SamplerFilter, ShaderHandle, UniformLocation,
    UniformValue,
};
use crate::render::queue::RenderQueue;
use crate::render::scene::SceneData;
use crate::render::states::{ClearBuffers, RenderStates, RendererParameters};
use crate::render::RenderError;

const GBUFFER_ATTACHMENTS: usize = 3;
const WORK_ATTACHMENTS: usize = 2;

#[derive(Debug, Clone, Copy)]
struct GeometryUniforms {
    shader: ShaderHandle,
    material_diffuse: UniformLocation,
    material_shininess: Option<UniformLocation>,
}

#[derive(Debug, Clone, Copy)]
struct FinalUniforms {
    shader: ShaderHandle,
    color_texture: Option<UniformLocation>,
}

#[derive(Debug, Clone)]
struct Targets {
    gbuffer: RenderTexture,
    work: RenderTexture,
}

/// Deferred shading with Phong lighting
#[derive(Debug, Default)]
pub struct DeferredRenderTechnique {
    queue: RenderQueue,
    lighting_pass: DeferredPhongLightingPass,
    geometry: Option<GeometryUniforms>,
    final_pass: Option<FinalUniforms>,
    targets: HashMap<RenderTargetId, Targets>,
    last_target: Option<RenderTargetId>,
}

impl DeferredRenderTechnique {
    /// Technique without buffers, they are created on first draw
    pub fn new() -> Self {
        Self::default()
    }

    /// Lighting pass settings
    pub fn lighting_pass(&self) -> &DeferredPhongLightingPass {
        &self.lighting_pass
    }

    /// Mutable lighting pass settings
    pub fn lighting_pass_mut(&mut self) -> &mut DeferredPhongLightingPass {
        &mut self.lighting_pass
    }

    /// G-buffer of the last draw
    pub fn gbuffer(&self) -> Option<&RenderTexture> {
        self.targets.get(&self.last_target?).map(|targets| &targets.gbuffer)
    }

    /// Number of camera targets with offscreen textures
    pub fn buffered_target_count(&self) -> usize {
        self.targets.len()
    }

    fn ensure_targets(
        &mut self,
        target: RenderTargetId,
        width: u32,
        height: u32,
        backend: &mut dyn RenderBackend,
    ) -> Result<Targets, RenderError> {
        self.last_target = Some(target);

        if let Some(targets) = self.targets.get(&target) {
            if targets.gbuffer.width == width && targets.gbuffer.height == height {
                return Ok(targets.clone());
            }
        }

        if let Some(old) = self.targets.remove(&target) {
            destroy_targets(&old, backend);
        }

        log::debug!("Creating deferred buffers of {}x{} for target {:?}", width, height, target);

        let gbuffer = backend.create_render_texture(width, height, GBUFFER_ATTACHMENTS)?;
        let work = match backend.create_render_texture(width, height, WORK_ATTACHMENTS) {
            Ok(work) => work,
            Err(err) => {
                if let Err(destroy_err) = backend.destroy_render_texture(&gbuffer) {
                    log::error!("Failed to destroy G-buffer: {}", destroy_err);
                }
                return Err(err);
            }
        };

        let targets = Targets { gbuffer, work };
        self.targets.insert(target, targets.clone());
        Ok(targets)
    }

    fn ensure_shaders(&mut self, backend: &mut dyn RenderBackend) -> Result<(GeometryUniforms, FinalUniforms), RenderError> {
        if let (Some(geometry), Some(final_pass)) = (self.geometry, self.final_pass) {
            return Ok((geometry, final_pass));
        }

        let geometry_shader = backend.shader(shaders::DEFERRED_GEOMETRY)?;
        let final_shader = backend.shader(shaders::DEFERRED_FINAL)?;

        let geometry = GeometryUniforms {
            shader: geometry_shader,
            material_diffuse: require_uniform(backend, geometry_shader, "MaterialDiffuse")?,
            material_shininess: backend.uniform_location(geometry_shader, "MaterialShininess"),
        };
        let final_pass = FinalUniforms {
            shader: final_shader,
            color_texture: backend.uniform_location(final_shader, "ColorTexture"),
        };

        self.geometry = Some(geometry);
        self.final_pass = Some(final_pass);
        Ok((geometry, final_pass))
    }

    fn geometry_pass(&self, uniforms: &GeometryUniforms, gbuffer: &RenderTexture, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        backend.set_target(gbuffer.target)?;
        backend.set_viewport(Recti::new(0, 0, gbuffer.width as i32, gbuffer.height as i32));
        backend.set_render_states(&RenderStates::default());
        backend.clear(ClearBuffers::COLOR | ClearBuffers::DEPTH | ClearBuffers::STENCIL, Color::BLACK);

        backend.set_shader(uniforms.shader);
        for model in self.queue.models() {
            backend.send_uniform(uniforms.material_diffuse, UniformValue::Vec4(model.material.diffuse_color.to_vec4()));
            if let Some(location) = uniforms.material_shininess {
                backend.send_uniform(location, UniformValue::Float(model.material.shininess));
            }
            if let Some(texture) = model.material.diffuse_map {
                backend.set_texture(0, texture, SamplerFilter::Bilinear);
            }

            backend.set_matrix(MatrixType::World, &model.transform);
            backend.draw_indexed(model.mesh);
        }

        Ok(())
    }

    fn final_pass(&self, uniforms: &FinalUniforms, scene: &SceneData<'_>, work: &RenderTexture, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        let viewer = scene.viewer;
        backend.set_target(viewer.target.id)?;
        backend.set_viewport(viewer.viewport);
        scene.background.draw(backend);

        let mut states = RenderStates::default();
        states.enable(RendererParameters::DEPTH_BUFFER, false);
        states.enable(RendererParameters::DEPTH_WRITE, false);
        states.enable(RendererParameters::FACE_CULLING, false);
        backend.set_render_states(&states);

        backend.set_shader(uniforms.shader);
        if let Some(texture) = work.color_textures.first() {
            backend.set_texture(0, *texture, SamplerFilter::Bilinear);
        }
        if let Some(location) = uniforms.color_texture {
            backend.send_uniform(location, UniformValue::Int(0));
        }
        backend.draw_fullscreen_quad();

        Ok(())
    }
}

impl RenderTechnique for DeferredRenderTechnique {
    fn name(&self) -> &'static str {
        "Deferred"
    }

    fn render_queue(&self) -> &RenderQueue {
        &self.queue
    }

    fn render_queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.queue
    }

    fn draw(&mut self, scene: &SceneData<'_>, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        let viewer = scene.viewer;
        let (geometry, final_pass) = self.ensure_shaders(backend)?;
        let targets = self.ensure_targets(viewer.target.id, viewer.target.width, viewer.target.height, backend)?;

        self.queue.sort_models(&viewer.eye_position);

        // Camera matrices stay bound across the offscreen passes
        backend.set_matrix(MatrixType::Projection, &viewer.projection_matrix);
        backend.set_matrix(MatrixType::View, &viewer.view_matrix);

        self.geometry_pass(&geometry, &targets.gbuffer, backend)?;
        self.lighting_pass
            .process(scene, &self.queue, &targets.gbuffer, &targets.work, backend)?;
        self.final_pass(&final_pass, scene, &targets.work, backend)?;

        log::trace!(
            "Deferred pass drew {} models and {} lights",
            self.queue.models().len(),
            self.queue.light_count()
        );
        Ok(())
    }

    fn release_target(&mut self, target: RenderTargetId, backend: &mut dyn RenderBackend) {
        if let Some(targets) = self.targets.remove(&target) {
            destroy_targets(&targets, backend);
        }
        if self.last_target == Some(target) {
            self.last_target = None;
        }
    }
}

fn destroy_targets(targets: &Targets, backend: &mut dyn RenderBackend) {
    for texture in [&targets.gbuffer, &targets.work] {
        if let Err(err) = backend.destroy_render_texture(texture) {
            log::error!("Failed to destroy deferred buffer: {}", err);
        }
    }
}
