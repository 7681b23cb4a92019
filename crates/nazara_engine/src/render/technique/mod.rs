//! Render techniques
//!
//! A technique drains the render queue of one camera pass and turns it into
//! backend calls. The forward technique shades every model with its closest
//! lights, the deferred one rasterises a G-buffer first and accumulates the
//! lights in screen space.

pub mod deferred;
pub mod forward;
pub mod lighting_pass;

pub use deferred::DeferredRenderTechnique;
pub use forward::ForwardRenderTechnique;
pub use lighting_pass::DeferredPhongLightingPass;

use crate::core::config::{RenderConfig, TechniqueKind};

use super::backend::{RenderBackend, RenderTargetId};
use super::queue::RenderQueue;
use super::scene::SceneData;
use super::RenderError;

/// Names of the shaders and uniforms used by the built-in techniques
pub mod shaders {
    pub const FORWARD_PHONG: &str = "ForwardPhong";
    pub const DEFERRED_GEOMETRY: &str = "DeferredGeometry";
    pub const DEFERRED_DIRECTIONAL_LIGHT: &str = "DeferredDirectionnalLight";
    pub const DEFERRED_POINT_SPOT_LIGHT: &str = "DeferredPointSpotLight";
    pub const DEFERRED_FINAL: &str = "DeferredFinal";
    pub const DEBUG_SIMPLE: &str = "DebugSimple";

    /// Uniform name of one field of the `index`-th forward light slot
    pub fn light_uniform(index: usize, field: &str) -> String {
        format!("Lights[{}].{}", index, field)
    }
}

/// Light categories as encoded in the `type` light uniforms
pub mod light_type {
    /// Unused light slot
    pub const NONE: i32 = -1;
    pub const DIRECTIONAL: i32 = 0;
    pub const POINT: i32 = 1;
    pub const SPOT: i32 = 2;
}

/// Strategy turning a filled render queue into GPU commands
pub trait RenderTechnique {
    /// Technique name, for logging
    fn name(&self) -> &'static str;

    /// Queue of the current camera pass
    fn render_queue(&self) -> &RenderQueue;

    /// Mutable queue of the current camera pass
    fn render_queue_mut(&mut self) -> &mut RenderQueue;

    /// Draw the queued models and lights for the viewer of `scene`
    ///
    /// GPU resources are acquired on first use; a failure is returned without
    /// retrying.
    fn draw(&mut self, scene: &SceneData<'_>, backend: &mut dyn RenderBackend) -> Result<(), RenderError>;

    /// Free whatever the technique keeps for a target that is going away
    fn release_target(&mut self, _target: RenderTargetId, _backend: &mut dyn RenderBackend) {}
}

/// Build the technique selected by the render configuration
pub fn create_technique(config: &RenderConfig) -> Box<dyn RenderTechnique> {
    match config.technique {
        TechniqueKind::Forward => Box::new(ForwardRenderTechnique::new(config.max_lights_per_pass)),
        TechniqueKind::Deferred => {
            let mut technique = DeferredRenderTechnique::new();
            technique
                .lighting_pass_mut()
                .enable_light_meshes_drawing(config.light_meshes_drawing);
            Box::new(technique)
        }
    }
}
