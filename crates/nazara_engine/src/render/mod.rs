//! # Rendering System
//!
//! Backend-agnostic render pipeline used by the render system:
//!
//! - **Backend**: the immediate-mode GPU command sink ([`RenderBackend`]) and
//!   a recording implementation for tools and tests
//! - **Render queue**: per-camera list of models and lights
//! - **Techniques**: forward and deferred strategies that turn a queue into
//!   backend calls
//! - **States**: fixed-function render state blocks
//!
//! Resource acquisition failures (unknown shader, missing uniform, invalid
//! mesh) are logged and reported as [`RenderError`]; nothing is retried
//! automatically.

pub mod backend;
pub mod material;
pub mod mesh;
pub mod queue;
pub mod recording;
pub mod scene;
pub mod states;
pub mod technique;

pub use backend::{
    BackendResult, MatrixType, MeshHandle, RenderBackend, RenderTargetId, RenderTargetInfo, RenderTexture,
    SamplerFilter, ShaderHandle, TextureHandle, UniformLocation, UniformValue,
};
pub use material::Material;
pub use mesh::{Mesh, Vertex};
pub use queue::{DirectionalLight, ModelEntry, PointLight, RenderQueue, SpotLight};
pub use recording::{GpuCommand, RecordingBackend};
pub use scene::{Background, SceneData, Viewer};
pub use states::{RenderStates, RendererParameters};
pub use technique::{create_technique, RenderTechnique};

use thiserror::Error;

/// High-level rendering error types
///
/// Backend specific failures are logged where they happen and surface here
/// in a generic form.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A GPU resource (shader, uniform, mesh, texture) could not be acquired
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A camera was drawn without a render target
    #[error("Missing render target: {0}")]
    MissingRenderTarget(String),

    /// A camera view cannot be built (empty viewport, degenerate clip planes)
    #[error("Invalid camera view: {0}")]
    InvalidView(String),

    /// A target notification or bind named a target that is not known here
    #[error("Unknown render target: {0}")]
    UnknownTarget(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
