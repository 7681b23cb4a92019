//! Backend abstraction traits for the rendering system
//!
//! The techniques talk to the GPU through the small immediate-mode surface
//! defined here: bind matrices, shaders, uniforms, textures and render states,
//! clear the current target and issue draws. Resources are referred to by the
//! opaque handles the backend hands out.

use std::any::Any;

use super::mesh::Mesh;
use super::states::{ClearBuffers, RenderStates};
use super::RenderError;
use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Recti, Vec2, Vec3, Vec4};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Handle to a mesh uploaded to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Handle to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Identifier of a render target (window or render texture)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u32);

/// Location of a uniform inside a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Matrix slots of the fixed transform pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixType {
    /// Camera projection
    Projection,
    /// Camera view
    View,
    /// Object to world
    World,
}

/// Value sent to a shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    Nearest,
    Bilinear,
}

/// Render target identity and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetInfo {
    /// Target identifier
    pub id: RenderTargetId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Offscreen target with its color attachments
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTexture {
    /// Target used with [`RenderBackend::set_target`]
    pub target: RenderTargetId,
    /// One texture per color attachment
    pub color_textures: Vec<TextureHandle>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl RenderTexture {
    /// Target info of the render texture
    pub fn info(&self) -> RenderTargetInfo {
        RenderTargetInfo {
            id: self.target,
            width: self.width,
            height: self.height,
        }
    }
}

/// Immediate-mode GPU command sink
///
/// Implementations translate these calls to a graphics API. Every method that
/// acquires a resource returns an error instead of panicking so callers can
/// log and skip the work depending on it.
pub trait RenderBackend {
    /// Look up a shader program by name
    fn shader(&mut self, name: &str) -> BackendResult<ShaderHandle>;

    /// Location of a uniform, `None` if the shader does not declare it
    fn uniform_location(&self, shader: ShaderHandle, name: &str) -> Option<UniformLocation>;

    /// Upload a mesh
    fn create_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle>;

    /// Create an offscreen target with `color_attachments` color textures
    fn create_render_texture(&mut self, width: u32, height: u32, color_attachments: usize) -> BackendResult<RenderTexture>;

    /// Release an offscreen target and its color textures
    fn destroy_render_texture(&mut self, texture: &RenderTexture) -> BackendResult<()>;

    /// Bind a matrix of the transform pipeline
    fn set_matrix(&mut self, matrix_type: MatrixType, matrix: &Mat4);

    /// Make `target` the current draw target
    fn set_target(&mut self, target: RenderTargetId) -> BackendResult<()>;

    /// Set the viewport of the current target
    fn set_viewport(&mut self, viewport: Recti);

    /// Bind a shader program
    fn set_shader(&mut self, shader: ShaderHandle);

    /// Send a value to a uniform of the bound shader
    fn send_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Bind a texture to a unit with the given sampler
    fn set_texture(&mut self, unit: u32, texture: TextureHandle, filter: SamplerFilter);

    /// Apply a render state block
    fn set_render_states(&mut self, states: &RenderStates);

    /// Clear buffers of the current target
    fn clear(&mut self, buffers: ClearBuffers, color: Color);

    /// Draw a mesh with its index buffer
    fn draw_indexed(&mut self, mesh: MeshHandle);

    /// Draw a mesh without indices
    fn draw(&mut self, mesh: MeshHandle);

    /// Draw a quad covering the whole viewport
    fn draw_fullscreen_quad(&mut self);

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast to the concrete backend type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Look up a uniform that a technique cannot work without
///
/// Logs an error and fails if the shader does not declare it.
pub fn require_uniform(backend: &dyn RenderBackend, shader: ShaderHandle, name: &str) -> BackendResult<UniformLocation> {
    backend.uniform_location(shader, name).ok_or_else(|| {
        log::error!("Shader {:?} has no uniform {}", shader, name);
        RenderError::ResourceCreationFailed(format!("missing uniform {}", name))
    })
}
