//! Command-recording render backend
//!
//! [`RecordingBackend`] implements [`RenderBackend`] without a GPU: it keeps
//! a registry of named shaders and render targets and appends every call to a
//! command list. Tools and tests inspect that list to check what a frame did
//! (draw order per camera, state blocks of each pass, uniforms sent per light).

use std::any::Any;
use std::collections::HashMap;

use super::backend::{
    BackendResult, MatrixType, MeshHandle, RenderBackend, RenderTargetId, RenderTargetInfo, RenderTexture,
    SamplerFilter, ShaderHandle, TextureHandle, UniformLocation, UniformValue,
};
use super::mesh::Mesh;
use super::states::{ClearBuffers, RenderStates};
use super::technique::shaders;
use super::RenderError;
use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Recti};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    SetMatrix(MatrixType, Mat4),
    SetTarget(RenderTargetId),
    SetViewport(Recti),
    /// Shader bound, by name
    SetShader(String),
    /// Uniform sent, by name
    SendUniform(String, UniformValue),
    SetTexture(u32, TextureHandle, SamplerFilter),
    SetRenderStates(RenderStates),
    Clear(ClearBuffers, Color),
    DrawIndexed(MeshHandle),
    Draw(MeshHandle),
    DrawFullscreenQuad,
}

impl GpuCommand {
    /// Is this command a draw call?
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed(_) | Self::Draw(_) | Self::DrawFullscreenQuad)
    }
}

#[derive(Debug)]
struct ShaderEntry {
    name: String,
    uniforms: HashMap<String, UniformLocation>,
}

/// Backend recording every call instead of talking to a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    shaders: Vec<ShaderEntry>,
    shader_lookup: HashMap<String, ShaderHandle>,
    uniform_names: Vec<String>,
    targets: HashMap<RenderTargetId, (u32, u32)>,
    next_target: u32,
    next_texture: u32,
    meshes: Vec<usize>,
    current_target: Option<RenderTargetId>,
    current_states: RenderStates,
    commands: Vec<GpuCommand>,
}

impl RecordingBackend {
    /// Create a backend without any shader or target
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend knowing the shaders of the built-in techniques
    ///
    /// The forward shader declares `max_lights` light slots.
    pub fn with_standard_shaders(max_lights: usize) -> Self {
        let mut backend = Self::new();

        let mut forward = vec![
            "SceneAmbient".to_string(),
            "EyePosition".to_string(),
            "MaterialDiffuse".to_string(),
            "MaterialShininess".to_string(),
        ];
        for index in 0..max_lights {
            for field in ["type", "color", "factors", "parameters1", "parameters2", "parameters3"] {
                forward.push(shaders::light_uniform(index, field));
            }
        }
        backend.register_shader(shaders::FORWARD_PHONG, forward.as_slice());

        backend.register_shader(shaders::DEFERRED_GEOMETRY, &["MaterialDiffuse", "MaterialShininess"]);
        backend.register_shader(
            shaders::DEFERRED_DIRECTIONAL_LIGHT,
            &["SceneAmbient", "EyePosition", "LightColor", "LightFactors", "LightDirection"],
        );
        backend.register_shader(
            shaders::DEFERRED_POINT_SPOT_LIGHT,
            &[
                "Discard",
                "EyePosition",
                "SceneAmbient",
                "LightType",
                "LightColor",
                "LightFactors",
                "LightParameters1",
                "LightParameters2",
                "LightParameters3",
            ],
        );
        backend.register_shader(shaders::DEFERRED_FINAL, &["ColorTexture"]);
        backend.register_shader(shaders::DEBUG_SIMPLE, &["Color"]);

        backend
    }

    /// Declare a shader and its uniforms, replacing any previous declaration
    pub fn register_shader<S: AsRef<str>>(&mut self, name: &str, uniforms: &[S]) -> ShaderHandle {
        let mut locations = HashMap::with_capacity(uniforms.len());
        for uniform in uniforms {
            let location = UniformLocation(self.uniform_names.len() as u32);
            self.uniform_names.push(uniform.as_ref().to_string());
            locations.insert(uniform.as_ref().to_string(), location);
        }

        let entry = ShaderEntry {
            name: name.to_string(),
            uniforms: locations,
        };

        if let Some(&handle) = self.shader_lookup.get(name) {
            self.shaders[handle.0 as usize] = entry;
            return handle;
        }

        let handle = ShaderHandle(self.shaders.len() as u32);
        self.shaders.push(entry);
        self.shader_lookup.insert(name.to_string(), handle);
        handle
    }

    /// Register a window-like target of the given size
    pub fn add_window_target(&mut self, width: u32, height: u32) -> RenderTargetInfo {
        let id = self.allocate_target(width, height);
        RenderTargetInfo { id, width, height }
    }

    /// Change the size of a known target
    pub fn resize_target(&mut self, target: RenderTargetId, width: u32, height: u32) -> BackendResult<RenderTargetInfo> {
        let size = self
            .targets
            .get_mut(&target)
            .ok_or_else(|| RenderError::UnknownTarget(format!("{:?}", target)))?;
        *size = (width, height);

        Ok(RenderTargetInfo { id: target, width, height })
    }

    /// Destroy a window target
    pub fn release_target(&mut self, target: RenderTargetId) -> BackendResult<()> {
        self.targets
            .remove(&target)
            .map(|_| ())
            .ok_or_else(|| RenderError::UnknownTarget(format!("{:?}", target)))
    }

    /// Number of live targets, windows and render textures alike
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Every command recorded so far
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the list empty
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of draw calls recorded so far
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|command| command.is_draw()).count()
    }

    /// Last state block applied
    pub fn current_states(&self) -> &RenderStates {
        &self.current_states
    }

    /// Current draw target
    pub fn current_target(&self) -> Option<RenderTargetId> {
        self.current_target
    }

    /// Number of meshes uploaded
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn allocate_target(&mut self, width: u32, height: u32) -> RenderTargetId {
        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, (width, height));
        id
    }
}

impl RenderBackend for RecordingBackend {
    fn shader(&mut self, name: &str) -> BackendResult<ShaderHandle> {
        self.shader_lookup.get(name).copied().ok_or_else(|| {
            log::error!("Failed to get shader {}", name);
            RenderError::ResourceCreationFailed(format!("unknown shader {}", name))
        })
    }

    fn uniform_location(&self, shader: ShaderHandle, name: &str) -> Option<UniformLocation> {
        self.shaders.get(shader.0 as usize)?.uniforms.get(name).copied()
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle> {
        if let Err(err) = mesh.validate() {
            log::error!("Failed to create mesh: {}", err);
            return Err(err);
        }

        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(mesh.indices.len());
        Ok(handle)
    }

    fn create_render_texture(&mut self, width: u32, height: u32, color_attachments: usize) -> BackendResult<RenderTexture> {
        if width == 0 || height == 0 {
            log::error!("Failed to create render texture of size {}x{}", width, height);
            return Err(RenderError::ResourceCreationFailed(format!(
                "render texture of size {}x{}",
                width, height
            )));
        }

        let target = self.allocate_target(width, height);
        let color_textures = (0..color_attachments)
            .map(|_| {
                let texture = TextureHandle(self.next_texture);
                self.next_texture += 1;
                texture
            })
            .collect();

        Ok(RenderTexture {
            target,
            color_textures,
            width,
            height,
        })
    }

    fn destroy_render_texture(&mut self, texture: &RenderTexture) -> BackendResult<()> {
        if self.targets.remove(&texture.target).is_none() {
            log::error!("Failed to destroy unknown render texture {:?}", texture.target);
            return Err(RenderError::UnknownTarget(format!("{:?}", texture.target)));
        }

        if self.current_target == Some(texture.target) {
            self.current_target = None;
        }
        Ok(())
    }

    fn set_matrix(&mut self, matrix_type: MatrixType, matrix: &Mat4) {
        self.commands.push(GpuCommand::SetMatrix(matrix_type, *matrix));
    }

    fn set_target(&mut self, target: RenderTargetId) -> BackendResult<()> {
        if !self.targets.contains_key(&target) {
            log::error!("Unknown render target {:?}", target);
            return Err(RenderError::UnknownTarget(format!("{:?}", target)));
        }

        self.current_target = Some(target);
        self.commands.push(GpuCommand::SetTarget(target));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Recti) {
        self.commands.push(GpuCommand::SetViewport(viewport));
    }

    fn set_shader(&mut self, shader: ShaderHandle) {
        let name = self
            .shaders
            .get(shader.0 as usize)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| format!("{:?}", shader));
        self.commands.push(GpuCommand::SetShader(name));
    }

    fn send_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self
            .uniform_names
            .get(location.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("{:?}", location));
        self.commands.push(GpuCommand::SendUniform(name, value));
    }

    fn set_texture(&mut self, unit: u32, texture: TextureHandle, filter: SamplerFilter) {
        self.commands.push(GpuCommand::SetTexture(unit, texture, filter));
    }

    fn set_render_states(&mut self, states: &RenderStates) {
        self.current_states = *states;
        self.commands.push(GpuCommand::SetRenderStates(*states));
    }

    fn clear(&mut self, buffers: ClearBuffers, color: Color) {
        self.commands.push(GpuCommand::Clear(buffers, color));
    }

    fn draw_indexed(&mut self, mesh: MeshHandle) {
        self.commands.push(GpuCommand::DrawIndexed(mesh));
    }

    fn draw(&mut self, mesh: MeshHandle) {
        self.commands.push(GpuCommand::Draw(mesh));
    }

    fn draw_fullscreen_quad(&mut self) {
        self.commands.push(GpuCommand::DrawFullscreenQuad);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
