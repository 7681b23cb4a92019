//! Deferred Phong lighting pass
//!
//! Reads the G-buffer and accumulates every queued light into a work texture
//! with additive blending:
//!
//! - directional lights: one full-screen quad per light
//! - point and spot lights: their light volume (sphere or cone) is drawn
//!   twice. The first draw writes no color and only marks the stencil buffer
//!   where the volume covers visible geometry, the second one shades the
//!   marked pixels and resets their stencil value.
//!
//! Overlapping volumes each add their own contribution.

use std::f32::consts::PI;

use crate::foundation::color::Color;
use crate::foundation::math::{axis, Mat4, Quat, Recti, Vec2, Vec3, Vec4};

use super::{light_type, shaders};
use crate::render::backend::{
    require_uniform, MatrixType, MeshHandle, RenderBackend, RenderTexture, SamplerFilter, ShaderHandle,
    UniformLocation, UniformValue,
};
use crate::render::mesh::Mesh;
use crate::render::queue::{PointLight, RenderQueue, SpotLight};
use crate::render::scene::SceneData;
use crate::render::states::{
    BlendFunc, ClearBuffers, FaceFilling, FaceSide, RenderStates, RendererComparison, RendererParameters,
    StencilOperation,
};
use crate::render::RenderError;

/// Volumes are scaled up slightly so their facets never clip the lit area
const VOLUME_MARGIN: f32 = 1.1;

/// World matrix of a point light volume (unit sphere)
pub fn point_light_volume(light: &PointLight) -> Mat4 {
    Mat4::new_translation(&light.position) * Mat4::new_scaling(light.radius * VOLUME_MARGIN)
}

/// World matrix of a spot light volume (unit cone along -Z, apex at the origin)
pub fn spot_light_volume(light: &SpotLight) -> Mat4 {
    let base_radius = light.radius * light.outer_angle_tangent * VOLUME_MARGIN;

    Mat4::new_translation(&light.position)
        * rotation_from_forward(&light.direction).to_homogeneous()
        * Mat4::new_nonuniform_scaling(&Vec3::new(base_radius, base_radius, light.radius))
}

fn rotation_from_forward(direction: &Vec3) -> Quat {
    if direction.norm_squared() <= f32::EPSILON {
        return Quat::identity();
    }

    // Opposite vectors have no unique shortest arc
    Quat::rotation_between(&axis::forward(), direction)
        .unwrap_or_else(|| Quat::from_axis_angle(&Vec3::y_axis(), PI))
}

#[derive(Debug, Clone, Copy)]
struct DirectionalUniforms {
    shader: ShaderHandle,
    scene_ambient: UniformLocation,
    eye_position: UniformLocation,
    color: UniformLocation,
    factors: UniformLocation,
    direction: UniformLocation,
}

#[derive(Debug, Clone, Copy)]
struct PointSpotUniforms {
    shader: ShaderHandle,
    discard: UniformLocation,
    scene_ambient: UniformLocation,
    eye_position: UniformLocation,
    light_type: UniformLocation,
    color: UniformLocation,
    factors: UniformLocation,
    parameters1: UniformLocation,
    parameters2: UniformLocation,
    parameters3: UniformLocation,
}

#[derive(Debug, Clone, Copy)]
struct DebugUniforms {
    shader: ShaderHandle,
    color: UniformLocation,
}

#[derive(Debug, Clone, Copy)]
struct LightingResources {
    directional: DirectionalUniforms,
    point_spot: PointSpotUniforms,
    sphere: MeshHandle,
    cone: MeshHandle,
}

impl LightingResources {
    fn acquire(backend: &mut dyn RenderBackend) -> Result<Self, RenderError> {
        let sphere = backend.create_mesh(&Mesh::sphere(1.0, 16, 8))?;
        let cone = backend.create_mesh(&Mesh::cone(1.0, 1.0, 16))?;

        let directional_shader = backend.shader(shaders::DEFERRED_DIRECTIONAL_LIGHT)?;
        let point_spot_shader = backend.shader(shaders::DEFERRED_POINT_SPOT_LIGHT)?;
        let backend: &dyn RenderBackend = backend;

        let directional = DirectionalUniforms {
            shader: directional_shader,
            scene_ambient: require_uniform(backend, directional_shader, "SceneAmbient")?,
            eye_position: require_uniform(backend, directional_shader, "EyePosition")?,
            color: require_uniform(backend, directional_shader, "LightColor")?,
            factors: require_uniform(backend, directional_shader, "LightFactors")?,
            direction: require_uniform(backend, directional_shader, "LightDirection")?,
        };

        let point_spot = PointSpotUniforms {
            shader: point_spot_shader,
            discard: require_uniform(backend, point_spot_shader, "Discard")?,
            scene_ambient: require_uniform(backend, point_spot_shader, "SceneAmbient")?,
            eye_position: require_uniform(backend, point_spot_shader, "EyePosition")?,
            light_type: require_uniform(backend, point_spot_shader, "LightType")?,
            color: require_uniform(backend, point_spot_shader, "LightColor")?,
            factors: require_uniform(backend, point_spot_shader, "LightFactors")?,
            parameters1: require_uniform(backend, point_spot_shader, "LightParameters1")?,
            parameters2: require_uniform(backend, point_spot_shader, "LightParameters2")?,
            parameters3: require_uniform(backend, point_spot_shader, "LightParameters3")?,
        };

        Ok(Self {
            directional,
            point_spot,
            sphere,
            cone,
        })
    }
}

/// Screen-space Phong light accumulation of the deferred technique
#[derive(Debug, Default)]
pub struct DeferredPhongLightingPass {
    light_meshes_drawing: bool,
    resources: Option<LightingResources>,
    debug: Option<DebugUniforms>,
}

impl DeferredPhongLightingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw every light volume in wireframe on top of the lighting
    pub fn enable_light_meshes_drawing(&mut self, enable: bool) {
        self.light_meshes_drawing = enable;
    }

    pub fn is_light_meshes_drawing_enabled(&self) -> bool {
        self.light_meshes_drawing
    }

    /// Accumulate the lights of `queue` into the first color texture of `work`
    ///
    /// `gbuffer` provides the three geometry attachments bound to units 0..2.
    pub fn process(
        &mut self,
        scene: &SceneData<'_>,
        queue: &RenderQueue,
        gbuffer: &RenderTexture,
        work: &RenderTexture,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), RenderError> {
        let resources = match self.resources {
            Some(resources) => resources,
            None => {
                let resources = LightingResources::acquire(backend)?;
                self.resources = Some(resources);
                resources
            }
        };

        let debug = if self.light_meshes_drawing {
            Some(self.debug_uniforms(backend)?)
        } else {
            None
        };

        backend.set_target(work.target)?;
        backend.set_viewport(Recti::new(0, 0, work.width as i32, work.height as i32));
        for (unit, texture) in gbuffer.color_textures.iter().take(3).enumerate() {
            backend.set_texture(unit as u32, *texture, SamplerFilter::Nearest);
        }
        backend.clear(ClearBuffers::COLOR, Color::BLACK);

        let mut states = RenderStates::default();
        states.enable(RendererParameters::BLEND, true);
        states.src_blend = BlendFunc::One;
        states.dst_blend = BlendFunc::One;
        states.enable(RendererParameters::DEPTH_BUFFER, false);
        states.enable(RendererParameters::DEPTH_WRITE, false);

        let ambient = UniformValue::Vec4(scene.ambient_color.to_vec4());
        let eye_position = UniformValue::Vec3(scene.viewer.eye_position);

        if !queue.directional_lights().is_empty() {
            let uniforms = resources.directional;

            backend.set_render_states(&states);
            backend.set_shader(uniforms.shader);
            backend.send_uniform(uniforms.scene_ambient, ambient);
            backend.send_uniform(uniforms.eye_position, eye_position);

            for light in queue.directional_lights() {
                backend.send_uniform(uniforms.color, UniformValue::Vec4(light.color.to_vec4()));
                backend.send_uniform(
                    uniforms.factors,
                    UniformValue::Vec2(Vec2::new(light.ambient_factor, light.diffuse_factor)),
                );
                backend.send_uniform(uniforms.direction, UniformValue::Vec3(light.direction));
                backend.draw_fullscreen_quad();
            }
        }

        if queue.point_lights().is_empty() && queue.spot_lights().is_empty() {
            return Ok(());
        }

        let uniforms = resources.point_spot;

        states.enable(RendererParameters::STENCIL_TEST, true);
        states.face_culling = FaceSide::Front;
        for face in [&mut states.front_face, &mut states.back_face] {
            face.mask = 0xFF;
            face.reference = 0;
            face.fail = StencilOperation::Keep;
            face.pass = StencilOperation::Keep;
            face.z_fail = StencilOperation::Invert;
        }

        backend.set_render_states(&states);
        backend.set_shader(uniforms.shader);
        backend.send_uniform(uniforms.scene_ambient, ambient);
        backend.send_uniform(uniforms.eye_position, eye_position);

        if !queue.point_lights().is_empty() {
            backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::POINT));

            for light in queue.point_lights() {
                backend.send_uniform(uniforms.color, UniformValue::Vec4(light.color.to_vec4()));
                backend.send_uniform(
                    uniforms.factors,
                    UniformValue::Vec2(Vec2::new(light.ambient_factor, light.diffuse_factor)),
                );
                backend.send_uniform(uniforms.parameters1, UniformValue::Vec4(light.position.push(light.attenuation)));
                backend.send_uniform(
                    uniforms.parameters2,
                    UniformValue::Vec4(Vec4::new(0.0, 0.0, 0.0, light.inv_radius)),
                );

                backend.set_matrix(MatrixType::World, &point_light_volume(light));
                draw_light_volume(backend, &mut states, &uniforms, resources.sphere);
            }

            if let Some(debug) = debug {
                let volumes = queue
                    .point_lights()
                    .iter()
                    .map(|light| (point_light_volume(light), light.color));
                draw_light_meshes(backend, &mut states, &debug, resources.sphere, volumes);
                backend.set_shader(uniforms.shader);
            }
        }

        if !queue.spot_lights().is_empty() {
            backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::SPOT));

            for light in queue.spot_lights() {
                backend.send_uniform(uniforms.color, UniformValue::Vec4(light.color.to_vec4()));
                backend.send_uniform(
                    uniforms.factors,
                    UniformValue::Vec2(Vec2::new(light.ambient_factor, light.diffuse_factor)),
                );
                backend.send_uniform(uniforms.parameters1, UniformValue::Vec4(light.position.push(light.attenuation)));
                backend.send_uniform(uniforms.parameters2, UniformValue::Vec4(light.direction.push(light.inv_radius)));
                backend.send_uniform(
                    uniforms.parameters3,
                    UniformValue::Vec2(Vec2::new(light.inner_angle_cosine, light.outer_angle_cosine)),
                );

                backend.set_matrix(MatrixType::World, &spot_light_volume(light));
                draw_light_volume(backend, &mut states, &uniforms, resources.cone);
            }

            if let Some(debug) = debug {
                let volumes = queue
                    .spot_lights()
                    .iter()
                    .map(|light| (spot_light_volume(light), light.color));
                draw_light_meshes(backend, &mut states, &debug, resources.cone, volumes);
                backend.set_shader(uniforms.shader);
            }
        }

        states.enable(RendererParameters::STENCIL_TEST, false);
        backend.set_render_states(&states);

        Ok(())
    }

    fn debug_uniforms(&mut self, backend: &mut dyn RenderBackend) -> Result<DebugUniforms, RenderError> {
        if let Some(debug) = self.debug {
            return Ok(debug);
        }

        let shader = backend.shader(shaders::DEBUG_SIMPLE)?;
        let debug = DebugUniforms {
            shader,
            color: require_uniform(backend, shader, "Color")?,
        };
        self.debug = Some(debug);
        Ok(debug)
    }
}

/// Stencil-mark then shade one light volume
///
/// `states` is updated in place, the back face pass operation set for the
/// shading draw stays in effect for the following lights.
fn draw_light_volume(
    backend: &mut dyn RenderBackend,
    states: &mut RenderStates,
    uniforms: &PointSpotUniforms,
    mesh: MeshHandle,
) {
    states.enable(RendererParameters::COLOR_WRITE, false);
    states.enable(RendererParameters::DEPTH_BUFFER, true);
    states.enable(RendererParameters::FACE_CULLING, false);
    states.set_stencil_compare(RendererComparison::Always, FaceSide::FrontAndBack);
    backend.set_render_states(states);
    backend.send_uniform(uniforms.discard, UniformValue::Bool(true));
    backend.draw_indexed(mesh);

    states.enable(RendererParameters::COLOR_WRITE, true);
    states.enable(RendererParameters::DEPTH_BUFFER, false);
    states.enable(RendererParameters::FACE_CULLING, true);
    states.face_culling = FaceSide::Front;
    states.set_stencil_compare(RendererComparison::NotEqual, FaceSide::Back);
    states.set_stencil_pass_operation(StencilOperation::Zero, FaceSide::Back);
    backend.set_render_states(states);
    backend.send_uniform(uniforms.discard, UniformValue::Bool(false));
    backend.draw_indexed(mesh);
}

/// Wireframe overlay of light volumes, `states` is restored afterwards
fn draw_light_meshes(
    backend: &mut dyn RenderBackend,
    states: &mut RenderStates,
    debug: &DebugUniforms,
    mesh: MeshHandle,
    volumes: impl Iterator<Item = (Mat4, Color)>,
) {
    let saved = *states;

    states.enable(RendererParameters::DEPTH_BUFFER, true);
    states.enable(RendererParameters::DEPTH_WRITE, true);
    states.enable(RendererParameters::FACE_CULLING, false);
    states.enable(RendererParameters::STENCIL_TEST, false);
    states.face_filling = FaceFilling::Line;
    backend.set_render_states(states);
    backend.set_shader(debug.shader);

    for (matrix, color) in volumes {
        backend.set_matrix(MatrixType::World, &matrix);
        backend.send_uniform(debug.color, UniformValue::Vec4(color.to_vec4()));
        backend.draw_indexed(mesh);
    }

    *states = saved;
    backend.set_render_states(states);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::recording::{GpuCommand, RecordingBackend};
    use crate::render::scene::{Background, Viewer};
    use approx::assert_relative_eq;

    fn point_light(position: Vec3, color: Color) -> PointLight {
        PointLight {
            color,
            ambient_factor: 0.0,
            diffuse_factor: 1.0,
            position,
            attenuation: 0.9,
            radius: 5.0,
            inv_radius: 0.2,
        }
    }

    fn spot_light(direction: Vec3) -> SpotLight {
        SpotLight {
            color: Color::WHITE,
            ambient_factor: 0.0,
            diffuse_factor: 1.0,
            position: Vec3::new(0.0, 4.0, 0.0),
            direction,
            attenuation: 0.9,
            radius: 10.0,
            inv_radius: 0.1,
            inner_angle_cosine: 15.0_f32.to_radians().cos(),
            outer_angle_cosine: 45.0_f32.to_radians().cos(),
            outer_angle_tangent: 45.0_f32.to_radians().tan(),
        }
    }

    struct Fixture {
        backend: RecordingBackend,
        gbuffer: RenderTexture,
        work: RenderTexture,
        viewer: Viewer,
        background: Background,
    }

    impl Fixture {
        fn new() -> Self {
            let mut backend = RecordingBackend::with_standard_shaders(3);
            let target = backend.add_window_target(320, 240);
            let gbuffer = backend.create_render_texture(320, 240, 3).unwrap();
            let work = backend.create_render_texture(320, 240, 2).unwrap();

            let viewer = Viewer {
                eye_position: Vec3::new(0.0, 0.0, 10.0),
                forward: axis::forward(),
                view_matrix: Mat4::identity(),
                projection_matrix: Mat4::identity(),
                viewport: Recti::new(0, 0, 320, 240),
                target,
                z_near: 1.0,
                z_far: 1000.0,
            };

            Self {
                backend,
                gbuffer,
                work,
                viewer,
                background: Background::default(),
            }
        }

        fn run(&mut self, pass: &mut DeferredPhongLightingPass, queue: &RenderQueue) {
            let scene = SceneData {
                ambient_color: Color::rgb(25, 25, 25),
                background: &self.background,
                viewer: &self.viewer,
            };
            pass.process(&scene, queue, &self.gbuffer, &self.work, &mut self.backend).unwrap();
        }

        /// States in effect at each draw call
        fn draw_states(&self) -> Vec<RenderStates> {
            let mut current = RenderStates::default();
            let mut states = Vec::new();
            for command in self.backend.commands() {
                match command {
                    GpuCommand::SetRenderStates(new_states) => current = *new_states,
                    command if command.is_draw() => states.push(current),
                    _ => {}
                }
            }
            states
        }
    }

    #[test]
    fn test_point_light_two_pass_stencil() {
        let mut fixture = Fixture::new();
        let mut queue = RenderQueue::new();
        queue.add_point_light(point_light(Vec3::zeros(), Color::WHITE));

        let mut pass = DeferredPhongLightingPass::new();
        fixture.run(&mut pass, &queue);

        let states = fixture.draw_states();
        assert_eq!(states.len(), 2);

        let (mark, shade) = (states[0], states[1]);
        assert!(!mark.is_enabled(RendererParameters::COLOR_WRITE));
        assert!(mark.is_enabled(RendererParameters::DEPTH_BUFFER));
        assert!(!mark.is_enabled(RendererParameters::FACE_CULLING));
        assert_eq!(mark.front_face.compare, RendererComparison::Always);
        assert_eq!(mark.back_face.z_fail, StencilOperation::Invert);

        assert!(shade.is_additive());
        assert!(shade.is_enabled(RendererParameters::STENCIL_TEST));
        assert!(!shade.is_enabled(RendererParameters::DEPTH_BUFFER));
        assert_eq!(shade.face_culling, FaceSide::Front);
        assert_eq!(shade.back_face.compare, RendererComparison::NotEqual);
        assert_eq!(shade.back_face.pass, StencilOperation::Zero);

        // Stencil test is switched off at the end
        assert!(!fixture.backend.current_states().is_enabled(RendererParameters::STENCIL_TEST));
    }

    #[test]
    fn test_directional_lights_use_fullscreen_quads() {
        let mut fixture = Fixture::new();
        let mut queue = RenderQueue::new();
        for _ in 0..2 {
            queue.add_directional_light(crate::render::queue::DirectionalLight {
                color: Color::WHITE,
                ambient_factor: 0.2,
                diffuse_factor: 1.0,
                direction: axis::forward(),
            });
        }

        let mut pass = DeferredPhongLightingPass::new();
        fixture.run(&mut pass, &queue);

        let quads = fixture
            .backend
            .commands()
            .iter()
            .filter(|command| **command == GpuCommand::DrawFullscreenQuad)
            .count();
        assert_eq!(quads, 2);
        assert!(fixture.draw_states().iter().all(|states| states.is_additive()));
        assert!(fixture
            .backend
            .commands()
            .contains(&GpuCommand::SetShader("DeferredDirectionnalLight".to_string())));
    }

    #[test]
    fn test_light_meshes_drawing() {
        let mut fixture = Fixture::new();
        let mut queue = RenderQueue::new();
        queue.add_point_light(point_light(Vec3::zeros(), Color::WHITE));
        queue.add_spot_light(spot_light(axis::forward()));

        let mut pass = DeferredPhongLightingPass::new();
        pass.enable_light_meshes_drawing(true);
        assert!(pass.is_light_meshes_drawing_enabled());
        fixture.run(&mut pass, &queue);

        let states = fixture.draw_states();
        // Two volume draws and one wireframe draw per light
        assert_eq!(states.len(), 6);
        let wireframe: Vec<_> = states.iter().filter(|s| s.face_filling == FaceFilling::Line).collect();
        assert_eq!(wireframe.len(), 2);
        assert!(wireframe.iter().all(|s| !s.is_enabled(RendererParameters::STENCIL_TEST)));

        // The point/spot shader is bound again before the spot lights
        let shaders: Vec<_> = fixture
            .backend
            .commands()
            .iter()
            .filter_map(|command| match command {
                GpuCommand::SetShader(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            shaders,
            vec!["DeferredPointSpotLight", "DebugSimple", "DeferredPointSpotLight", "DebugSimple", "DeferredPointSpotLight"]
        );
    }

    #[test]
    fn test_spot_volume_orientation() {
        let light = spot_light(Vec3::new(0.0, -1.0, 0.0));
        let matrix = spot_light_volume(&light);

        // The cone apex sits on the light, its base center one radius along the direction
        let apex = matrix.transform_point(&crate::foundation::math::Point3::origin());
        let base = matrix.transform_point(&crate::foundation::math::Point3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(apex.coords, light.position, epsilon = 1e-5);
        assert_relative_eq!(base.coords, Vec3::new(0.0, -6.0, 0.0), epsilon = 1e-4);

        // Pointing backwards still yields a valid rotation
        let backwards = spot_light_volume(&spot_light(Vec3::new(0.0, 0.0, 1.0)));
        let base = backwards.transform_point(&crate::foundation::math::Point3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(base.coords, Vec3::new(0.0, 4.0, 10.0), epsilon = 1e-4);
    }

    #[test]
    fn test_point_volume_scale() {
        let light = point_light(Vec3::new(1.0, 2.0, 3.0), Color::WHITE);
        let matrix = point_light_volume(&light);
        let edge = matrix.transform_point(&crate::foundation::math::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(edge.coords, Vec3::new(1.0 + 5.5, 2.0, 3.0), epsilon = 1e-4);
    }
}
