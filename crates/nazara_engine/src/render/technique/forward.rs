//! Forward Phong technique
//!
//! Every model is shaded by the lights that can reach its bounding sphere,
//! closest first. When more lights qualify than the shader has slots for, the
//! model is drawn again in additive passes (`One`/`One` blending, depth test
//! `Equal`, no depth writes) until every light has contributed.

use crate::foundation::math::{Sphere, Vec2, Vec4};

use super::{light_type, shaders};
use super::RenderTechnique;
use crate::render::backend::{
    require_uniform, MatrixType, RenderBackend, SamplerFilter, ShaderHandle, UniformLocation, UniformValue,
};
use crate::render::queue::{DirectionalLight, PointLight, RenderQueue, SpotLight};
use crate::render::scene::SceneData;
use crate::render::states::{BlendFunc, RenderStates, RendererComparison, RendererParameters};
use crate::render::RenderError;

/// Light category of a [`LightIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// Reference to a queued light with its priority for one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightIndex {
    pub kind: LightKind,
    /// Position in the queue list of its category
    pub index: usize,
    /// Lower is more important
    pub score: f32,
}

/// Borrowed queued light of any category
#[derive(Debug, Clone, Copy)]
pub enum LightRef<'a> {
    Directional(&'a DirectionalLight),
    Point(&'a PointLight),
    Spot(&'a SpotLight),
}

impl<'a> LightRef<'a> {
    /// Resolve an index against the queue it was chosen from
    pub fn resolve(queue: &'a RenderQueue, light: &LightIndex) -> Option<Self> {
        match light.kind {
            LightKind::Directional => queue.directional_lights().get(light.index).map(Self::Directional),
            LightKind::Point => queue.point_lights().get(light.index).map(Self::Point),
            LightKind::Spot => queue.spot_lights().get(light.index).map(Self::Spot),
        }
    }
}

/// Ranking of a directional light: constant, they reach everything equally
pub fn directional_score(_light: &DirectionalLight, _object: &Sphere) -> f32 {
    0.0
}

/// Ranking of a point light: squared distance to the object
pub fn point_score(light: &PointLight, object: &Sphere) -> f32 {
    object.squared_distance(&light.position)
}

/// Ranking of a spot light: squared distance to the object
pub fn spot_score(light: &SpotLight, object: &Sphere) -> f32 {
    object.squared_distance(&light.position)
}

/// Can a point light reach the object?
pub fn is_point_light_suitable(light: &PointLight, object: &Sphere) -> bool {
    object.squared_distance(&light.position) <= light.radius * light.radius
}

/// Can a spot light reach the object?
pub fn is_spot_light_suitable(light: &SpotLight, object: &Sphere) -> bool {
    object.squared_distance(&light.position) <= light.radius * light.radius
}

/// Lights of `queue` able to reach `object`, most important first
///
/// Directional lights always qualify. Ties keep queue order.
pub fn choose_lights(queue: &RenderQueue, object: &Sphere) -> Vec<LightIndex> {
    let mut lights = Vec::with_capacity(queue.light_count());

    for (index, light) in queue.directional_lights().iter().enumerate() {
        lights.push(LightIndex {
            kind: LightKind::Directional,
            index,
            score: directional_score(light, object),
        });
    }

    for (index, light) in queue.point_lights().iter().enumerate() {
        if is_point_light_suitable(light, object) {
            lights.push(LightIndex {
                kind: LightKind::Point,
                index,
                score: point_score(light, object),
            });
        }
    }

    for (index, light) in queue.spot_lights().iter().enumerate() {
        if is_spot_light_suitable(light, object) {
            lights.push(LightIndex {
                kind: LightKind::Spot,
                index,
                score: spot_score(light, object),
            });
        }
    }

    lights.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    lights
}

/// Number of passes needed to apply `light_count` lights `max_lights` at a time
///
/// A model without lights still gets one (ambient) pass.
pub fn pass_count(light_count: usize, max_lights: usize) -> usize {
    if light_count == 0 || max_lights == 0 {
        1
    } else {
        (light_count - 1) / max_lights + 1
    }
}

/// Uniform locations of one shader light slot
#[derive(Debug, Clone, Copy)]
pub struct LightUniforms {
    pub light_type: UniformLocation,
    pub color: UniformLocation,
    pub factors: UniformLocation,
    pub parameters1: UniformLocation,
    pub parameters2: UniformLocation,
    pub parameters3: UniformLocation,
}

impl LightUniforms {
    fn resolve(backend: &dyn RenderBackend, shader: ShaderHandle, slot: usize) -> Result<Self, RenderError> {
        let location = |field: &str| require_uniform(backend, shader, &shaders::light_uniform(slot, field));

        Ok(Self {
            light_type: location("type")?,
            color: location("color")?,
            factors: location("factors")?,
            parameters1: location("parameters1")?,
            parameters2: location("parameters2")?,
            parameters3: location("parameters3")?,
        })
    }
}

/// Fill one light slot, `None` disables it
pub fn send_light_uniforms(backend: &mut dyn RenderBackend, uniforms: &LightUniforms, light: Option<LightRef<'_>>) {
    let Some(light) = light else {
        backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::NONE));
        return;
    };

    match light {
        LightRef::Directional(light) => {
            backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::DIRECTIONAL));
            backend.send_uniform(uniforms.color, UniformValue::Vec4(light.color.to_vec4()));
            backend.send_uniform(
                uniforms.factors,
                UniformValue::Vec2(Vec2::new(light.ambient_factor, light.diffuse_factor)),
            );
            backend.send_uniform(uniforms.parameters1, UniformValue::Vec4(light.direction.push(0.0)));
        }
        LightRef::Point(light) => {
            backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::POINT));
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
        }
        LightRef::Spot(light) => {
            backend.send_uniform(uniforms.light_type, UniformValue::Int(light_type::SPOT));
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
        }
    }
}

#[derive(Debug, Clone)]
struct ForwardResources {
    shader: ShaderHandle,
    scene_ambient: UniformLocation,
    eye_position: UniformLocation,
    material_diffuse: UniformLocation,
    material_shininess: Option<UniformLocation>,
    lights: Vec<LightUniforms>,
}

impl ForwardResources {
    fn acquire(backend: &mut dyn RenderBackend, max_lights: usize) -> Result<Self, RenderError> {
        let shader = backend.shader(shaders::FORWARD_PHONG)?;
        let backend: &dyn RenderBackend = backend;

        let lights = (0..max_lights)
            .map(|slot| LightUniforms::resolve(backend, shader, slot))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            shader,
            scene_ambient: require_uniform(backend, shader, "SceneAmbient")?,
            eye_position: require_uniform(backend, shader, "EyePosition")?,
            material_diffuse: require_uniform(backend, shader, "MaterialDiffuse")?,
            material_shininess: backend.uniform_location(shader, "MaterialShininess"),
            lights,
        })
    }
}

/// Forward rendering with multi-pass light accumulation
pub struct ForwardRenderTechnique {
    queue: RenderQueue,
    max_lights_per_pass: usize,
    resources: Option<ForwardResources>,
}

impl ForwardRenderTechnique {
    /// Create the technique, the shader provides `max_lights_per_pass` light slots
    pub fn new(max_lights_per_pass: usize) -> Self {
        Self {
            queue: RenderQueue::new(),
            max_lights_per_pass: max_lights_per_pass.max(1),
            resources: None,
        }
    }

    /// Light slots per pass
    pub fn max_lights_per_pass(&self) -> usize {
        self.max_lights_per_pass
    }

    fn ensure_resources(&mut self, backend: &mut dyn RenderBackend) -> Result<ForwardResources, RenderError> {
        if let Some(resources) = &self.resources {
            return Ok(resources.clone());
        }

        let resources = ForwardResources::acquire(backend, self.max_lights_per_pass)?;
        self.resources = Some(resources.clone());
        Ok(resources)
    }
}

impl RenderTechnique for ForwardRenderTechnique {
    fn name(&self) -> &'static str {
        "Forward"
    }

    fn render_queue(&self) -> &RenderQueue {
        &self.queue
    }

    fn render_queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.queue
    }

    fn draw(&mut self, scene: &SceneData<'_>, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        let resources = self.ensure_resources(backend)?;

        self.queue.sort_models(&scene.viewer.eye_position);
        scene.background.draw(backend);

        if self.queue.models().is_empty() {
            return Ok(());
        }

        let base_states = RenderStates::default();
        let mut additive_states = base_states;
        additive_states.enable(RendererParameters::BLEND, true);
        additive_states.src_blend = BlendFunc::One;
        additive_states.dst_blend = BlendFunc::One;
        additive_states.depth_func = RendererComparison::Equal;
        additive_states.enable(RendererParameters::DEPTH_WRITE, false);

        backend.set_render_states(&base_states);
        backend.set_shader(resources.shader);
        backend.send_uniform(resources.scene_ambient, UniformValue::Vec4(scene.ambient_color.to_vec4()));
        backend.send_uniform(resources.eye_position, UniformValue::Vec3(scene.viewer.eye_position));

        let max_lights = self.max_lights_per_pass;
        for model in self.queue.models() {
            backend.send_uniform(resources.material_diffuse, UniformValue::Vec4(model.material.diffuse_color.to_vec4()));
            if let Some(location) = resources.material_shininess {
                backend.send_uniform(location, UniformValue::Float(model.material.shininess));
            }
            if let Some(texture) = model.material.diffuse_map {
                backend.set_texture(0, texture, SamplerFilter::Bilinear);
            }
            backend.set_matrix(MatrixType::World, &model.transform);

            let lights = choose_lights(&self.queue, &model.bounding_sphere);
            let passes = pass_count(lights.len(), max_lights);

            for pass in 0..passes {
                if pass == 1 {
                    backend.set_render_states(&additive_states);
                }

                let offset = pass * max_lights;
                for (slot, uniforms) in resources.lights.iter().enumerate() {
                    let light = lights
                        .get(offset + slot)
                        .and_then(|light| LightRef::resolve(&self.queue, light));
                    send_light_uniforms(backend, uniforms, light);
                }

                backend.draw_indexed(model.mesh);
            }

            if passes > 1 {
                backend.set_render_states(&base_states);
            }
        }

        log::trace!("Forward pass drew {} models", self.queue.models().len());
        Ok(())
    }
}
