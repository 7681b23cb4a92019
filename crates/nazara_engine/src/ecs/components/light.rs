//! Light component
//!
//! A light takes its position and direction from the entity node: the node
//! translation places point and spot lights, the node forward axis orients
//! directional and spot lights. Every frame the render system turns each
//! light into a render queue record.

use crate::ecs::Component;
use crate::foundation::color::Color;
use crate::foundation::math::{axis, utils, Mat4};
use crate::render::queue::{DirectionalLight, PointLight, RenderQueue, SpotLight};

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Parallel rays, like sunlight
    Directional,
    /// Radiates in all directions from a position
    Point,
    /// Cone of light from a position
    Spot,
}

/// Light source attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    light_type: LightType,
    color: Color,
    ambient_factor: f32,
    diffuse_factor: f32,
    attenuation: f32,
    radius: f32,
    inv_radius: f32,
    inner_angle: f32,
    inner_angle_cosine: f32,
    outer_angle: f32,
    outer_angle_cosine: f32,
    outer_angle_tangent: f32,
}

impl Component for LightComponent {}

impl LightComponent {
    /// White light of the given type with the engine defaults
    ///
    /// Directional lights get an ambient factor of 0.2, the others none.
    pub fn new(light_type: LightType) -> Self {
        let mut light = Self {
            light_type,
            color: Color::WHITE,
            ambient_factor: if light_type == LightType::Directional { 0.2 } else { 0.0 },
            diffuse_factor: 1.0,
            attenuation: 0.9,
            radius: 0.0,
            inv_radius: 0.0,
            inner_angle: 0.0,
            inner_angle_cosine: 0.0,
            outer_angle: 0.0,
            outer_angle_cosine: 0.0,
            outer_angle_tangent: 0.0,
        };

        light.set_radius(5.0);
        light.set_inner_angle(15.0);
        light.set_outer_angle(45.0);
        light
    }

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn ambient_factor(&self) -> f32 {
        self.ambient_factor
    }

    pub fn set_ambient_factor(&mut self, factor: f32) {
        self.ambient_factor = factor;
    }

    pub fn diffuse_factor(&self) -> f32 {
        self.diffuse_factor
    }

    pub fn set_diffuse_factor(&mut self, factor: f32) {
        self.diffuse_factor = factor;
    }

    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    pub fn set_attenuation(&mut self, attenuation: f32) {
        self.attenuation = attenuation;
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Range of point and spot lights
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.inv_radius = if radius > 0.0 { 1.0 / radius } else { 0.0 };
    }

    /// Inner cone angle in degrees
    pub fn inner_angle(&self) -> f32 {
        self.inner_angle
    }

    pub fn set_inner_angle(&mut self, degrees: f32) {
        self.inner_angle = degrees;
        self.inner_angle_cosine = utils::deg_to_rad(degrees).cos();
    }

    /// Outer cone angle in degrees
    pub fn outer_angle(&self) -> f32 {
        self.outer_angle
    }

    pub fn set_outer_angle(&mut self, degrees: f32) {
        self.outer_angle = degrees;
        let radians = utils::deg_to_rad(degrees);
        self.outer_angle_cosine = radians.cos();
        self.outer_angle_tangent = radians.tan();
    }

    /// Queue the light as seen through `transform`
    ///
    /// The direction is the transformed forward axis and is not renormalised.
    pub fn add_to_render_queue(&self, queue: &mut RenderQueue, transform: &Mat4) {
        let position = transform.column(3).xyz();
        let direction = transform.transform_vector(&axis::forward());

        match self.light_type {
            LightType::Directional => queue.add_directional_light(DirectionalLight {
                color: self.color,
                ambient_factor: self.ambient_factor,
                diffuse_factor: self.diffuse_factor,
                direction,
            }),
            LightType::Point => queue.add_point_light(PointLight {
                color: self.color,
                ambient_factor: self.ambient_factor,
                diffuse_factor: self.diffuse_factor,
                position,
                attenuation: self.attenuation,
                radius: self.radius,
                inv_radius: self.inv_radius,
            }),
            LightType::Spot => queue.add_spot_light(SpotLight {
                color: self.color,
                ambient_factor: self.ambient_factor,
                diffuse_factor: self.diffuse_factor,
                position,
                direction,
                attenuation: self.attenuation,
                radius: self.radius,
                inv_radius: self.inv_radius,
                inner_angle_cosine: self.inner_angle_cosine,
                outer_angle_cosine: self.outer_angle_cosine,
                outer_angle_tangent: self.outer_angle_tangent,
            }),
        }
    }
}

/// Factory functions for creating light components
pub struct LightFactory;

impl LightFactory {
    /// Directional light, oriented by its node
    pub fn directional(color: Color) -> LightComponent {
        let mut light = LightComponent::new(LightType::Directional);
        light.set_color(color);
        light
    }

    /// Point light reaching `radius` units
    pub fn point(color: Color, radius: f32) -> LightComponent {
        let mut light = LightComponent::new(LightType::Point);
        light.set_color(color);
        light.set_radius(radius);
        light
    }

    /// Spot light with cone angles in degrees
    pub fn spot(color: Color, radius: f32, inner_angle: f32, outer_angle: f32) -> LightComponent {
        let mut light = LightComponent::new(LightType::Spot);
        light.set_color(color);
        light.set_radius(radius);
        light.set_inner_angle(inner_angle);
        light.set_outer_angle(outer_angle);
        light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let directional = LightComponent::new(LightType::Directional);
        assert_relative_eq!(directional.ambient_factor(), 0.2);

        let point = LightComponent::new(LightType::Point);
        assert_relative_eq!(point.ambient_factor(), 0.0);
        assert_relative_eq!(point.attenuation(), 0.9);
        assert_relative_eq!(point.radius(), 5.0);
        assert_relative_eq!(point.inner_angle(), 15.0);
        assert_relative_eq!(point.outer_angle(), 45.0);
        assert_eq!(point.color(), Color::WHITE);
    }

    #[test]
    fn test_spot_record() {
        let light = LightFactory::spot(Color::rgb(255, 0, 0), 10.0, 20.0, 30.0);
        let rotation = Quat::from_axis_angle(&Vec3::x_axis(), -std::f32::consts::FRAC_PI_2);
        let transform = Mat4::new_translation(&Vec3::new(1.0, 5.0, 0.0)) * rotation.to_homogeneous();

        let mut queue = RenderQueue::new();
        light.add_to_render_queue(&mut queue, &transform);

        let spot = queue.spot_lights()[0];
        assert_relative_eq!(spot.position, Vec3::new(1.0, 5.0, 0.0));
        assert_relative_eq!(spot.direction, Vec3::new(0.0, -1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(spot.inv_radius, 0.1);
        assert_relative_eq!(spot.inner_angle_cosine, 20.0_f32.to_radians().cos(), epsilon = 1e-6);
        assert_relative_eq!(spot.outer_angle_tangent, 30.0_f32.to_radians().tan(), epsilon = 1e-6);
    }

    #[test]
    fn test_directional_direction_is_not_normalised() {
        let light = LightFactory::directional(Color::WHITE);
        let mut queue = RenderQueue::new();
        light.add_to_render_queue(&mut queue, &Mat4::new_scaling(2.0));

        assert_relative_eq!(queue.directional_lights()[0].direction, Vec3::new(0.0, 0.0, -2.0));
        assert!(queue.point_lights().is_empty());
    }
}
