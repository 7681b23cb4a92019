//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the few geometric helpers the scene graph
//! and lighting code need (transforms, bounding spheres, rectangles).

pub use nalgebra::{Isometry3, Matrix3, Matrix4, Quaternion, Translation3, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Engine axis conventions (right-handed, Y up, looking down -Z)
pub mod axis {
    use super::Vec3;

    /// Forward direction, (0, 0, -1)
    pub fn forward() -> Vec3 {
        Vec3::new(0.0, 0.0, -1.0)
    }

    /// Up direction, (0, 1, 0)
    pub fn up() -> Vec3 {
        Vec3::new(0.0, 1.0, 0.0)
    }

    /// Right direction, (1, 0, 0)
    pub fn right() -> Vec3 {
        Vec3::new(1.0, 0.0, 0.0)
    }
}

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Inverse of the rigid part (translation and rotation), scale is ignored
    pub fn view_matrix(&self) -> Mat4 {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation)
            .inverse()
            .to_homogeneous()
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Squared distance from the sphere surface to `point`
    ///
    /// Computed as `|point - center|² - radius²`, negative when the point is inside.
    pub fn squared_distance(&self, point: &Vec3) -> f32 {
        (point - self.center).norm_squared() - self.radius * self.radius
    }

    /// Does the sphere contain `point`?
    pub fn contains(&self, point: &Vec3) -> bool {
        self.squared_distance(point) <= 0.0
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect<T> {
    /// Left edge
    pub x: T,
    /// Top edge
    pub y: T,
    /// Width
    pub width: T,
    /// Height
    pub height: T,
}

impl<T> Rect<T> {
    /// Create a new rectangle
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Self { x, y, width, height }
    }
}

/// Rectangle in normalised [0, 1] coordinates
pub type Rectf = Rect<f32>;

/// Rectangle in pixels
pub type Recti = Rect<i32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Compare two floats with an absolute tolerance
    pub fn number_equals(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_squared_distance() {
        let sphere = Sphere::new(Vec3::new(1.0, 0.0, 0.0), 2.0);

        assert_relative_eq!(sphere.squared_distance(&Vec3::new(4.0, 0.0, 0.0)), 5.0);
        assert_relative_eq!(sphere.squared_distance(&Vec3::new(1.0, 0.0, 0.0)), -4.0);
        assert!(sphere.contains(&Vec3::new(2.0, 1.0, 0.0)));
        assert!(!sphere.contains(&Vec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn test_view_matrix_inverts_transform() {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), 0.7);
        let transform = Transform::from_position_rotation(Vec3::new(3.0, -2.0, 5.0), rotation);

        let product = transform.view_matrix() * transform.to_matrix();
        assert_relative_eq!(product, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_transform_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vec3::new(0.0, 0.0, 10.0),
            rotation: Quat::from_axis_angle(&Vec3::z_axis(), constants::PI * 0.5),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let point = transform.to_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point, Point3::new(0.0, 2.0, 10.0), epsilon = 1e-5);
    }
}
