use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use std::ops;

/// Rigid transform between two camera frames. Translations are in millimeters.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Isometry3<f32>);

impl Transform {
    pub fn eye() -> Self {
        Self(Isometry3::<f32>::identity())
    }

    /// Creates a transform from a translation and a scaled-axis rotation.
    ///
    /// # Arguments
    ///
    /// * translation: The translation, in millimeters.
    /// * axis_angle: The rotation axis scaled by the angle, in radians.
    pub fn new(translation: Vector3<f32>, axis_angle: Vector3<f32>) -> Self {
        Self(Isometry3::<f32>::from_parts(
            Translation3::from(translation),
            UnitQuaternion::from_scaled_axis(axis_angle),
        ))
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vector3::new(x, y, z), Vector3::zeros())
    }

    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.0.transform_point(&(*vector).into()).coords
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }
}

impl ops::Mul<&Vector3<f32>> for &Transform {
    type Output = Vector3<f32>;

    fn mul(self, rhs: &Vector3<f32>) -> Self::Output {
        self.transform_vector(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_mul_op() {
        let point = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(&Transform::eye() * &point, point);

        let transform = Transform::new(
            Vector3::new(0., 0., 3.),
            Vector3::y() * std::f32::consts::PI,
        );
        assert_abs_diff_eq!(
            &transform * &point,
            Vector3::new(-1.0, 2.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_inverse() {
        let transform = Transform::new(Vector3::new(-32.0, 2.0, 4.0), Vector3::x() * 0.1);
        let point = Vector3::new(10.0, -20.0, 800.0);
        let back = &transform.inverse() * &(&transform * &point);
        assert_abs_diff_eq!(back, point, epsilon = 1e-3);
    }
}
