use nalgebra::Scalar;
use nalgebra::Vector3;

/// Axis aligned box, closed on both ends.
#[derive(Clone, Debug, PartialEq)]
pub struct Box3D<T>
where
    T: Scalar,
{
    /// Lower bound in the X, Y, and Z axis.
    pub min: Vector3<T>,
    /// Upper bound in the X, Y, and Z axis.
    pub max: Vector3<T>,
}

impl<T> Box3D<T>
where
    T: Scalar + PartialOrd,
{
    pub fn new(min: Vector3<T>, max: Vector3<T>) -> Self {
        Self { min, max }
    }

    /// Whether `min <= max` on every axis. Always false if a bound is NaN.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Whether `min <= point <= max` on every axis.
    pub fn contains(&self, point: &Vector3<T>) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

/// Region of interest used to cut the context out of the full cloud, in millimeters.
pub type SpatialBounds = Box3D<f32>;

impl SpatialBounds {
    /// The bounds that filter nothing: the whole representable range.
    pub fn unbounded() -> Self {
        Self {
            min: Vector3::from_element(f32::MIN),
            max: Vector3::from_element(f32::MAX),
        }
    }

    /// Whether these bounds mean "no filtering".
    ///
    /// Only the Z pair is inspected, and both ends must be at the limits.
    pub fn is_unbounded(&self) -> bool {
        self.min[2] == f32::MIN && self.max[2] == f32::MAX
    }
}

impl Default for SpatialBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::SpatialBounds;

    #[test]
    fn should_default_to_unbounded() {
        let bounds = SpatialBounds::default();
        assert!(bounds.is_unbounded());
        assert!(bounds.contains(&Vector3::new(f32::MIN, 0.0, f32::MAX)));
    }

    #[test]
    fn should_check_only_the_z_pair() {
        let mut bounds = SpatialBounds::unbounded();
        bounds.min[0] = 0.0;
        assert!(bounds.is_unbounded());

        bounds.max[2] = 1000.0;
        assert!(!bounds.is_unbounded());

        let mut bounds = SpatialBounds::unbounded();
        bounds.min[2] = -5.0;
        assert!(!bounds.is_unbounded());
    }

    #[test]
    fn should_include_the_faces() {
        let bounds = SpatialBounds::new(Vector3::new(-10.0, -10.0, 500.0), Vector3::new(10.0, 10.0, 1000.0));
        assert!(bounds.contains(&Vector3::new(-10.0, 10.0, 1000.0)));
        assert!(bounds.contains(&Vector3::new(0.0, 0.0, 500.0)));
        assert!(!bounds.contains(&Vector3::new(0.0, 10.5, 700.0)));
        assert!(!bounds.contains(&Vector3::new(0.0, 0.0, 1000.5)));
    }

    #[test]
    fn should_validate_ordering() {
        assert!(SpatialBounds::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)).is_valid());
        assert!(!SpatialBounds::new(Vector3::new(0.0, 2.0, 0.0), Vector3::new(1.0, 1.0, 1.0)).is_valid());
        assert!(!SpatialBounds::new(Vector3::new(f32::NAN, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)).is_valid());
        assert!(SpatialBounds::new(Vector3::zeros(), Vector3::zeros()).is_valid());
    }
}
