use crate::error::GeometryError;
use crate::math::polygon_3d::newell_normal;
use crate::math::{Point3, Vector3};

/// A closed polygon of 3D points.
///
/// The last point implicitly connects back to the first. A contour may
/// carry the normal of the plane it was drawn in; otherwise the normal is
/// derived from the points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    points: Vec<Point3>,
    normal: Option<Vector3>,
}

impl Contour {
    /// Creates a contour from an ordered point loop.
    #[must_use]
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            normal: None,
        }
    }

    /// Attaches the normal of the plane the contour lies in.
    #[must_use]
    pub fn with_normal(mut self, normal: Vector3) -> Self {
        self.normal = Some(normal);
        self
    }

    /// The ordered boundary points.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the carried normal, or the Newell normal of the points.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if no normal is carried and
    /// the points enclose no area.
    pub fn plane_normal(&self) -> Result<Vector3, GeometryError> {
        match self.normal {
            Some(n) => Ok(n),
            None => newell_normal(&self.points),
        }
    }
}

impl From<Vec<Point3>> for Contour {
    fn from(points: Vec<Point3>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn carried_normal_wins() {
        let contour = Contour::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
        .with_normal(Vector3::new(0.0, 0.0, -2.0));
        assert_relative_eq!(contour.plane_normal().unwrap(), Vector3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn derived_normal_from_points() {
        let contour = Contour::from(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]);
        assert_relative_eq!(contour.plane_normal().unwrap(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn empty_contour_has_no_normal() {
        let contour = Contour::default();
        assert!(contour.is_empty());
        assert!(contour.plane_normal().is_err());
    }
}
