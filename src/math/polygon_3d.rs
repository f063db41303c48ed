use crate::error::GeometryError;

use super::{Point2, Point3, Vector3, TOLERANCE};

/// Computes the unit normal of a closed polygon using Newell's method.
///
/// The normal follows the right-hand rule with respect to the point order.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] if the polygon has no area
/// (fewer than 3 points, or all points collinear).
pub fn newell_normal(points: &[Point3]) -> Result<Vector3, GeometryError> {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return Err(GeometryError::Degenerate(
            "polygon has no area, cannot compute normal".into(),
        ));
    }
    Ok(normal / len)
}

/// Arithmetic mean of a point set, or `None` when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Right-handed orthonormal frame of a plane through `origin`.
///
/// `u_dir × v_dir == normal`, so a loop that is counter-clockwise in `(u, v)`
/// winds counter-clockwise around `normal`.
#[derive(Debug, Clone)]
pub struct PlaneFrame {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl PlaneFrame {
    /// Builds a frame from an origin and a (not necessarily unit) normal.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if `normal` has no length, or
    /// [`GeometryError::NonFinite`] if it contains NaN or infinity.
    pub fn new(origin: Point3, normal: &Vector3) -> Result<Self, GeometryError> {
        if !normal.iter().all(|c| c.is_finite()) {
            return Err(GeometryError::NonFinite("plane normal"));
        }
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector);
        }
        let normal = normal / len;

        // Seed with the world axis least aligned with the normal.
        let seed = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
            Vector3::x()
        } else if normal.y.abs() <= normal.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let u_dir = seed.cross(&normal).normalize();
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Projects a 3D point to `(u, v)` coordinates in the plane.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        let d = point - self.origin;
        Point2::new(d.dot(&self.u_dir), d.dot(&self.v_dir))
    }
}

/// Signed area of a closed loop after projection into `frame`.
///
/// Positive when the loop winds counter-clockwise around the frame normal.
#[must_use]
pub fn signed_area_in_frame(points: &[Point3], frame: &PlaneFrame) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let uv: Vec<Point2> = points.iter().map(|p| frame.project(p)).collect();
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += uv[i].x * uv[j].y - uv[j].x * uv[i].y;
    }
    sum * 0.5
}
