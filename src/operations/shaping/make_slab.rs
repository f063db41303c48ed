use tracing::debug;

use crate::error::{GeometryError, Result, TessellationError};
use crate::geometry::Contour;
use crate::math::polygon_3d::{signed_area_in_frame, PlaneFrame};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::tessellation::{CleanMesh, TriangleMesh, TriangulateContour};

/// Parameters controlling slab generation.
#[derive(Debug, Clone, Copy)]
pub struct SlabParams {
    /// Distance between the top and bottom caps, for a unit normal.
    pub thickness: f64,
    /// Vertices closer than this are merged by the cleaning pass.
    pub merge_tolerance: f64,
}

impl Default for SlabParams {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            merge_tolerance: TOLERANCE,
        }
    }
}

impl SlabParams {
    /// Sets the slab thickness.
    #[must_use]
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    /// Sets the vertex merge tolerance of the cleaning pass.
    #[must_use]
    pub fn with_merge_tolerance(mut self, tolerance: f64) -> Self {
        self.merge_tolerance = tolerance;
        self
    }
}

/// Thickens a closed contour into a watertight slab.
///
/// The contour is capped by triangulation, and the cap is copied half a
/// thickness along `+normal` (top) and `-normal` (bottom). A belt of quads,
/// two triangles each, joins every boundary edge of the top cap to the
/// matching edge of the bottom cap. Bottom cap, belt and top cap are then
/// concatenated and cleaned so shared boundary points appear once.
///
/// The offset is `0.5 * thickness * normal`; a non-unit normal scales it.
pub struct MakeSlab {
    contour: Contour,
    normal: Vector3,
    params: SlabParams,
}

impl MakeSlab {
    /// Creates a new `MakeSlab` operation.
    #[must_use]
    pub fn new(contour: Contour, normal: Vector3, thickness: f64) -> Self {
        Self {
            contour,
            normal,
            params: SlabParams::default().with_thickness(thickness),
        }
    }

    /// Creates a new `MakeSlab` operation from a full parameter set.
    #[must_use]
    pub fn with_params(contour: Contour, normal: Vector3, params: SlabParams) -> Self {
        Self {
            contour,
            normal,
            params,
        }
    }

    /// Executes the operation.
    ///
    /// Returns `Ok(None)` when the contour has fewer than 3 points: the
    /// contour is not closeable yet, which is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge tolerance is negative or non-finite, the
    /// thickness or a point is non-finite, the normal
    /// is zero-length, or the contour cannot be triangulated (crossing edges,
    /// no enclosed area).
    pub fn execute(&self) -> Result<Option<TriangleMesh>> {
        let points = self.contour.points();
        if points.len() < 3 {
            debug!(points = points.len(), "contour not closeable yet, no slab");
            return Ok(None);
        }
        let tolerance = self.params.merge_tolerance;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "merge tolerance must be finite and non-negative, got {tolerance}"
            ))
            .into());
        }
        if !self.params.thickness.is_finite() {
            return Err(GeometryError::NonFinite("slab thickness").into());
        }
        if !points.iter().all(|p| p.iter().all(|c| c.is_finite())) {
            return Err(GeometryError::NonFinite("contour point").into());
        }

        let cap = TriangulateContour::new(points, self.normal).execute()?;

        let offset = self.normal * (0.5 * self.params.thickness);
        let top = cap.translated(&offset);
        let bottom = cap.translated(&-offset);

        let frame = PlaneFrame::new(points[0], &self.normal)?;
        let counter_clockwise = signed_area_in_frame(points, &frame) >= 0.0;
        let belt = belt(&top.vertices, &bottom.vertices, counter_clockwise);

        // Cap triangles wind around +normal: the bottom cap must face away.
        let mut combined = bottom.flipped();
        combined.append(&belt);
        combined.append(&top);
        if self.params.thickness < 0.0 {
            combined = combined.flipped();
        }

        let slab = CleanMesh::new(&combined, tolerance).execute();
        debug!(
            contour_points = points.len(),
            vertices = slab.vertex_count(),
            triangles = slab.triangle_count(),
            "built slab"
        );
        Ok(Some(slab))
    }
}

/// Builds the side wall joining the top and bottom boundary loops.
///
/// Points are interleaved `[top0, bottom0, top1, bottom1, ...]` with the
/// first pair repeated at the end to close the loop. Each step of two emits
/// the quad `(i, i+1, i+2)`, `(i+1, i+3, i+2)`, which faces outward for a
/// loop winding counter-clockwise around the normal and is reversed
/// otherwise.
#[allow(clippy::cast_possible_truncation)]
fn belt(top: &[Point3], bottom: &[Point3], counter_clockwise: bool) -> TriangleMesh {
    let n = top.len();
    let mut vertices = Vec::with_capacity(2 * (n + 1));
    for k in (0..n).chain(std::iter::once(0)) {
        vertices.push(top[k]);
        vertices.push(bottom[k]);
    }

    let mut indices = Vec::with_capacity(2 * n);
    for i in (0..vertices.len() as u32 - 2).step_by(2) {
        if counter_clockwise {
            indices.push([i, i + 1, i + 2]);
            indices.push([i + 1, i + 3, i + 2]);
        } else {
            indices.push([i, i + 2, i + 1]);
            indices.push([i + 1, i + 2, i + 3]);
        }
    }

    TriangleMesh { vertices, indices }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SplinesError;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn slab(points: Vec<Point3>, thickness: f64) -> TriangleMesh {
        MakeSlab::new(Contour::new(points), Vector3::z(), thickness)
            .execute()
            .unwrap()
            .unwrap()
    }

    fn square() -> Vec<Point3> {
        vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]
    }

    fn assert_watertight(mesh: &TriangleMesh) {
        assert!(mesh.is_closed());
        assert!(mesh.is_consistently_oriented());
    }

    // ── Not closeable ──────────────────────────────────────────

    #[test]
    fn empty_contour_yields_nothing() {
        let result = MakeSlab::new(Contour::default(), Vector3::z(), 1.0)
            .execute()
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn two_points_yield_nothing() {
        let result = MakeSlab::new(Contour::new(vec![p(0.0, 0.0), p(1.0, 0.0)]), Vector3::z(), 1.0)
            .execute()
            .unwrap();
        assert!(result.is_none());
    }

    // ── Minimal triangle ───────────────────────────────────────

    #[test]
    fn triangle_slab_counts() {
        let mesh = slab(vec![p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)], 2.0);
        assert_eq!(mesh.vertex_count(), 6);
        // 1 top + 1 bottom + 2 per boundary edge
        assert_eq!(mesh.triangle_count(), 2 + 2 * 3);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn caps_sit_half_thickness_from_contour() {
        let mesh = slab(square(), 3.0);
        for v in &mesh.vertices {
            assert_relative_eq!(v.z.abs(), 1.5, epsilon = 1e-12);
        }
        assert_eq!(mesh.vertices.iter().filter(|v| v.z > 0.0).count(), 4);
    }

    // ── Polygons ───────────────────────────────────────────────

    #[test]
    fn square_slab_is_a_box() {
        let mesh = slab(square(), 1.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clockwise_contour_still_faces_outward() {
        let mut pts = square();
        pts.reverse();
        let mesh = slab(pts, 1.0);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn concave_contour() {
        let pts = vec![
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 2.0),
            p(0.0, 2.0),
        ];
        let mesh = slab(pts, 0.5);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 2 * 4 + 2 * 6);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn negative_thickness_keeps_outward_winding() {
        let mesh = slab(square(), -2.0);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn tilted_contour_with_carried_normal() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(s, 0.0, s),
            Point3::new(s, 1.0, s),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let contour = Contour::new(pts);
        let normal = contour.plane_normal().unwrap();
        let mesh = MakeSlab::new(contour, normal, 2.0).execute().unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_watertight(&mesh);
        assert_relative_eq!(mesh.signed_volume(), 2.0, epsilon = 1e-9);
    }

    // ── Duplicates ─────────────────────────────────────────────

    #[test]
    fn repeated_closing_point_is_merged() {
        let mut pts = square();
        pts.push(pts[0]);
        let mesh = slab(pts, 1.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_watertight(&mesh);
    }

    #[test]
    fn repeated_interior_point_is_merged() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let mesh = slab(pts, 1.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_watertight(&mesh);
    }

    // ── Determinism & errors ───────────────────────────────────

    #[test]
    fn identical_inputs_give_identical_meshes() {
        let a = slab(square(), 1.25);
        let b = slab(square(), 1.25);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_normal_is_an_error() {
        let result = MakeSlab::new(Contour::new(square()), Vector3::zeros(), 1.0).execute();
        assert!(result.is_err());
    }

    #[test]
    fn non_finite_thickness_is_an_error() {
        let result = MakeSlab::new(Contour::new(square()), Vector3::z(), f64::NAN).execute();
        assert!(result.is_err());
    }

    #[test]
    fn contour_far_from_origin() {
        let pts: Vec<Point3> = square()
            .iter()
            .map(|q| Point3::new(q.x + 1e10, q.y + 1e10, 0.0))
            .collect();
        let mesh = slab(pts, 1.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_watertight(&mesh);
    }

    #[test]
    fn invalid_merge_tolerance_is_rejected() {
        for tolerance in [-1.0, f64::NAN, f64::INFINITY] {
            let params = SlabParams::default().with_merge_tolerance(tolerance);
            let result = MakeSlab::with_params(Contour::new(square()), Vector3::z(), params).execute();
            assert!(matches!(
                result,
                Err(SplinesError::Tessellation(TessellationError::InvalidParameters(_)))
            ));
        }
    }

    #[test]
    fn zero_merge_tolerance_welds_exact_duplicates() {
        let params = SlabParams::default().with_merge_tolerance(0.0);
        let mesh = MakeSlab::with_params(Contour::new(square()), Vector3::z(), params)
            .execute()
            .unwrap()
            .unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_watertight(&mesh);
    }

    // ── Belt layout ────────────────────────────────────────────

    #[test]
    fn belt_interleaves_top_and_bottom_and_closes_the_loop() {
        let top = vec![Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0), Point3::new(0.0, 1.0, 1.0)];
        let bottom: Vec<Point3> = top.iter().map(|q| Point3::new(q.x, q.y, -1.0)).collect();

        let ccw = belt(&top, &bottom, true);
        assert_eq!(
            ccw.vertices,
            vec![top[0], bottom[0], top[1], bottom[1], top[2], bottom[2], top[0], bottom[0]]
        );
        assert_eq!(
            ccw.indices,
            vec![[0, 1, 2], [1, 3, 2], [2, 3, 4], [3, 5, 4], [4, 5, 6], [5, 7, 6]]
        );

        let cw = belt(&top, &bottom, false);
        assert_eq!(cw.vertices, ccw.vertices);
        assert_eq!(cw.indices, ccw.flipped().indices);
    }

    #[test]
    fn merge_tolerance_comes_from_params() {
        let params = SlabParams::default()
            .with_thickness(1.0)
            .with_merge_tolerance(1e-6);
        let mesh = MakeSlab::with_params(Contour::new(square()), Vector3::z(), params)
            .execute()
            .unwrap()
            .unwrap();
        assert_eq!(mesh.vertex_count(), 8);
    }
}
