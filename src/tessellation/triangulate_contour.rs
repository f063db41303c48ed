use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{Result, TessellationError};
use crate::math::polygon_3d::PlaneFrame;
use crate::math::{Point3, Vector3};

use super::TriangleMesh;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Triangulates a closed planar contour into a cap mesh.
///
/// The contour is projected onto the plane through its first point with the
/// given normal and filled with a constrained Delaunay triangulation. The
/// returned mesh keeps the contour's own 3D points as its vertices, in
/// contour order, and every triangle winds counter-clockwise around
/// `normal`. No Steiner points are added.
pub struct TriangulateContour<'a> {
    points: &'a [Point3],
    normal: Vector3,
}

impl<'a> TriangulateContour<'a> {
    /// Creates a new `TriangulateContour` operation.
    #[must_use]
    pub fn new(points: &'a [Point3], normal: Vector3) -> Self {
        Self { points, normal }
    }

    /// Executes the triangulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the contour has fewer than 3 points, contains
    /// non-finite coordinates, has crossing edges, or encloses no area.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> Result<TriangleMesh> {
        if self.points.len() < 3 {
            return Err(TessellationError::InvalidParameters(
                "contour needs at least 3 points".into(),
            )
            .into());
        }

        let frame = PlaneFrame::new(self.points[0], &self.normal)?;
        let projected: Vec<SpadePoint2<f64>> = self
            .points
            .iter()
            .map(|p| {
                let uv = frame.project(p);
                SpadePoint2::new(uv.x, uv.y)
            })
            .collect();

        let mut cdt = Cdt::new();
        let vertex_to_contour = insert_constraint_loop(&mut cdt, &projected)?;

        let mut mesh = TriangleMesh {
            vertices: self.points.to_vec(),
            indices: Vec::new(),
        };

        let interior = classify_interior_faces(&cdt);
        for face in cdt.inner_faces() {
            if !interior.contains(&face.fix().index()) {
                continue;
            }
            // Spade yields face vertices counter-clockwise in (u, v).
            let [a, b, c] = face.vertices();
            mesh.indices.push([
                vertex_to_contour[a.fix().index()],
                vertex_to_contour[b.fix().index()],
                vertex_to_contour[c.fix().index()],
            ]);
        }

        if mesh.indices.is_empty() {
            return Err(TessellationError::Failed("contour encloses no area".into()).into());
        }

        Ok(mesh)
    }
}

/// Inserts the loop's points and constrains each consecutive pair.
///
/// Returns the map from spade vertex index to the first contour index
/// inserted at that position.
#[allow(clippy::cast_possible_truncation)]
fn insert_constraint_loop(cdt: &mut Cdt, points: &[SpadePoint2<f64>]) -> Result<Vec<u32>> {
    let mut handles = Vec::with_capacity(points.len());
    let mut vertex_to_contour = Vec::with_capacity(points.len());

    for (i, &pt) in points.iter().enumerate() {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        // A repeated position returns the existing vertex.
        if h.index() == vertex_to_contour.len() {
            vertex_to_contour.push(i as u32);
        }
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(TessellationError::Failed("contour edges intersect".into()).into());
        }
        cdt.add_constraint(from, to);
    }

    Ok(vertex_to_contour)
}

/// Classifies which inner faces of the CDT lie inside the contour.
///
/// Flood-fills from the faces touching the outer face; crossing a constraint
/// edge increments the depth. Odd depth = interior.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n_idx = neighbor.fix().index();
            if depth_map.contains_key(&n_idx) {
                continue;
            }
            let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(n_idx, new_depth);
            if new_depth % 2 == 1 {
                interior.insert(n_idx);
            }
            queue.push_back((neighbor.fix(), new_depth));
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn area_along(mesh: &TriangleMesh, normal: &Vector3) -> f64 {
        mesh.indices
            .iter()
            .map(|t| {
                let a = mesh.vertices[t[0] as usize];
                let b = mesh.vertices[t[1] as usize];
                let c = mesh.vertices[t[2] as usize];
                (b - a).cross(&(c - a)).dot(normal) * 0.5
            })
            .sum()
    }

    #[test]
    fn triangle_is_single_face() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        let mesh = TriangulateContour::new(&pts, Vector3::z()).execute().unwrap();
        assert_eq!(mesh.vertices, pts);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn concave_l_shape_keeps_notch_open() {
        let pts = vec![
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 2.0),
            p(0.0, 2.0),
        ];
        let mesh = TriangulateContour::new(&pts, Vector3::z()).execute().unwrap();
        assert_eq!(mesh.triangle_count(), pts.len() - 2);
        assert_relative_eq!(area_along(&mesh, &Vector3::z()), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn triangles_wind_around_given_normal() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let up = TriangulateContour::new(&pts, Vector3::z()).execute().unwrap();
        assert_relative_eq!(area_along(&up, &Vector3::z()), 1.0, epsilon = 1e-9);

        // Clockwise loop: the cap still faces the requested side.
        let reversed: Vec<Point3> = pts.iter().rev().copied().collect();
        let down = TriangulateContour::new(&reversed, -Vector3::z())
            .execute()
            .unwrap();
        assert_relative_eq!(area_along(&down, &-Vector3::z()), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn tilted_contour_keeps_original_points() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let normal = Vector3::new(-1.0, 0.0, 1.0);
        let mesh = TriangulateContour::new(&pts, normal).execute().unwrap();
        assert_eq!(mesh.vertices, pts);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn repeated_point_maps_to_first_occurrence() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        let mesh = TriangulateContour::new(&pts, Vector3::z()).execute().unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.indices[0].iter().all(|&i| i != 2));
    }

    #[test]
    fn bow_tie_is_rejected() {
        let pts = vec![p(0.0, 0.0), p(1.0, 1.0), p(1.0, 0.0), p(0.0, 1.0)];
        assert!(TriangulateContour::new(&pts, Vector3::z()).execute().is_err());
    }

    #[test]
    fn collinear_points_enclose_nothing() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)];
        assert!(TriangulateContour::new(&pts, Vector3::z()).execute().is_err());
    }

    #[test]
    fn too_few_points_is_invalid() {
        let pts = vec![p(0.0, 0.0), p(1.0, 0.0)];
        assert!(TriangulateContour::new(&pts, Vector3::z()).execute().is_err());
    }
}
