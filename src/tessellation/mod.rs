mod clean_mesh;
mod triangulate_contour;

pub use clean_mesh::CleanMesh;
pub use triangulate_contour::TriangulateContour;

use std::collections::HashMap;

use crate::math::{Point3, Vector3};

/// A triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends another mesh, offsetting its indices past the current vertices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    /// Returns a copy with every vertex moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> TriangleMesh {
        TriangleMesh {
            vertices: self.vertices.iter().map(|p| p + offset).collect(),
            indices: self.indices.clone(),
        }
    }

    /// Returns a copy with the winding of every triangle reversed.
    #[must_use]
    pub fn flipped(&self) -> TriangleMesh {
        TriangleMesh {
            vertices: self.vertices.clone(),
            indices: self.indices.iter().map(|t| [t[0], t[2], t[1]]).collect(),
        }
    }

    /// Returns `true` if every edge is shared by exactly two triangles.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        let mut uses: HashMap<(u32, u32), usize> = HashMap::new();
        for tri in &self.indices {
            for (a, b) in triangle_edges(tri) {
                *uses.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        !uses.is_empty() && uses.values().all(|&count| count == 2)
    }

    /// Returns `true` if no directed edge is used twice, i.e. all
    /// neighbouring triangles agree on winding.
    #[must_use]
    pub fn is_consistently_oriented(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.indices
            .iter()
            .flat_map(triangle_edges)
            .all(|edge| seen.insert(edge))
    }

    /// Signed enclosed volume (positive for outward-facing closed meshes).
    ///
    /// Sums `(1/6) * v0 . (v1 x v2)` over all triangles.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.indices
            .iter()
            .map(|tri| {
                let v0 = self.vertices[tri[0] as usize].coords;
                let v1 = self.vertices[tri[1] as usize].coords;
                let v2 = self.vertices[tri[2] as usize].coords;
                v0.dot(&v1.cross(&v2))
            })
            .sum::<f64>()
            / 6.0
    }
}

fn triangle_edges(tri: &[u32; 3]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}
