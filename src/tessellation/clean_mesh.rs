use std::collections::HashMap;

use crate::math::{Point3, TOLERANCE};

use super::TriangleMesh;

/// Merges coincident vertices and drops the cells that collapse as a result.
///
/// Vertices closer than `tolerance` are welded into the lowest-indexed one.
/// Triangles that end up referencing the same vertex twice are removed, and
/// vertices no longer referenced by any triangle are discarded. Surviving
/// vertices keep their relative order.
pub struct CleanMesh<'a> {
    mesh: &'a TriangleMesh,
    tolerance: f64,
}

impl<'a> CleanMesh<'a> {
    /// Creates a new `CleanMesh` operation.
    #[must_use]
    pub fn new(mesh: &'a TriangleMesh, tolerance: f64) -> Self {
        Self { mesh, tolerance }
    }

    /// Executes the cleaning pass, returning a new mesh.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> TriangleMesh {
        let remap = self.weld_map();

        let indices: Vec<[u32; 3]> = self
            .mesh
            .indices
            .iter()
            .map(|t| [remap[t[0] as usize], remap[t[1] as usize], remap[t[2] as usize]])
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
            .collect();

        let mut used = vec![false; self.mesh.vertices.len()];
        for t in &indices {
            for &i in t {
                used[i as usize] = true;
            }
        }

        let mut compacted = vec![u32::MAX; self.mesh.vertices.len()];
        let mut vertices = Vec::new();
        for (i, p) in self.mesh.vertices.iter().enumerate() {
            if used[i] {
                compacted[i] = vertices.len() as u32;
                vertices.push(*p);
            }
        }

        TriangleMesh {
            vertices,
            indices: indices
                .into_iter()
                .map(|t| [compacted[t[0] as usize], compacted[t[1] as usize], compacted[t[2] as usize]])
                .collect(),
        }
    }

    /// Maps each vertex to its canonical representative using a spatial hash.
    #[allow(clippy::cast_possible_truncation)]
    fn weld_map(&self) -> Vec<u32> {
        let vertices = &self.mesh.vertices;
        let cell_size = self.tolerance.max(TOLERANCE) * 2.0;

        let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        for (idx, p) in vertices.iter().enumerate() {
            grid.entry(cell_of(p, cell_size)).or_default().push(idx as u32);
        }

        let mut remap: Vec<u32> = (0..vertices.len() as u32).collect();
        for (idx, p) in vertices.iter().enumerate() {
            let idx = idx as u32;
            if remap[idx as usize] != idx {
                continue;
            }
            let (cx, cy, cz) = cell_of(p, cell_size);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        // Far-away points saturate to the edge cells.
                        let neighbor = (cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz));
                        let Some(candidates) = grid.get(&neighbor) else {
                            continue;
                        };
                        for &other in candidates {
                            if other <= idx || remap[other as usize] != other {
                                continue;
                            }
                            if (p - vertices[other as usize]).norm() <= self.tolerance {
                                remap[other as usize] = idx;
                            }
                        }
                    }
                }
            }
        }
        remap
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(p: &Point3, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}
