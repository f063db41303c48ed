use crate::logic::SyncKey;
use crate::tessellation::TriangleMesh;

/// A mesh-bearing node derived from a markup.
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    name: String,
    mesh: Option<TriangleMesh>,
    /// Markup revision the current mesh was built from.
    source_revision: Option<u64>,
}

impl ModelNode {
    /// Creates a model without geometry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&TriangleMesh> {
        self.mesh.as_ref()
    }

    #[must_use]
    pub fn source_revision(&self) -> Option<u64> {
        self.source_revision
    }

    /// Replaces the geometry and records which markup revision produced it.
    pub fn set_mesh(&mut self, mesh: Option<TriangleMesh>, revision: u64, _key: &SyncKey) {
        self.mesh = mesh;
        self.source_revision = Some(revision);
    }
}
