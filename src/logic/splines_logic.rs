use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, error, info, trace, warn};

use crate::error::{LoadError, Result};
use crate::geometry::Contour;
use crate::operations::shaping::{MakeSlab, SlabParams};
use crate::scene::{
    BatchGuard, Node, NodeId, NodeKind, PlaceRegistry, PlaceableKind, Scene, SceneEvent,
    SplinesNode, SplinesStorage,
};
use crate::tessellation::TriangleMesh;

/// Proof of write access to the fields owned by [`SplinesLogic`]: markup
/// associations and model geometry.
///
/// Cannot be constructed outside this module.
#[derive(Debug)]
pub struct SyncKey {
    _private: (),
}

const KEY: SyncKey = SyncKey { _private: () };

/// Work done by one or more reconcile passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Models created.
    pub created: usize,
    /// Models destroyed.
    pub removed: usize,
    /// Model meshes regenerated.
    pub rebuilt: usize,
}

impl ReconcileSummary {
    /// Returns `true` if the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    fn absorb(&mut self, other: ReconcileSummary) {
        self.created += other.created;
        self.removed += other.removed;
        self.rebuilt += other.rebuilt;
    }
}

/// Scene notifications that concern markup collections.
#[derive(Debug)]
pub enum SplinesEvent {
    /// A collection was added to the scene.
    CollectionAttached(NodeId),
    /// A collection was removed; it is no longer in the scene.
    CollectionDetached { id: NodeId, node: SplinesNode },
    /// Points or properties of a collection's markups changed.
    ContentsChanged(NodeId),
}

impl SplinesEvent {
    /// Narrows a scene notification to one about a markup collection.
    ///
    /// Returns `None` for every other node kind and for batch markers.
    #[must_use]
    pub fn from_scene(event: SceneEvent, scene: &Scene) -> Option<Self> {
        match event {
            SceneEvent::NodeAdded(id) => scene
                .splines(id)
                .is_ok()
                .then_some(SplinesEvent::CollectionAttached(id)),
            SceneEvent::NodeRemoved {
                id,
                node: Node::Splines(node),
            } => Some(SplinesEvent::CollectionDetached { id, node }),
            SceneEvent::NodeModified(id) => scene
                .splines(id)
                .is_ok()
                .then_some(SplinesEvent::ContentsChanged(id)),
            SceneEvent::NodeRemoved { .. } | SceneEvent::BatchEnded => None,
        }
    }
}

/// Maintains the slab model of every markup in the observed collections.
///
/// For every markup `i` of every observed collection, after each handled
/// event:
///
/// `point_count(i) > 2` ⇔ markup `i` is associated with a live model.
///
/// This is the only writer of markup associations and model geometry; both
/// setters demand a [`SyncKey`], which only this module can create.
#[derive(Debug, Default)]
pub struct SplinesLogic {
    params: SlabParams,
    observed: HashSet<NodeId>,
    attached: bool,
    placeable_registered: bool,
}

impl SplinesLogic {
    /// Creates a detached logic with default slab parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slab parameters used for every generated model.
    #[must_use]
    pub fn with_params(mut self, params: SlabParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn params(&self) -> &SlabParams {
        &self.params
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns `true` if content changes of `id` are being followed.
    #[must_use]
    pub fn is_observing(&self, id: NodeId) -> bool {
        self.observed.contains(&id)
    }

    /// Starts serving `scene`.
    ///
    /// Registers the spline tool with `selection` once per attachment, then
    /// observes and reconciles every collection already in the scene.
    pub fn attach(
        &mut self,
        scene: &mut Scene,
        selection: Option<&mut dyn PlaceRegistry>,
    ) -> ReconcileSummary {
        self.attached = true;

        if let Some(selection) = selection {
            if !self.placeable_registered {
                // The bracket makes tool bars refresh once the kind is in.
                let _batch = scene.start_batch();
                selection.add_placeable_kind(PlaceableKind::splines());
                self.placeable_registered = true;
            }
        }

        let mut summary = ReconcileSummary::default();
        for id in scene.ids_of_kind(NodeKind::Splines) {
            summary.absorb(self.dispatch(scene, SplinesEvent::CollectionAttached(id)));
        }
        summary
    }

    /// Stops serving the current scene. Models already created stay.
    pub fn detach(&mut self) {
        self.attached = false;
        self.placeable_registered = false;
        self.observed.clear();
    }

    /// Drains the scene's pending notifications, handling each in order.
    pub fn process_pending(&mut self, scene: &mut Scene) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        while let Some(event) = scene.next_event() {
            summary.absorb(self.process_event(scene, event));
        }
        summary
    }

    /// Handles one scene notification; unrelated notifications are ignored.
    pub fn process_event(&mut self, scene: &mut Scene, event: SceneEvent) -> ReconcileSummary {
        match SplinesEvent::from_scene(event, scene) {
            Some(event) => self.dispatch(scene, event),
            None => ReconcileSummary::default(),
        }
    }

    /// Handles one markup collection event.
    pub fn dispatch(&mut self, scene: &mut Scene, event: SplinesEvent) -> ReconcileSummary {
        if !self.attached {
            trace!(?event, "logic detached, ignoring event");
            return ReconcileSummary::default();
        }

        match event {
            SplinesEvent::CollectionAttached(id) => {
                self.observed.insert(id);
                self.reconcile_or_skip(scene, id)
            }
            SplinesEvent::ContentsChanged(id) => {
                if !self.observed.contains(&id) {
                    trace!(?id, "collection not observed, ignoring change");
                    return ReconcileSummary::default();
                }
                self.reconcile_or_skip(scene, id)
            }
            SplinesEvent::CollectionDetached { id, node } => {
                self.observed.remove(&id);
                remove_models_of(scene, &node)
            }
        }
    }

    fn reconcile_or_skip(&self, scene: &mut Scene, id: NodeId) -> ReconcileSummary {
        self.reconcile(scene, id).unwrap_or_else(|e| {
            debug!(?id, error = %e, "collection vanished before reconcile");
            ReconcileSummary::default()
        })
    }

    /// Brings the models of collection `id` in line with its markups.
    ///
    /// For every markup in index order: creates a model named
    /// `<collection>_Model_<i>` if the markup has more than two points and no
    /// live model; destroys the model if it has two or fewer. Models of
    /// removed markups are destroyed, and the mesh of every eligible markup
    /// whose points changed since its model was built is regenerated.
    ///
    /// A second pass over an unchanged collection does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a markup collection in `scene`.
    pub fn reconcile(&self, scene: &mut Scene, id: NodeId) -> Result<ReconcileSummary> {
        let mut scene = scene.start_batch();
        let mut summary = ReconcileSummary::default();

        for model in scene.splines_mut(id)?.take_orphaned_models(&KEY) {
            if scene.remove_node(model) {
                info!(?model, "removed model of deleted markup");
                summary.removed += 1;
            }
        }

        let (name, count) = {
            let splines = scene.splines(id)?;
            (splines.name().to_owned(), splines.markup_count())
        };

        for i in 0..count {
            let splines = scene.splines(id)?;
            let association = splines.associated_model(i);
            let eligible = splines.point_count(i) > 2;
            let live = association.filter(|model| scene.model(*model).is_ok());

            let model = match (eligible, live) {
                (true, Some(model)) => model,
                (true, None) => {
                    let model_name = format!("{name}_Model_{i}");
                    let model = scene.add_model(model_name.as_str());
                    scene
                        .splines_mut(id)?
                        .set_associated_model(i, Some(model), &KEY);
                    info!(collection = %name, markup = i, model = %model_name, "created model");
                    summary.created += 1;
                    model
                }
                (false, Some(model)) => {
                    scene.remove_node(model);
                    scene.splines_mut(id)?.set_associated_model(i, None, &KEY);
                    info!(collection = %name, markup = i, "removed model");
                    summary.removed += 1;
                    continue;
                }
                (false, None) => {
                    if association.is_some() {
                        scene.splines_mut(id)?.set_associated_model(i, None, &KEY);
                        debug!(collection = %name, markup = i, "cleared dangling association");
                    }
                    continue;
                }
            };

            if self.update_geometry(&mut scene, id, i, model)? {
                summary.rebuilt += 1;
            }
        }

        Ok(summary)
    }

    /// Regenerates the mesh of `model` from markup `index` if it is stale.
    fn update_geometry(
        &self,
        scene: &mut BatchGuard<'_>,
        id: NodeId,
        index: usize,
        model: NodeId,
    ) -> Result<bool> {
        let splines = scene.splines(id)?;
        let Some(revision) = splines.revision(index) else {
            return Ok(false);
        };
        if scene.model(model)?.source_revision() == Some(revision) {
            return Ok(false);
        }

        let contour = splines.contour(index).unwrap_or_default();
        let mesh = build_slab(contour, self.params).unwrap_or_else(|e| {
            warn!(collection = %splines.name(), markup = index, error = %e, "cannot build slab");
            None
        });
        debug!(
            ?model,
            revision,
            triangles = mesh.as_ref().map_or(0, TriangleMesh::triangle_count),
            "rebuilt slab"
        );
        scene.model_mut(model)?.set_mesh(mesh, revision, &KEY);
        Ok(true)
    }

    /// Loads a markup collection named `name` from `path` and adds it to the
    /// scene.
    ///
    /// The node is filled before it is added, so a failed read leaves the scene
    /// untouched. Models for the loaded markups are created when the logic
    /// handles the resulting [`SceneEvent::NodeAdded`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingFileName`] for an empty path, or the storage's
    /// [`LoadError::Read`] if reading fails.
    pub fn load_splines(
        scene: &mut Scene,
        storage: &dyn SplinesStorage,
        path: &Path,
        name: &str,
    ) -> Result<NodeId> {
        if path.as_os_str().is_empty() {
            error!("load splines: no file name given, cannot load");
            return Err(LoadError::MissingFileName.into());
        }

        let mut node = SplinesNode::new(name);
        node.set_storage_path(path);
        if let Err(e) = storage.read(path, &mut node) {
            error!(path = %path.display(), error = %e, "load splines failed");
            return Err(e.into());
        }

        let markups = node.markup_count();
        let mut scene = scene.start_batch();
        let id = scene.add_node(node);
        info!(path = %path.display(), markups, "loaded splines");
        Ok(id)
    }
}

/// Builds the slab of a markup, using the contour's own plane normal.
fn build_slab(contour: Contour, params: SlabParams) -> Result<Option<TriangleMesh>> {
    let normal = contour.plane_normal()?;
    MakeSlab::with_params(contour, normal, params).execute()
}

/// Destroys every model still referenced by a removed collection.
fn remove_models_of(scene: &mut Scene, node: &SplinesNode) -> ReconcileSummary {
    let mut scene = scene.start_batch();
    let mut summary = ReconcileSummary::default();
    for model in node.referenced_models() {
        if scene.model(model).is_ok() && scene.remove_node(model) {
            summary.removed += 1;
        }
    }
    info!(collection = %node.name(), removed = summary.removed, "collection removed");
    summary
}
