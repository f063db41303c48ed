pub mod model_node;
pub mod selection;
pub mod splines_node;
pub mod storage;

pub use model_node::ModelNode;
pub use selection::{PlaceRegistry, PlaceableKind, SelectionNode};
pub use splines_node::SplinesNode;
pub use storage::SplinesStorage;

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

use slotmap::SlotMap;

use crate::error::SceneError;

slotmap::new_key_type! {
    /// Unique identifier for a node in the scene.
    pub struct NodeId;
}

/// A node stored in the scene.
#[derive(Debug, Clone)]
pub enum Node {
    /// A collection of closed spline markups.
    Splines(SplinesNode),
    /// A mesh-bearing model.
    Model(ModelNode),
}

/// The kind of a [`Node`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Splines,
    Model,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Splines => "splines",
            NodeKind::Model => "model",
        }
    }
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Splines(_) => NodeKind::Splines,
            Node::Model(_) => NodeKind::Model,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Node::Splines(s) => s.name(),
            Node::Model(m) => m.name(),
        }
    }
}

impl From<SplinesNode> for Node {
    fn from(node: SplinesNode) -> Self {
        Node::Splines(node)
    }
}

impl From<ModelNode> for Node {
    fn from(node: ModelNode) -> Self {
        Node::Model(node)
    }
}

/// Change notifications emitted by the scene.
#[derive(Debug)]
pub enum SceneEvent {
    /// A node was added.
    NodeAdded(NodeId),
    /// A node was removed; the event carries what was removed.
    NodeRemoved { id: NodeId, node: Node },
    /// A node's content changed through [`Scene::modify_splines`].
    NodeModified(NodeId),
    /// The outermost batch bracket closed.
    BatchEnded,
}

/// In-memory document store holding markup collections and model nodes.
///
/// Nodes live in a slot map keyed by generational [`NodeId`]s, so an id
/// kept after its node was removed simply stops resolving. Structural
/// changes queue [`SceneEvent`]s that the host drains with
/// [`Scene::next_event`]; a live [`BatchGuard`] holds them back until the
/// batch closes.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    pending: VecDeque<SceneEvent>,
    batch_depth: usize,
}

impl Scene {
    /// Creates a new, empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    // --- Node lifecycle ---

    /// Inserts a node and returns its ID.
    pub fn add_node(&mut self, node: impl Into<Node>) -> NodeId {
        let id = self.nodes.insert(node.into());
        self.push_event(SceneEvent::NodeAdded(id));
        id
    }

    /// Creates an empty model node with the given name.
    pub fn add_model(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(ModelNode::new(name))
    }

    /// Removes a node. Returns `false` if it was not in the scene.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        match self.nodes.remove(id) {
            Some(node) => {
                self.push_event(SceneEvent::NodeRemoved { id, node });
                true
            }
            None => false,
        }
    }

    // --- Lookup ---

    /// Returns a reference to a node, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] if the id does not resolve.
    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{id:?}")))
    }

    /// Returns the markup collection behind `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not resolve or names another kind.
    pub fn splines(&self, id: NodeId) -> Result<&SplinesNode, SceneError> {
        match self.node(id)? {
            Node::Splines(s) => Ok(s),
            other => Err(wrong_kind(other, NodeKind::Splines)),
        }
    }

    /// Mutable access to a markup collection. Does not notify.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not resolve or names another kind.
    pub fn splines_mut(&mut self, id: NodeId) -> Result<&mut SplinesNode, SceneError> {
        match self
            .nodes
            .get_mut(id)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{id:?}")))?
        {
            Node::Splines(s) => Ok(s),
            other => Err(wrong_kind(other, NodeKind::Splines)),
        }
    }

    /// Edits a markup collection and queues a [`SceneEvent::NodeModified`].
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not resolve or names another kind.
    pub fn modify_splines<R>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut SplinesNode) -> R,
    ) -> Result<R, SceneError> {
        let result = edit(self.splines_mut(id)?);
        self.push_event(SceneEvent::NodeModified(id));
        Ok(result)
    }

    /// Returns the model behind `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not resolve or names another kind.
    pub fn model(&self, id: NodeId) -> Result<&ModelNode, SceneError> {
        match self.node(id)? {
            Node::Model(m) => Ok(m),
            other => Err(wrong_kind(other, NodeKind::Model)),
        }
    }

    /// Mutable access to a model. Does not notify.
    ///
    /// # Errors
    ///
    /// Returns an error if the id does not resolve or names another kind.
    pub fn model_mut(&mut self, id: NodeId) -> Result<&mut ModelNode, SceneError> {
        match self
            .nodes
            .get_mut(id)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{id:?}")))?
        {
            Node::Model(m) => Ok(m),
            other => Err(wrong_kind(other, NodeKind::Model)),
        }
    }

    /// IDs of all nodes of the given kind, in slot order.
    #[must_use]
    pub fn ids_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.kind() == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Finds the first node with the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name() == name)
            .map(|(id, _)| id)
    }

    // --- Notifications ---

    /// Opens a batch bracket. Notifications are held until the returned
    /// guard, and every guard opened inside it, is dropped.
    pub fn start_batch(&mut self) -> BatchGuard<'_> {
        self.batch_depth += 1;
        BatchGuard { scene: self }
    }

    #[must_use]
    pub fn is_batch_processing(&self) -> bool {
        self.batch_depth > 0
    }

    /// Pops the next notification, or `None` while a batch is open.
    pub fn next_event(&mut self) -> Option<SceneEvent> {
        if self.is_batch_processing() {
            return None;
        }
        self.pending.pop_front()
    }

    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.pending.len()
    }

    fn push_event(&mut self, event: SceneEvent) {
        if let SceneEvent::NodeModified(id) = event {
            let queued = self
                .pending
                .iter()
                .any(|e| matches!(e, SceneEvent::NodeModified(other) if *other == id));
            if queued {
                return;
            }
        }
        self.pending.push_back(event);
    }
}

fn wrong_kind(node: &Node, expected: NodeKind) -> SceneError {
    SceneError::WrongKind {
        name: node.name().to_owned(),
        expected: expected.as_str(),
    }
}

/// Scoped batch bracket returned by [`Scene::start_batch`].
///
/// Dereferences to the scene so work can continue through the guard.
/// Dropping the outermost guard queues [`SceneEvent::BatchEnded`] and
/// releases the held notifications.
#[derive(Debug)]
pub struct BatchGuard<'a> {
    scene: &'a mut Scene,
}

impl Deref for BatchGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for BatchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.scene.batch_depth -= 1;
        if self.scene.batch_depth == 0 {
            self.scene.push_event(SceneEvent::BatchEnded);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_emit_events() {
        let mut scene = Scene::new();
        let id = scene.add_node(SplinesNode::new("S"));
        assert!(matches!(scene.next_event(), Some(SceneEvent::NodeAdded(x)) if x == id));

        assert!(scene.remove_node(id));
        match scene.next_event() {
            Some(SceneEvent::NodeRemoved { id: removed, node }) => {
                assert_eq!(removed, id);
                assert_eq!(node.name(), "S");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!scene.remove_node(id));
        assert!(scene.next_event().is_none());
    }

    #[test]
    fn stale_id_does_not_resolve() {
        let mut scene = Scene::new();
        let id = scene.add_model("M");
        scene.remove_node(id);
        let again = scene.add_model("M");
        assert_ne!(id, again);
        assert!(matches!(scene.model(id), Err(SceneError::NodeNotFound(_))));
        assert!(scene.model(again).is_ok());
    }

    #[test]
    fn lookup_checks_kind() {
        let mut scene = Scene::new();
        let model = scene.add_model("M");
        assert!(matches!(
            scene.splines(model),
            Err(SceneError::WrongKind { expected: "splines", .. })
        ));
        assert!(scene.splines_mut(model).is_err());
        assert_eq!(scene.ids_of_kind(NodeKind::Model), vec![model]);
        assert!(scene.ids_of_kind(NodeKind::Splines).is_empty());
        assert_eq!(scene.find_by_name("M"), Some(model));
    }

    #[test]
    fn batch_holds_notifications_until_outermost_guard_drops() {
        let mut scene = Scene::new();
        {
            let mut outer = scene.start_batch();
            outer.add_model("A");
            {
                let mut inner = outer.start_batch();
                inner.add_model("B");
                assert!(inner.next_event().is_none());
            }
            assert!(outer.is_batch_processing());
            assert!(outer.next_event().is_none());
        }
        assert!(!scene.is_batch_processing());
        assert!(matches!(scene.next_event(), Some(SceneEvent::NodeAdded(_))));
        assert!(matches!(scene.next_event(), Some(SceneEvent::NodeAdded(_))));
        assert!(matches!(scene.next_event(), Some(SceneEvent::BatchEnded)));
        assert!(scene.next_event().is_none());
    }

    #[test]
    fn repeated_modifications_are_coalesced() {
        let mut scene = Scene::new();
        let id = scene.add_node(SplinesNode::new("S"));
        scene.next_event();
        for _ in 0..3 {
            scene
                .modify_splines(id, |s| s.add_markup(Vec::new()))
                .unwrap();
        }
        assert_eq!(scene.pending_event_count(), 1);
        assert_eq!(scene.splines(id).unwrap().markup_count(), 3);
    }

    #[test]
    fn silent_access_does_not_notify() {
        let mut scene = Scene::new();
        let id = scene.add_node(SplinesNode::new("S"));
        scene.next_event();
        scene.splines_mut(id).unwrap().add_markup(Vec::new());
        assert!(scene.next_event().is_none());
    }
}
