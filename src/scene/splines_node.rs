use std::path::{Path, PathBuf};

use crate::geometry::Contour;
use crate::logic::SyncKey;
use crate::math::polygon_3d::centroid;
use crate::math::Point3;

use super::NodeId;

/// One closed polygon of a [`SplinesNode`].
#[derive(Debug, Clone, Default)]
struct Markup {
    points: Vec<Point3>,
    associated_model: Option<NodeId>,
    /// Bumped by every geometry edit.
    revision: u64,
}

/// A collection of closed spline markups.
///
/// Markups are addressed by index. Each may be associated with one model
/// node; the association is written only by the synchronization logic,
/// which proves it with a [`SyncKey`].
#[derive(Debug, Clone, Default)]
pub struct SplinesNode {
    name: String,
    markups: Vec<Markup>,
    storage_path: Option<PathBuf>,
    orphaned_models: Vec<NodeId>,
}

impl SplinesNode {
    /// Creates an empty collection.
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

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// File the collection was loaded from, if any.
    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn set_storage_path(&mut self, path: impl Into<PathBuf>) {
        self.storage_path = Some(path.into());
    }

    // --- Markups ---

    #[must_use]
    pub fn markup_count(&self) -> usize {
        self.markups.len()
    }

    #[must_use]
    pub fn markup_exists(&self, index: usize) -> bool {
        index < self.markups.len()
    }

    /// Appends a markup and returns its index.
    pub fn add_markup(&mut self, points: Vec<Point3>) -> usize {
        self.markups.push(Markup {
            points,
            ..Markup::default()
        });
        self.markups.len() - 1
    }

    /// Removes a markup, shifting later indices down.
    ///
    /// A model associated with the removed markup is remembered as orphaned
    /// until the synchronization logic destroys it.
    pub fn remove_markup(&mut self, index: usize) -> bool {
        if !self.markup_exists(index) {
            return false;
        }
        let removed = self.markups.remove(index);
        if let Some(model) = removed.associated_model {
            self.orphaned_models.push(model);
        }
        true
    }

    // --- Points ---

    /// Number of points in markup `index`; zero if it does not exist.
    #[must_use]
    pub fn point_count(&self, index: usize) -> usize {
        self.markups.get(index).map_or(0, |m| m.points.len())
    }

    /// The points of markup `index`; empty if it does not exist.
    #[must_use]
    pub fn points(&self, index: usize) -> &[Point3] {
        self.markups
            .get(index)
            .map(|m| m.points.as_slice())
            .unwrap_or(&[])
    }

    /// World position of point `point` of markup `index`.
    #[must_use]
    pub fn point_world(&self, index: usize, point: usize) -> Option<Point3> {
        self.markups.get(index)?.points.get(point).copied()
    }

    pub fn add_point(&mut self, index: usize, point: Point3) -> bool {
        self.edit_points(index, |points| {
            points.push(point);
            true
        })
        .unwrap_or(false)
    }

    pub fn remove_point(&mut self, index: usize, point: usize) -> Option<Point3> {
        if point >= self.point_count(index) {
            return None;
        }
        self.edit_points(index, |points| points.remove(point))
    }

    pub fn set_point(&mut self, index: usize, point: usize, position: Point3) -> bool {
        if point >= self.point_count(index) {
            return false;
        }
        self.edit_points(index, |points| points[point] = position)
            .is_some()
    }

    pub fn set_points(&mut self, index: usize, points: Vec<Point3>) -> bool {
        self.edit_points(index, |current| {
            *current = points;
            true
        })
        .unwrap_or(false)
    }

    fn edit_points<R>(&mut self, index: usize, edit: impl FnOnce(&mut Vec<Point3>) -> R) -> Option<R> {
        let markup = self.markups.get_mut(index)?;
        markup.revision += 1;
        Some(edit(&mut markup.points))
    }

    /// Geometry revision of markup `index`, bumped on every point edit.
    #[must_use]
    pub fn revision(&self, index: usize) -> Option<u64> {
        self.markups.get(index).map(|m| m.revision)
    }

    /// The closed contour traced by markup `index`.
    #[must_use]
    pub fn contour(&self, index: usize) -> Option<Contour> {
        self.markups
            .get(index)
            .map(|m| Contour::new(m.points.clone()))
    }

    /// Mean position of the points of markup `index`.
    ///
    /// Returns `None` if the markup does not exist or has no points.
    #[must_use]
    pub fn centroid(&self, index: usize) -> Option<Point3> {
        centroid(self.markups.get(index)?.points.as_slice())
    }

    // --- Associations ---

    /// ID of the model derived from markup `index`, if any.
    #[must_use]
    pub fn associated_model(&self, index: usize) -> Option<NodeId> {
        self.markups.get(index)?.associated_model
    }

    /// Sets or clears the model associated with markup `index`.
    pub fn set_associated_model(&mut self, index: usize, model: Option<NodeId>, _key: &SyncKey) -> bool {
        let Some(markup) = self.markups.get_mut(index) else {
            return false;
        };
        markup.associated_model = model;
        true
    }

    /// Models whose markups were removed and that still await destruction.
    #[must_use]
    pub fn orphaned_models(&self) -> &[NodeId] {
        &self.orphaned_models
    }

    pub fn take_orphaned_models(&mut self, _key: &SyncKey) -> Vec<NodeId> {
        std::mem::take(&mut self.orphaned_models)
    }

    /// Every model ID this collection refers to, live or orphaned.
    pub fn referenced_models(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.markups
            .iter()
            .filter_map(|m| m.associated_model)
            .chain(self.orphaned_models.iter().copied())
    }
}
