/// A node kind the user can place interactively, as shown in the tool bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceableKind {
    pub class_name: String,
    pub icon: String,
    pub label: String,
}

impl PlaceableKind {
    #[must_use]
    pub fn new(
        class_name: impl Into<String>,
        icon: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            icon: icon.into(),
            label: label.into(),
        }
    }

    /// The spline markup tool.
    #[must_use]
    pub fn splines() -> Self {
        Self::new("Splines", ":/Icons/SplinesMouseModePlace.png", "Splines")
    }
}

/// Receives placeable node kinds from the logic that owns them.
pub trait PlaceRegistry {
    /// Registers a kind. Returns `false` if the class was already known.
    fn add_placeable_kind(&mut self, kind: PlaceableKind) -> bool;
}

/// Interaction state shared by the tools: the kinds that can be placed.
#[derive(Debug, Clone, Default)]
pub struct SelectionNode {
    placeable: Vec<PlaceableKind>,
}

impl SelectionNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn placeable_kinds(&self) -> &[PlaceableKind] {
        &self.placeable
    }
}

impl PlaceRegistry for SelectionNode {
    fn add_placeable_kind(&mut self, kind: PlaceableKind) -> bool {
        if self.placeable.iter().any(|k| k.class_name == kind.class_name) {
            return false;
        }
        self.placeable.push(kind);
        true
    }
}
