use crate::overlay::OverlayLayer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One row of the status readout shown in the demo's side panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub diagram: String,
    pub colors: usize,
    pub containers: usize,
    pub notes: usize,
}

/// Owned map from open diagram to its attached overlay. Replaces the
/// process-wide static registries of a typical plugin host: one registry
/// per session, registered on open, unregistered on close, so independent
/// sessions (and tests) never share state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    views: HashMap<PathBuf, OverlayLayer>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an overlay for the diagram, replacing any previous one.
    pub fn register(&mut self, diagram_path: &Path, overlay: OverlayLayer) {
        debug!(diagram = %diagram_path.display(), "overlay registered");
        self.views.insert(diagram_path.to_path_buf(), overlay);
    }

    /// Drops the diagram's overlay on close so no stale refresh can reach a
    /// disposed view.
    pub fn unregister(&mut self, diagram_path: &Path) -> Option<OverlayLayer> {
        debug!(diagram = %diagram_path.display(), "overlay unregistered");
        self.views.remove(diagram_path)
    }

    pub fn overlay(&self, diagram_path: &Path) -> Option<&OverlayLayer> {
        self.views.get(diagram_path)
    }

    pub fn overlay_mut(&mut self, diagram_path: &Path) -> Option<&mut OverlayLayer> {
        self.views.get_mut(diagram_path)
    }

    pub fn is_attached(&self, diagram_path: &Path) -> bool {
        self.views.contains_key(diagram_path)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn statuses(&self) -> Vec<SessionStatus> {
        let mut statuses: Vec<SessionStatus> = self
            .views
            .iter()
            .map(|(path, overlay)| {
                let annotations = overlay.annotations();
                SessionStatus {
                    diagram: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                    colors: annotations.tables.len(),
                    containers: annotations.containers.len(),
                    notes: annotations.notes.len(),
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.diagram.cmp(&b.diagram));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagramAnnotations, StickyNote, DEFAULT_NOTE_COLOR};

    #[test]
    fn register_lookup_unregister_lifecycle() {
        let mut registry = SessionRegistry::new();
        let path = Path::new("/work/sales.uml");
        assert!(!registry.is_attached(path));

        registry.register(path, OverlayLayer::new(DiagramAnnotations::new()));
        assert!(registry.is_attached(path));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(path).is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister(path).is_none());
    }

    #[test]
    fn statuses_count_annotation_kinds() {
        let mut annotations = DiagramAnnotations::new();
        annotations.set_table_color("t1", "#FF0000");
        annotations.add_note(StickyNote::new("todo", DEFAULT_NOTE_COLOR));

        let mut registry = SessionRegistry::new();
        registry.register(Path::new("/work/sales.uml"), OverlayLayer::new(annotations));

        let statuses = registry.statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].diagram, "sales.uml");
        assert_eq!(statuses[0].colors, 1);
        assert_eq!(statuses[0].containers, 0);
        assert_eq!(statuses[0].notes, 1);
    }
}
