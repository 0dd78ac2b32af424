use crate::model::DiagramAnnotations;
use crate::session::SessionRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::trace;

/// Refresh requests for the same diagram closer together than this are
/// dropped, not queued. Last-write-wins still holds because the mutation is
/// already applied to the shared aggregate; only the notification is
/// debounced.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// The host side of a refresh: ask the external canvas to repaint itself.
pub trait DiagramHost {
    fn request_repaint(&self, diagram_path: &Path);
}

/// Pushes mutated aggregates to the attached overlay and pokes the host
/// canvas, collapsing bursts of rapid successive updates per diagram.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    last_refresh: HashMap<PathBuf, Instant>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Propagates `annotations` to the diagram's overlay and host. Returns
    /// false when the request was dropped by the debounce window.
    pub fn refresh(
        &mut self,
        diagram_path: &Path,
        annotations: &DiagramAnnotations,
        registry: &mut SessionRegistry,
        host: &dyn DiagramHost,
        now: Instant,
    ) -> bool {
        if let Some(last) = self.last_refresh.get(diagram_path) {
            if now.duration_since(*last) < MIN_REFRESH_INTERVAL {
                trace!(diagram = %diagram_path.display(), "refresh dropped by debounce");
                return false;
            }
        }
        self.last_refresh.insert(diagram_path.to_path_buf(), now);

        if let Some(overlay) = registry.overlay_mut(diagram_path) {
            overlay.set_annotations(annotations.clone());
        }
        host.request_repaint(diagram_path);
        true
    }

    /// Forgets the diagram's refresh history on close.
    pub fn unregister(&mut self, diagram_path: &Path) {
        self.last_refresh.remove(diagram_path);
    }
}
