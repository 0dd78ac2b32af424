use crate::model::DiagramAnnotations;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SIDECAR_SUFFIX: &str = "_annotations.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Non-blocking notification sink. The demo routes these to toasts; tests
/// use [`NullNotifier`].
pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str);
}

pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}

/// Derives the side-file path for a diagram: extension stripped, fixed
/// suffix appended, same directory.
pub fn sidecar_path(diagram_path: &Path) -> PathBuf {
    let stem = diagram_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    diagram_path.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"))
}

/// Load/save/cache service for annotation side-files. Every failure path
/// resolves to a safe value (empty aggregate on read, aborted write on
/// save) plus a notification; callers never see an error.
pub struct AnnotationStore {
    cache: HashMap<PathBuf, DiagramAnnotations>,
    notifier: Box<dyn Notifier>,
}

impl AnnotationStore {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            cache: HashMap::new(),
            notifier,
        }
    }

    /// Cached aggregate for the diagram, reading the side-file on a miss.
    /// A missing side-file means "no annotations yet"; an unreadable or
    /// malformed one degrades the same way, with a warning surfaced.
    pub fn load(&mut self, diagram_path: &Path) -> DiagramAnnotations {
        let sidecar = sidecar_path(diagram_path);
        if let Some(cached) = self.cache.get(&sidecar) {
            return cached.clone();
        }

        let annotations = match read_annotations(&sidecar) {
            Ok(annotations) => annotations,
            Err(err) => {
                warn!(sidecar = %sidecar.display(), error = %err, "failed to load annotations");
                self.notifier
                    .notify(Severity::Warning, "Failed to load diagram annotations");
                DiagramAnnotations::new()
            }
        };
        self.cache.insert(sidecar, annotations.clone());
        annotations
    }

    /// Writes the side-file, or deletes it when the aggregate is empty so
    /// no empty annotation files accumulate next to diagrams.
    pub fn save(&mut self, diagram_path: &Path, annotations: &DiagramAnnotations) {
        let sidecar = sidecar_path(diagram_path);

        if annotations.is_empty() {
            if sidecar.exists() {
                if let Err(err) = fs::remove_file(&sidecar) {
                    warn!(sidecar = %sidecar.display(), error = %err, "failed to delete empty side-file");
                    self.notifier
                        .notify(Severity::Error, "Failed to save diagram annotations");
                    return;
                }
            }
            self.cache.remove(&sidecar);
            return;
        }

        match write_annotations(&sidecar, annotations) {
            Ok(()) => {
                info!(sidecar = %sidecar.display(), "saved annotations");
                self.cache.insert(sidecar, annotations.clone());
            }
            Err(err) => {
                warn!(sidecar = %sidecar.display(), error = %err, "failed to save annotations");
                self.notifier
                    .notify(Severity::Error, "Failed to save diagram annotations");
            }
        }
    }

    /// Writes the current aggregate for `diagram_path` to an arbitrary
    /// target, bypassing the cache lifecycle.
    pub fn export(&mut self, diagram_path: &Path, target: &Path) {
        let annotations = self.load(diagram_path);
        match write_annotations(target, &annotations) {
            Ok(()) => self
                .notifier
                .notify(Severity::Info, "Annotations exported successfully"),
            Err(err) => {
                warn!(target = %target.display(), error = %err, "failed to export annotations");
                self.notifier
                    .notify(Severity::Error, "Failed to export annotations");
            }
        }
    }

    /// Reads an aggregate from an arbitrary source, independent of the
    /// cache. Failures produce an empty aggregate.
    pub fn import(&mut self, source: &Path) -> DiagramAnnotations {
        if !source.exists() {
            warn!(source = %source.display(), "import source does not exist");
            self.notifier
                .notify(Severity::Error, "Failed to import annotations");
            return DiagramAnnotations::new();
        }
        match read_annotations(source) {
            Ok(annotations) => {
                self.notifier
                    .notify(Severity::Info, "Annotations imported successfully");
                annotations
            }
            Err(err) => {
                warn!(source = %source.display(), error = %err, "failed to import annotations");
                self.notifier
                    .notify(Severity::Error, "Failed to import annotations");
                DiagramAnnotations::new()
            }
        }
    }

    /// Drops the cached entry so the next load re-reads disk. Used when the
    /// diagram file changed outside the editor or was closed.
    pub fn invalidate(&mut self, diagram_path: &Path) {
        let sidecar = sidecar_path(diagram_path);
        if self.cache.remove(&sidecar).is_some() {
            debug!(sidecar = %sidecar.display(), "evicted cached annotations");
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

fn read_annotations(path: &Path) -> Result<DiagramAnnotations> {
    if !path.exists() {
        return Ok(DiagramAnnotations::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("read annotation file {}", path.display()))?;
    let annotations = serde_json::from_str(&json)
        .with_context(|| format!("parse annotation file {}", path.display()))?;
    Ok(annotations)
}

fn write_annotations(path: &Path, annotations: &DiagramAnnotations) -> Result<()> {
    let json = serde_json::to_string_pretty(annotations).context("serialize annotations")?;
    fs::write(path, json).with_context(|| format!("write annotation file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_strips_extension_and_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/work/db/sales.uml")),
            Path::new("/work/db/sales_annotations.json")
        );
        assert_eq!(
            sidecar_path(Path::new("/work/db/sales.schema.uml")),
            Path::new("/work/db/sales.schema_annotations.json")
        );
        // No extension: suffix still lands after the name.
        assert_eq!(
            sidecar_path(Path::new("/work/db/sales")),
            Path::new("/work/db/sales_annotations.json")
        );
    }
}
