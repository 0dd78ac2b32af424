use crate::geometry::{Bounds, Point};
use crate::model::{Container, DiagramAnnotations, StickyNote};
use crate::persistence::AnnotationStore;
use std::path::Path;

const DEFAULT_CONTAINER_ORIGIN: Point = Point::new(50, 50);
const DEFAULT_NOTE_ORIGIN: Point = Point::new(100, 100);
const PLACEMENT_GAP: i32 = 20;

/// How an import interacts with annotations already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Replace,
    /// Only fills table keys and container/note ids that are absent;
    /// existing entries always win.
    Merge,
}

pub fn color_table(annotations: &mut DiagramAnnotations, table_id: &str, color: &str) {
    annotations.set_table_color(table_id, color);
}

/// Removes the given tables' colors and pulls them out of every container.
/// An empty selection means "reset everything": all colors cleared and all
/// container member lists emptied (the containers themselves survive).
pub fn reset_colors(annotations: &mut DiagramAnnotations, selection: &[String]) {
    if selection.is_empty() {
        annotations.tables.clear();
        for container in &mut annotations.containers {
            container.clear_tables();
        }
        return;
    }
    for table_id in selection {
        annotations.remove_table_color(table_id);
        for container in &mut annotations.containers {
            container.remove_table(table_id);
        }
    }
}

/// Creates a container at the default origin, or shifted right of the
/// rightmost existing container so new ones don't stack on top of each
/// other. Returns the new container's id.
pub fn create_container(
    annotations: &mut DiagramAnnotations,
    title: &str,
    color: &str,
) -> String {
    let origin = next_origin(
        annotations.containers.iter().map(|c| c.bounds().right()),
        DEFAULT_CONTAINER_ORIGIN,
    );
    let container = Container::new(title, color).with_bounds(Bounds::new(
        origin.x,
        origin.y,
        300,
        200,
    ));
    let id = container.id.clone();
    annotations.add_container(container);
    id
}

/// Moves tables into the container: each is removed from any other
/// container first (the one-container-per-table convention lives here, not
/// in the data layer), then appended. A table without its own color
/// inherits the container's color as an individual entry.
pub fn add_to_container(
    annotations: &mut DiagramAnnotations,
    table_ids: &[String],
    container_id: &str,
) {
    let container_color = match annotations.container(container_id) {
        Some(container) => container.color.clone(),
        None => return,
    };

    for table_id in table_ids {
        for container in &mut annotations.containers {
            container.remove_table(table_id);
        }
        if let Some(container) = annotations.container_mut(container_id) {
            container.add_table(table_id);
        }
        if annotations.table_color(table_id).is_none() {
            annotations.set_table_color(table_id, &container_color);
        }
    }
}

pub fn remove_from_container(annotations: &mut DiagramAnnotations, table_id: &str) {
    for container in &mut annotations.containers {
        container.remove_table(table_id);
    }
}

/// Adds a note at the default origin or right of the rightmost existing
/// note. Returns the new note's id.
pub fn add_note(annotations: &mut DiagramAnnotations, text: &str, color: &str) -> String {
    let origin = next_origin(
        annotations.notes.iter().map(|n| n.bounds().right()),
        DEFAULT_NOTE_ORIGIN,
    );
    let note = StickyNote::new(text, color).at(origin);
    let id = note.id.clone();
    annotations.add_note(note);
    id
}

/// Applies an imported aggregate according to the chosen mode and returns
/// the result to persist.
pub fn import_annotations(
    store: &mut AnnotationStore,
    existing: &DiagramAnnotations,
    source: &Path,
    mode: ImportMode,
) -> DiagramAnnotations {
    let imported = store.import(source);
    match mode {
        ImportMode::Replace => imported,
        ImportMode::Merge => {
            let mut merged = existing.clone();
            merged.merge_missing_from(imported);
            merged
        }
    }
}

fn next_origin(rights: impl Iterator<Item = i32>, default: Point) -> Point {
    match rights.max() {
        Some(max_right) => Point::new(max_right + PLACEMENT_GAP, default.y),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_CONTAINER_COLOR;

    #[test]
    fn second_container_lands_right_of_the_first() {
        let mut ann = DiagramAnnotations::new();
        let first = create_container(&mut ann, "A", DEFAULT_CONTAINER_COLOR);
        let second = create_container(&mut ann, "B", DEFAULT_CONTAINER_COLOR);

        let first_bounds = ann.container(&first).expect("first").bounds();
        let second_bounds = ann.container(&second).expect("second").bounds();
        assert_eq!(first_bounds.position(), Point::new(50, 50));
        assert_eq!(
            second_bounds.position(),
            Point::new(first_bounds.right() + PLACEMENT_GAP, 50)
        );
    }

    #[test]
    fn moving_a_table_between_containers_keeps_it_unique() {
        let mut ann = DiagramAnnotations::new();
        let a = create_container(&mut ann, "A", "#45B7D1");
        let b = create_container(&mut ann, "B", "#2ECC71");
        let tables = vec!["orders".to_string()];

        add_to_container(&mut ann, &tables, &a);
        add_to_container(&mut ann, &tables, &b);

        assert!(!ann.container(&a).expect("a").contains_table("orders"));
        assert!(ann.container(&b).expect("b").contains_table("orders"));
    }

    #[test]
    fn tables_inherit_container_color_only_when_uncolored() {
        let mut ann = DiagramAnnotations::new();
        let a = create_container(&mut ann, "A", "#45B7D1");
        ann.set_table_color("colored", "#FF0000");

        add_to_container(
            &mut ann,
            &["colored".to_string(), "plain".to_string()],
            &a,
        );

        assert_eq!(
            ann.table_color("colored").map(|e| e.color.as_str()),
            Some("#FF0000")
        );
        assert_eq!(
            ann.table_color("plain").map(|e| e.color.as_str()),
            Some("#45B7D1")
        );
    }

    #[test]
    fn reset_with_selection_touches_only_those_tables() {
        let mut ann = DiagramAnnotations::new();
        let a = create_container(&mut ann, "A", "#45B7D1");
        add_to_container(
            &mut ann,
            &["t1".to_string(), "t2".to_string()],
            &a,
        );

        reset_colors(&mut ann, &["t1".to_string()]);
        assert!(ann.table_color("t1").is_none());
        assert!(ann.table_color("t2").is_some());
        let container = ann.container(&a).expect("container");
        assert!(!container.contains_table("t1"));
        assert!(container.contains_table("t2"));
    }

    #[test]
    fn reset_without_selection_clears_everything() {
        let mut ann = DiagramAnnotations::new();
        let a = create_container(&mut ann, "A", "#45B7D1");
        add_to_container(&mut ann, &["t1".to_string()], &a);

        reset_colors(&mut ann, &[]);
        assert!(ann.tables.is_empty());
        assert!(ann.container(&a).expect("container").tables().is_empty());
        // The container itself survives a color reset.
        assert_eq!(ann.containers.len(), 1);
    }
}
