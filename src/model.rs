use crate::color::{self, Rgb};
use crate::geometry::{Bounds, Point, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CONTAINER_COLOR: &str = "#45B7D1";
pub const DEFAULT_NOTE_COLOR: &str = "#FFEAA7";

pub const CONTAINER_MIN_SIZE: Size = Size::new(100, 50);
pub const NOTE_MIN_SIZE: Size = Size::new(80, 40);

const CONTAINER_DEFAULT_BOUNDS: Bounds = Bounds::new(0, 0, 300, 200);
const NOTE_DEFAULT_SIZE: Size = Size::new(150, 100);

/// Color assignment for a single table, keyed by the identifier the host
/// diagram uses for that table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColorEntry {
    #[serde(rename = "tableId")]
    pub table_id: String,
    #[serde(rename = "colorHex")]
    pub color: String,
}

impl TableColorEntry {
    pub fn new(table_id: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            color: color.into(),
        }
    }

    pub fn rgb(&self) -> Option<Rgb> {
        color::parse_hex(&self.color)
    }
}

/// Visual container grouping a set of tables under a titled rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub title: String,
    #[serde(rename = "colorHex")]
    pub color: String,
    bounds: Bounds,
    tables: Vec<String>,
}

impl Container {
    pub fn new(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            color: color.into(),
            bounds: CONTAINER_DEFAULT_BOUNDS,
            tables: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.set_bounds(bounds);
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Width and height are floor-clamped so a container can never collapse
    /// below its minimum extent.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds.clamped_min(CONTAINER_MIN_SIZE);
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.bounds = self.bounds.translated(dx, dy);
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Appends in insertion order; already-present ids are ignored.
    pub fn add_table(&mut self, table_id: &str) {
        if !self.contains_table(table_id) {
            self.tables.push(table_id.to_string());
        }
    }

    pub fn remove_table(&mut self, table_id: &str) {
        self.tables.retain(|t| t != table_id);
    }

    pub fn clear_tables(&mut self) {
        self.tables.clear();
    }

    pub fn contains_table(&self, table_id: &str) -> bool {
        self.tables.iter().any(|t| t == table_id)
    }

    pub fn rgb(&self) -> Option<Rgb> {
        color::parse_hex(&self.color)
    }
}

/// Free-floating note pinned on top of the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickyNote {
    pub id: String,
    pub text: String,
    #[serde(rename = "colorHex")]
    pub color: String,
    position: Point,
    size: Size,
}

impl StickyNote {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            color: color.into(),
            position: Point::new(0, 0),
            size: NOTE_DEFAULT_SIZE,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.set_size(size);
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = Size::new(
            size.width.max(NOTE_MIN_SIZE.width),
            size.height.max(NOTE_MIN_SIZE.height),
        );
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_parts(self.position, self.size)
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.position = bounds.position();
        self.set_size(bounds.size());
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.position = Point::new(self.position.x + dx, self.position.y + dy);
    }

    pub fn rgb(&self) -> Rgb {
        color::parse_hex(&self.color)
            .or_else(|| color::parse_hex(DEFAULT_NOTE_COLOR))
            .unwrap_or(Rgb::new(0xFF, 0xEA, 0xA7))
    }
}

/// Root aggregate for one diagram's annotations. List order of containers
/// and notes is z-order: later entries paint on top and hit-test first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramAnnotations {
    #[serde(default)]
    pub tables: IndexMap<String, TableColorEntry>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub notes: Vec<StickyNote>,
}

impl DiagramAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    // Table colors. Last write wins on an existing key.

    pub fn set_table_color(&mut self, table_id: &str, color: &str) {
        self.tables.insert(
            table_id.to_string(),
            TableColorEntry::new(table_id, color),
        );
    }

    pub fn table_color(&self, table_id: &str) -> Option<&TableColorEntry> {
        self.tables.get(table_id)
    }

    pub fn remove_table_color(&mut self, table_id: &str) {
        self.tables.shift_remove(table_id);
    }

    // Containers.

    pub fn add_container(&mut self, container: Container) {
        self.containers.push(container);
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    pub fn container_mut(&mut self, container_id: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.id == container_id)
    }

    pub fn remove_container(&mut self, container_id: &str) {
        self.containers.retain(|c| c.id != container_id);
    }

    /// First container in list order whose member list holds the table.
    /// Membership in more than one container is tolerated (a soft business
    /// rule maintained by the editor actions, not enforced here), and this
    /// resolves to whichever container comes first.
    pub fn find_container_for_table(&self, table_id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.contains_table(table_id))
    }

    // Notes.

    pub fn add_note(&mut self, note: StickyNote) {
        self.notes.push(note);
    }

    pub fn note(&self, note_id: &str) -> Option<&StickyNote> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    pub fn note_mut(&mut self, note_id: &str) -> Option<&mut StickyNote> {
        self.notes.iter_mut().find(|n| n.id == note_id)
    }

    pub fn remove_note(&mut self, note_id: &str) {
        self.notes.retain(|n| n.id != note_id);
    }

    /// Gates whether a side-file exists at all: an empty aggregate is
    /// deleted from disk rather than written.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.containers.is_empty() && self.notes.is_empty()
    }

    /// Effective color for a table: its own entry wins, else the color of
    /// the container holding it, else none. Recomputed on every call since
    /// membership and colors mutate independently.
    pub fn effective_color(&self, table_id: &str) -> Option<Rgb> {
        if let Some(own) = self.table_color(table_id).and_then(TableColorEntry::rgb) {
            return Some(own);
        }
        self.find_container_for_table(table_id)
            .and_then(Container::rgb)
    }

    /// Merge-import: fills in table keys, container ids and note ids absent
    /// from `self`; never overwrites an existing entry.
    pub fn merge_missing_from(&mut self, other: DiagramAnnotations) {
        for (table_id, entry) in other.tables {
            if !self.tables.contains_key(&table_id) {
                self.tables.insert(table_id, entry);
            }
        }
        for container in other.containers {
            if self.container(&container.id).is_none() {
                self.containers.push(container);
            }
        }
        for note in other.notes {
            if self.note(&note.id).is_none() {
                self.notes.push(note);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_color_set_get_remove_round_trip() {
        let mut ann = DiagramAnnotations::new();
        ann.set_table_color("orders", "#FF0000");
        assert_eq!(
            ann.table_color("orders").map(|e| e.color.as_str()),
            Some("#FF0000")
        );

        ann.set_table_color("orders", "#00FF00");
        assert_eq!(
            ann.table_color("orders").map(|e| e.color.as_str()),
            Some("#00FF00")
        );

        ann.remove_table_color("orders");
        assert!(ann.table_color("orders").is_none());
        // Removing again is a no-op, not an error.
        ann.remove_table_color("orders");
    }

    #[test]
    fn find_container_returns_first_in_list_order() {
        let mut ann = DiagramAnnotations::new();
        let mut first = Container::new("A", DEFAULT_CONTAINER_COLOR);
        first.add_table("shared");
        let mut second = Container::new("B", DEFAULT_CONTAINER_COLOR);
        second.add_table("shared");
        second.add_table("only_b");
        let first_id = first.id.clone();
        let second_id = second.id.clone();
        ann.add_container(first);
        ann.add_container(second);

        assert_eq!(
            ann.find_container_for_table("shared").map(|c| c.id.as_str()),
            Some(first_id.as_str())
        );
        assert_eq!(
            ann.find_container_for_table("only_b").map(|c| c.id.as_str()),
            Some(second_id.as_str())
        );
        assert!(ann.find_container_for_table("nowhere").is_none());
    }

    #[test]
    fn container_members_stay_unique_and_ordered() {
        let mut container = Container::new("Sales", DEFAULT_CONTAINER_COLOR);
        container.add_table("t1");
        container.add_table("t2");
        container.add_table("t1");
        assert_eq!(container.tables(), ["t1", "t2"]);
        container.remove_table("t1");
        assert_eq!(container.tables(), ["t2"]);
    }

    #[test]
    fn container_bounds_never_collapse() {
        let mut container = Container::new("Sales", DEFAULT_CONTAINER_COLOR);
        container.set_bounds(Bounds::new(10, 10, 3, -40));
        assert_eq!(container.bounds().size(), CONTAINER_MIN_SIZE);
        assert_eq!(container.bounds().position(), Point::new(10, 10));
    }

    #[test]
    fn note_size_floor_clamped() {
        let mut note = StickyNote::new("hi", DEFAULT_NOTE_COLOR);
        note.set_size(Size::new(10, 10));
        assert_eq!(note.size(), NOTE_MIN_SIZE);
    }

    #[test]
    fn emptiness_requires_all_three_collections_empty() {
        let mut ann = DiagramAnnotations::new();
        assert!(ann.is_empty());
        ann.add_note(StickyNote::new("x", DEFAULT_NOTE_COLOR));
        assert!(!ann.is_empty());
        let note_id = ann.notes[0].id.clone();
        ann.remove_note(&note_id);
        assert!(ann.is_empty());
    }

    #[test]
    fn own_color_wins_over_container_color() {
        let mut ann = DiagramAnnotations::new();
        let mut sales = Container::new("Sales", "#45B7D1")
            .with_bounds(Bounds::new(50, 50, 300, 200));
        sales.add_table("T1");
        ann.add_container(sales);

        assert_eq!(ann.effective_color("T1"), crate::color::parse_hex("#45B7D1"));

        ann.set_table_color("T1", "#FF0000");
        assert_eq!(ann.effective_color("T1"), crate::color::parse_hex("#FF0000"));

        assert_eq!(ann.effective_color("T2"), None);
    }

    #[test]
    fn invalid_own_color_falls_through_to_container() {
        let mut ann = DiagramAnnotations::new();
        let mut grp = Container::new("G", "#2ECC71");
        grp.add_table("T1");
        ann.add_container(grp);
        ann.set_table_color("T1", "not-a-color");
        assert_eq!(ann.effective_color("T1"), crate::color::parse_hex("#2ECC71"));
    }
}
