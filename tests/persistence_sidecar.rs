use diagram_annotator::geometry::{Bounds, Point, Size};
use diagram_annotator::model::{Container, DiagramAnnotations, StickyNote};
use diagram_annotator::persistence::{sidecar_path, AnnotationStore, NullNotifier};
use std::fs;
use std::path::Path;

fn store() -> AnnotationStore {
    AnnotationStore::new(Box::new(NullNotifier))
}

fn sample_annotations() -> DiagramAnnotations {
    let mut ann = DiagramAnnotations::new();
    ann.set_table_color("customers", "#45B7D1");
    ann.set_table_color("orders", "#E74C3C");

    let mut sales = Container::new("Sales", "#45B7D1").with_bounds(Bounds::new(50, 50, 300, 200));
    sales.add_table("orders");
    sales.add_table("invoices");
    ann.add_container(sales);
    ann.add_container(
        Container::new("Catalog", "#2ECC71").with_bounds(Bounds::new(400, 50, 300, 200)),
    );

    ann.add_note(
        StickyNote::new("check invoice totals", "#FFEAA7")
            .at(Point::new(120, 300))
            .sized(Size::new(180, 120)),
    );
    ann
}

#[test]
fn save_then_load_preserves_everything_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");
    let annotations = sample_annotations();

    let mut store = store();
    store.save(&diagram, &annotations);
    store.invalidate(&diagram);

    let loaded = store.load(&diagram);
    assert_eq!(loaded, annotations);
    assert_eq!(
        loaded.tables.keys().collect::<Vec<_>>(),
        ["customers", "orders"]
    );
    assert_eq!(loaded.containers[0].title, "Sales");
    assert_eq!(loaded.containers[0].tables(), ["orders", "invoices"]);
    assert_eq!(loaded.containers[0].bounds(), Bounds::new(50, 50, 300, 200));
    assert_eq!(loaded.notes[0].text, "check invoice totals");
    assert_eq!(loaded.notes[0].position(), Point::new(120, 300));
    assert_eq!(loaded.notes[0].size(), Size::new(180, 120));
}

#[test]
fn save_load_save_is_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");
    let sidecar = sidecar_path(&diagram);

    let mut store = store();
    store.save(&diagram, &sample_annotations());
    let first = fs::read(&sidecar).expect("first read");

    store.invalidate(&diagram);
    let reloaded = store.load(&diagram);
    store.save(&diagram, &reloaded);
    let second = fs::read(&sidecar).expect("second read");

    assert_eq!(first, second);
}

#[test]
fn wire_format_matches_the_documented_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");

    let mut store = store();
    store.save(&diagram, &sample_annotations());
    let json = fs::read_to_string(sidecar_path(&diagram)).expect("read sidecar");

    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["tables"]["customers"]["colorHex"], "#45B7D1");
    assert_eq!(value["tables"]["customers"]["tableId"], "customers");
    assert_eq!(
        value["containers"][0]["bounds"],
        serde_json::json!([50, 50, 300, 200])
    );
    assert_eq!(value["containers"][0]["tables"][0], "orders");
    assert_eq!(value["notes"][0]["position"], serde_json::json!([120, 300]));
    assert_eq!(value["notes"][0]["size"], serde_json::json!([180, 120]));
}

#[test]
fn saving_an_empty_aggregate_deletes_the_side_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");
    let sidecar = sidecar_path(&diagram);

    let mut store = store();
    store.save(&diagram, &sample_annotations());
    assert!(sidecar.exists());

    store.save(&diagram, &DiagramAnnotations::new());
    assert!(!sidecar.exists());
    // And nothing reappears on reload.
    store.invalidate(&diagram);
    assert!(store.load(&diagram).is_empty());
}

#[test]
fn missing_side_file_loads_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("never_saved.uml");
    assert!(store().load(&diagram).is_empty());
}

#[test]
fn malformed_side_file_degrades_to_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");
    fs::write(sidecar_path(&diagram), "{ this is not json").expect("write junk");

    let mut store = store();
    assert!(store.load(&diagram).is_empty());
}

#[test]
fn load_prefers_the_cached_aggregate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let diagram = dir.path().join("sales.uml");

    let mut store = store();
    store.save(&diagram, &sample_annotations());

    // Overwrite the file behind the cache's back; the cached copy wins
    // until the entry is invalidated.
    fs::write(sidecar_path(&diagram), "{}").expect("overwrite");
    assert!(!store.load(&diagram).is_empty());

    store.invalidate(&diagram);
    assert!(store.load(&diagram).is_empty());
}

#[test]
fn sidecar_lands_next_to_the_diagram() {
    let sidecar = sidecar_path(Path::new("/data/models/warehouse.dbdiagram"));
    assert_eq!(
        sidecar,
        Path::new("/data/models/warehouse_annotations.json")
    );
}
