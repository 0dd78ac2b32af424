use crate::actions::{self, ImportMode};
use crate::color::{self, Rgb};
use crate::geometry::{Bounds, Point};
use crate::locator::{self, AttachProbe, NodeId, ProbeState, SurfaceKind, WidgetTree};
use crate::model::{DiagramAnnotations, DEFAULT_CONTAINER_COLOR, DEFAULT_NOTE_COLOR};
use crate::overlay::{DrawKind, OverlayLayer, ShapeId};
use crate::persistence::{AnnotationStore, Notifier, Severity};
use crate::refresh::{DiagramHost, RefreshCoordinator};
use crate::session::SessionRegistry;
use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Vec2};
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

/// Quick palette offered next to the color action.
const QUICK_COLORS: [&str; 10] = [
    "#45B7D1", "#96CEB4", "#FFEEAD", "#D4A5A5", "#9B59B6", "#3498DB", "#E74C3C", "#2ECC71",
    "#F39C12", "#1ABC9C",
];

const EDITOR_TYPE_NAME: &str = "DatabaseDiagramEditor";
// First node added by `widget_snapshot`; construction order is fixed so the
// id stays valid across snapshots.
const EDITOR_NODE: NodeId = 0;

/// Table boxes of the mock host diagram, in canvas coordinates. The demo
/// stands in for the external diagram editor; these are its "tables".
struct MockTable {
    id: &'static str,
    bounds: Bounds,
}

fn demo_tables() -> Vec<MockTable> {
    vec![
        MockTable {
            id: "customers",
            bounds: Bounds::new(40, 40, 150, 90),
        },
        MockTable {
            id: "orders",
            bounds: Bounds::new(240, 40, 150, 110),
        },
        MockTable {
            id: "order_items",
            bounds: Bounds::new(440, 60, 150, 90),
        },
        MockTable {
            id: "products",
            bounds: Bounds::new(440, 200, 150, 90),
        },
        MockTable {
            id: "invoices",
            bounds: Bounds::new(240, 220, 150, 90),
        },
    ]
}

/// Queue-backed notifier shared between the store and the toast display.
#[derive(Clone, Default)]
struct QueuedNotifier {
    queue: Rc<RefCell<Vec<(Severity, String)>>>,
}

impl Notifier for QueuedNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.queue.borrow_mut().push((severity, message.to_string()));
    }
}

impl QueuedNotifier {
    fn drain(&self) -> Vec<(Severity, String)> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

struct EguiHost {
    ctx: egui::Context,
}

impl DiagramHost for EguiHost {
    fn request_repaint(&self, _diagram_path: &std::path::Path) {
        self.ctx.request_repaint();
    }
}

pub struct AnnotatorApp {
    diagram_path: PathBuf,
    store: AnnotationStore,
    notifier: QueuedNotifier,
    coordinator: RefreshCoordinator,
    session: SessionRegistry,
    annotations: DiagramAnnotations,
    tables: Vec<MockTable>,
    selected_table: Option<String>,
    probe: Option<AttachProbe>,
    next_probe_at: Option<Instant>,
    last_canvas_rect: Option<Rect>,
    container_title: String,
    note_text: String,
    toasts: Toasts,
}

impl AnnotatorApp {
    pub fn new(diagram_path: PathBuf) -> Self {
        let notifier = QueuedNotifier::default();
        let mut store = AnnotationStore::new(Box::new(notifier.clone()));
        let annotations = store.load(&diagram_path);

        // The demo's editor surface is a diagram by construction, but run
        // it through the same detection a host adapter would use.
        let probe = locator::is_diagram_surface(EDITOR_TYPE_NAME)
            .then(|| AttachProbe::new(EDITOR_NODE));

        Self {
            diagram_path,
            store,
            notifier,
            coordinator: RefreshCoordinator::new(),
            session: SessionRegistry::new(),
            annotations,
            tables: demo_tables(),
            selected_table: None,
            probe,
            next_probe_at: None,
            last_canvas_rect: None,
            container_title: String::new(),
            note_text: String::new(),
            toasts: Toasts::new().anchor(Align2::RIGHT_TOP, [-10.0, 10.0]),
        }
    }

    /// Persists the working aggregate and propagates it to the overlay and
    /// the host canvas.
    fn commit(&mut self, ctx: &egui::Context) {
        self.store.save(&self.diagram_path, &self.annotations);
        let host = EguiHost { ctx: ctx.clone() };
        self.coordinator.refresh(
            &self.diagram_path,
            &self.annotations,
            &mut self.session,
            &host,
            Instant::now(),
        );
    }

    fn mutate(&mut self, ctx: &egui::Context, change: impl FnOnce(&mut DiagramAnnotations)) {
        change(&mut self.annotations);
        self.commit(ctx);
    }

    /// Snapshot of the demo's widget hierarchy in the shape a host adapter
    /// would produce: an editor root that reports no size of its own, a
    /// scroll pane, and the layered drawing canvas inside it. Until the
    /// first frame has laid the panel out the canvas has zero size, which
    /// is exactly the not-ready case the probe retries through.
    fn widget_snapshot(&self) -> WidgetTree {
        let canvas_bounds = self
            .last_canvas_rect
            .map(|rect| {
                Bounds::new(
                    rect.min.x as i32,
                    rect.min.y as i32,
                    rect.width() as i32,
                    rect.height() as i32,
                )
            })
            .unwrap_or_default();

        let mut tree = WidgetTree::new();
        let editor = tree.add_node(
            None,
            EDITOR_TYPE_NAME,
            false,
            Bounds::default(),
            SurfaceKind::Plain,
        );
        let scroll_pane = tree.add_node(
            Some(editor),
            "DiagramScrollPane",
            true,
            canvas_bounds,
            SurfaceKind::Plain,
        );
        tree.add_node(
            Some(scroll_pane),
            "DatabaseDiagramCanvas",
            self.last_canvas_rect.is_some(),
            canvas_bounds,
            SurfaceKind::Layered,
        );
        tree
    }

    fn drive_attachment(&mut self, ctx: &egui::Context) {
        if self.session.is_attached(&self.diagram_path) || self.probe.is_none() {
            return;
        }

        let now = Instant::now();
        if let Some(at) = self.next_probe_at {
            if now < at {
                ctx.request_repaint_after(at - now);
                return;
            }
        }

        let tree = self.widget_snapshot();
        let Some(probe) = self.probe.as_mut() else {
            return;
        };
        match probe.attempt(&tree) {
            ProbeState::Probing { .. } => {
                if let Some(delay) = probe.next_delay() {
                    self.next_probe_at = Some(now + delay);
                    ctx.request_repaint_after(delay);
                }
            }
            state @ (ProbeState::Attached(_) | ProbeState::GaveUp(_)) => {
                if let Some(anchor) = state.anchor() {
                    tracing::info!(anchor, "attaching annotation overlay");
                    self.session.register(
                        &self.diagram_path,
                        OverlayLayer::new(self.annotations.clone()),
                    );
                }
                self.probe = None;
                self.next_probe_at = None;
            }
            ProbeState::Cancelled => {
                self.probe = None;
                self.next_probe_at = None;
            }
        }
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        for (severity, message) in self.notifier.drain() {
            self.toasts.add(Toast {
                text: message.into(),
                kind: match severity {
                    Severity::Info => ToastKind::Info,
                    Severity::Warning => ToastKind::Warning,
                    Severity::Error => ToastKind::Error,
                },
                options: ToastOptions::default().duration_in_seconds(4.0),
            });
        }
        self.toasts.show(ctx);
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("annotator-actions")
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Annotations");
                ui.separator();

                match &self.selected_table {
                    Some(id) => ui.label(format!("Selected table: {id}")),
                    None => ui.label("Click a table to select it"),
                };

                ui.add_space(4.0);
                ui.label("Table color");
                let mut picked_color: Option<&str> = None;
                ui.horizontal_wrapped(|ui| {
                    for hex in QUICK_COLORS {
                        let rgb = color::parse_hex(hex).unwrap_or(Rgb::WHITE);
                        let (rect, response) =
                            ui.allocate_exact_size(Vec2::splat(18.0), Sense::click());
                        ui.painter()
                            .rect_filled(rect, 2.0, Color32::from_rgb(rgb.r, rgb.g, rgb.b));
                        if response.clicked() {
                            picked_color = Some(hex);
                        }
                    }
                });
                if let (Some(hex), Some(table)) = (picked_color, self.selected_table.clone()) {
                    self.mutate(ctx, |ann| actions::color_table(ann, &table, hex));
                }
                if ui.button("Reset selected color").clicked() {
                    if let Some(table) = self.selected_table.clone() {
                        self.mutate(ctx, |ann| actions::reset_colors(ann, &[table]));
                    }
                }
                if ui.button("Reset all colors").clicked() {
                    self.mutate(ctx, |ann| actions::reset_colors(ann, &[]));
                }

                ui.separator();
                ui.label("Containers");
                ui.text_edit_singleline(&mut self.container_title);
                ui.horizontal(|ui| {
                    if ui.button("Create").clicked() {
                        let title = if self.container_title.trim().is_empty() {
                            format!("Group {}", self.annotations.containers.len() + 1)
                        } else {
                            self.container_title.trim().to_string()
                        };
                        self.container_title.clear();
                        self.mutate(ctx, |ann| {
                            actions::create_container(ann, &title, DEFAULT_CONTAINER_COLOR);
                        });
                    }
                    if ui.button("Draw").clicked() {
                        if let Some(overlay) = self.session.overlay_mut(&self.diagram_path) {
                            overlay.arm_draw(DrawKind::Container);
                        }
                    }
                });
                if ui.button("Add selected to newest container").clicked() {
                    if let (Some(table), Some(container_id)) = (
                        self.selected_table.clone(),
                        self.annotations.containers.last().map(|c| c.id.clone()),
                    ) {
                        self.mutate(ctx, |ann| {
                            actions::add_to_container(ann, &[table], &container_id);
                        });
                    }
                }
                if ui.button("Remove selected from container").clicked() {
                    if let Some(table) = self.selected_table.clone() {
                        self.mutate(ctx, |ann| actions::remove_from_container(ann, &table));
                    }
                }

                ui.separator();
                ui.label("Sticky notes");
                ui.text_edit_singleline(&mut self.note_text);
                ui.horizontal(|ui| {
                    if ui.button("Add").clicked() {
                        let text = self.note_text.trim().to_string();
                        self.note_text.clear();
                        self.mutate(ctx, |ann| {
                            actions::add_note(ann, &text, DEFAULT_NOTE_COLOR);
                        });
                    }
                    if ui.button("Draw").clicked() {
                        if let Some(overlay) = self.session.overlay_mut(&self.diagram_path) {
                            overlay.arm_draw(DrawKind::Note);
                        }
                    }
                });
                if ui.button("Delete selected shape").clicked() {
                    self.delete_selected_shape(ctx);
                }
                let drawing = self
                    .session
                    .overlay(&self.diagram_path)
                    .and_then(|overlay| overlay.interaction().armed_draw())
                    .is_some();
                if drawing && ui.button("Cancel drawing").clicked() {
                    if let Some(overlay) = self.session.overlay_mut(&self.diagram_path) {
                        overlay.cancel_draw();
                    }
                }

                ui.separator();
                if ui.button("Export...").clicked() {
                    self.export_dialog();
                }
                ui.horizontal(|ui| {
                    if ui.button("Import (merge)").clicked() {
                        self.import_dialog(ctx, ImportMode::Merge);
                    }
                    if ui.button("Import (replace)").clicked() {
                        self.import_dialog(ctx, ImportMode::Replace);
                    }
                });

                ui.separator();
                ui.label("Status");
                let attached = self.session.is_attached(&self.diagram_path);
                ui.label(if attached {
                    "Overlay: attached"
                } else {
                    "Overlay: probing..."
                });
                for status in self.session.statuses() {
                    ui.label(format!(
                        "{}: {} colors | {} containers | {} notes",
                        status.diagram, status.colors, status.containers, status.notes
                    ));
                }
            });
    }

    fn delete_selected_shape(&mut self, ctx: &egui::Context) {
        let selected = self
            .session
            .overlay(&self.diagram_path)
            .and_then(|overlay| overlay.interaction().selected().cloned());
        match selected {
            Some(ShapeId::Container(id)) => {
                self.mutate(ctx, |ann| ann.remove_container(&id));
            }
            Some(ShapeId::Note(id)) => {
                self.mutate(ctx, |ann| ann.remove_note(&id));
            }
            None => {}
        }
    }

    fn export_dialog(&mut self) {
        let suggested = self
            .diagram_path
            .file_stem()
            .map(|s| {
                format!(
                    "{}{}",
                    s.to_string_lossy(),
                    crate::persistence::SIDECAR_SUFFIX
                )
            })
            .unwrap_or_else(|| "diagram_annotations.json".to_string());
        if let Some(target) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(suggested)
            .save_file()
        {
            self.store.export(&self.diagram_path, &target);
        }
    }

    fn import_dialog(&mut self, ctx: &egui::Context, mode: ImportMode) {
        if let Some(source) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.annotations =
                actions::import_annotations(&mut self.store, &self.annotations, &source, mode);
            self.commit(ctx);
        }
    }

    fn diagram_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let canvas_rect = ui.available_rect_before_wrap();
            self.last_canvas_rect = Some(canvas_rect);
            let canvas_response =
                ui.interact(canvas_rect, ui.id().with("diagram-canvas"), Sense::click());

            self.paint_mock_diagram(ui, canvas_rect);

            let mut pointer_captured = false;
            let mut committed = false;
            if let Some(overlay) = self.session.overlay_mut(&self.diagram_path) {
                let response = overlay.show(ui, canvas_rect);
                pointer_captured = response.pointer_captured;
                if response.repaint {
                    ctx.request_repaint();
                }
                if response.commit {
                    self.annotations = overlay.annotations().clone();
                    committed = true;
                }
            }
            if committed {
                self.commit(ctx);
            }

            // Clicks the overlay left alone fall through to the diagram:
            // table selection, the demo's stand-in for the host's
            // table-identity resolver.
            if canvas_response.clicked() && !pointer_captured {
                if let Some(pos) = canvas_response.interact_pointer_pos() {
                    let local = Point::new(
                        (pos.x - canvas_rect.min.x) as i32,
                        (pos.y - canvas_rect.min.y) as i32,
                    );
                    self.selected_table = self
                        .tables
                        .iter()
                        .find(|t| t.bounds.contains(local))
                        .map(|t| t.id.to_string());
                }
            }
        });
    }

    fn paint_mock_diagram(&self, ui: &egui::Ui, canvas_rect: Rect) {
        let painter = ui.painter_at(canvas_rect);
        painter.rect_filled(canvas_rect, 0.0, Color32::from_gray(24));

        for table in &self.tables {
            let rect = Rect::from_min_size(
                canvas_rect.min + Vec2::new(table.bounds.x as f32, table.bounds.y as f32),
                Vec2::new(table.bounds.width as f32, table.bounds.height as f32),
            );
            let effective = self.annotations.effective_color(table.id);
            let fill = effective
                .map(|c| Color32::from_rgb(c.r, c.g, c.b))
                .unwrap_or(Color32::from_gray(48));
            let header = effective
                .map(color::header_shade)
                .map(|c| Color32::from_rgb(c.r, c.g, c.b))
                .unwrap_or(Color32::from_gray(64));
            let border = effective
                .map(color::border_shade)
                .map(|c| Color32::from_rgb(c.r, c.g, c.b))
                .unwrap_or(Color32::from_gray(90));
            let text = effective
                .map(color::contrasting_text_color)
                .map(|c| Color32::from_rgb(c.r, c.g, c.b))
                .unwrap_or(Color32::from_gray(220));

            painter.rect_filled(rect, 4.0, fill);
            let header_rect = Rect::from_min_size(rect.min, Vec2::new(rect.width(), 22.0));
            painter.rect_filled(header_rect, 4.0, header);
            let selected = self.selected_table.as_deref() == Some(table.id);
            painter.rect_stroke(
                rect,
                4.0,
                Stroke::new(if selected { 2.0 } else { 1.0 }, border),
            );
            painter.text(
                header_rect.min + Vec2::new(6.0, 11.0),
                Align2::LEFT_CENTER,
                table.id,
                FontId::proportional(12.0),
                text,
            );
        }
    }
}

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.side_panel(ctx);
        self.diagram_canvas(ctx);
        self.drive_attachment(ctx);
        self.show_toasts(ctx);
    }
}
