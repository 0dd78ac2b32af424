use diagram_annotator::app::AnnotatorApp;
use diagram_annotator::logging;

use eframe::egui;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    logging::init();

    let diagram_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo_diagram.uml"));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 680.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Diagram Annotator",
        native_options,
        Box::new(move |_cc| Box::new(AnnotatorApp::new(diagram_path))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run annotator window: {err}"))?;

    Ok(())
}
