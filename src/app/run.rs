//! Top-level entry point: window options, fonts, icon.

use crate::app::ApexApp;
use crate::config::AppConfig;

/// Launch the ApexTrace window and run until close.
pub fn run_apextrace(config: AppConfig) -> eframe::Result<()> {
    let mut options = eframe::NativeOptions::default();
    options.viewport = egui::ViewportBuilder::default()
        .with_inner_size(egui::vec2(1280.0, 720.0))
        .with_min_inner_size(egui::vec2(1280.0, 720.0));
    if let Some(icon) = load_app_icon_png() {
        options.viewport = options.viewport.with_icon(icon);
    }

    let app = ApexApp::new(config);
    eframe::run_native(
        "ApexTrace",
        options,
        Box::new(|cc| {
            // Install the Phosphor icon font before creating the app.
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(app))
        }),
    )
}

/// Attempt to load the project's `icon.png` as an [`egui::IconData`].
///
/// Returns `None` if the file does not exist or cannot be decoded.
fn load_app_icon_png() -> Option<egui::IconData> {
    let png_path = concat!(env!("CARGO_MANIFEST_DIR"), "/icon.png");
    let data = std::fs::read(png_path).ok()?;
    let image = image::load_from_memory(&data).ok()?.into_rgba8();
    let (width, height) = image.dimensions();
    Some(egui::IconData {
        rgba: image.into_raw(),
        width,
        height,
    })
}
