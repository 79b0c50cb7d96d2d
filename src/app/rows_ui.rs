//! Header bar and comparison-row rendering.
//!
//! Widgets only collect [`RowAction`]s while drawing; the actions are
//! applied after the panels close so row iteration never fights the
//! synchronizer or the relay for borrows.

use egui::{Color32, RichText};
use egui_phosphor::regular::{
    MINUS, PAUSE, PLAY, PLUS, SPEAKER_HIGH, SPEAKER_SLASH, STOP,
};

use crate::app::row::Row;
use crate::app::{ApexApp, AppView, RowPlayers, SaveDialog};
use crate::player::VideoPlayer;
use crate::plot::camera::CameraPreset;
use crate::plot::surface::ViewMode;
use crate::storage::{CreateRequest, TraceStore, UpdateAction};

pub(crate) enum RowAction {
    AddRow,
    RemoveRow,
    OverlayToggled,
    NewTrace(u64),
    OpenSaveDialog(u64),
    OpenLoadView(u64),
    SelectVideo(u64),
    SwitchView(u64, ViewMode),
    PlayPause(u64),
    Stop(u64),
    Mute(u64),
    Camera(u64, String),
    TrimToggle(u64, bool),
    TrimBounds(u64, f64, f64),
    TrimLabel(u64, String),
    TrimCommit(u64),
    TrimDelete(u64),
    TrimSelect(u64, Option<usize>),
}

pub fn landing_view(app: &mut ApexApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.heading(RichText::new("ApexTrace").size(42.0));
            ui.label("Import, visualize and compare G-force traces from your track videos");
            ui.add_space(24.0);
            if ui.button(RichText::new("Get started").size(18.0)).clicked() {
                app.view = AppView::Main;
            }
        });
    });
}

pub fn main_view(app: &mut ApexApp, ctx: &egui::Context) {
    let mut actions: Vec<RowAction> = Vec::new();

    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button(MINUS).on_hover_text("Remove a trace").clicked() {
                actions.push(RowAction::RemoveRow);
            }
            if ui.button(PLUS).on_hover_text("Compare another trace").clicked() {
                actions.push(RowAction::AddRow);
            }
            let n = app.rows.len();
            ui.label(format!("{n} Trace{}", if n == 1 { "" } else { "s" }));

            ui.separator();
            let mut overlay = app.overlay_all;
            if ui.checkbox(&mut overlay, "Overlay all traces").changed() {
                app.overlay_all = overlay;
                actions.push(RowAction::OverlayToggled);
            }

            if app.rows.len() > 1 {
                ui.separator();
                let mut sync_ctx = app.sync_ctx.borrow_mut();
                ui.checkbox(&mut sync_ctx.sync_views, "Sync views");
                ui.checkbox(&mut sync_ctx.sync_playback, "Sync video playback");
            }
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        let row_height = if app.rows.len() == 1 {
            ui.available_height()
        } else {
            (ui.available_height() * 0.55).max(320.0)
        };
        egui::ScrollArea::vertical().show(ui, |ui| {
            for row in &app.rows {
                ui.allocate_ui(egui::vec2(ui.available_width(), row_height), |ui| {
                    row_ui(ui, row, &app.players, &mut actions);
                });
                ui.separator();
            }
        });
    });

    save_dialog_ui(app, ctx);
    apply_actions(app, actions);
}

fn row_ui(ui: &mut egui::Ui, row: &Row, players: &RowPlayers, actions: &mut Vec<RowAction>) {
    ui.horizontal_top(|ui| {
        let total = ui.available_width();
        ui.allocate_ui(egui::vec2(total * 0.42, ui.available_height()), |ui| {
            ui.vertical(|ui| left_column(ui, row, players, actions));
        });
        ui.separator();
        ui.vertical(|ui| right_column(ui, row, actions));
    });
}

fn left_column(ui: &mut egui::Ui, row: &Row, players: &RowPlayers, actions: &mut Vec<RowAction>) {
    let id = row.id;

    ui.horizontal(|ui| {
        if ui.button("New").clicked() {
            actions.push(RowAction::NewTrace(id));
        }
        if ui.add_enabled(row.has_data(), egui::Button::new("Save")).clicked() {
            actions.push(RowAction::OpenSaveDialog(id));
        }
        if ui.button("Load").clicked() {
            actions.push(RowAction::OpenLoadView(id));
        }

        ui.separator();
        ui.add_enabled_ui(row.has_data(), |ui| {
            if ui.selectable_label(row.view == ViewMode::ThreeD, "3D").clicked() {
                actions.push(RowAction::SwitchView(id, ViewMode::ThreeD));
            }
            if ui.selectable_label(row.view == ViewMode::TwoD, "2D").clicked() {
                actions.push(RowAction::SwitchView(id, ViewMode::TwoD));
            }
        });

        ui.separator();
        let player = players.get(row.player);
        let playing = player.map(|p| p.is_playing()).unwrap_or(false);
        let muted = player.map(|p| p.is_muted()).unwrap_or(false);
        ui.add_enabled_ui(row.has_data(), |ui| {
            let play_icon = if playing { PAUSE } else { PLAY };
            if ui.button(play_icon).clicked() {
                actions.push(RowAction::PlayPause(id));
            }
            if ui.button(STOP).clicked() {
                actions.push(RowAction::Stop(id));
            }
            let audio_icon = if muted { SPEAKER_SLASH } else { SPEAKER_HIGH };
            if ui.button(audio_icon).clicked() {
                actions.push(RowAction::Mute(id));
            }
        });
    });

    ui.add_space(6.0);

    match row.loaded.as_ref().and_then(|t| t.video_path.as_ref()) {
        Some(video_path) => {
            let name = video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| video_path.display().to_string());
            egui::Frame::canvas(ui.style()).show(ui, |ui| {
                ui.set_min_height(ui.available_height() - 8.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(12.0);
                    ui.label(RichText::new(name).color(Color32::LIGHT_GRAY));
                    if let Some(p) = players.get(row.player) {
                        let duration = p.duration().max(f64::EPSILON);
                        let t = p.current_time();
                        ui.add(
                            egui::ProgressBar::new((t / duration) as f32)
                                .desired_width(ui.available_width() * 0.9),
                        );
                        ui.monospace(format!(
                            "{} / {}",
                            format_time(t),
                            format_time(p.duration())
                        ));
                    }
                });
            });
        }
        None => {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_height(ui.available_height() - 8.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(ui.available_height() * 0.35);
                    ui.label("Load a dashcam video with a G-force overlay");
                    if ui.button("Select video").clicked() {
                        actions.push(RowAction::SelectVideo(id));
                    }
                });
            });
        }
    }
}

fn right_column(ui: &mut egui::Ui, row: &Row, actions: &mut Vec<RowAction>) {
    let id = row.id;

    if row.processing {
        ui.centered_and_justified(|ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Please wait, processing video...");
            });
        });
        return;
    }
    if !row.has_data() {
        ui.centered_and_justified(|ui| ui.weak("No trace yet"));
        return;
    }

    let plots_height = ui.available_height() - 64.0;
    match row.view {
        ViewMode::ThreeD => {
            ui.allocate_ui(egui::vec2(ui.available_width(), plots_height), |ui| {
                row.scene.borrow_mut().draw(ui);
            });
            ui.horizontal(|ui| {
                ui.menu_button(row.camera_label.clone(), |ui| {
                    for preset in CameraPreset::ALL {
                        if ui.button(preset.label()).clicked() {
                            actions.push(RowAction::Camera(id, preset.label().to_string()));
                            ui.close();
                        }
                    }
                });
                trim_controls(ui, row, actions);
            });
        }
        ViewMode::TwoD => {
            let half = plots_height * 0.5;
            ui.allocate_ui(egui::vec2(ui.available_width(), half), |ui| {
                row.strip_top.borrow_mut().draw(ui);
            });
            ui.allocate_ui(egui::vec2(ui.available_width(), half), |ui| {
                row.strip_bottom.borrow_mut().draw(ui);
            });
            ui.horizontal(|ui| trim_controls(ui, row, actions));
        }
    }
}

fn trim_controls(ui: &mut egui::Ui, row: &Row, actions: &mut Vec<RowAction>) {
    let id = row.id;
    let mut enabled = row.trim.enabled;
    if ui.checkbox(&mut enabled, "Trim").changed() {
        actions.push(RowAction::TrimToggle(id, enabled));
    }

    let series_len = row
        .loaded
        .as_ref()
        .map(|t| t.trace.frames.len() as f64)
        .unwrap_or(0.0);

    if row.trim.enabled && series_len > 1.0 {
        let (mut start, mut end) = row.trim.bounds;
        let start_changed = ui
            .add(egui::Slider::new(&mut start, 0.0..=series_len - 1.0).text("start"))
            .changed();
        let end_changed = ui
            .add(egui::Slider::new(&mut end, 0.0..=series_len).text("end"))
            .changed();
        if start_changed || end_changed {
            if end < start {
                end = start;
            }
            actions.push(RowAction::TrimBounds(id, start, end));
        }

        let mut label = row.trim.label.clone();
        if ui
            .add(egui::TextEdit::singleline(&mut label).hint_text("Region label").desired_width(110.0))
            .changed()
        {
            actions.push(RowAction::TrimLabel(id, label));
        }
        if ui.button("Save trim").clicked() {
            actions.push(RowAction::TrimCommit(id));
        }
    }

    let regions = row
        .loaded
        .as_ref()
        .map(|t| t.trace.trim.clone())
        .unwrap_or_default();
    if !regions.is_empty() {
        let selected_text = row
            .trim
            .selected_region
            .and_then(|i| regions.get(i))
            .map(|r| r.label.clone())
            .unwrap_or_else(|| "Full trace".to_string());
        egui::ComboBox::from_id_salt(("trim-region", id))
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                if ui.selectable_label(row.trim.selected_region.is_none(), "Full trace").clicked() {
                    actions.push(RowAction::TrimSelect(id, None));
                }
                for (i, region) in regions.iter().enumerate() {
                    let chosen = row.trim.selected_region == Some(i);
                    if ui.selectable_label(chosen, &region.label).clicked() {
                        actions.push(RowAction::TrimSelect(id, Some(i)));
                    }
                }
            });
        if row.trim.selected_region.is_some() && ui.button("Delete trim").clicked() {
            actions.push(RowAction::TrimDelete(id));
        }
    }
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn save_dialog_ui(app: &mut ApexApp, ctx: &egui::Context) {
    let Some(mut dialog) = app.save_dialog.take() else {
        return;
    };
    let mut commit = false;
    let mut cancel = false;

    egui::Window::new("Save trace")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("Title");
            ui.text_edit_singleline(&mut dialog.title);
            ui.checkbox(&mut dialog.cache_video, "Store a copy of the video");
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    commit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    if commit {
        save_trace(app, dialog);
    } else if !cancel {
        app.save_dialog = Some(dialog);
    }
}

fn save_trace(app: &mut ApexApp, dialog: SaveDialog) {
    if dialog.title.trim().is_empty() {
        app.notify.error("Please provide a title for the trace");
        app.save_dialog = Some(dialog);
        return;
    }
    let Some(store) = app.store.as_ref() else {
        app.notify.error("Trace storage is unavailable");
        return;
    };
    let Some(row) = app.rows.iter_mut().find(|r| r.id == dialog.row) else {
        return;
    };
    let Some(loaded) = row.loaded.as_mut() else {
        return;
    };
    let (Some(json_path), Some(video_path)) = (loaded.json_path.clone(), loaded.video_path.clone())
    else {
        app.notify.error("This trace has nothing to save");
        return;
    };

    let request = CreateRequest {
        title: dialog.title.trim().to_string(),
        cache_video: dialog.cache_video,
        video_path,
        json_path,
    };
    match store.create(&request) {
        Ok((trace_id, bundle_path)) => {
            loaded.trace_id = Some(trace_id);
            loaded.json_path = Some(bundle_path);
            loaded.trace.title = Some(request.title.clone());
            row.adapter_3d.set_title(Some(request.title.clone()));
            row.adapter_corner.set_title(Some(request.title.clone()));
            row.adapter_accel.set_title(Some(request.title));
            app.notify.success("Save successful");
        }
        Err(err) => {
            log::error!("save failed: {err:#}");
            app.notify.error("There was a problem saving the trace");
        }
    }
}

fn apply_actions(app: &mut ApexApp, actions: Vec<RowAction>) {
    for action in actions {
        match action {
            RowAction::AddRow => app.add_row(),
            RowAction::RemoveRow => app.remove_last_row(),
            RowAction::OverlayToggled => app.refresh_overlays(),
            RowAction::NewTrace(id) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.clear(&mut app.relay);
                    if let Some(p) = app.players.get_mut(row.player) {
                        p.open(0.0);
                    }
                }
            }
            RowAction::OpenSaveDialog(id) => {
                app.save_dialog = Some(SaveDialog {
                    row: id,
                    title: String::new(),
                    cache_video: false,
                });
            }
            RowAction::OpenLoadView(id) => {
                app.load_for_row = id;
                app.refresh_load_list();
                app.view = AppView::LoadList;
            }
            RowAction::SelectVideo(id) => {
                let picked = rfd::FileDialog::new()
                    .add_filter("Movies", &["mp4"])
                    .pick_file();
                if let Some(path) = picked {
                    if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                        row.processing = true;
                    }
                    crate::processing::spawn_extraction(
                        &app.config,
                        path,
                        id,
                        app.processing_tx.clone(),
                    );
                }
            }
            RowAction::SwitchView(id, view) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.switch_view(view, &mut app.relay);
                }
                app.refresh_overlays();
            }
            RowAction::PlayPause(id) => {
                let player = app.rows.iter().find(|r| r.id == id).map(|r| r.player);
                if let Some(player) = player {
                    let playing = app
                        .players
                        .get(player)
                        .map(|p| p.is_playing())
                        .unwrap_or(false);
                    if playing {
                        app.sync.request_pause(player, &mut app.players);
                    } else {
                        app.sync.request_play(player, &mut app.players);
                    }
                }
            }
            RowAction::Stop(id) => {
                let target = app
                    .rows
                    .iter()
                    .find(|r| r.id == id)
                    .map(|r| (r.player, r.timeline_start()));
                if let Some((player, start)) = target {
                    app.sync.request_stop(player, start, &mut app.players);
                }
            }
            RowAction::Mute(id) => {
                let player = app.rows.iter().find(|r| r.id == id).map(|r| r.player);
                if let Some(p) = player.and_then(|pl| app.players.get_mut(pl)) {
                    let muted = p.is_muted();
                    p.set_muted(!muted);
                }
            }
            RowAction::Camera(id, preset) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.camera_label = preset.clone();
                    row.adapter_3d.change_camera(&preset);
                }
            }
            RowAction::TrimToggle(id, enabled) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.trim.enabled = enabled;
                    let len = row
                        .loaded
                        .as_ref()
                        .map(|t| t.trace.frames.len() as f64)
                        .unwrap_or(0.0);
                    row.trim.bounds = (0.0, len);
                    for adapter in row.active_adapters() {
                        adapter.set_trim_mode(enabled);
                    }
                }
            }
            RowAction::TrimBounds(id, start, end) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.trim.bounds = (start, end);
                    for adapter in row.active_adapters() {
                        adapter.draw_trim_bounds(start, end);
                    }
                }
            }
            RowAction::TrimLabel(id, label) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    row.trim.label = label;
                }
            }
            RowAction::TrimCommit(id) => commit_trim(app, id),
            RowAction::TrimDelete(id) => delete_trim(app, id),
            RowAction::TrimSelect(id, selection) => {
                if let Some(row) = app.rows.iter_mut().find(|r| r.id == id) {
                    match selection {
                        Some(index) => row.apply_saved_region(index),
                        None => row.show_full_series(&mut app.relay),
                    }
                }
            }
        }
    }
}

fn commit_trim(app: &mut ApexApp, id: u64) {
    let Some(row) = app.rows.iter_mut().find(|r| r.id == id) else {
        return;
    };
    let label = if row.trim.label.trim().is_empty() {
        format!(
            "Trim {}",
            row.loaded.as_ref().map(|t| t.trace.trim.len() + 1).unwrap_or(1)
        )
    } else {
        row.trim.label.trim().to_string()
    };
    let Some(region) = row.commit_trim(&label) else {
        app.notify.error("Draw the trim bounds first");
        return;
    };
    row.trim.label.clear();
    row.trim.enabled = false;

    // persist: onto the stored bundle when there is one, else onto the
    // extractor result so the region rides along with a later save
    let target = row
        .loaded
        .as_ref()
        .map(|t| (t.trace_id.clone(), t.json_path.clone()));
    let result = match target {
        Some((Some(trace_id), _)) => app
            .store
            .as_ref()
            .map(|s| s.update(&trace_id, UpdateAction::AddTrim(region))),
        Some((None, Some(json_path))) => {
            Some(TraceStore::update_file(&json_path, UpdateAction::AddTrim(region)))
        }
        _ => None,
    };
    match result {
        Some(Ok(())) => app.notify.success("Trim region saved"),
        Some(Err(err)) => {
            log::error!("saving trim failed: {err:#}");
            app.notify.error("There was a problem saving the trim region");
        }
        None => {}
    }
}

fn delete_trim(app: &mut ApexApp, id: u64) {
    let Some(row) = app.rows.iter_mut().find(|r| r.id == id) else {
        return;
    };
    let Some(index) = row.trim.selected_region else {
        return;
    };
    if let Some(loaded) = row.loaded.as_mut() {
        if index < loaded.trace.trim.len() {
            loaded.trace.trim.remove(index);
        }
        let target = (loaded.trace_id.clone(), loaded.json_path.clone());
        let result = match target {
            (Some(trace_id), _) => app
                .store
                .as_ref()
                .map(|s| s.update(&trace_id, UpdateAction::DeleteTrim(index))),
            (None, Some(json_path)) => {
                Some(TraceStore::update_file(&json_path, UpdateAction::DeleteTrim(index)))
            }
            _ => None,
        };
        if let Some(Err(err)) = result {
            log::error!("deleting trim failed: {err:#}");
            app.notify.error("Updating unsuccessful");
        }
    }
    row.show_full_series(&mut app.relay);
}
