//! Stored-trace list view: search, open, rename, delete, fix a missing
//! video path.

use egui::{Color32, RichText};

use crate::app::row::RowTrace;
use crate::app::{ApexApp, AppView};
use crate::storage::UpdateAction;

enum LoadAction {
    Back,
    Open(usize),
    StartRename(String, String),
    CommitRename,
    CancelRename,
    Delete(String),
    FixPath(String),
}

impl ApexApp {
    /// Re-query the store for the list view.
    pub(crate) fn refresh_load_list(&mut self) {
        let Some(store) = self.store.as_ref() else {
            self.load_list.clear();
            return;
        };
        match store.read_all() {
            Ok(list) => self.load_list = list,
            Err(err) => {
                log::error!("listing traces failed: {err:#}");
                self.notify.error("There was a problem listing saved traces");
                self.load_list.clear();
            }
        }
    }
}

pub fn load_view(app: &mut ApexApp, ctx: &egui::Context) {
    let mut actions: Vec<LoadAction> = Vec::new();

    egui::TopBottomPanel::top("load-header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                actions.push(LoadAction::Back);
            }
            ui.heading("Saved traces");
            ui.add(
                egui::TextEdit::singleline(&mut app.search)
                    .hint_text("Search")
                    .desired_width(220.0),
            );
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        let needle = app.search.to_lowercase();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (index, summary) in app.load_list.iter().enumerate() {
                if !needle.is_empty() && !summary.title.to_lowercase().contains(&needle) {
                    continue;
                }
                ui.horizontal(|ui| {
                    let renaming = app
                        .rename_edit
                        .as_ref()
                        .map(|(id, _)| *id == summary.trace_id)
                        .unwrap_or(false);
                    if renaming {
                        let (_, text) = app.rename_edit.as_mut().expect("checked above");
                        let response = ui.text_edit_singleline(text);
                        ui.weak("Press Enter to save");
                        if response.lost_focus() {
                            if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                                actions.push(LoadAction::CommitRename);
                            } else {
                                actions.push(LoadAction::CancelRename);
                            }
                        }
                    } else {
                        let label = ui.add(
                            egui::Label::new(RichText::new(&summary.title).size(16.0))
                                .sense(egui::Sense::click()),
                        );
                        if label.clicked() {
                            actions.push(LoadAction::Open(index));
                        }
                    }

                    if !summary.video_found {
                        ui.label(
                            RichText::new("⚠ Video missing").color(Color32::YELLOW),
                        )
                        .on_hover_text(
                            summary
                                .video_path
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default(),
                        );
                        if ui.button("Fix path").clicked() {
                            actions.push(LoadAction::FixPath(summary.trace_id.clone()));
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Delete").clicked() {
                            actions.push(LoadAction::Delete(summary.trace_id.clone()));
                        }
                        if ui.button("Rename").clicked() {
                            actions.push(LoadAction::StartRename(
                                summary.trace_id.clone(),
                                summary.title.clone(),
                            ));
                        }
                    });
                });
                ui.separator();
            }
            if app.load_list.is_empty() {
                ui.weak("No saved traces yet");
            }
        });
    });

    apply_actions(app, actions);
}

fn apply_actions(app: &mut ApexApp, actions: Vec<LoadAction>) {
    for action in actions {
        match action {
            LoadAction::Back => {
                app.view = AppView::Main;
                app.rename_edit = None;
            }
            LoadAction::Open(index) => open_trace(app, index),
            LoadAction::StartRename(trace_id, title) => {
                app.rename_edit = Some((trace_id, title));
            }
            LoadAction::CancelRename => app.rename_edit = None,
            LoadAction::CommitRename => {
                if let Some((trace_id, title)) = app.rename_edit.take() {
                    let title = title.trim().to_string();
                    if title.is_empty() {
                        continue;
                    }
                    let result = app
                        .store
                        .as_ref()
                        .map(|s| s.update(&trace_id, UpdateAction::Title(title)));
                    match result {
                        Some(Ok(())) => app.notify.success("Updating successful"),
                        Some(Err(err)) => {
                            log::error!("rename failed: {err:#}");
                            app.notify.error("Updating unsuccessful");
                        }
                        None => {}
                    }
                    app.refresh_load_list();
                }
            }
            LoadAction::Delete(trace_id) => {
                let result = app.store.as_ref().map(|s| s.delete(&trace_id));
                if let Some(Err(err)) = result {
                    log::error!("delete failed: {err:#}");
                    app.notify.error("There was a problem deleting the trace");
                }
                app.refresh_load_list();
            }
            LoadAction::FixPath(trace_id) => {
                let picked = rfd::FileDialog::new()
                    .add_filter("Movies", &["mp4"])
                    .pick_file();
                if let Some(path) = picked {
                    let result = app
                        .store
                        .as_ref()
                        .map(|s| s.update(&trace_id, UpdateAction::VideoPath(path)));
                    if let Some(Err(err)) = result {
                        log::error!("fixing video path failed: {err:#}");
                        app.notify.error("Updating unsuccessful");
                    }
                    app.refresh_load_list();
                }
            }
        }
    }
}

fn open_trace(app: &mut ApexApp, index: usize) {
    let Some(summary) = app.load_list.get(index).cloned() else {
        return;
    };
    let Some(store) = app.store.as_ref() else {
        return;
    };
    let loaded = match store.read(&summary.trace_path) {
        Ok(loaded) => loaded,
        Err(err) => {
            log::error!("loading trace failed: {err:#}");
            app.notify.error("There was a problem loading this trace");
            return;
        }
    };

    let Some(row) = app.rows.iter_mut().find(|r| r.id == app.load_for_row) else {
        app.notify.error("There was a problem loading this trace");
        return;
    };
    let duration = loaded.trace.duration();
    let player = row.player;
    row.set_trace(
        RowTrace {
            trace: loaded.trace,
            video_path: loaded.video_path,
            json_path: Some(summary.trace_path.clone()),
            trace_id: Some(summary.trace_id.clone()),
        },
        &mut app.relay,
    );
    if let Some(p) = app.players.get_mut(player) {
        p.open(duration);
    }
    app.view = AppView::Main;
    app.refresh_overlays();
}
