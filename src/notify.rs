//! Non-blocking toast notifications.
//!
//! Transient faults (a failed save, a processing error) surface here;
//! they stack in the bottom-right corner and expire on their own.

use std::time::{Duration, Instant};

use egui::{Align2, Color32, Vec2};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

struct Notice {
    message: String,
    level: NoticeLevel,
    created: Instant,
}

#[derive(Default)]
pub struct Notifications {
    notices: Vec<Notice>,
}

impl Notifications {
    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message.into(), NoticeLevel::Success);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), NoticeLevel::Error);
    }

    fn push(&mut self, message: String, level: NoticeLevel) {
        log::debug!("notify: {message}");
        self.notices.push(Notice { message, level, created: Instant::now() });
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        self.notices.retain(|n| n.created.elapsed() < TOAST_TTL);
        if self.notices.is_empty() {
            return;
        }
        // keep repainting so toasts expire without user input
        ctx.request_repaint_after(Duration::from_millis(250));

        egui::Area::new(egui::Id::new("toast-area"))
            .anchor(Align2::RIGHT_BOTTOM, Vec2::new(-12.0, -12.0))
            .show(ctx, |ui| {
                for notice in self.notices.iter().rev() {
                    let fill = match notice.level {
                        NoticeLevel::Success => Color32::from_rgb(30, 90, 45),
                        NoticeLevel::Error => Color32::from_rgb(120, 40, 40),
                    };
                    egui::Frame::window(ui.style())
                        .fill(fill)
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(&notice.message).color(Color32::WHITE),
                            );
                        });
                    ui.add_space(4.0);
                }
            });
    }
}
