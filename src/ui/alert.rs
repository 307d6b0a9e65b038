use crate::tracking::notify::{Alert, Notifier};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Alerts waiting to be shown as egui modals, oldest first.
///
/// Clones share one queue, so the controller can hold one as its
/// [`Notifier`] while the UI drains another.
#[derive(Clone, Default)]
pub struct AlertQueue {
    pending: Arc<Mutex<VecDeque<Alert>>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The alert currently on screen
    pub fn current(&self) -> Option<Alert> {
        self.pending
            .lock()
            .ok()
            .and_then(|queue| queue.front().cloned())
    }

    /// Acknowledges the alert on screen
    pub fn dismiss(&self) -> Option<Alert> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
    }

    /// Shows the oldest pending alert as a centered modal window.
    ///
    /// Returns the label of the button pressed this frame, if any.
    pub fn show(&self, ctx: &egui::Context) -> Option<String> {
        let alert = self.current()?;
        let mut pressed = None;

        egui::Window::new(alert.header.as_str())
            .id(egui::Id::new("tracklet_alert"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(alert.message.as_str());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    for button in &alert.buttons {
                        if ui.button(button.as_str()).clicked() {
                            pressed = Some(button.clone());
                        }
                    }
                });
            });

        if pressed.is_some() {
            self.dismiss();
        }
        pressed
    }
}

impl Notifier for AlertQueue {
    fn notify(&self, alert: Alert) {
        log::debug!("queueing alert '{}'", alert.header);
        if let Ok(mut queue) = self.pending.lock() {
            queue.push_back(alert);
        }
    }
}
