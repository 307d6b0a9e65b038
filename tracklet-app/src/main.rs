use anyhow::Context as _;
use std::{sync::Arc, time::Duration};
use tracklet::{
    runtime::{spawn, AsyncHandle},
    tracking::controller::{PollOutcome, TrackingController, TrackingScreen},
    ui::{AlertQueue, TrackingMapView},
    TrackerConfig,
};

/// How often the window redraws to pick up poll results
const REFRESH: Duration = Duration::from_millis(250);

/// Tracking screen as a desktop window.
///
/// Configuration comes from the JSON file given as the first argument, or
/// from the `TRACKLET_*` environment variables when none is given.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => TrackerConfig::from_env().context("reading TRACKLET_* environment")?,
    };

    let alerts = AlertQueue::new();
    let controller = TrackingController::from_config(config, Arc::new(alerts.clone()))
        .context("building tracking controller")?;

    let mut screen = TrackingScreen::new(controller);
    screen.on_init()?;
    match screen.on_view_enter().await {
        Ok(PollOutcome::Updated(coordinate)) => log::info!("subject at {}", coordinate),
        Ok(outcome) => log::info!("first poll: {:?}", outcome),
        // Not fatal; the timer keeps polling
        Err(err) => log::warn!("first poll failed: {}", err),
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_title("Tracklet"),
        ..Default::default()
    };

    eframe::run_native(
        "tracklet-app",
        options,
        Box::new(move |_cc| Box::new(TrackletApp::new(screen, alerts))),
    )
    .map_err(|err| anyhow::anyhow!("window closed with error: {}", err))?;

    Ok(())
}

struct TrackletApp {
    // Dropping the screen stops polling
    screen: TrackingScreen,
    alerts: AlertQueue,
    sending: Option<Box<dyn AsyncHandle>>,
}

impl TrackletApp {
    fn new(screen: TrackingScreen, alerts: AlertQueue) -> Self {
        Self {
            screen,
            alerts,
            sending: None,
        }
    }

    fn controller(&self) -> &TrackingController {
        self.screen.controller()
    }

    fn is_sending(&self) -> bool {
        self.sending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn send_own_location(&mut self) {
        let controller = self.controller().clone();
        self.sending = Some(spawn(async move {
            if let Err(err) = controller.get_current_location().await {
                log::error!("sending own location failed: {}", err);
            }
        }));
    }

    fn status_line(&self) -> String {
        let view = self
            .controller()
            .with_map(|map| (map.center(), map.zoom()));
        let marker = self.controller().marker_position();

        match (view, marker) {
            (Some((center, zoom)), Some(position)) => format!(
                "Subject {} | View {} | Zoom {:.0}",
                position, center, zoom
            ),
            (Some((center, zoom)), None) => {
                format!("Waiting for location | View {} | Zoom {:.0}", center, zoom)
            }
            (None, _) => "Map not ready".to_string(),
        }
    }
}

impl eframe::App for TrackletApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Fokus").clicked() {
                    self.controller().focus_on_location();
                }

                let sending = self.is_sending();
                if ui
                    .add_enabled(!sending, egui::Button::new("Kirim Lokasi"))
                    .clicked()
                {
                    self.send_own_location();
                }
                if sending {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(self.status_line());
                });
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.add(TrackingMapView::new(self.controller()));
            });

        self.alerts.show(ctx);

        for event in self
            .controller()
            .with_map_mut(|map| map.process_events())
            .unwrap_or_default()
        {
            log::trace!("map event {}: {:?}", event.event_type(), event);
        }

        ctx.request_repaint_after(REFRESH);
    }
}
