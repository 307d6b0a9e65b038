//! The tracking screen controller.
//!
//! [`TrackingController`] owns the map and the subject marker and implements
//! the screen's four operations. [`TrackingScreen`] ties the controller to a
//! screen lifecycle: polling starts on init, the map is built when the view
//! is entered, and the polling task is cancelled on teardown.

use crate::{
    core::{
        config::TrackerConfig,
        constants::{BASE_TILE_LAYER_ID, SUBJECT_MARKER_ID},
        geo::LatLng,
        map::{Map, MapOptions},
        viewport::Viewport,
    },
    layers::{marker::Marker, tile::TileLayer},
    tracking::{
        api::{HttpTrackingApi, TrackingApi},
        location::{provider_from_config, FailureHandling, LocationProvider},
        model::Coordinate,
        notify::{Alert, Notifier},
        poller::PollingTask,
    },
    Error, Result,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

/// What a single poll did to the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// Marker replaced at the new coordinate
    Updated(Coordinate),
    /// The endpoint reported no location
    NoData,
    /// A coordinate arrived before the map was created
    MapNotReady(Coordinate),
    /// A later poll was already applied; this response was dropped
    Stale(Coordinate),
}

/// How a send-own-location attempt ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendOutcome {
    /// Position reported; success alert shown
    Sent(Coordinate),
    /// Report request failed; failure alert shown
    ReportFailed(Coordinate),
    /// Native permission refused; nothing shown
    PermissionDenied,
    /// Browser host without geolocation; unsupported alert shown
    Unsupported,
    /// Browser position request failed; failure alert shown
    LocationFailed,
}

struct MapState {
    map: Option<Map>,
    /// Sequence number of the last poll whose coordinate reached the map
    applied_seq: u64,
}

struct Inner {
    config: TrackerConfig,
    api: Arc<dyn TrackingApi>,
    locator: Arc<dyn LocationProvider>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<MapState>,
    issued_seq: AtomicU64,
}

/// Cheap to clone; clones share the same map and marker
#[derive(Clone)]
pub struct TrackingController {
    inner: Arc<Inner>,
}

impl TrackingController {
    pub fn new(
        config: TrackerConfig,
        api: Arc<dyn TrackingApi>,
        locator: Arc<dyn LocationProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                api,
                locator,
                notifier,
                state: Mutex::new(MapState {
                    map: None,
                    applied_seq: 0,
                }),
                issued_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Wires the HTTP API and the configured location provider
    pub fn from_config(config: TrackerConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(HttpTrackingApi::new(&config.api)?);
        let locator = provider_from_config(&config.location)?;
        Ok(Self::new(config, api, locator, notifier))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, MapState> {
        // A panic while holding the lock leaves the map usable
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates the map at the default view with the base tile layer.
    ///
    /// Returns `false` when a map already exists; it is kept as is.
    pub fn create_map(&self) -> Result<bool> {
        let mut state = self.state();
        if state.map.is_some() {
            log::debug!("map already created, keeping the current view");
            return Ok(false);
        }

        let settings = &self.inner.config.map;
        let viewport = Viewport::new(
            settings.default_center,
            settings.default_zoom,
            settings.view_size,
        );
        let options = MapOptions {
            min_zoom: Some(settings.min_zoom),
            max_zoom: Some(settings.max_zoom),
            ..Default::default()
        };
        let mut map = Map::with_options(viewport, options);
        map.set_view(settings.default_center, settings.default_zoom)?;

        let tiles = TileLayer::from_template(
            BASE_TILE_LAYER_ID.to_string(),
            &settings.tile_url_template,
            &settings.attribution,
        );
        map.add_layer(Box::new(tiles))?;

        log::debug!(
            "map created at {} zoom {}",
            settings.default_center,
            settings.default_zoom
        );
        state.map = Some(map);
        Ok(true)
    }

    pub fn has_map(&self) -> bool {
        self.state().map.is_some()
    }

    /// Runs `f` against the map, if it exists
    pub fn with_map<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Map) -> R,
    {
        self.state().map.as_ref().map(f)
    }

    /// Runs `f` against the map mutably, if it exists
    pub fn with_map_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Map) -> R,
    {
        self.state().map.as_mut().map(f)
    }

    /// Position of the subject marker, if one is on the map
    pub fn marker_position(&self) -> Option<LatLng> {
        self.with_map(|map| {
            map.get_layer_as::<Marker>(SUBJECT_MARKER_ID)
                .map(Marker::position)
        })
        .flatten()
    }

    /// Polls the subject-location endpoint once and moves the marker.
    ///
    /// Transport and parse failures are logged and returned; the map is left
    /// untouched. An empty response leaves the marker where it was.
    pub async fn load_location_data(&self) -> Result<PollOutcome> {
        let seq = self.inner.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("poll #{} issued", seq);

        let coordinate = match self.inner.api.fetch_subject_location().await {
            Ok(Some(coordinate)) => coordinate,
            Ok(None) => {
                log::warn!("poll #{}: no location data found", seq);
                return Ok(PollOutcome::NoData);
            }
            Err(err) => {
                log::error!("poll #{}: failed to fetch subject location: {}", seq, err);
                return Err(err);
            }
        };

        if !coordinate.is_valid() {
            log::error!("poll #{}: subject location {} is out of range", seq, coordinate);
            return Err(Error::InvalidCoordinates(coordinate.to_string()));
        }
        log::info!("poll #{}: subject at {}", seq, coordinate);

        let mut state = self.state();
        if seq <= state.applied_seq {
            log::warn!(
                "poll #{} answered after poll #{} was applied, dropping {}",
                seq,
                state.applied_seq,
                coordinate
            );
            return Ok(PollOutcome::Stale(coordinate));
        }

        let Some(map) = state.map.as_mut() else {
            log::warn!("poll #{}: map not ready, skipping {}", seq, coordinate);
            return Ok(PollOutcome::MapNotReady(coordinate));
        };

        self.place_subject_marker(map, coordinate)?;
        state.applied_seq = seq;
        Ok(PollOutcome::Updated(coordinate))
    }

    /// Replaces the subject marker and follows it.
    ///
    /// At or below the follow zoom the view jumps to the subject at the
    /// follow zoom; above it the view only pans so a zoom the user picked
    /// is kept.
    fn place_subject_marker(&self, map: &mut Map, coordinate: Coordinate) -> Result<()> {
        let settings = &self.inner.config.map;
        let position = coordinate.to_lat_lng();

        map.remove_layer(SUBJECT_MARKER_ID);
        let marker = Marker::new(SUBJECT_MARKER_ID.to_string(), position)
            .with_icon(settings.marker_icon.clone())
            .with_popup(settings.popup_text.clone());
        map.add_layer(Box::new(marker))?;

        if map.zoom() <= settings.follow_zoom {
            map.set_view(position, settings.follow_zoom)
        } else {
            map.pan_to(position)
        }
    }

    /// Zooms in on the subject marker. Returns `false` without touching the
    /// view when there is no marker yet.
    pub fn focus_on_location(&self) -> bool {
        let focus_zoom = self.inner.config.map.focus_zoom;
        let mut state = self.state();

        let Some(map) = state.map.as_mut() else {
            log::info!("focus requested before the map exists");
            return false;
        };
        let Some(position) = map
            .get_layer_as::<Marker>(SUBJECT_MARKER_ID)
            .map(Marker::position)
        else {
            log::info!("marker not available, nothing to focus");
            return false;
        };

        match map.set_view(position, focus_zoom) {
            Ok(()) => {
                log::debug!("focused on {} at zoom {}", position, focus_zoom);
                true
            }
            Err(err) => {
                log::error!("failed to focus on {}: {}", position, err);
                false
            }
        }
    }

    /// Reads the device position and reports it.
    ///
    /// When no position can be read, the provider decides how the attempt
    /// ends: quietly, with an alert, or with an alert and an `Err`.
    pub async fn get_current_location(&self) -> Result<SendOutcome> {
        let locator = &self.inner.locator;
        log::debug!("reading device location ({:?})", locator.kind());

        let error = match locator.current_position(&self.inner.config.location.options).await {
            Ok(coordinate) => return Ok(self.send_location_to_api(coordinate).await),
            Err(error) => error,
        };

        match locator.handle_failure(&error) {
            FailureHandling::Quiet => {
                log::warn!("location permission not granted; check the system settings");
                Ok(SendOutcome::PermissionDenied)
            }
            FailureHandling::Unsupported => {
                log::error!("geolocation is not supported on this host");
                self.inner.notifier.notify(Alert::unsupported());
                Ok(SendOutcome::Unsupported)
            }
            FailureHandling::Alert => {
                log::error!("error getting location: {}", error);
                self.inner.notifier.notify(Alert::send_failed());
                Ok(SendOutcome::LocationFailed)
            }
            FailureHandling::AlertAndPropagate => {
                log::error!("failed to read device location: {}", error);
                self.inner.notifier.notify(Alert::send_failed());
                Err(error.into())
            }
        }
    }

    /// Posts `coordinate` to the report endpoint and shows the result
    pub async fn send_location_to_api(&self, coordinate: Coordinate) -> SendOutcome {
        match self.inner.api.report_location(coordinate).await {
            Ok(()) => {
                log::info!("reported own location {}", coordinate);
                self.inner.notifier.notify(Alert::sent());
                SendOutcome::Sent(coordinate)
            }
            Err(err) => {
                log::error!("failed to report own location {}: {}", coordinate, err);
                self.inner.notifier.notify(Alert::send_failed());
                SendOutcome::ReportFailed(coordinate)
            }
        }
    }
}

/// Lifecycle owner of a tracking screen
pub struct TrackingScreen {
    controller: TrackingController,
    polling: Option<PollingTask>,
}

impl TrackingScreen {
    pub fn new(controller: TrackingController) -> Self {
        Self {
            controller,
            polling: None,
        }
    }

    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    /// Starts the repeating poll. Calling it again while polling is a no-op.
    pub fn on_init(&mut self) -> Result<()> {
        if self.is_polling() {
            log::debug!("polling already running");
            return Ok(());
        }

        let controller = self.controller.clone();
        let task = PollingTask::start(self.controller.config().polling.interval, move || {
            let controller = controller.clone();
            async move {
                // Failures are already logged; the next tick retries
                let _ = controller.load_location_data().await;
            }
        })?;

        self.polling = Some(task);
        Ok(())
    }

    /// Creates the map and polls once right away
    pub async fn on_view_enter(&self) -> Result<PollOutcome> {
        self.controller.create_map()?;
        self.controller.load_location_data().await
    }

    /// Cancels the repeating poll
    pub fn on_destroy(&mut self) {
        if let Some(task) = self.polling.take() {
            task.cancel();
            log::info!("tracking screen closed, polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.polling.as_ref().is_some_and(PollingTask::is_active)
    }
}

impl Drop for TrackingScreen {
    fn drop(&mut self) {
        self.on_destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{
        location::{LocationError, PositionOptions, ProviderKind},
        notify::Notifier,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Serves queued poll responses; reports always succeed
    #[derive(Default)]
    struct QueueApi {
        polls: Mutex<VecDeque<Result<Option<Coordinate>>>>,
    }

    impl QueueApi {
        fn push(&self, response: Result<Option<Coordinate>>) {
            self.polls.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl TrackingApi for QueueApi {
        async fn fetch_subject_location(&self) -> Result<Option<Coordinate>> {
            self.polls.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn report_location(&self, _coordinate: Coordinate) -> Result<()> {
            Ok(())
        }
    }

    struct Unused;

    #[async_trait]
    impl LocationProvider for Unused {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Native
        }

        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> std::result::Result<Coordinate, LocationError> {
            Err(LocationError::Unsupported)
        }

        fn handle_failure(&self, _error: &LocationError) -> FailureHandling {
            FailureHandling::AlertAndPropagate
        }
    }

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _alert: Alert) {}
    }

    fn controller(api: Arc<QueueApi>) -> TrackingController {
        TrackingController::new(TrackerConfig::default(), api, Arc::new(Unused), Arc::new(Silent))
    }

    #[tokio::test]
    async fn test_create_map_uses_defaults() {
        let controller = controller(Arc::new(QueueApi::default()));
        assert!(controller.create_map().unwrap());
        assert!(!controller.create_map().unwrap());

        let (center, zoom, layers) = controller
            .with_map(|map| (map.center(), map.zoom(), map.list_layers()))
            .unwrap();
        assert_eq!(center, LatLng::new(-6.3276, 107.289));
        assert_eq!(zoom, 6.0);
        assert_eq!(layers, vec!["osm"]);
    }

    #[tokio::test]
    async fn test_poll_before_map_is_not_applied() {
        let api = Arc::new(QueueApi::default());
        api.push(Ok(Some(Coordinate::new(-6.2, 106.8))));
        let controller = controller(api.clone());

        let outcome = controller.load_location_data().await.unwrap();
        assert_eq!(outcome, PollOutcome::MapNotReady(Coordinate::new(-6.2, 106.8)));

        // A later poll still applies once the map exists
        controller.create_map().unwrap();
        api.push(Ok(Some(Coordinate::new(-6.3, 106.9))));
        let outcome = controller.load_location_data().await.unwrap();
        assert_eq!(outcome, PollOutcome::Updated(Coordinate::new(-6.3, 106.9)));
    }

    #[tokio::test]
    async fn test_out_of_range_coordinate_rejected() {
        let api = Arc::new(QueueApi::default());
        api.push(Ok(Some(Coordinate::new(-200.0, 106.8))));
        let controller = controller(api);
        controller.create_map().unwrap();

        assert!(controller.load_location_data().await.is_err());
        assert_eq!(controller.marker_position(), None);
    }

    #[tokio::test]
    async fn test_marker_carries_icon_and_popup() {
        let api = Arc::new(QueueApi::default());
        api.push(Ok(Some(Coordinate::new(-6.2, 106.8))));
        let controller = controller(api);
        controller.create_map().unwrap();
        controller.load_location_data().await.unwrap();

        let (popup, icon_size) = controller
            .with_map(|map| {
                let marker = map.get_layer_as::<Marker>(SUBJECT_MARKER_ID).unwrap();
                (
                    marker.popup_text().map(str::to_string),
                    marker.icon().icon_size,
                )
            })
            .unwrap();
        assert_eq!(popup.as_deref(), Some("Saya Disini!"));
        assert_eq!(icon_size, (25, 41));
    }

    #[tokio::test]
    async fn test_focus_before_map_is_noop() {
        let controller = controller(Arc::new(QueueApi::default()));
        assert!(!controller.focus_on_location());
    }
}
