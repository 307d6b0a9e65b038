//! Prelude module for common tracklet types and traits
//!
//! Re-exports the types most screens need with `use tracklet::prelude::*;`

pub use crate::core::{
    config::{ApiConfig, LocationConfig, MapConfig, PollingConfig, TrackerConfig},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::{Map, MapOptions},
    viewport::Viewport,
};

pub use crate::layers::{
    base::{LayerProperties, LayerTrait, LayerType},
    manager::LayerManager,
    marker::{Marker, MarkerIcon},
    tile::{TileLayer, TileLayerOptions},
};

pub use crate::input::{
    events::{InputEvent, MapEvent},
    handler::{Action, EventManager, InputHandler},
};

pub use crate::tiles::source::{TemplateTileSource, TileSource};

pub use crate::tracking::{
    api::{HttpTrackingApi, TrackingApi},
    location::{
        BrowserLocationProvider, FailureHandling, GeolocationBackend, LocationError,
        LocationProvider, NativeLocationProvider, PermissionState, PositionOptions, ProviderKind,
    },
    model::{Coordinate, LocationResponse},
    notify::{Alert, LogNotifier, Notifier},
};

#[cfg(feature = "tokio-runtime")]
pub use crate::tracking::{
    controller::{PollOutcome, SendOutcome, TrackingController, TrackingScreen},
    poller::PollingTask,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

#[cfg(feature = "egui")]
pub use crate::ui::{alert::AlertQueue, widget::TrackingMapView};

pub use crate::{Error as TrackerError, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
pub use std::pin::Pin;
