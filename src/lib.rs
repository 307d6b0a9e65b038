//! # Tracklet
//!
//! Follow a tracked subject on a slippy map.
//!
//! The library polls a remote API for the subject's last known coordinate,
//! keeps a single marker on a Leaflet-style map model in sync with it, and
//! reports the device's own position to a companion API. The map model,
//! layers and viewport live in [`core`] and [`layers`]; the screen logic
//! lives in [`tracking`]; an optional egui view lives in `ui`.

pub mod core;
pub mod input;
pub mod layers;
pub mod prelude;
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
pub mod tiles;
pub mod tracking;
#[cfg(feature = "egui")]
pub mod ui;

pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::TrackerConfig,
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use layers::{base::LayerTrait, marker::Marker, tile::TileLayer};

pub use input::{events::InputEvent, events::MapEvent, handler::InputHandler};

pub use tracking::{
    api::{HttpTrackingApi, TrackingApi},
    location::{LocationError, LocationProvider},
    model::Coordinate,
    notify::{Alert, Notifier},
};

#[cfg(feature = "tokio-runtime")]
pub use tracking::controller::{TrackingController, TrackingScreen};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),
}

/// Error type alias for convenience
pub type Error = TrackerError;
