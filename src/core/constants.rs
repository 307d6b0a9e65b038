//! Core constants derived from Leaflet defaults and the tracking screen's
//! fixed behaviour. Keeping them in a single place makes it easier to tweak
//! the magic numbers; runtime overrides go through [`crate::core::config`].

use std::time::Duration;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Map center used before the first coordinate arrives.
pub const DEFAULT_CENTER: (f64, f64) = (-6.3276, 107.289);

/// Zoom level used before the first coordinate arrives.
pub const DEFAULT_ZOOM: f64 = 6.0;

/// Polls re-center at this zoom unless the user has zoomed in further.
pub const FOLLOW_ZOOM: f64 = 12.0;

/// Zoom used by the manual "focus on marker" action.
pub const FOCUS_ZOOM: f64 = 20.0;

pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 20.0;

/// Programmatic +/- zoom step.
pub const DEFAULT_ZOOM_DELTA: f64 = 1.0;

/// Period of the subject-location poll.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Client-side timeout for HTTP round trips.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Geolocation: accept a cached position at most this old.
pub const POSITION_MAXIMUM_AGE: Duration = Duration::from_millis(3000);

/// Geolocation: give up waiting for a fix after this long.
pub const POSITION_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Marker icon default size (regular PNG).
pub const MARKER_ICON_SIZE: (u32, u32) = (25, 41);

/// Anchor inside the icon (hot-spot) in pixel coords.
pub const MARKER_ICON_ANCHOR: (u32, u32) = (12, 41);

pub const MARKER_ICON_URL: &str = "https://unpkg.com/leaflet@1.7.1/dist/images/marker-icon.png";
pub const MARKER_SHADOW_URL: &str =
    "https://unpkg.com/leaflet@1.7.1/dist/images/marker-shadow.png";

/// Popup label bound to the subject marker.
pub const MARKER_POPUP_TEXT: &str = "Saya Disini!";

/// Layer ids owned by the tracking screen.
pub const SUBJECT_MARKER_ID: &str = "subject-marker";
pub const BASE_TILE_LAYER_ID: &str = "osm";
