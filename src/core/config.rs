//! Configuration for the tracking screen
//!
//! Every tunable the screen uses lives here: the two API endpoints, the poll
//! period, the map defaults and the geolocation settings. Values start from
//! [`Default`] and can be overridden from environment variables
//! ([`TrackerConfig::from_env`]) or a JSON file
//! ([`TrackerConfig::from_json_file`]).

use crate::{
    core::{
        constants::{
            DEFAULT_CENTER, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_ZOOM, FOCUS_ZOOM,
            FOLLOW_ZOOM, MARKER_POPUP_TEXT, OSM_ATTRIBUTION, OSM_TILE_URL, POLL_INTERVAL,
            REQUEST_TIMEOUT,
        },
        geo::{LatLng, Point},
    },
    layers::marker::MarkerIcon,
    tracking::location::{PositionOptions, ProviderKind},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

pub const ENV_SUBJECT_LOCATION_URL: &str = "TRACKLET_SUBJECT_LOCATION_URL";
pub const ENV_SUBJECT_REPORT_URL: &str = "TRACKLET_SUBJECT_REPORT_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "TRACKLET_POLL_INTERVAL_MS";
pub const ENV_LOCATION_PROVIDER: &str = "TRACKLET_LOCATION_PROVIDER";
pub const ENV_GEOIP_URL: &str = "TRACKLET_GEOIP_URL";
pub const ENV_FIXED_POSITION: &str = "TRACKLET_FIXED_POSITION";

/// Default geo-IP lookup used by the network geolocation backend
pub const DEFAULT_GEOIP_URL: &str = "https://ipapi.co/json/";

/// Serializes a [`Duration`] as whole milliseconds
pub(crate) mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub map: MapConfig,
    pub location: LocationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GET endpoint returning `{ "data": [ { "latitude", "longitude" } ] }`
    pub subject_location_url: String,
    /// POST endpoint accepting `{ "latitude", "longitude" }`
    pub subject_report_url: String,
    #[serde(with = "serde_millis")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            subject_location_url: String::new(),
            subject_report_url: String::new(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(with = "serde_millis")]
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub default_center: LatLng,
    pub default_zoom: f64,
    /// Polls re-center at this zoom while the view is at or below it
    pub follow_zoom: f64,
    /// Zoom used by the focus action
    pub focus_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Initial container size; the view reports the real size once laid out
    pub view_size: Point,
    pub tile_url_template: String,
    pub attribution: String,
    pub popup_text: String,
    pub marker_icon: MarkerIcon,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: LatLng::from(DEFAULT_CENTER),
            default_zoom: DEFAULT_ZOOM,
            follow_zoom: FOLLOW_ZOOM,
            focus_zoom: FOCUS_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            view_size: Point::new(800.0, 600.0),
            tile_url_template: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            popup_text: MARKER_POPUP_TEXT.to_string(),
            marker_icon: MarkerIcon::default(),
        }
    }
}

/// Where the geolocation backend gets its fix from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Network lookup against a geo-IP JSON service
    GeoIp { url: String },
    /// A stationary device at a known coordinate
    Fixed { latitude: f64, longitude: f64 },
    /// No geolocation capability on this host
    Unavailable,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::GeoIp {
            url: DEFAULT_GEOIP_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub provider: ProviderKind,
    pub options: PositionOptions,
    pub backend: BackendConfig,
}

impl TrackerConfig {
    /// Builds a config from the process environment.
    ///
    /// Both endpoint variables are required; everything else falls back to
    /// the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source with the same variable names
    /// as [`TrackerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let mut config = TrackerConfig::default();
        config.api.subject_location_url = required(ENV_SUBJECT_LOCATION_URL)?;
        config.api.subject_report_url = required(ENV_SUBJECT_REPORT_URL)?;

        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be milliseconds, got '{}'",
                    ENV_POLL_INTERVAL_MS, raw
                ))
            })?;
            config.polling.interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(ENV_LOCATION_PROVIDER) {
            config.location.provider = raw.parse()?;
        }

        if let Some(url) = lookup(ENV_GEOIP_URL) {
            config.location.backend = BackendConfig::GeoIp { url };
        }

        // A fixed position wins over a geo-IP URL
        if let Some(raw) = lookup(ENV_FIXED_POSITION) {
            let position = parse_lat_lng(&raw)?;
            config.location.backend = BackendConfig::Fixed {
                latitude: position.lat,
                longitude: position.lng,
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.subject_location_url.trim().is_empty() {
            return Err(Error::Config("subject location URL is empty".to_string()));
        }
        if self.api.subject_report_url.trim().is_empty() {
            return Err(Error::Config("subject report URL is empty".to_string()));
        }
        if self.polling.interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }

        let map = &self.map;
        if map.min_zoom > map.max_zoom {
            return Err(Error::Config(format!(
                "min zoom {} exceeds max zoom {}",
                map.min_zoom, map.max_zoom
            )));
        }
        for (label, zoom) in [
            ("default", map.default_zoom),
            ("follow", map.follow_zoom),
            ("focus", map.focus_zoom),
        ] {
            if zoom < map.min_zoom || zoom > map.max_zoom {
                return Err(Error::Config(format!(
                    "{} zoom {} outside [{}, {}]",
                    label, zoom, map.min_zoom, map.max_zoom
                )));
            }
        }
        if !map.default_center.is_valid() {
            return Err(Error::InvalidCoordinates(map.default_center.to_string()));
        }

        Ok(())
    }
}

/// Parses "lat,lng"
fn parse_lat_lng(raw: &str) -> Result<LatLng> {
    let invalid = || Error::InvalidCoordinates(raw.to_string());

    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    let position = LatLng::new(lat, lng);
    if position.is_valid() {
        Ok(position)
    } else {
        Err(invalid())
    }
}
