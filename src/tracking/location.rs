//! Device geolocation.
//!
//! A [`LocationProvider`] is chosen once at startup from [`ProviderKind`]:
//! the native provider walks the permission check/request dance before
//! asking for a fix, the browser provider only checks that a geolocation
//! capability exists. Both read positions from a [`GeolocationBackend`].

use crate::{
    core::{
        config::{serde_millis, BackendConfig, LocationConfig},
        constants::{POSITION_MAXIMUM_AGE, POSITION_TIMEOUT},
    },
    tracking::model::Coordinate,
    Error, Result,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("geolocation is not supported on this host")]
    Unsupported,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("geolocation platform error: {0}")]
    Platform(String),
}

pub type LocationResult<T> = std::result::Result<T, LocationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet; asking will prompt the user
    Prompt,
}

/// Options for a single position request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOptions {
    /// A cached fix at most this old may be returned instead of a new one
    #[serde(with = "serde_millis")]
    pub maximum_age: Duration,
    #[serde(with = "serde_millis")]
    pub timeout: Duration,
    pub enable_high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            maximum_age: POSITION_MAXIMUM_AGE,
            timeout: POSITION_TIMEOUT,
            enable_high_accuracy: true,
        }
    }
}

/// Which host environment the screen runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Native or hybrid shell with an explicit permission model
    #[default]
    Native,
    /// Browser-style geolocation: available or not, no permission API
    Browser,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "hybrid" => Ok(ProviderKind::Native),
            "browser" | "web" => Ok(ProviderKind::Browser),
            other => Err(Error::Config(format!(
                "unknown location provider '{}', expected 'native' or 'browser'",
                other
            ))),
        }
    }
}

/// Platform capability that actually produces position fixes
#[async_trait]
pub trait GeolocationBackend: Send + Sync {
    /// Whether this host can produce a position at all
    fn is_supported(&self) -> bool {
        true
    }

    async fn check_permissions(&self) -> LocationResult<PermissionState> {
        Ok(PermissionState::Granted)
    }

    async fn request_permissions(&self) -> LocationResult<PermissionState> {
        Ok(PermissionState::Granted)
    }

    async fn get_current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate>;
}

/// How the send-own-location action ends when no position could be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHandling {
    /// End quietly; the user has to grant access in the system settings
    Quiet,
    /// Show the "unsupported" alert
    Unsupported,
    /// Show the failure alert
    Alert,
    /// Show the failure alert and hand the error back to the caller
    AlertAndPropagate,
}

/// Device location capability used by the send-own-location action
#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate>;

    /// How a failed [`current_position`](Self::current_position) is surfaced
    fn handle_failure(&self, error: &LocationError) -> FailureHandling;
}

pub struct NativeLocationProvider {
    backend: Arc<dyn GeolocationBackend>,
}

impl NativeLocationProvider {
    pub fn new(backend: Arc<dyn GeolocationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl LocationProvider for NativeLocationProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Native
    }

    async fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate> {
        let status = self.backend.check_permissions().await?;
        log::debug!("location permission status: {:?}", status);

        if status != PermissionState::Granted {
            let requested = self.backend.request_permissions().await?;
            if requested != PermissionState::Granted {
                return Err(LocationError::PermissionDenied);
            }
        }

        let position = self.backend.get_current_position(options).await?;
        log::debug!("native position fix {}", position);
        Ok(position)
    }

    fn handle_failure(&self, error: &LocationError) -> FailureHandling {
        match error {
            LocationError::PermissionDenied => FailureHandling::Quiet,
            _ => FailureHandling::AlertAndPropagate,
        }
    }
}

pub struct BrowserLocationProvider {
    backend: Arc<dyn GeolocationBackend>,
}

impl BrowserLocationProvider {
    pub fn new(backend: Arc<dyn GeolocationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl LocationProvider for BrowserLocationProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Browser
    }

    async fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate> {
        if !self.backend.is_supported() {
            return Err(LocationError::Unsupported);
        }

        let position = self.backend.get_current_position(options).await?;
        log::debug!("browser position fix {}", position);
        Ok(position)
    }

    fn handle_failure(&self, error: &LocationError) -> FailureHandling {
        match error {
            LocationError::Unsupported => FailureHandling::Unsupported,
            _ => FailureHandling::Alert,
        }
    }
}

/// A device that never moves
pub struct FixedPosition {
    coordinate: Coordinate,
}

impl FixedPosition {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl GeolocationBackend for FixedPosition {
    async fn get_current_position(&self, _options: &PositionOptions) -> LocationResult<Coordinate> {
        Ok(self.coordinate)
    }
}

/// A host with no geolocation capability
pub struct NoGeolocation;

#[async_trait]
impl GeolocationBackend for NoGeolocation {
    fn is_supported(&self) -> bool {
        false
    }

    async fn get_current_position(&self, _options: &PositionOptions) -> LocationResult<Coordinate> {
        Err(LocationError::Unsupported)
    }
}

/// Shared client for geo-IP lookups; per-request timeouts come from
/// [`PositionOptions::timeout`].
static GEO_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("tracklet/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            log::warn!("falling back to default HTTP client for geolocation: {}", err);
            reqwest::Client::new()
        })
});

#[derive(Debug, Deserialize)]
struct GeoIpBody {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon", alias = "lng")]
    longitude: Option<f64>,
}

/// Network geolocation through a geo-IP JSON service
pub struct IpGeolocation {
    url: String,
    client: reqwest::Client,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl IpGeolocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(GEO_CLIENT.clone(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinate> {
        let guard = self.last_fix.lock().ok()?;
        let (taken_at, coordinate) = (*guard)?;
        (taken_at.elapsed() <= maximum_age).then_some(coordinate)
    }

    fn remember(&self, coordinate: Coordinate) {
        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some((Instant::now(), coordinate));
        }
    }

    async fn lookup(&self, timeout: Duration) -> LocationResult<Coordinate> {
        let response = self
            .client
            .get(&self.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "geo-IP lookup returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: GeoIpBody = response.json().await.map_err(classify_request_error)?;
        match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => {
                let coordinate = Coordinate::new(latitude, longitude);
                if coordinate.is_valid() {
                    Ok(coordinate)
                } else {
                    Err(LocationError::Unavailable(format!(
                        "geo-IP lookup returned {}",
                        coordinate
                    )))
                }
            }
            _ => Err(LocationError::Unavailable(
                "geo-IP response has no coordinates".to_string(),
            )),
        }
    }
}

fn classify_request_error(err: reqwest::Error) -> LocationError {
    if err.is_timeout() {
        LocationError::Timeout
    } else if err.is_decode() {
        LocationError::Unavailable(err.to_string())
    } else {
        LocationError::Platform(err.to_string())
    }
}

#[async_trait]
impl GeolocationBackend for IpGeolocation {
    async fn get_current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate> {
        if let Some(coordinate) = self.cached(options.maximum_age) {
            log::debug!("reusing cached position {}", coordinate);
            return Ok(coordinate);
        }

        if options.enable_high_accuracy {
            log::debug!("geo-IP lookup cannot honour high accuracy; using network position");
        }

        let coordinate = self.lookup(options.timeout).await?;
        self.remember(coordinate);
        Ok(coordinate)
    }
}

/// Builds the geolocation backend described by `config`
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn GeolocationBackend>> {
    let backend: Arc<dyn GeolocationBackend> = match config {
        BackendConfig::GeoIp { url } => Arc::new(IpGeolocation::new(url.clone())),
        BackendConfig::Fixed {
            latitude,
            longitude,
        } => {
            let coordinate = Coordinate::new(*latitude, *longitude);
            if !coordinate.is_valid() {
                return Err(Error::InvalidCoordinates(coordinate.to_string()));
            }
            Arc::new(FixedPosition::new(coordinate))
        }
        BackendConfig::Unavailable => Arc::new(NoGeolocation),
    };
    Ok(backend)
}

/// Selects the location provider for this host once, at startup
pub fn provider_from_config(config: &LocationConfig) -> Result<Arc<dyn LocationProvider>> {
    let backend = backend_from_config(&config.backend)?;
    log::info!("using {:?} location provider", config.provider);

    let provider: Arc<dyn LocationProvider> = match config.provider {
        ProviderKind::Native => Arc::new(NativeLocationProvider::new(backend)),
        ProviderKind::Browser => Arc::new(BrowserLocationProvider::new(backend)),
    };
    Ok(provider)
}
