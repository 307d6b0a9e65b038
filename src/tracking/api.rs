//! HTTP side of the tracking screen: one GET for the subject's location and
//! one POST for the device's own position.

use crate::{
    core::config::ApiConfig,
    tracking::model::{Coordinate, LocationResponse},
    Error, Result,
};
use async_trait::async_trait;

const USER_AGENT: &str = concat!("tracklet/", env!("CARGO_PKG_VERSION"));

/// The two remote endpoints the screen talks to
#[async_trait]
pub trait TrackingApi: Send + Sync {
    /// Latest known subject coordinate, `None` when the endpoint has no data
    async fn fetch_subject_location(&self) -> Result<Option<Coordinate>>;

    /// Reports the device's own coordinate
    async fn report_location(&self, coordinate: Coordinate) -> Result<()>;
}

/// [`TrackingApi`] over plain JSON HTTP
pub struct HttpTrackingApi {
    client: reqwest::Client,
    location_url: String,
    report_url: String,
}

impl HttpTrackingApi {
    /// Builds a client with the configured request timeout
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Uses a caller-supplied client; its own timeout settings apply
    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self {
            client,
            location_url: config.subject_location_url.clone(),
            report_url: config.subject_report_url.clone(),
        }
    }

    fn check_status(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl TrackingApi for HttpTrackingApi {
    async fn fetch_subject_location(&self) -> Result<Option<Coordinate>> {
        log::debug!("GET {}", self.location_url);
        let response = self.client.get(&self.location_url).send().await?;
        Self::check_status(&response)?;

        let body = response.bytes().await?;
        let parsed: LocationResponse = serde_json::from_slice(&body)?;
        Ok(parsed.latest())
    }

    async fn report_location(&self, coordinate: Coordinate) -> Result<()> {
        log::debug!("POST {} {}", self.report_url, coordinate);
        let response = self
            .client
            .post(&self.report_url)
            .json(&coordinate)
            .send()
            .await?;
        Self::check_status(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    /// Serves exactly one HTTP response and hands back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn api_for(location_url: &str, report_url: &str) -> HttpTrackingApi {
        let config = ApiConfig {
            subject_location_url: location_url.to_string(),
            subject_report_url: report_url.to_string(),
            request_timeout: Duration::from_secs(5),
        };
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(config.request_timeout)
            .build()
            .unwrap();
        HttpTrackingApi::with_client(client, &config)
    }

    #[tokio::test]
    async fn test_fetch_reads_first_entry() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"data":[{"latitude":-6.2,"longitude":106.8},{"latitude":null,"longitude":null}]}"#,
        )
        .await;
        let api = api_for(&format!("{}/anak", url), "http://unused");

        let location = api.fetch_subject_location().await.unwrap();
        assert_eq!(location, Some(Coordinate::new(-6.2, 106.8)));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /anak HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_empty_data() {
        let (url, server) = serve_once("200 OK", r#"{"data":[]}"#).await;
        let api = api_for(&url, "http://unused");

        assert_eq!(api.fetch_subject_location().await.unwrap(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{}"#).await;
        let api = api_for(&url, "http://unused");

        let err = api.fetch_subject_location().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let (url, server) = serve_once("200 OK", "not json").await;
        let api = api_for(&url, "http://unused");

        let err = api.fetch_subject_location().await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_report_posts_json_body() {
        let (url, server) = serve_once("201 Created", r#"{"message":"ok"}"#).await;
        let api = api_for("http://unused", &format!("{}/ortu", url));

        api.report_location(Coordinate::new(-6.9, 107.6))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /ortu HTTP/1.1"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent, serde_json::json!({ "latitude": -6.9, "longitude": 107.6 }));
    }

    #[tokio::test]
    async fn test_report_rejected() {
        let (url, server) = serve_once("422 Unprocessable Entity", r#"{}"#).await;
        let api = api_for("http://unused", &url);

        let err = api
            .report_location(Coordinate::new(-6.9, 107.6))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 422, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Bind and drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let api = api_for(&format!("http://127.0.0.1:{}", port), "http://unused");

        let err = api.fetch_subject_location().await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
