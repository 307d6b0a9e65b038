/// Header and message of the send-own-location alerts
pub const SENT_HEADER: &str = "Berhasil";
pub const SENT_MESSAGE: &str = "Berhasil Mengirim Lokasi.";
pub const FAILED_HEADER: &str = "Gagal";
pub const FAILED_MESSAGE: &str = "Gagal Mengirim Lokasi.";
pub const UNSUPPORTED_HEADER: &str = "Error";
pub const UNSUPPORTED_MESSAGE: &str = "Geolocation is not supported by this browser.";

/// Label of the single acknowledgement button
pub const ALERT_ACTION: &str = "OK";

/// A modal message with acknowledgement buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub header: String,
    pub message: String,
    pub buttons: Vec<String>,
}

impl Alert {
    pub fn new(header: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            message: message.into(),
            buttons: vec![ALERT_ACTION.to_string()],
        }
    }

    pub fn sent() -> Self {
        Self::new(SENT_HEADER, SENT_MESSAGE)
    }

    pub fn send_failed() -> Self {
        Self::new(FAILED_HEADER, FAILED_MESSAGE)
    }

    pub fn unsupported() -> Self {
        Self::new(UNSUPPORTED_HEADER, UNSUPPORTED_MESSAGE)
    }
}

/// Presents alerts to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: Alert);

    fn show_alert(&self, header: &str, message: &str) {
        self.notify(Alert::new(header, message));
    }
}

/// Headless notifier: alerts only reach the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: Alert) {
        log::info!("[{}] {}", alert.header, alert.message);
    }
}
