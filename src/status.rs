//! Now-playing status from an Icecast `status-json.xsl` endpoint.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const STATUS_PATH: &str = "status-json.xsl";
pub const STREAM_PATH: &str = "stream";

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Connection error")]
    Network,

    #[error("Request timed out")]
    Timeout,

    #[error("Server error (HTTP {0})")]
    Server(u16),

    #[error("Status endpoint not found")]
    NotFound,

    #[error("Not authorized to read status")]
    Unauthorized,

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusErrorKind {
    Network,
    Timeout,
    Server,
    NotFound,
    Unauthorized,
    Unknown,
}

impl StatusError {
    pub fn kind(&self) -> StatusErrorKind {
        match self {
            StatusError::Network => StatusErrorKind::Network,
            StatusError::Timeout => StatusErrorKind::Timeout,
            StatusError::Server(_) => StatusErrorKind::Server,
            StatusError::NotFound => StatusErrorKind::NotFound,
            StatusError::Unauthorized => StatusErrorKind::Unauthorized,
            StatusError::Unknown(_) => StatusErrorKind::Unknown,
        }
    }

    /// Whether trying again later could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StatusError::NotFound | StatusError::Unauthorized)
    }

    /// Short text for a listener, without transport detail.
    pub fn message(&self) -> &'static str {
        match self.kind() {
            StatusErrorKind::Network => "Connection error",
            StatusErrorKind::Timeout => "Timed out",
            StatusErrorKind::Server => "Server error",
            StatusErrorKind::NotFound => "Not found",
            StatusErrorKind::Unauthorized => "Not authorized",
            StatusErrorKind::Unknown => "Something went wrong",
        }
    }
}

/// Map a non-success HTTP status to an error.
pub fn classify_status(code: u16) -> StatusError {
    match code {
        404 => StatusError::NotFound,
        401 | 403 => StatusError::Unauthorized,
        500..=599 => StatusError::Server(code),
        _ => StatusError::Unknown(format!("HTTP {}", code)),
    }
}

fn classify_transport(err: &reqwest::Error) -> StatusError {
    if err.is_builder() {
        // Bad URL; no request ever left.
        StatusError::Unknown(err.to_string())
    } else if err.is_timeout() {
        StatusError::Timeout
    } else if let Some(status) = err.status() {
        classify_status(status.as_u16())
    } else if err.is_connect() || err.is_request() {
        StatusError::Network
    } else if err.is_decode() {
        StatusError::Unknown(err.to_string())
    } else {
        StatusError::Network
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RadioStatus {
    #[serde(default)]
    pub icestats: Icestats,
}

#[derive(Debug, Default, Deserialize)]
pub struct Icestats {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub server_start_iso8601: Option<String>,
    #[serde(default)]
    source: Option<Sources>,
}

/// Icecast reports a single mount as an object and several as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sources {
    Many(Vec<Source>),
    One(Source),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub listeners: Option<u32>,
    #[serde(default)]
    pub listener_peak: Option<u32>,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub server_description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub listenurl: Option<String>,
    #[serde(default)]
    pub stream_start_iso8601: Option<String>,
}

impl Icestats {
    /// The first mounted source, if any.
    pub fn source(&self) -> Option<&Source> {
        match self.source.as_ref()? {
            Sources::One(source) => Some(source),
            Sources::Many(sources) => sources.first(),
        }
    }
}

impl RadioStatus {
    pub fn from_json(body: &str) -> Result<Self, StatusError> {
        serde_json::from_str(body).map_err(|err| StatusError::Unknown(err.to_string()))
    }

    pub fn is_live(&self) -> bool {
        self.icestats.source().is_some()
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.icestats
            .source()?
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn listeners(&self) -> Option<u32> {
        self.icestats.source()?.listeners
    }
}

pub struct StatusClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl StatusClient {
    pub fn new(api_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn status_url(&self) -> String {
        format!("{}/{}", self.base_url, STATUS_PATH)
    }

    pub fn stream_url(&self) -> String {
        format!("{}/{}", self.base_url, STREAM_PATH)
    }

    /// One request, no retries.
    pub fn fetch(&self) -> Result<RadioStatus, StatusError> {
        let url = self.status_url();
        log::debug!("Fetching status from {}", url);
        let response = self.client.get(&url).send().map_err(|e| classify_transport(&e))?;
        let code = response.status();
        if !code.is_success() {
            return Err(classify_status(code.as_u16()));
        }
        let body = response.text().map_err(|e| classify_transport(&e))?;
        RadioStatus::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE: &str = r#"{
        "icestats": {
            "admin": "icemaster@localhost",
            "host": "radio.example",
            "server_id": "Icecast 2.4.4",
            "source": {
                "bitrate": 192,
                "genre": "various",
                "listener_peak": 14,
                "listeners": 3,
                "listenurl": "http://radio.example:8000/stream",
                "server_name": "Night Shift",
                "title": "  Boards of Canada - Roygbiv  ",
                "dummy": null
            }
        }
    }"#;

    #[test]
    fn parses_single_source() {
        let status = RadioStatus::from_json(LIVE).unwrap();
        assert!(status.is_live());
        assert_eq!(status.now_playing(), Some("Boards of Canada - Roygbiv"));
        assert_eq!(status.listeners(), Some(3));
        assert_eq!(status.icestats.host.as_deref(), Some("radio.example"));
    }

    #[test]
    fn parses_source_array() {
        let body = r#"{"icestats": {"source": [{"title": "First"}, {"title": "Second"}]}}"#;
        let status = RadioStatus::from_json(body).unwrap();
        assert_eq!(status.now_playing(), Some("First"));
    }

    #[test]
    fn offline_and_blank_titles() {
        let offline = RadioStatus::from_json(r#"{"icestats": {"host": "x"}}"#).unwrap();
        assert!(!offline.is_live());
        assert_eq!(offline.now_playing(), None);

        let blank = RadioStatus::from_json(r#"{"icestats": {"source": {"title": "   "}}}"#).unwrap();
        assert!(blank.is_live());
        assert_eq!(blank.now_playing(), None);

        let null_title = RadioStatus::from_json(r#"{"icestats": {"source": {"title": null}}}"#).unwrap();
        assert_eq!(null_title.now_playing(), None);
    }

    #[test]
    fn malformed_body_is_unknown() {
        let err = RadioStatus::from_json("<html>").unwrap_err();
        assert_eq!(err.kind(), StatusErrorKind::Unknown);
        assert!(err.is_retryable());
    }

    #[test]
    fn http_codes_classify() {
        assert_eq!(classify_status(404).kind(), StatusErrorKind::NotFound);
        assert_eq!(classify_status(401).kind(), StatusErrorKind::Unauthorized);
        assert_eq!(classify_status(403).kind(), StatusErrorKind::Unauthorized);
        assert_eq!(classify_status(503).kind(), StatusErrorKind::Server);
        assert_eq!(classify_status(418).kind(), StatusErrorKind::Unknown);
    }

    #[test]
    fn retryability() {
        assert!(StatusError::Network.is_retryable());
        assert!(StatusError::Timeout.is_retryable());
        assert!(StatusError::Server(500).is_retryable());
        assert!(!StatusError::NotFound.is_retryable());
        assert!(!StatusError::Unauthorized.is_retryable());
        assert_eq!(StatusError::Network.message(), "Connection error");
    }

    #[test]
    fn urls_join_without_double_slash() {
        let client = StatusClient::new("https://radio.example/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.status_url(), "https://radio.example/status-json.xsl");
        assert_eq!(client.stream_url(), "https://radio.example/stream");
    }

    #[test]
    fn malformed_api_url_fails_before_sending() {
        let client = StatusClient::new("not a url", Duration::from_millis(500)).unwrap();
        let err = client.fetch().unwrap_err();
        assert_eq!(err.kind(), StatusErrorKind::Unknown);
        assert_eq!(err.message(), "Something went wrong");
    }
}
