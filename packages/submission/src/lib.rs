#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the remote unsafe-location report API.
//!
//! A report is sent as a single JSON `POST`. The API's response body is
//! not reliably JSON, so it is always read as text first and interpreted
//! by [`interpret_response`]:
//!
//! - empty body → `{}`
//! - valid JSON → that value
//! - anything else → the raw text as a JSON string
//!
//! Non-success statuses become [`SubmitError::Rejected`], carrying the
//! payload's `message` field when there is one.

pub mod config;

use safety_map_report_models::ReportPayload;
use thiserror::Error;

pub use config::ReportsApiConfig;

/// Errors from report submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request could not be sent or the response body not read.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// The API's `message`, or a generic status description.
        message: String,
    },

    /// Endpoint configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Sends reports to the configured endpoint.
#[derive(Debug, Clone)]
pub struct ReportsApiClient {
    client: reqwest::Client,
    url: String,
}

impl ReportsApiClient {
    /// Creates a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ReportsApiConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Creates a client from the embedded configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] if the configuration is malformed or the
    /// HTTP client cannot be built.
    pub fn from_env() -> Result<Self, SubmitError> {
        let config = ReportsApiConfig::from_env()?;
        log::info!("Submitting reports to {} ({})", config.name, config.url);
        Self::new(&config)
    }

    /// Posts a report and returns the interpreted response payload.
    ///
    /// Never retries; the caller decides whether to submit again.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Http`] on transport failure and
    /// [`SubmitError::Rejected`] when the API answers with a non-success
    /// status.
    pub async fn submit(&self, payload: &ReportPayload) -> Result<serde_json::Value, SubmitError> {
        let resp = self.client.post(&self.url).json(payload).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        log::debug!(
            "Report API {} answered {status} with {} byte(s)",
            self.url,
            body.len()
        );

        interpret_response(status, &body)
    }
}

/// Interprets a report API response.
///
/// # Errors
///
/// Returns [`SubmitError::Rejected`] if `status` is not a success status.
pub fn interpret_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<serde_json::Value, SubmitError> {
    let payload = parse_body(body);

    if !status.is_success() {
        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| format!("HTTP error: status {}", status.as_u16()), String::from);
        return Err(SubmitError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    Ok(payload)
}

fn parse_body(body: &str) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Reads one HTTP/1.1 request, headers and `content-length` body.
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
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Answers a single request on a local port and hands back what was
    /// received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/api/reviews"), server)
    }

    fn client(url: String) -> ReportsApiClient {
        ReportsApiClient::new(&ReportsApiConfig {
            name: "local".to_string(),
            url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn payload() -> ReportPayload {
        ReportPayload {
            userid: "u1".to_string(),
            description: "Broken streetlight".to_string(),
            latt: 19.07,
            long: 72.87,
            rating: 7,
        }
    }

    #[tokio::test]
    async fn posts_payload_as_json() {
        let (url, server) = serve_once("201 Created", "").await;

        let response = client(url).submit(&payload()).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(response, serde_json::json!({}));
        assert_eq!(
            request.lines().next().unwrap(),
            "POST /api/reviews HTTP/1.1"
        );
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/json")
        );
        assert!(request.ends_with(
            r#"{"userid":"u1","description":"Broken streetlight","latt":19.07,"long":72.87,"rating":7}"#
        ));
    }

    #[tokio::test]
    async fn plain_text_server_error_reports_status() {
        let (url, server) = serve_once("500 Internal Server Error", "Internal Server Error").await;

        let err = client(url).submit(&payload()).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, SubmitError::Rejected { status: 500, .. }));
        assert_eq!(err.to_string(), "HTTP error: status 500");
    }

    #[tokio::test]
    async fn plain_text_success_is_kept_raw() {
        let (url, server) = serve_once("200 OK", "Review saved").await;

        let response = client(url).submit(&payload()).await.unwrap();
        server.await.unwrap();

        assert_eq!(response, serde_json::json!("Review saved"));
    }

    #[test]
    fn ok_json_body() {
        let payload = interpret_response(StatusCode::OK, r#"{"status":"ok"}"#).unwrap();
        assert_eq!(payload, serde_json::json!({"status": "ok"}));
    }

    #[test]
    fn ok_empty_body_is_empty_object() {
        let payload = interpret_response(StatusCode::OK, "").unwrap();
        assert_eq!(payload, serde_json::json!({}));
    }

    #[test]
    fn ok_plain_text_body_is_kept_raw() {
        let payload = interpret_response(StatusCode::CREATED, "Review saved").unwrap();
        assert_eq!(payload, serde_json::json!("Review saved"));
    }

    #[test]
    fn error_uses_message_field() {
        let err =
            interpret_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"db error"}"#)
                .unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { status: 500, .. }));
        assert_eq!(err.to_string(), "db error");
    }

    #[test]
    fn error_without_message_falls_back_to_status() {
        let err = interpret_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: status 502");

        let err = interpret_response(StatusCode::NOT_FOUND, r#"{"message":42}"#).unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: status 404");
    }
}
