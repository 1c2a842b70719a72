//! Nominatim / OpenStreetMap free-form place search.
//!
//! Backs the report page's place-search box. Results are returned in the
//! order Nominatim ranks them; the list length is whatever the server
//! decides to send.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use safety_map_report_models::PlaceSuggestion;

use crate::GeocodeError;
use crate::service_registry::{GeocodingService, ProviderConfig};

/// Client for a Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    country_codes: String,
}

impl NominatimClient {
    /// Creates a client for `base_url`, restricting results to
    /// `country_codes`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        country_codes: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            country_codes: country_codes.into(),
        })
    }

    /// Creates a client from a registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_service(service: &GeocodingService) -> Result<Self, GeocodeError> {
        match &service.provider {
            ProviderConfig::Nominatim {
                base_url,
                country_codes,
                user_agent,
            } => Self::new(base_url.as_str(), country_codes.as_str(), user_agent),
        }
    }

    /// Searches for places matching a free-form query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP request fails, the server
    /// answers with a non-success status, or the body is not a Nominatim
    /// result array.
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceSuggestion>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("countrycodes", self.country_codes.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        let suggestions = parse_response(&body)?;
        log::debug!(
            "Nominatim returned {} place(s) for {query:?}",
            suggestions.len()
        );
        Ok(suggestions)
    }
}

/// Parses a Nominatim JSON result array.
fn parse_response(body: &serde_json::Value) -> Result<Vec<PlaceSuggestion>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    results
        .iter()
        .map(|place| {
            let field = |name: &str| {
                place[name]
                    .as_str()
                    .map(String::from)
                    .ok_or_else(|| GeocodeError::Parse {
                        message: format!("Missing {name} in Nominatim response"),
                    })
            };
            Ok(PlaceSuggestion {
                lat: field("lat")?,
                lon: field("lon")?,
                display_name: field("display_name")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    async fn read_request_head(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !String::from_utf8_lossy(&buf).contains("\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(buf).unwrap()
    }

    /// Answers a single GET on a local port and hands back the request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request_head(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/search"), server)
    }

    #[tokio::test]
    async fn search_sends_encoded_country_filtered_query() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"lat":"18.9219841","lon":"72.8346543","display_name":"Gateway of India, Mumbai"}]"#,
        )
        .await;
        let client = NominatimClient::new(url, "in", "safety-map-tests").unwrap();

        let places = client.search("Gateway of India & Co").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(
            request.lines().next().unwrap(),
            "GET /search?format=json&q=Gateway+of+India+%26+Co&countrycodes=in HTTP/1.1"
        );
        assert!(
            request
                .to_ascii_lowercase()
                .contains("user-agent: safety-map-tests")
        );
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].display_name, "Gateway of India, Mumbai");
        assert_eq!(places[0].lat, "18.9219841");
    }

    #[test]
    fn builds_from_primary_service() {
        let service = crate::service_registry::primary_service().unwrap();
        let client = NominatimClient::from_service(&service).unwrap();
        assert_eq!(client.base_url, service.base_url());
        assert_eq!(client.country_codes, "in");
    }

    #[tokio::test]
    async fn search_maps_too_many_requests() {
        let (url, server) = serve_once("429 Too Many Requests", "").await;
        let client = NominatimClient::new(url, "in", "safety-map-tests").unwrap();

        let result = client.search("Pune station").await;
        server.await.unwrap();

        assert!(matches!(result, Err(GeocodeError::RateLimited)));
    }

    #[tokio::test]
    async fn search_reports_server_error_status() {
        let (url, server) = serve_once("503 Service Unavailable", "down").await;
        let client = NominatimClient::new(url, "in", "safety-map-tests").unwrap();

        let result = client.search("Pune station").await;
        server.await.unwrap();

        assert!(matches!(result, Err(GeocodeError::Status { status: 503 })));
    }

    #[test]
    fn parses_results_in_order() {
        let body = serde_json::json!([
            {
                "lat": "19.0759837",
                "lon": "72.8776559",
                "display_name": "Mumbai, Maharashtra, India",
                "importance": 0.8
            },
            {
                "lat": "18.9387711",
                "lon": "72.8353355",
                "display_name": "Fort, Mumbai, Maharashtra, India"
            }
        ]);
        let places = parse_response(&body).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].lat, "19.0759837");
        assert_eq!(places[0].display_name, "Mumbai, Maharashtra, India");
        assert_eq!(places[1].lon, "72.8353355");
    }

    #[test]
    fn parses_empty_result() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_numeric_coordinates() {
        let body = serde_json::json!([{ "lat": 19.07, "lon": "72.87", "display_name": "x" }]);
        assert!(parse_response(&body).is_err());
    }
}
