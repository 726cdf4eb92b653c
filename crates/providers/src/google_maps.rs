//! Google Maps Directions API provider.
//!
//! Calls `GET {base_url}/maps/api/directions/json` and maps the response onto
//! the core route types. `ZERO_RESULTS` and `NOT_FOUND` are ordinary empty
//! answers; every other non-`OK` status is an error.

use async_trait::async_trait;
use lookout_core::directions::{
    DirectionsProvider, DirectionsRequest, Leg, Route, Step, TextValue,
};
use lookout_core::error::DirectionsError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A Google Maps Directions provider.
pub struct GoogleMapsDirections {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleMapsDirections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsDirections")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GoogleMapsDirections {
    /// Create a new provider.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DirectionsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectionsError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from application config. Requires a Maps key.
    pub fn from_config(config: &lookout_config::AppConfig) -> Result<Self, DirectionsError> {
        let api_key = config
            .google_maps_api_key
            .clone()
            .ok_or_else(|| DirectionsError::NotConfigured("no Google Maps API key".into()))?;

        Self::new(
            &config.directions.base_url,
            api_key,
            Duration::from_secs(config.directions.timeout_secs),
        )
    }

    fn to_route(route: ApiRoute) -> Route {
        Route {
            legs: route
                .legs
                .into_iter()
                .map(|leg| Leg {
                    distance: TextValue::new(leg.distance.text),
                    duration: TextValue::new(leg.duration.text),
                    steps: leg
                        .steps
                        .into_iter()
                        .map(|s| Step {
                            instruction_text: html_to_text(&s.html_instructions),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl DirectionsProvider for GoogleMapsDirections {
    fn name(&self) -> &str {
        "google_maps"
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>, DirectionsError> {
        let url = format!("{}/maps/api/directions/json", self.base_url);

        debug!(
            mode = request.mode.as_str(),
            units = request.units.as_str(),
            "Sending directions request"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("origin", request.origin.as_str()),
                ("destination", request.destination.as_str()),
                ("mode", request.mode.as_str()),
                ("units", request.units.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key
                let e = e.without_url();
                if e.is_timeout() {
                    DirectionsError::Timeout(e.to_string())
                } else {
                    DirectionsError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Directions API returned HTTP error");
            return Err(DirectionsError::Http {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| {
                DirectionsError::Malformed(format!("Failed to parse response: {}", e.without_url()))
            })?;

        match api_response.status.as_str() {
            "OK" => Ok(api_response.routes.into_iter().map(Self::to_route).collect()),
            "ZERO_RESULTS" | "NOT_FOUND" => {
                debug!(status = %api_response.status, "No route found");
                Ok(Vec::new())
            }
            other => Err(DirectionsError::Api {
                status: other.to_string(),
                message: api_response.error_message.unwrap_or_default(),
            }),
        }
    }
}

/// Convert Google's `html_instructions` into plain speakable text.
///
/// Inline tags (`<b>`, `<wbr/>`) vanish; block tags (`<div>`, `<br>`, `<p>`)
/// become a space. Common entities are decoded and whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' if !in_tag => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|ch: char| ch.is_whitespace() || ch == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "div" | "br" | "p" | "li") {
                    out.push(' ');
                }
            }
            _ if in_tag => tag.push(c),
            _ => out.push(c),
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Google Directions API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    distance: ApiTextValue,
    duration: ApiTextValue,
    #[serde(default)]
    steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
struct ApiTextValue {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    #[serde(default)]
    html_instructions: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GoogleMapsDirections {
        GoogleMapsDirections::new(server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    fn ok_body() -> serde_json::Value {
        serde_json::json!({
            "status": "OK",
            "routes": [{
                "legs": [{
                    "distance": { "text": "500 m", "value": 500 },
                    "duration": { "text": "6 mins", "value": 360 },
                    "steps": [
                        { "html_instructions": "Head <b>north</b> on <b>Main St</b>" },
                        { "html_instructions": "Turn <b>left</b>" }
                    ]
                }]
            }]
        })
    }

    #[tokio::test]
    async fn parses_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("origin", "10 Main St"))
            .and(query_param("destination", "20 Main St"))
            .and(query_param("mode", "walking"))
            .and(query_param("units", "metric"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let routes = provider(&server)
            .directions(&DirectionsRequest::walking("10 Main St", "20 Main St"))
            .await
            .unwrap();

        assert_eq!(routes.len(), 1);
        let leg = &routes[0].legs[0];
        assert_eq!(leg.distance.text, "500 m");
        assert_eq!(leg.duration.text, "6 mins");
        assert_eq!(leg.steps[0].instruction_text, "Head north on Main St");
        assert_eq!(leg.steps.len(), 2);
    }

    #[tokio::test]
    async fn zero_results_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ZERO_RESULTS", "routes": []})),
            )
            .mount(&server)
            .await;

        let routes = provider(&server)
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap();
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn denied_request_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "routes": []
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap_err();
        match err {
            DirectionsError::Api { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectionsError::Http { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectionsError::Malformed(_)));
    }

    #[tokio::test]
    async fn timeout_error_does_not_carry_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let slow = GoogleMapsDirections::new(server.uri(), "SECRET-KEY-123", Duration::from_millis(200))
            .unwrap();
        let err = slow
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap_err();

        assert!(matches!(err, DirectionsError::Timeout(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn network_error_does_not_carry_api_key() {
        // Nothing listens on port 9 locally
        let offline =
            GoogleMapsDirections::new("http://127.0.0.1:9", "SECRET-KEY-123", Duration::from_secs(5))
                .unwrap();
        let err = offline
            .directions(&DirectionsRequest::walking("a", "b"))
            .await
            .unwrap_err();

        assert!(matches!(err, DirectionsError::Network(_) | DirectionsError::Timeout(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[test]
    fn from_config_requires_key() {
        let config = lookout_config::AppConfig::default();
        let err = GoogleMapsDirections::from_config(&config).unwrap_err();
        assert!(matches!(err, DirectionsError::NotConfigured(_)));
    }

    #[test]
    fn html_instructions_become_plain_text() {
        assert_eq!(
            html_to_text("Turn <b>right</b> onto <b>5th Ave</b>"),
            "Turn right onto 5th Ave"
        );
        assert_eq!(
            html_to_text(
                "Head <b>east</b><div style=\"font-size:0.9em\">Destination will be on the left</div>"
            ),
            "Head east Destination will be on the left"
        );
        assert_eq!(html_to_text("Cross&nbsp;at Smith &amp; Co"), "Cross at Smith & Co");
        assert_eq!(html_to_text(""), "");
    }
}
