//! Walking directions tool.
//!
//! Resolves "current location" aliases against the session's last known
//! position, asks the directions provider for a walking route and turns the
//! first leg into one spoken sentence. Every failure becomes a sentence too;
//! the engine never sees an error from this tool.

use async_trait::async_trait;
use lookout_core::directions::{DirectionsProvider, DirectionsRequest, DirectionsResult};
use lookout_core::error::ToolError;
use lookout_core::location::LocationCell;
use lookout_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

pub const NO_LOCATION_REPLY: &str = "I don't have your current location yet.";
pub const NOT_FOUND_REPLY: &str = "I couldn't find directions to that location.";
pub const PROVIDER_FAILURE_REPLY: &str = "I had trouble getting directions. Please try again.";
pub const MISSING_ARGS_REPLY: &str = "Please tell me where you'd like to go.";

/// Origins that mean "wherever the user is right now".
const CURRENT_LOCATION_ALIASES: [&str; 3] = ["current location", "here", "my location"];

/// Typed arguments for `get_directions`.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsArgs {
    pub origin: String,
    pub destination: String,
}

pub struct GetDirectionsTool {
    provider: Arc<dyn DirectionsProvider>,
    location: LocationCell,
}

impl GetDirectionsTool {
    pub fn new(provider: Arc<dyn DirectionsProvider>, location: LocationCell) -> Self {
        Self { provider, location }
    }

    /// Look up walking directions and describe them in one sentence.
    pub async fn get_directions(&self, origin: &str, destination: &str) -> String {
        self.lookup(origin, destination).await.1
    }

    /// Returns `(answered, sentence)`; `answered` is false for every fallback.
    async fn lookup(&self, origin: &str, destination: &str) -> (bool, String) {
        let origin = if is_current_location(origin) {
            match self.location.get() {
                Some(location) => location.as_origin(),
                None => return (false, NO_LOCATION_REPLY.into()),
            }
        } else {
            origin.to_string()
        };

        let request = DirectionsRequest::walking(origin, destination);
        debug!(provider = self.provider.name(), destination = %request.destination, "Looking up directions");

        let summary = self
            .provider
            .directions(&request)
            .await
            .and_then(|routes| DirectionsResult::from_routes(&routes));

        match summary {
            Ok(Some(result)) => (true, result.spoken()),
            Ok(None) => (false, NOT_FOUND_REPLY.into()),
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Error getting directions");
                (false, PROVIDER_FAILURE_REPLY.into())
            }
        }
    }
}

fn is_current_location(origin: &str) -> bool {
    let origin = origin.trim().to_lowercase();
    CURRENT_LOCATION_ALIASES.contains(&origin.as_str())
}

#[async_trait]
impl Tool for GetDirectionsTool {
    fn name(&self) -> &str {
        "get_directions"
    }

    fn description(&self) -> &str {
        "Get walking directions from an origin to a destination. Returns the distance, \
         the estimated walking time, and the first instruction. Use \"current location\" \
         as the origin to start from where the user is."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "origin": {
                    "type": "string",
                    "description": "Starting address, or \"current location\""
                },
                "destination": {
                    "type": "string",
                    "description": "Destination address or place name"
                }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: DirectionsArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!(error = %e, "Rejected get_directions arguments");
                return Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: MISSING_ARGS_REPLY.into(),
                });
            }
        };

        if args.origin.trim().is_empty() || args.destination.trim().is_empty() {
            return Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: MISSING_ARGS_REPLY.into(),
            });
        }

        let (success, output) = self.lookup(&args.origin, &args.destination).await;
        Ok(ToolResult {
            call_id: String::new(),
            success,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::directions::{Leg, Route, Step, TextValue};
    use lookout_core::error::DirectionsError;
    use lookout_core::location::UserLocation;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed outcome.
    struct MockProvider {
        outcome: Result<Vec<Route>, DirectionsError>,
        requests: Mutex<Vec<DirectionsRequest>>,
    }

    impl MockProvider {
        fn new(outcome: Result<Vec<Route>, DirectionsError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DirectionsProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn directions(
            &self,
            request: &DirectionsRequest,
        ) -> Result<Vec<Route>, DirectionsError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcome.clone()
        }
    }

    fn one_route() -> Vec<Route> {
        vec![Route {
            legs: vec![Leg {
                distance: TextValue::new("500 m"),
                duration: TextValue::new("6 mins"),
                steps: vec![Step {
                    instruction_text: "Head north".into(),
                }],
            }],
        }]
    }

    #[tokio::test]
    async fn alias_without_location_skips_provider() {
        let provider = MockProvider::new(Ok(one_route()));
        let tool = GetDirectionsTool::new(provider.clone(), LocationCell::new());

        let reply = tool.get_directions("current location", "Library").await;
        assert_eq!(reply, "I don't have your current location yet.");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn alias_is_case_insensitive_and_substitutes_coordinates() {
        let provider = MockProvider::new(Ok(one_route()));
        let location = LocationCell::new();
        location.set(UserLocation::new(51.5007, -0.1246));
        let tool = GetDirectionsTool::new(provider.clone(), location);

        for alias in ["Current Location", "HERE", "my location"] {
            tool.get_directions(alias, "Library").await;
        }

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        for req in requests.iter() {
            assert_eq!(req.origin, "51.5007,-0.1246");
            assert_eq!(req.destination, "Library");
            assert_eq!(req.mode.as_str(), "walking");
            assert_eq!(req.units.as_str(), "metric");
        }
    }

    #[tokio::test]
    async fn composes_first_leg_sentence() {
        let provider = MockProvider::new(Ok(one_route()));
        let tool = GetDirectionsTool::new(provider.clone(), LocationCell::new());

        let reply = tool.get_directions("10 Main St", "20 Main St").await;
        assert_eq!(reply, "500 m away, about 6 mins. Head north");
        assert_eq!(provider.requests.lock().unwrap()[0].origin, "10 Main St");
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let tool = GetDirectionsTool::new(MockProvider::new(Ok(vec![])), LocationCell::new());
        let reply = tool.get_directions("10 Main St", "Atlantis").await;
        assert_eq!(reply, "I couldn't find directions to that location.");
    }

    #[tokio::test]
    async fn provider_error_is_not_propagated() {
        let provider = MockProvider::new(Err(DirectionsError::Network("connection refused".into())));
        let tool = GetDirectionsTool::new(provider, LocationCell::new());

        let reply = tool.get_directions("10 Main St", "20 Main St").await;
        assert_eq!(reply, "I had trouble getting directions. Please try again.");
    }

    #[tokio::test]
    async fn route_without_legs_counts_as_provider_failure() {
        let provider = MockProvider::new(Ok(vec![Route { legs: vec![] }]));
        let tool = GetDirectionsTool::new(provider, LocationCell::new());

        let reply = tool.get_directions("10 Main St", "20 Main St").await;
        assert_eq!(reply, PROVIDER_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn execute_validates_arguments() {
        let provider = MockProvider::new(Ok(one_route()));
        let tool = GetDirectionsTool::new(provider.clone(), LocationCell::new());

        let missing = tool
            .execute(serde_json::json!({"origin": "10 Main St"}))
            .await
            .unwrap();
        assert!(!missing.success);
        assert_eq!(missing.output, MISSING_ARGS_REPLY);

        let blank = tool
            .execute(serde_json::json!({"origin": " ", "destination": "Library"}))
            .await
            .unwrap();
        assert_eq!(blank.output, MISSING_ARGS_REPLY);
        assert_eq!(provider.calls(), 0);

        let ok = tool
            .execute(serde_json::json!({"origin": "10 Main St", "destination": "20 Main St"}))
            .await
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.output, "500 m away, about 6 mins. Head north");
    }

    #[test]
    fn tool_definition() {
        let tool = GetDirectionsTool::new(MockProvider::new(Ok(vec![])), LocationCell::new());
        let def = tool.to_definition();
        assert_eq!(def.name, "get_directions");
        assert_eq!(def.parameters["required"][1], "destination");
    }
}
