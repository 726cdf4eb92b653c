//! Tool implementations for LookOut.
//!
//! Tools are what the response engine can call mid-conversation. There is
//! one today: walking directions.

pub mod get_directions;

pub use get_directions::{DirectionsArgs, GetDirectionsTool};

use std::sync::Arc;

use lookout_core::directions::DirectionsProvider;
use lookout_core::location::LocationCell;
use lookout_core::tool::ToolRegistry;

/// Create a session's tool registry.
///
/// `location` is the session's own location slot; the registry is built once
/// and shared read-only for the session's lifetime.
pub fn default_registry(
    directions: Arc<dyn DirectionsProvider>,
    location: LocationCell,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetDirectionsTool::new(directions, location)));
    registry
}
