//! Directions provider implementations for LookOut.
//!
//! All providers implement the `lookout_core::DirectionsProvider` trait.

pub mod google_maps;

pub use google_maps::{GoogleMapsDirections, html_to_text};

use std::sync::Arc;

use lookout_core::directions::DirectionsProvider;
use lookout_core::error::DirectionsError;

/// Build the configured directions provider.
pub fn build_from_config(
    config: &lookout_config::AppConfig,
) -> Result<Arc<dyn DirectionsProvider>, DirectionsError> {
    let provider = GoogleMapsDirections::from_config(config)?;
    Ok(Arc::new(provider))
}
