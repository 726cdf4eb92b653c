//! Directions provider trait and route types.
//!
//! A provider turns `{origin, destination, mode, units}` into an ordered list
//! of candidate routes. An empty list is a valid answer, not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectionsError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Driving,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// A routing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    /// Address, place name, or `"lat,lng"`
    pub origin: String,

    pub destination: String,

    #[serde(default)]
    pub mode: TravelMode,

    #[serde(default)]
    pub units: Units,
}

impl DirectionsRequest {
    /// A walking, metric request.
    pub fn walking(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            mode: TravelMode::Walking,
            units: Units::Metric,
        }
    }
}

/// A provider's human-readable measurement (e.g. `"500 m"`, `"6 mins"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
}

impl TextValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Plain-text instruction (markup already removed)
    pub instruction_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub distance: TextValue,
    pub duration: TextValue,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<Leg>,
}

/// The spoken summary of the first route's first leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionsResult {
    pub distance: String,
    pub duration: String,
    /// Empty if the leg has no steps
    pub first_step: String,
}

impl DirectionsResult {
    /// Summarise the first leg of the first route.
    ///
    /// `Ok(None)` for an empty route list. A route without legs is a
    /// malformed response.
    pub fn from_routes(routes: &[Route]) -> Result<Option<Self>, DirectionsError> {
        let Some(route) = routes.first() else {
            return Ok(None);
        };
        let leg = route
            .legs
            .first()
            .ok_or_else(|| DirectionsError::Malformed("route has no legs".into()))?;

        Ok(Some(Self {
            distance: leg.distance.text.clone(),
            duration: leg.duration.text.clone(),
            first_step: leg
                .steps
                .first()
                .map(|s| s.instruction_text.clone())
                .unwrap_or_default(),
        }))
    }

    /// `"<distance> away, about <duration>. <first_step>"`
    pub fn spoken(&self) -> String {
        format!(
            "{} away, about {}. {}",
            self.distance, self.duration, self.first_step
        )
    }
}

/// The core DirectionsProvider trait.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Provider name (e.g., "google_maps").
    fn name(&self) -> &str;

    /// Fetch candidate routes. An empty Vec means no route was found.
    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>, DirectionsError>;
}
