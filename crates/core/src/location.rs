//! User location: the last known coordinate pair for a session.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
}

impl UserLocation {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Render as a routing origin: `"lat,lng"`.
    pub fn as_origin(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// A location-update data packet as the client publishes it.
///
/// `{"type": "location", "data": {"lat": 51.5, "lng": -0.12}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationPacket {
    Location { data: UserLocation },
}

impl LocationPacket {
    /// Parse a packet. Errors on malformed JSON or an unknown `type`.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Shared slot holding a session's last known location.
///
/// One writer (the location-update handler), any number of readers. Reads
/// copy the value out, so a reader never holds the lock across an await.
#[derive(Debug, Clone, Default)]
pub struct LocationCell {
    inner: Arc<RwLock<Option<UserLocation>>>,
}

impl LocationCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest known location, if any.
    pub fn get(&self) -> Option<UserLocation> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the stored location.
    pub fn set(&self, location: UserLocation) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(location);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_format_is_lat_comma_lng() {
        let loc = UserLocation::new(37.7749, -122.4194);
        assert_eq!(loc.as_origin(), "37.7749,-122.4194");
    }

    #[test]
    fn out_of_range_coordinates_are_invalid() {
        assert!(UserLocation::new(0.0, 0.0).is_valid());
        assert!(!UserLocation::new(91.0, 0.0).is_valid());
        assert!(!UserLocation::new(0.0, -181.0).is_valid());
        assert!(!UserLocation::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn parse_location_packet() {
        let payload = br#"{"type":"location","data":{"lat":40.7,"lng":-74.0}}"#;
        let LocationPacket::Location { data } = LocationPacket::parse(payload).unwrap();
        assert_eq!(data, UserLocation::new(40.7, -74.0));
    }

    #[test]
    fn unknown_packet_type_is_rejected() {
        let payload = br#"{"type":"heading","data":{"deg":90}}"#;
        assert!(LocationPacket::parse(payload).is_err());
        assert!(LocationPacket::parse(b"not json").is_err());
    }

    #[test]
    fn cell_is_shared_between_clones() {
        let cell = LocationCell::new();
        let reader = cell.clone();
        assert!(reader.get().is_none());

        cell.set(UserLocation::new(1.0, 2.0));
        assert_eq!(reader.get(), Some(UserLocation::new(1.0, 2.0)));

        cell.clear();
        assert!(reader.get().is_none());
    }
}
