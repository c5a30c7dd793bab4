// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location types shared by users and search.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in miles used for spherical-cap radius conversion.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

/// Radius of the sphere MongoDB uses for spherical geometry, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// Metres per statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// GeoJSON point stored on user documents (`[lng, lat]` order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    kind: PointType,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum PointType {
    Point,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside the valid range.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self {
            kind: PointType::Point,
            coordinates: [lng, lat],
        })
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }
}

/// Human-readable address used for geocoding and display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

/// Convert a radius in miles to radians on the Earth sphere.
pub fn miles_to_radians(miles: f64) -> f64 {
    miles / EARTH_RADIUS_MILES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geopoint_serializes_as_geojson() {
        let point = GeoPoint::new(40.7128, -74.006).unwrap();
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -74.006);
        assert_eq!(json["coordinates"][1], 40.7128);
    }

    #[test]
    fn test_geopoint_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn test_miles_to_radians() {
        assert!((miles_to_radians(3963.2) - 1.0).abs() < f64::EPSILON);
        assert!((miles_to_radians(25.0) - 25.0 / 3963.2).abs() < f64::EPSILON);
    }
}
