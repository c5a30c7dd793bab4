// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! City/state/country geocoding against a Nominatim-compatible endpoint.
//!
//! Geocoding never fails a request: any error is logged and the location is
//! left unresolved.

use crate::models::location::{Address, GeoPoint};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("werkout-api/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
enum GeocoderMode {
    Nominatim { base_url: String },
    /// Fixed answers keyed by normalized address, for tests.
    Static(Arc<HashMap<String, GeoPoint>>),
}

/// Address-to-coordinates resolver.
#[derive(Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    mode: GeocoderMode,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            mode: GeocoderMode::Nominatim {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Geocoder that answers from a fixed table and never touches the network.
    pub fn new_static(entries: impl IntoIterator<Item = (Address, GeoPoint)>) -> Self {
        let table = entries
            .into_iter()
            .map(|(address, point)| (address_key(&address), point))
            .collect();
        Self {
            http: reqwest::Client::new(),
            mode: GeocoderMode::Static(Arc::new(table)),
        }
    }

    /// Resolve an address to a point, or `None` if it cannot be resolved.
    pub async fn geocode(&self, address: &Address) -> Option<GeoPoint> {
        if address.city.trim().is_empty() && address.country.trim().is_empty() {
            return None;
        }

        let base_url = match &self.mode {
            GeocoderMode::Static(table) => return table.get(&address_key(address)).copied(),
            GeocoderMode::Nominatim { base_url } => base_url,
        };

        match self.lookup(base_url, address).await {
            Ok(Some(point)) => {
                tracing::debug!(
                    city = %address.city,
                    country = %address.country,
                    lat = point.lat(),
                    lng = point.lng(),
                    "Geocoded address"
                );
                Some(point)
            }
            Ok(None) => {
                tracing::info!(
                    city = %address.city,
                    state = %address.state,
                    country = %address.country,
                    "Address did not resolve; location left unset"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, city = %address.city, "Geocoding failed");
                None
            }
        }
    }

    async fn lookup(&self, base_url: &str, address: &Address) -> anyhow::Result<Option<GeoPoint>> {
        let mut query: Vec<(&str, &str)> = vec![("format", "json"), ("limit", "1")];
        for (key, value) in [
            ("city", address.city.trim()),
            ("state", address.state.trim()),
            ("country", address.country.trim()),
        ] {
            if !value.is_empty() {
                query.push((key, value));
            }
        }

        let places: Vec<NominatimPlace> = self
            .http
            .get(format!("{}/search", base_url))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(places.first().and_then(parse_place))
    }
}

fn parse_place(place: &NominatimPlace) -> Option<GeoPoint> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lng = place.lon.trim().parse::<f64>().ok()?;
    GeoPoint::new(lat, lng)
}

fn address_key(address: &Address) -> String {
    [&address.city, &address.state, &address.country]
        .iter()
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(city: &str, state: &str, country: &str) -> Address {
        Address {
            city: city.into(),
            state: state.into(),
            country: country.into(),
        }
    }

    #[test]
    fn test_parse_place() {
        let place = NominatimPlace {
            lat: "37.7790262".into(),
            lon: "-122.419906".into(),
        };
        let point = parse_place(&place).unwrap();
        assert!((point.lat() - 37.7790262).abs() < 1e-9);
        assert!((point.lng() + 122.419906).abs() < 1e-9);

        let bad = NominatimPlace {
            lat: "north".into(),
            lon: "0".into(),
        };
        assert!(parse_place(&bad).is_none());
    }

    #[tokio::test]
    async fn test_static_lookup_is_case_insensitive() {
        let sf = GeoPoint::new(37.77, -122.42).unwrap();
        let geocoder = Geocoder::new_static([(address("San Francisco", "CA", "USA"), sf)]);

        assert_eq!(
            geocoder.geocode(&address(" san francisco", "ca", "usa ")).await,
            Some(sf)
        );
        assert_eq!(geocoder.geocode(&address("Atlantis", "", "")).await, None);
    }

    #[tokio::test]
    async fn test_unreachable_geocoder_yields_none() {
        let geocoder = Geocoder::new("http://127.0.0.1:9").unwrap();
        assert_eq!(geocoder.geocode(&address("Paris", "", "France")).await, None);
    }

    #[tokio::test]
    async fn test_empty_address_is_not_looked_up() {
        let geocoder = Geocoder::new_static(Vec::<(Address, GeoPoint)>::new());
        assert_eq!(geocoder.geocode(&Address::default()).await, None);
    }
}
