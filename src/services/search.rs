// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geospatial provider search: parameter parsing and aggregation pipelines.
//!
//! The pipeline runs against the `users` collection:
//!
//! 1. `$geoNear` keeps active providers inside the spherical cap around the
//!    query point and annotates each with its distance in miles.
//! 2. `$lookup` + `$unwind` joins the provider profile. `$unwind` drops
//!    providers without a profile, so this is an inner join.
//! 3. Optional `$match` on specialties / provider type.
//! 4. `$sort` by distance, then `_id`, so pages never overlap or skip.
//! 5. `$skip` / `$limit`, then `$project` to the summary shape.
//!
//! The count pipeline shares stages 1-3 and ends in `$count`.

use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::collections;
use crate::error::AppError;
use crate::models::location::{miles_to_radians, GeoPoint, EARTH_RADIUS_METERS, METERS_PER_MILE};
use crate::models::user::Visibility;
use crate::models::{ProviderType, UserType};

pub const MAX_RADIUS_MILES: f64 = 500.0;
pub const MAX_LIMIT: u32 = 100;

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSearch {
    pub center: GeoPoint,
    pub radius_miles: f64,
    pub specialties: Vec<String>,
    pub provider_types: Vec<ProviderType>,
    pub page: u32,
    pub limit: u32,
}

/// Raw query string parameters, all optional so that missing values can be
/// reported per field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub specialties: Option<String>,
    pub provider_types: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl TryFrom<SearchParams> for ProviderSearch {
    type Error = AppError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        let lat = parse_number::<f64>("lat", params.lat.as_deref())?;
        let lng = parse_number::<f64>("lng", params.lng.as_deref())?;
        let radius_miles = parse_number::<f64>("radius", params.radius.as_deref())?;
        let page = parse_number::<u32>("page", params.page.as_deref())?;
        let limit = parse_number::<u32>("limit", params.limit.as_deref())?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::invalid_field("lat", "must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::invalid_field("lng", "must be between -180 and 180"));
        }
        if !(radius_miles > 0.0 && radius_miles <= MAX_RADIUS_MILES) {
            return Err(AppError::invalid_field(
                "radius",
                format!("must be greater than 0 and at most {}", MAX_RADIUS_MILES),
            ));
        }
        if page < 1 {
            return Err(AppError::invalid_field("page", "must be at least 1"));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::invalid_field(
                "limit",
                format!("must be between 1 and {}", MAX_LIMIT),
            ));
        }

        let center = GeoPoint::new(lat, lng)
            .ok_or_else(|| AppError::invalid_field("lat", "invalid coordinates"))?;

        let provider_types = split_list(params.provider_types.as_deref())
            .into_iter()
            .map(|t| {
                t.parse::<ProviderType>()
                    .map_err(|e| AppError::invalid_field("providerTypes", e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            center,
            radius_miles,
            specialties: split_list(params.specialties.as_deref()),
            provider_types,
            page,
            limit,
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: Option<&str>) -> Result<T, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::invalid_field(field, "is required"))?;
    let value = raw
        .parse::<T>()
        .map_err(|_| AppError::invalid_field(field, "must be a number"))?;
    Ok(value)
}

/// Split a comma-separated filter list, dropping blanks and duplicates.
fn split_list(raw: Option<&str>) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.unwrap_or_default().split(',') {
        let item = item.trim();
        if !item.is_empty() && !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }
    items
}

impl ProviderSearch {
    /// Number of documents skipped before the requested page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Search radius as a spherical-cap angle.
    pub fn radius_radians(&self) -> f64 {
        miles_to_radians(self.radius_miles)
    }

    /// Search radius in metres on MongoDB's sphere.
    pub fn max_distance_meters(&self) -> f64 {
        self.radius_radians() * EARTH_RADIUS_METERS
    }

    /// Stages shared by the page and count pipelines.
    fn filter_stages(&self) -> Vec<Document> {
        let mut stages = vec![
            doc! {
                "$geoNear": {
                    "near": {
                        "type": "Point",
                        "coordinates": [self.center.lng(), self.center.lat()],
                    },
                    "key": "location",
                    "distanceField": "distance",
                    "distanceMultiplier": 1.0 / METERS_PER_MILE,
                    "maxDistance": self.max_distance_meters(),
                    "spherical": true,
                    "query": {
                        "userType": UserType::Provider.as_str(),
                        "isActive": true,
                        "preferences.privacy.profileVisibility": {
                            "$nin": [
                                Visibility::Connections.as_str(),
                                Visibility::Private.as_str(),
                            ],
                        },
                    },
                }
            },
            doc! {
                "$lookup": {
                    "from": collections::PROVIDER_PROFILES,
                    "localField": "_id",
                    "foreignField": "user",
                    "as": "profile",
                }
            },
            doc! { "$unwind": "$profile" },
        ];

        let mut post_join = Document::new();
        if !self.specialties.is_empty() {
            post_join.insert("profile.specialties", doc! { "$in": &self.specialties });
        }
        if !self.provider_types.is_empty() {
            let types: Vec<Bson> = self
                .provider_types
                .iter()
                .map(|t| Bson::String(t.as_str().to_string()))
                .collect();
            post_join.insert("profile.providerType", doc! { "$in": types });
        }
        if !post_join.is_empty() {
            stages.push(doc! { "$match": post_join });
        }

        stages
    }

    /// Pipeline producing one page of provider summaries.
    pub fn page_pipeline(&self) -> Vec<Document> {
        let mut stages = self.filter_stages();
        stages.push(doc! { "$sort": { "distance": 1, "_id": 1 } });
        stages.push(doc! { "$skip": self.skip() as i64 });
        stages.push(doc! { "$limit": i64::from(self.limit) });
        stages.push(doc! {
            "$project": {
                "_id": 0,
                "id": { "$toString": "$_id" },
                "firstName": 1,
                "lastName": 1,
                "imageUrl": 1,
                "city": unless_location_hidden("$address.city"),
                "state": unless_location_hidden("$address.state"),
                "country": unless_location_hidden("$address.country"),
                "distance": 1,
                "bio": "$profile.bio",
                "specialties": "$profile.specialties",
                "providerType": "$profile.providerType",
                "experienceYears": "$profile.experienceYears",
                "verificationStatus": "$profile.verificationStatus",
            }
        });
        stages
    }

    /// Pipeline counting every match, ignoring pagination.
    pub fn count_pipeline(&self) -> Vec<Document> {
        let mut stages = self.filter_stages();
        stages.push(doc! { "$count": "total" });
        stages
    }
}

/// Project `field` unless the provider turned `showLocation` off.
fn unless_location_hidden(field: &str) -> Document {
    doc! {
        "$cond": [
            { "$eq": ["$preferences.privacy.showLocation", false] },
            "$$REMOVE",
            field,
        ]
    }
}

/// One provider in a search result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProviderSummary {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Distance from the search center in miles
    pub distance: f64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub verification_status: Option<String>,
}

/// Pagination block of a search response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let limit_u64 = u64::from(limit.max(1));
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit_u64),
        }
    }
}

/// Extract the total from a `$count` result document.
pub fn count_from_document(doc: Option<&Document>) -> u64 {
    match doc.and_then(|d| d.get("total")) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n >= 0.0 => *n as u64,
        _ => 0,
    }
}
