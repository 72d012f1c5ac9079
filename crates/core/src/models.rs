use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::score::{Score, SubScores};

/// Text the extractor falls back to when a request names no starting point.
pub const CURRENT_LOCATION: &str = "Current Location";

/// Canonical coordinate. Mapbox speaks `[lon, lat]`, the backend speaks
/// `{latitude, longitude}`; both are converted at their parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lon: pair[0],
        }
    }

    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    #[default]
    Quick,
    Enhanced,
}

impl RouteMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "quick" | "fast" | "basic" => Some(Self::Quick),
            "enhanced" | "ai" | "scenic" | "backend" => Some(Self::Enhanced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Enhanced => "enhanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingProfile {
    #[default]
    Walking,
    Driving,
    Cycling,
}

impl RoutingProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "walking" | "walk" | "foot" => Some(Self::Walking),
            "driving" | "drive" | "car" => Some(Self::Driving),
            "cycling" | "bike" | "bicycle" => Some(Self::Cycling),
            _ => None,
        }
    }

    pub fn mapbox_profile(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Driving => "driving",
            Self::Cycling => "cycling",
        }
    }

    pub fn google_travel_mode(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Driving => "driving",
            Self::Cycling => "bicycling",
        }
    }

    pub fn apple_dirflg(self) -> &'static str {
        match self {
            Self::Walking => "w",
            Self::Driving => "d",
            // Apple Maps has no cycling flag on the URL scheme.
            Self::Cycling => "w",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "imperial" | "mi" | "miles" | "us" => Some(Self::Imperial),
            "metric" | "km" | "si" => Some(Self::Metric),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub text: String,
    pub mode: RouteMode,
    pub max_results: usize,
}

impl RouteQuery {
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    pub fn new(text: impl Into<String>, mode: RouteMode) -> Self {
        Self {
            text: text.into(),
            mode,
            max_results: Self::DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEndpoints {
    pub origin: String,
    pub destination: String,
}

impl ResolvedEndpoints {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawLeg {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Vec<Coordinate>,
    pub via: Vec<String>,
}

/// One alternative returned by the mapping service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPath {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Vec<Coordinate>,
    pub legs: Vec<RawLeg>,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
}

impl RawPath {
    /// Via-point names across all legs, first occurrence wins.
    pub fn via_points(&self) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        for name in self.legs.iter().flat_map(|leg| leg.via.iter()) {
            if !seen.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
                seen.push(name.clone());
            }
        }
        seen
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSubScores {
    #[serde(default, alias = "clip")]
    pub scenic: Option<f64>,
    #[serde(default)]
    pub efficiency: Option<f64>,
    #[serde(default)]
    pub preference: Option<f64>,
    #[serde(default)]
    pub safety: Option<f64>,
    #[serde(default)]
    pub images_used: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendWaypoint {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub input_query: Option<String>,
    pub coordinates: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendSegment {
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub duration_s: f64,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub polyline: Option<String>,
    #[serde(default)]
    pub start: Option<Coordinate>,
    #[serde(default)]
    pub end: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeepLinks {
    #[serde(default)]
    pub google_maps: Option<String>,
    #[serde(default)]
    pub apple_maps: Option<String>,
}

impl DeepLinks {
    pub fn is_empty(&self) -> bool {
        self.google_maps.is_none() && self.apple_maps.is_none()
    }
}

/// A ranked route produced by the backend pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBackendRoute {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub scores: RawSubScores,
    pub distance_m: f64,
    pub duration_s: f64,
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(default)]
    pub waypoints: Vec<BackendWaypoint>,
    #[serde(default)]
    pub segments: Vec<BackendSegment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub links: Option<DeepLinks>,
}

impl RawBackendRoute {
    /// Origin, every waypoint, then destination.
    pub fn stops(&self) -> Vec<Coordinate> {
        let mut stops = Vec::with_capacity(self.waypoints.len() + 2);
        stops.push(self.origin);
        stops.extend(self.waypoints.iter().map(|waypoint| waypoint.coordinates));
        stops.push(self.destination);
        stops
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendMetadata {
    #[serde(default, alias = "total_routes_generated")]
    pub total_generated: usize,
    #[serde(default)]
    pub waypoints_found: usize,
    #[serde(default)]
    pub resolved_origin_text: Option<String>,
    #[serde(default)]
    pub resolved_destination_text: Option<String>,
    #[serde(default)]
    pub timings: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub routes: Vec<RawBackendRoute>,
    #[serde(default, alias = "processing_time")]
    pub processing_time_seconds: f64,
    #[serde(default)]
    pub metadata: BackendMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl BackendHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// Source data a `RouteOption` was normalized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RoutePayload {
    Path(RawPath),
    Backend(RawBackendRoute),
}

/// Canonical, pipeline-agnostic route used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOption {
    /// 1-based display id; always `index + 1`.
    pub id: usize,
    pub title: String,
    pub score: Score,
    pub sub_scores: SubScores,
    pub duration_text: String,
    pub distance_text: String,
    pub detour_percent: u32,
    pub tags: Vec<String>,
    pub narrative: String,
    pub waypoint_names: Vec<String>,
    pub links: Option<DeepLinks>,
    pub payload: RoutePayload,
}

impl RouteOption {
    pub fn detour_text(&self) -> String {
        format!("{}%", self.detour_percent)
    }

    pub fn backend_route(&self) -> Option<&RawBackendRoute> {
        match &self.payload {
            RoutePayload::Backend(route) => Some(route),
            RoutePayload::Path(_) => None,
        }
    }

    pub fn raw_path(&self) -> Option<&RawPath> {
        match &self.payload {
            RoutePayload::Path(path) => Some(path),
            RoutePayload::Backend(_) => None,
        }
    }

    pub fn distance_m(&self) -> f64 {
        match &self.payload {
            RoutePayload::Path(path) => path.distance_m,
            RoutePayload::Backend(route) => route.distance_m,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
