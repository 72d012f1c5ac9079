use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;
use wayfind_core::{
    is_current_location, Coordinate, PathError, RawLeg, RawPath, ResolvedEndpoints,
    RoutingProfile,
};

use crate::cache::GeocodeCache;
use crate::config::ClientConfig;

const GEOCODE_CACHE_ENTRIES: usize = 512;

/// Looks up alternative paths between two places through a mapping service.
pub trait PathRetriever: Send + Sync {
    async fn retrieve(
        &self,
        endpoints: &ResolvedEndpoints,
        alternatives: bool,
    ) -> Result<Vec<RawPath>, PathError>;

    /// A single path visiting `stops` in order.
    async fn retrieve_through(&self, stops: &[Coordinate]) -> Result<RawPath, PathError>;
}

#[derive(Debug, Clone)]
pub struct MapboxRetriever {
    client: Client,
    token: String,
    base_url: Url,
    profile: RoutingProfile,
    current_location: Option<Coordinate>,
    cache: GeocodeCache,
}

impl MapboxRetriever {
    pub fn new(client: Client, token: String, base_url: Url, profile: RoutingProfile) -> Self {
        Self {
            client,
            token,
            base_url,
            profile,
            current_location: None,
            cache: GeocodeCache::new(std::time::Duration::from_secs(86_400), GEOCODE_CACHE_ENTRIES),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let token = config
            .mapbox_token
            .clone()
            .context("WAYFIND_MAPBOX_TOKEN is not set")?;
        let base_url = Url::parse(&config.mapbox_base_url)
            .with_context(|| format!("invalid Mapbox base url {}", config.mapbox_base_url))?;

        Ok(Self::new(config.quick_http_client()?, token, base_url, config.profile)
            .with_current_location(config.current_location)
            .with_cache(GeocodeCache::new(config.geocode_cache_ttl, GEOCODE_CACHE_ENTRIES)))
    }

    pub fn with_current_location(mut self, current_location: Option<Coordinate>) -> Self {
        self.current_location = current_location;
        self
    }

    pub fn with_cache(mut self, cache: GeocodeCache) -> Self {
        self.cache = cache;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PathError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PathError::Other {
                status: None,
                message: format!("{} cannot carry path segments", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("access_token", &self.token);
        Ok(url)
    }

    #[instrument(skip(self))]
    async fn resolve(&self, place: &str) -> Result<Coordinate, PathError> {
        if is_current_location(place) {
            return self
                .current_location
                .ok_or_else(|| PathError::LocationNotFound(place.to_string()));
        }
        if let Some(hit) = self.cache.get(place) {
            debug!("geocode cache hit");
            return Ok(hit);
        }

        let file = format!("{}.json", place.trim());
        let mut url = self.endpoint(&["geocoding", "v5", "mapbox.places", &file])?;
        url.query_pairs_mut().append_pair("limit", "1");

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().await.unwrap_or_default()));
        }
        let body: GeocodingResponse = response.json().await.map_err(|err| PathError::Other {
            status: Some(status.as_u16()),
            message: format!("unreadable geocoding response: {err}"),
        })?;

        let coordinate = parse_geocoding(place, body)?;
        self.cache.insert(place, coordinate);
        Ok(coordinate)
    }

    #[instrument(skip(self, stops), fields(stops = stops.len()))]
    async fn directions(
        &self,
        stops: &[Coordinate],
        alternatives: bool,
    ) -> Result<Vec<RawPath>, PathError> {
        let coordinates = stops
            .iter()
            .map(|point| format!("{:.6},{:.6}", point.lon, point.lat))
            .collect::<Vec<_>>()
            .join(";");
        let mut url = self.endpoint(&[
            "directions",
            "v5",
            "mapbox",
            self.profile.mapbox_profile(),
            &coordinates,
        ])?;
        url.query_pairs_mut()
            .append_pair("alternatives", if alternatives { "true" } else { "false" })
            .append_pair("geometries", "geojson")
            .append_pair("overview", "full")
            .append_pair("steps", "true");

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        match serde_json::from_str::<DirectionsResponse>(&text) {
            Ok(body) => parse_directions(body, Some(status)),
            Err(_) if !status.is_success() => Err(status_error(status, text)),
            Err(err) => Err(PathError::Other {
                status: Some(status.as_u16()),
                message: format!("unreadable directions response: {err}"),
            }),
        }
    }
}

impl PathRetriever for MapboxRetriever {
    #[instrument(skip(self), fields(origin = %endpoints.origin, destination = %endpoints.destination))]
    async fn retrieve(
        &self,
        endpoints: &ResolvedEndpoints,
        alternatives: bool,
    ) -> Result<Vec<RawPath>, PathError> {
        let origin = self.resolve(&endpoints.origin).await?;
        let destination = self.resolve(&endpoints.destination).await?;
        let paths = self.directions(&[origin, destination], alternatives).await?;
        info!(alternatives = paths.len(), "paths retrieved");
        Ok(paths)
    }

    async fn retrieve_through(&self, stops: &[Coordinate]) -> Result<RawPath, PathError> {
        if stops.len() < 2 {
            return Err(PathError::Other {
                status: None,
                message: "at least two stops are required".to_string(),
            });
        }
        self.directions(stops, false)
            .await?
            .into_iter()
            .next()
            .ok_or(PathError::NoRoutes)
    }
}

fn transport_error(err: reqwest::Error) -> PathError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    warn!(error = %message, "mapping service unreachable");
    PathError::Other {
        status: err.status().map(|status| status.as_u16()),
        message,
    }
}

fn status_error(status: StatusCode, body: String) -> PathError {
    PathError::Other {
        status: Some(status.as_u16()),
        message: if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unexpected status").to_string()
        } else {
            body
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    features: Vec<GeocodingFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodingFeature {
    center: [f64; 2],
}

pub fn parse_geocoding(query: &str, body: GeocodingResponse) -> Result<Coordinate, PathError> {
    body.features
        .first()
        .map(|feature| Coordinate::from_lon_lat(feature.center))
        .filter(|point| point.is_valid())
        .ok_or_else(|| PathError::LocationNotFound(query.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    #[serde(default)]
    waypoints: Vec<DirectionsWaypoint>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<LineString>,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    #[serde(default)]
    geometry: Option<LineString>,
}

#[derive(Debug, Default, Deserialize)]
struct LineString {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsWaypoint {
    location: [f64; 2],
}

impl LineString {
    fn points(&self) -> Vec<Coordinate> {
        self.coordinates
            .iter()
            .map(|pair| Coordinate::from_lon_lat(*pair))
            .collect()
    }
}

pub fn parse_directions(
    body: DirectionsResponse,
    status: Option<StatusCode>,
) -> Result<Vec<RawPath>, PathError> {
    match body.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Err(PathError::NoRoutes),
        "NoSegment" => {
            return Err(PathError::LocationNotFound(
                body.message
                    .unwrap_or_else(|| "no road near one of the locations".to_string()),
            ))
        }
        other => {
            return Err(PathError::Other {
                status: status.map(|status| status.as_u16()),
                message: body.message.unwrap_or_else(|| other.to_string()),
            })
        }
    }

    if body.routes.is_empty() {
        return Err(PathError::NoRoutes);
    }

    let origin = body.waypoints.first().map(|point| Coordinate::from_lon_lat(point.location));
    let destination = body
        .waypoints
        .last()
        .filter(|_| body.waypoints.len() > 1)
        .map(|point| Coordinate::from_lon_lat(point.location));

    Ok(body
        .routes
        .into_iter()
        .map(|route| RawPath {
            distance_m: route.distance,
            duration_s: route.duration,
            geometry: route.geometry.unwrap_or_default().points(),
            legs: route.legs.into_iter().map(leg_from_directions).collect(),
            origin,
            destination,
        })
        .collect())
}

fn leg_from_directions(leg: DirectionsLeg) -> RawLeg {
    let mut geometry = Vec::<Coordinate>::new();
    for step in leg.steps {
        for point in step.geometry.unwrap_or_default().points() {
            if geometry.last() != Some(&point) {
                geometry.push(point);
            }
        }
    }

    RawLeg {
        distance_m: leg.distance,
        duration_s: leg.duration,
        geometry,
        via: leg
            .summary
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect(),
    }
}
