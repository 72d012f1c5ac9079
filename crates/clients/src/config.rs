use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use wayfind_core::{Coordinate, NormalizeOptions, RoutingProfile, UnitSystem};

/// The backend runs a multi-step pipeline; shorter client timeouts cut off healthy requests.
pub const MIN_BACKEND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub mapbox_token: Option<String>,
    pub mapbox_base_url: String,
    pub profile: RoutingProfile,
    pub backend_url: String,
    pub connect_timeout: Duration,
    pub quick_timeout: Duration,
    pub backend_timeout: Duration,
    pub current_location: Option<Coordinate>,
    pub units: UnitSystem,
    pub geocode_cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            mapbox_token: None,
            mapbox_base_url: "https://api.mapbox.com".to_string(),
            profile: RoutingProfile::Walking,
            backend_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(6),
            quick_timeout: Duration::from_secs(20),
            backend_timeout: Duration::from_secs(300),
            current_location: None,
            units: UnitSystem::Imperial,
            geocode_cache_ttl: Duration::from_secs(86_400),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let current_location = match (
            env_parse::<f64>("WAYFIND_CURRENT_LAT"),
            env_parse::<f64>("WAYFIND_CURRENT_LON"),
        ) {
            (Some(lat), Some(lon)) => {
                Some(Coordinate::new(lat, lon)).filter(|point| point.is_valid())
            }
            _ => None,
        };

        Self {
            openai_api_key: env::var("WAYFIND_OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openai_model: env::var("WAYFIND_OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: env::var("WAYFIND_OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            mapbox_token: env::var("WAYFIND_MAPBOX_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            mapbox_base_url: env::var("WAYFIND_MAPBOX_BASE_URL")
                .unwrap_or(defaults.mapbox_base_url),
            profile: env::var("WAYFIND_ROUTING_PROFILE")
                .ok()
                .and_then(|value| RoutingProfile::parse(&value))
                .unwrap_or(defaults.profile),
            backend_url: env::var("WAYFIND_BACKEND_URL").unwrap_or(defaults.backend_url),
            connect_timeout: env_parse::<u64>("WAYFIND_CONNECT_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            quick_timeout: env_parse::<u64>("WAYFIND_QUICK_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.quick_timeout),
            backend_timeout: backend_timeout_from(env_parse::<u64>(
                "WAYFIND_BACKEND_TIMEOUT_SECONDS",
            )),
            current_location,
            units: env::var("WAYFIND_UNITS")
                .ok()
                .and_then(|value| UnitSystem::parse(&value))
                .unwrap_or(defaults.units),
            geocode_cache_ttl: env_parse::<u64>("WAYFIND_GEOCODE_CACHE_TTL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.geocode_cache_ttl),
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            units: self.units,
            profile: self.profile,
        }
    }

    /// Client for the human-scale quick-mode services.
    pub fn quick_http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.quick_timeout)
            .build()
            .context("failed to build quick-mode HTTP client")
    }

    pub fn backend_request_timeout(&self) -> Duration {
        self.backend_timeout.max(MIN_BACKEND_TIMEOUT)
    }

    pub fn backend_http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.backend_request_timeout())
            .build()
            .context("failed to build backend HTTP client")
    }
}

/// Backend timeout from a configured number of seconds, floored at [`MIN_BACKEND_TIMEOUT`].
pub fn backend_timeout_from(seconds: Option<u64>) -> Duration {
    seconds
        .map(Duration::from_secs)
        .unwrap_or(ClientConfig::default().backend_timeout)
        .max(MIN_BACKEND_TIMEOUT)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse::<T>().ok())
}
