//! In-process collaborators with scripted results for driving the route flow.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wayfind_clients::{LocationExtractor, PathRetriever, RoutePipeline};
use wayfind_core::{
    BackendHealth, BackendMetadata, BackendResponse, BackendWaypoint, Coordinate,
    ExtractionError, PathError, PipelineError, RawBackendRoute, RawPath, RawSubScores,
    ResolvedEndpoints,
};
use wayfind_flow::{FlowController, FlowTimings};
use wayfind_observability::FlowMetrics;

pub type TestController = FlowController<ScriptedExtractor, ScriptedRetriever, ScriptedPipeline>;

pub fn controller(
    extractor: ScriptedExtractor,
    retriever: ScriptedRetriever,
    pipeline: ScriptedPipeline,
) -> TestController {
    FlowController::new(
        extractor,
        retriever,
        pipeline,
        FlowTimings::immediate(),
        FlowMetrics::shared(),
    )
}

#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Answers keyed by the exact request text; unknown text fails extraction.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    answers: HashMap<String, (Duration, Result<ResolvedEndpoints, ExtractionError>)>,
    pub calls: CallCount,
}

impl ScriptedExtractor {
    pub fn answer(mut self, text: &str, latency: Duration, endpoints: ResolvedEndpoints) -> Self {
        self.answers
            .insert(text.to_string(), (latency, Ok(endpoints)));
        self
    }
}

impl LocationExtractor for ScriptedExtractor {
    async fn extract(&self, text: &str) -> Result<ResolvedEndpoints, ExtractionError> {
        self.calls.bump();
        match self.answers.get(text) {
            Some((latency, result)) => {
                tokio::time::sleep(*latency).await;
                result.clone()
            }
            None => Err(ExtractionError::MissingDestination),
        }
    }
}

/// Paths keyed by destination text; unknown destinations have no route.
#[derive(Debug, Default)]
pub struct ScriptedRetriever {
    paths: HashMap<String, (Duration, Result<Vec<RawPath>, PathError>)>,
    pub calls: CallCount,
    pub conversions: CallCount,
}

impl ScriptedRetriever {
    pub fn paths(mut self, destination: &str, latency: Duration, paths: Vec<RawPath>) -> Self {
        self.paths
            .insert(destination.to_string(), (latency, Ok(paths)));
        self
    }

    pub fn failure(mut self, destination: &str, latency: Duration, error: PathError) -> Self {
        self.paths
            .insert(destination.to_string(), (latency, Err(error)));
        self
    }
}

impl PathRetriever for ScriptedRetriever {
    async fn retrieve(
        &self,
        endpoints: &ResolvedEndpoints,
        _alternatives: bool,
    ) -> Result<Vec<RawPath>, PathError> {
        self.calls.bump();
        match self.paths.get(&endpoints.destination) {
            Some((latency, result)) => {
                tokio::time::sleep(*latency).await;
                result.clone()
            }
            None => Err(PathError::NoRoutes),
        }
    }

    async fn retrieve_through(&self, stops: &[Coordinate]) -> Result<RawPath, PathError> {
        self.conversions.bump();
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(RawPath {
            distance_m: 3000.0,
            duration_s: 2100.0,
            geometry: stops.to_vec(),
            origin: stops.first().copied(),
            destination: stops.last().copied(),
            ..RawPath::default()
        })
    }
}

#[derive(Debug)]
pub struct ScriptedPipeline {
    latency: Duration,
    result: Result<BackendResponse, PipelineError>,
    pub calls: CallCount,
}

impl Default for ScriptedPipeline {
    fn default() -> Self {
        Self::respond(Duration::ZERO, Err(PipelineError::NoRoutes))
    }
}

impl ScriptedPipeline {
    pub fn respond(latency: Duration, result: Result<BackendResponse, PipelineError>) -> Self {
        Self {
            latency,
            result,
            calls: CallCount::default(),
        }
    }
}

impl RoutePipeline for ScriptedPipeline {
    async fn generate(
        &self,
        _text: &str,
        _max_results: usize,
    ) -> Result<BackendResponse, PipelineError> {
        self.calls.bump();
        tokio::time::sleep(self.latency).await;
        self.result.clone()
    }

    async fn health(&self) -> Result<BackendHealth, PipelineError> {
        Ok(BackendHealth {
            status: "healthy".to_string(),
            modules: Default::default(),
        })
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn union_square() -> Coordinate {
    Coordinate::new(37.7880, -122.4075)
}

pub fn golden_gate_park() -> Coordinate {
    Coordinate::new(37.7694, -122.4862)
}

pub fn walking_path(distance_m: f64) -> RawPath {
    RawPath {
        distance_m,
        duration_s: distance_m / 1.35,
        geometry: vec![union_square(), golden_gate_park()],
        origin: Some(union_square()),
        destination: Some(golden_gate_park()),
        ..RawPath::default()
    }
}

pub fn scenic_route(score: f64, distance_m: f64, stops: &[(&str, &str, Coordinate)]) -> RawBackendRoute {
    RawBackendRoute {
        id: None,
        score,
        scores: RawSubScores {
            scenic: Some(score),
            efficiency: Some(0.6),
            ..RawSubScores::default()
        },
        distance_m,
        duration_s: distance_m / 1.35,
        origin: union_square(),
        destination: golden_gate_park(),
        waypoints: stops
            .iter()
            .map(|(name, category, coordinates)| BackendWaypoint {
                name: name.to_string(),
                category: category.to_string(),
                relevance_score: Some(0.8),
                input_query: Some("parks".to_string()),
                coordinates: *coordinates,
            })
            .collect(),
        segments: Vec::new(),
        tags: Vec::new(),
        explanation: None,
        links: None,
    }
}

pub fn backend_response(routes: Vec<RawBackendRoute>, waypoints_found: usize) -> BackendResponse {
    BackendResponse {
        routes,
        processing_time_seconds: 42.0,
        metadata: BackendMetadata {
            total_generated: 8,
            waypoints_found,
            resolved_origin_text: Some("Union Square, San Francisco".to_string()),
            resolved_destination_text: Some("Golden Gate Park, San Francisco".to_string()),
            ..BackendMetadata::default()
        },
    }
}
