use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tracing::{debug, info, instrument};
use wayfind_clients::{LocationExtractor, PathRetriever, RoutePipeline};
use wayfind_core::NormalizeOptions;
use wayfind_observability::FlowMetrics;

use crate::event::{Effect, Event, PathPurpose, UserAction};
use crate::map::{map_view, MapView};
use crate::reducer::{reduce, Outcome, Transition};
use crate::state::{FlowState, TimerKind};

/// Pauses between loading screens. The defaults match what a person
/// needs to read each screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimings {
    pub success_delay: Duration,
    pub thinking_delay: Duration,
    pub failure_delay: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_millis(600),
            thinking_delay: Duration::from_millis(1500),
            failure_delay: Duration::from_millis(3000),
        }
    }
}

impl FlowTimings {
    pub fn immediate() -> Self {
        Self {
            success_delay: Duration::ZERO,
            thinking_delay: Duration::ZERO,
            failure_delay: Duration::ZERO,
        }
    }

    pub fn delay(&self, timer: TimerKind) -> Duration {
        match timer {
            TimerKind::ShowThinking => self.success_delay,
            TimerKind::ShowRoutes => self.thinking_delay,
            TimerKind::ReturnToSearch => self.failure_delay,
        }
    }
}

/// Runs the reducer and performs its effects. Calls and timers are polled
/// on the caller's task; nothing is spawned, so collaborators need not be `Send`.
pub struct FlowController<E, R, P> {
    extractor: Arc<E>,
    retriever: Arc<R>,
    pipeline: Arc<P>,
    state: FlowState,
    timings: FlowTimings,
    metrics: Arc<FlowMetrics>,
    inflight: FuturesUnordered<LocalBoxFuture<'static, Event>>,
}

impl<E, R, P> FlowController<E, R, P>
where
    E: LocationExtractor + 'static,
    R: PathRetriever + 'static,
    P: RoutePipeline + 'static,
{
    pub fn new(
        extractor: E,
        retriever: R,
        pipeline: P,
        timings: FlowTimings,
        metrics: Arc<FlowMetrics>,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            retriever: Arc::new(retriever),
            pipeline: Arc::new(pipeline),
            state: FlowState::default(),
            timings,
            metrics,
            inflight: FuturesUnordered::new(),
        }
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.state.normalize_options = options;
        self
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn map_view(&self) -> Option<MapView> {
        map_view(&self.state)
    }

    pub fn metrics(&self) -> &Arc<FlowMetrics> {
        &self.metrics
    }

    /// True while a call or timer is still outstanding, stale ones included.
    pub fn has_pending(&self) -> bool {
        !self.inflight.is_empty()
    }

    #[instrument(skip(self))]
    pub fn dispatch(&mut self, action: UserAction) -> Outcome {
        self.apply(action.into())
    }

    /// Waits for the next finished call or timer and applies it.
    /// Returns `None` once nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<Outcome> {
        let event = self.inflight.next().await?;
        Some(self.apply(event))
    }

    pub async fn settle(&mut self) {
        while self.next_event().await.is_some() {}
    }

    fn apply(&mut self, event: Event) -> Outcome {
        let name = event.name();
        let event_token = event.token();
        let submitted_mode = match &event {
            Event::QuerySubmitted(query) => Some(query.mode),
            _ => None,
        };

        let Transition {
            state,
            effects,
            outcome,
        } = reduce(std::mem::take(&mut self.state), event);
        self.state = state;

        match outcome {
            Outcome::Applied => {
                info!(
                    event = name,
                    step = self.state.step.as_str(),
                    token = self.state.token.0,
                    effects = effects.len(),
                    "flow transition"
                );
                if let Some(mode) = submitted_mode {
                    self.metrics.inc_query(mode.as_str());
                }
            }
            Outcome::Stale => {
                debug!(
                    event = name,
                    stale_token = event_token.map(|token| token.0),
                    current_token = self.state.token.0,
                    "discarded stale result"
                );
                self.metrics.inc_stale(name);
            }
            Outcome::Ignored => {
                debug!(event = name, step = self.state.step.as_str(), "event ignored");
            }
        }

        for effect in effects {
            self.schedule(effect);
        }
        outcome
    }

    fn schedule(&mut self, effect: Effect) {
        let metrics = Arc::clone(&self.metrics);
        let future = match effect {
            Effect::ExtractLocations { token, text } => {
                let extractor = Arc::clone(&self.extractor);
                async move {
                    let started = Instant::now();
                    let result = extractor.extract(&text).await;
                    metrics.observe_call("extract_locations", started.elapsed(), result.is_ok());
                    match result {
                        Ok(endpoints) => Event::ExtractionSucceeded { token, endpoints },
                        Err(error) => Event::ExtractionFailed { token, error },
                    }
                }
                .boxed_local()
            }
            Effect::RetrievePaths {
                token,
                endpoints,
                purpose,
            } => {
                let retriever = Arc::clone(&self.retriever);
                if purpose == PathPurpose::Regeneration {
                    metrics.inc_regeneration();
                }
                async move {
                    let started = Instant::now();
                    let result = retriever.retrieve(&endpoints, true).await;
                    metrics.observe_call("retrieve_paths", started.elapsed(), result.is_ok());
                    match purpose {
                        PathPurpose::Initial => Event::PathsReceived { token, result },
                        PathPurpose::Regeneration => Event::RegenerationReceived { token, result },
                    }
                }
                .boxed_local()
            }
            Effect::GenerateRoutes {
                token,
                text,
                max_results,
            } => {
                let pipeline = Arc::clone(&self.pipeline);
                async move {
                    let started = Instant::now();
                    let result = pipeline.generate(&text, max_results).await;
                    metrics.observe_call("generate_routes", started.elapsed(), result.is_ok());
                    Event::BackendRoutesReceived { token, result }
                }
                .boxed_local()
            }
            Effect::ConvertGeometry {
                token,
                index,
                stops,
            } => {
                let retriever = Arc::clone(&self.retriever);
                async move {
                    let started = Instant::now();
                    let result = retriever.retrieve_through(&stops).await;
                    metrics.observe_call("convert_geometry", started.elapsed(), result.is_ok());
                    Event::GeometryReceived {
                        token,
                        index,
                        result,
                    }
                }
                .boxed_local()
            }
            Effect::StartTimer { token, timer } => {
                let delay = self.timings.delay(timer);
                async move {
                    tokio::time::sleep(delay).await;
                    Event::TimerElapsed { token, timer }
                }
                .boxed_local()
            }
        };
        self.inflight.push(future);
    }
}
