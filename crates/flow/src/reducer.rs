use wayfind_core::{
    index_for_id, normalize_backend_routes, normalize_paths, normalize_text, same_query,
    FlowError, PathError, PipelineError, ResolvedEndpoints, RouteMode, RouteOption, RouteQuery,
};

use crate::event::{Effect, Event, PathPurpose};
use crate::state::{FlowState, PendingCall, RequestToken, Step, TimerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Result or timer from a superseded request; state untouched.
    Stale,
    /// Event not meaningful in the current step; state untouched.
    Ignored,
}

#[derive(Debug)]
pub struct Transition {
    pub state: FlowState,
    pub effects: Vec<Effect>,
    pub outcome: Outcome,
}

impl Transition {
    fn applied(state: FlowState, effects: Vec<Effect>) -> Self {
        Self {
            state,
            effects,
            outcome: Outcome::Applied,
        }
    }

    fn unchanged(state: FlowState, outcome: Outcome) -> Self {
        Self {
            state,
            effects: Vec::new(),
            outcome,
        }
    }
}

/// The flow's transition function. Performs no I/O; every side effect is
/// returned as an [`Effect`] for the shell to run.
pub fn reduce(mut state: FlowState, event: Event) -> Transition {
    match event {
        Event::QuerySubmitted(query) => submit(state, query),

        Event::QueryEdited { text } => {
            let differs = state
                .query
                .as_ref()
                .is_some_and(|query| !same_query(&query.text, &text));
            state.draft_text = text;
            if differs {
                state.reset();
            }
            Transition::applied(state, Vec::new())
        }

        Event::ExtractionSucceeded { token, endpoints } => {
            if !accepts(&state, token, PendingCall::Extraction) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            state.endpoints = Some(endpoints.clone());
            state.pending_call = Some(PendingCall::PathRetrieval);
            Transition::applied(
                state,
                vec![Effect::RetrievePaths {
                    token,
                    endpoints,
                    purpose: PathPurpose::Initial,
                }],
            )
        }

        Event::ExtractionFailed { token, error } => {
            if !accepts(&state, token, PendingCall::Extraction) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            fail(state, error.into())
        }

        Event::PathsReceived { token, result } => {
            if !accepts(&state, token, PendingCall::PathRetrieval) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            match result {
                Ok(paths) => {
                    let routes = normalize_paths(&paths, state.normalize_options);
                    if routes.is_empty() {
                        fail(state, PathError::NoRoutes.into())
                    } else {
                        succeed(state, routes)
                    }
                }
                Err(error) => fail(state, error.into()),
            }
        }

        Event::BackendRoutesReceived { token, result } => {
            if !accepts(&state, token, PendingCall::BackendPipeline) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            match result {
                Ok(response) => {
                    let routes = normalize_backend_routes(&response.routes, state.normalize_options);
                    let metadata = response.metadata;
                    if let (Some(origin), Some(destination)) = (
                        metadata.resolved_origin_text.clone(),
                        metadata.resolved_destination_text.clone(),
                    ) {
                        state.endpoints = Some(ResolvedEndpoints {
                            origin,
                            destination,
                        });
                    }
                    let empty_error = if metadata.waypoints_found == 0 {
                        PipelineError::NoWaypoints
                    } else {
                        PipelineError::NoRoutes
                    };
                    state.backend_metadata = Some(metadata);
                    if routes.is_empty() {
                        fail(state, empty_error.into())
                    } else {
                        succeed(state, routes)
                    }
                }
                Err(error) => fail(state, error.into()),
            }
        }

        Event::TimerElapsed { token, timer } => {
            if token != state.token || state.pending_timer != Some(timer) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            state.pending_timer = None;
            let mut effects = Vec::new();
            match timer {
                TimerKind::ShowThinking => {
                    state.step = Step::Thinking;
                    state.pending_timer = Some(TimerKind::ShowRoutes);
                    effects.push(Effect::StartTimer {
                        token,
                        timer: TimerKind::ShowRoutes,
                    });
                }
                TimerKind::ShowRoutes => state.step = Step::Routes,
                TimerKind::ReturnToSearch => state.step = Step::Search,
            }
            Transition::applied(state, effects)
        }

        Event::RouteSelected { id } => select(state, id),

        Event::GeometryReceived {
            token,
            index,
            result,
        } => {
            if token != state.token || !state.geometry_pending || state.selected != Some(index) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            state.geometry_pending = false;
            // A failed conversion leaves the map on the straight waypoint legs.
            state.converted_geometry = result.ok().map(|path| (index, path));
            Transition::applied(state, Vec::new())
        }

        Event::NavigationStarted => {
            if state.step != Step::Detail || state.selected_route().is_none() {
                return Transition::unchanged(state, Outcome::Ignored);
            }
            state.step = Step::Navigation;
            Transition::applied(state, Vec::new())
        }

        Event::BackRequested => match state.step {
            Step::Search => Transition::unchanged(state, Outcome::Ignored),
            Step::Navigation => {
                state.step = Step::Detail;
                Transition::applied(state, Vec::new())
            }
            Step::Detail => {
                state.step = Step::Routes;
                Transition::applied(state, Vec::new())
            }
            Step::Processing | Step::Thinking | Step::Routes => {
                state.reset();
                Transition::applied(state, Vec::new())
            }
        },

        Event::EndpointsEdited {
            origin,
            destination,
        } => {
            if state.step != Step::Routes {
                return Transition::unchanged(state, Outcome::Ignored);
            }
            state.draft_endpoints = Some(ResolvedEndpoints {
                origin: normalize_text(&origin),
                destination: normalize_text(&destination),
            });
            Transition::applied(state, Vec::new())
        }

        Event::RegenerateRequested => {
            if state.step != Step::Routes || state.is_regenerating() {
                return Transition::unchanged(state, Outcome::Ignored);
            }
            let Some(endpoints) = state
                .draft_endpoints
                .clone()
                .or_else(|| state.endpoints.clone())
                .filter(|endpoints| !endpoints.destination.is_empty())
            else {
                return Transition::unchanged(state, Outcome::Ignored);
            };

            let token = state.issue_token();
            state.pending_call = Some(PendingCall::Regeneration);
            state.regenerating_for = Some(endpoints.clone());
            state.inline_error = None;
            state.geometry_pending = false;
            Transition::applied(
                state,
                vec![Effect::RetrievePaths {
                    token,
                    endpoints,
                    purpose: PathPurpose::Regeneration,
                }],
            )
        }

        Event::RegenerationReceived { token, result } => {
            if !accepts(&state, token, PendingCall::Regeneration) {
                return Transition::unchanged(state, Outcome::Stale);
            }
            state.pending_call = None;
            let requested = state.regenerating_for.take();
            let routes = result.map(|paths| normalize_paths(&paths, state.normalize_options));
            match routes {
                Ok(routes) if !routes.is_empty() => {
                    // A draft edited while the call was in flight stays a draft.
                    if state.draft_endpoints == requested {
                        state.draft_endpoints = None;
                    }
                    if requested.is_some() {
                        state.endpoints = requested;
                    }
                    state.routes = routes;
                    state.selected = Some(0);
                    state.converted_geometry = None;
                    state.expanded_waypoints.clear();
                    state.backend_metadata = None;
                }
                Ok(_) => state.inline_error = Some(PathError::NoRoutes.into()),
                Err(error) => state.inline_error = Some(error.into()),
            }
            Transition::applied(state, Vec::new())
        }

        Event::WaypointsToggled { id } => {
            if index_for_id(id, state.routes.len()).is_none() {
                return Transition::unchanged(state, Outcome::Ignored);
            }
            if !state.expanded_waypoints.remove(&id) {
                state.expanded_waypoints.insert(id);
            }
            Transition::applied(state, Vec::new())
        }
    }
}

fn accepts(state: &FlowState, token: RequestToken, call: PendingCall) -> bool {
    token == state.token && state.pending_call == Some(call)
}

fn submit(mut state: FlowState, query: RouteQuery) -> Transition {
    let text = normalize_text(&query.text);
    if text.is_empty() {
        return Transition::unchanged(state, Outcome::Ignored);
    }

    state.draft_text = text.clone();
    state.reset();
    let token = state.token;
    let effect = match query.mode {
        RouteMode::Quick => {
            state.pending_call = Some(PendingCall::Extraction);
            Effect::ExtractLocations {
                token,
                text: text.clone(),
            }
        }
        RouteMode::Enhanced => {
            state.pending_call = Some(PendingCall::BackendPipeline);
            Effect::GenerateRoutes {
                token,
                text: text.clone(),
                max_results: query.max_results,
            }
        }
    };
    state.step = Step::Processing;
    state.query = Some(RouteQuery { text, ..query });
    Transition::applied(state, vec![effect])
}

fn succeed(mut state: FlowState, routes: Vec<RouteOption>) -> Transition {
    let token = state.token;
    state.pending_call = None;
    state.error = None;
    state.routes = routes;
    state.selected = None;
    state.pending_timer = Some(TimerKind::ShowThinking);
    Transition::applied(
        state,
        vec![Effect::StartTimer {
            token,
            timer: TimerKind::ShowThinking,
        }],
    )
}

fn fail(mut state: FlowState, error: FlowError) -> Transition {
    let token = state.token;
    state.pending_call = None;
    state.error = Some(error);
    state.pending_timer = Some(TimerKind::ReturnToSearch);
    Transition::applied(
        state,
        vec![Effect::StartTimer {
            token,
            timer: TimerKind::ReturnToSearch,
        }],
    )
}

fn select(mut state: FlowState, id: usize) -> Transition {
    if !matches!(state.step, Step::Routes | Step::Detail) {
        return Transition::unchanged(state, Outcome::Ignored);
    }
    let Some(index) = index_for_id(id, state.routes.len()) else {
        return Transition::unchanged(state, Outcome::Ignored);
    };

    // Leaving the list abandons a regeneration still in flight.
    if state.is_regenerating() {
        state.pending_call = None;
        state.regenerating_for = None;
        state.issue_token();
    }

    state.selected = Some(index);
    state.step = Step::Detail;

    let mut effects = Vec::new();
    let already_converted = state
        .converted_geometry
        .as_ref()
        .is_some_and(|(converted, _)| *converted == index);
    if !already_converted {
        state.converted_geometry = None;
        state.geometry_pending = false;
        if let Some(route) = state.routes[index].backend_route() {
            effects.push(Effect::ConvertGeometry {
                token: state.token,
                index,
                stops: route.stops(),
            });
            state.geometry_pending = true;
        }
    }
    Transition::applied(state, effects)
}
