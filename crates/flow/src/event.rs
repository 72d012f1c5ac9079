use wayfind_core::{
    BackendResponse, Coordinate, ExtractionError, PathError, PipelineError, RawPath,
    ResolvedEndpoints, RouteMode, RouteQuery,
};

use crate::state::{RequestToken, TimerKind};

/// Everything that can move the flow forward, from the user or from a completed call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    QuerySubmitted(RouteQuery),
    QueryEdited {
        text: String,
    },
    ExtractionSucceeded {
        token: RequestToken,
        endpoints: ResolvedEndpoints,
    },
    ExtractionFailed {
        token: RequestToken,
        error: ExtractionError,
    },
    PathsReceived {
        token: RequestToken,
        result: Result<Vec<RawPath>, PathError>,
    },
    BackendRoutesReceived {
        token: RequestToken,
        result: Result<BackendResponse, PipelineError>,
    },
    RouteSelected {
        id: usize,
    },
    GeometryReceived {
        token: RequestToken,
        index: usize,
        result: Result<RawPath, PathError>,
    },
    NavigationStarted,
    BackRequested,
    EndpointsEdited {
        origin: String,
        destination: String,
    },
    RegenerateRequested,
    RegenerationReceived {
        token: RequestToken,
        result: Result<Vec<RawPath>, PathError>,
    },
    WaypointsToggled {
        id: usize,
    },
    TimerElapsed {
        token: RequestToken,
        timer: TimerKind,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuerySubmitted(_) => "query_submitted",
            Self::QueryEdited { .. } => "query_edited",
            Self::ExtractionSucceeded { .. } => "extraction_succeeded",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::PathsReceived { .. } => "paths_received",
            Self::BackendRoutesReceived { .. } => "backend_routes_received",
            Self::RouteSelected { .. } => "route_selected",
            Self::GeometryReceived { .. } => "geometry_received",
            Self::NavigationStarted => "navigation_started",
            Self::BackRequested => "back_requested",
            Self::EndpointsEdited { .. } => "endpoints_edited",
            Self::RegenerateRequested => "regenerate_requested",
            Self::RegenerationReceived { .. } => "regeneration_received",
            Self::WaypointsToggled { .. } => "waypoints_toggled",
            Self::TimerElapsed { .. } => "timer_elapsed",
        }
    }

    pub fn token(&self) -> Option<RequestToken> {
        match self {
            Self::ExtractionSucceeded { token, .. }
            | Self::ExtractionFailed { token, .. }
            | Self::PathsReceived { token, .. }
            | Self::BackendRoutesReceived { token, .. }
            | Self::GeometryReceived { token, .. }
            | Self::RegenerationReceived { token, .. }
            | Self::TimerElapsed { token, .. } => Some(*token),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPurpose {
    Initial,
    Regeneration,
}

/// I/O the shell performs on the reducer's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ExtractLocations {
        token: RequestToken,
        text: String,
    },
    RetrievePaths {
        token: RequestToken,
        endpoints: ResolvedEndpoints,
        purpose: PathPurpose,
    },
    GenerateRoutes {
        token: RequestToken,
        text: String,
        max_results: usize,
    },
    ConvertGeometry {
        token: RequestToken,
        index: usize,
        stops: Vec<Coordinate>,
    },
    StartTimer {
        token: RequestToken,
        timer: TimerKind,
    },
}

/// Inputs a user interface may send. Pipeline results are not user actions.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Submit {
        text: String,
        mode: RouteMode,
        max_results: Option<usize>,
    },
    EditQuery {
        text: String,
    },
    Select {
        id: usize,
    },
    StartNavigation,
    Back,
    EditEndpoints {
        origin: String,
        destination: String,
    },
    Regenerate,
    ToggleWaypoints {
        id: usize,
    },
}

impl From<UserAction> for Event {
    fn from(action: UserAction) -> Self {
        match action {
            UserAction::Submit {
                text,
                mode,
                max_results,
            } => {
                let query = RouteQuery::new(text, mode);
                let query = match max_results {
                    Some(max_results) => query.with_max_results(max_results),
                    None => query,
                };
                Event::QuerySubmitted(query)
            }
            UserAction::EditQuery { text } => Event::QueryEdited { text },
            UserAction::Select { id } => Event::RouteSelected { id },
            UserAction::StartNavigation => Event::NavigationStarted,
            UserAction::Back => Event::BackRequested,
            UserAction::EditEndpoints {
                origin,
                destination,
            } => Event::EndpointsEdited {
                origin,
                destination,
            },
            UserAction::Regenerate => Event::RegenerateRequested,
            UserAction::ToggleWaypoints { id } => Event::WaypointsToggled { id },
        }
    }
}
