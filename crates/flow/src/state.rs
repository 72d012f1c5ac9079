use std::collections::BTreeSet;

use serde::Serialize;
use wayfind_core::{
    BackendMetadata, FlowError, NormalizeOptions, RawPath, ResolvedEndpoints, RouteOption,
    RouteQuery,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Search,
    Processing,
    Thinking,
    Routes,
    Detail,
    Navigation,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Processing => "processing",
            Self::Thinking => "thinking",
            Self::Routes => "routes",
            Self::Detail => "detail",
            Self::Navigation => "navigation",
        }
    }
}

/// Generation counter stamped on every outgoing call. Results carrying
/// anything but the current token are discarded on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct RequestToken(pub u64);

impl RequestToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// processing -> thinking after a successful pipeline call.
    ShowThinking,
    /// thinking -> routes.
    ShowRoutes,
    /// processing -> search after a failure, once the message has been on screen.
    ReturnToSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCall {
    Extraction,
    PathRetrieval,
    BackendPipeline,
    Regeneration,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowState {
    pub step: Step,
    pub token: RequestToken,
    /// Query currently (or last) processed; its mode was captured at submission.
    pub query: Option<RouteQuery>,
    /// Text in the query box, which may differ from `query`.
    pub draft_text: String,
    pub endpoints: Option<ResolvedEndpoints>,
    /// Manually edited endpoints awaiting a regenerate action.
    pub draft_endpoints: Option<ResolvedEndpoints>,
    /// Endpoints the in-flight regeneration was issued for.
    pub regenerating_for: Option<ResolvedEndpoints>,
    pub routes: Vec<RouteOption>,
    pub selected: Option<usize>,
    /// Display geometry converted for an enhanced-mode route, keyed by route index.
    pub converted_geometry: Option<(usize, RawPath)>,
    pub geometry_pending: bool,
    pub error: Option<FlowError>,
    /// Regeneration failure shown next to a route list that is kept.
    pub inline_error: Option<FlowError>,
    pub pending_call: Option<PendingCall>,
    pub pending_timer: Option<TimerKind>,
    pub expanded_waypoints: BTreeSet<usize>,
    pub backend_metadata: Option<BackendMetadata>,
    #[serde(skip)]
    pub normalize_options: NormalizeOptions,
}

impl FlowState {
    pub fn new(normalize_options: NormalizeOptions) -> Self {
        Self {
            normalize_options,
            ..Self::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending_call.is_some() || self.geometry_pending
    }

    pub fn is_regenerating(&self) -> bool {
        self.pending_call == Some(PendingCall::Regeneration)
    }

    pub fn selected_route(&self) -> Option<&RouteOption> {
        self.selected.and_then(|index| self.routes.get(index))
    }

    pub fn is_expanded(&self, id: usize) -> bool {
        self.expanded_waypoints.contains(&id)
    }

    /// Message for whichever error is currently displayed.
    pub fn error_message(&self) -> Option<String> {
        self.inline_error
            .as_ref()
            .or(self.error.as_ref())
            .map(FlowError::user_message)
    }

    /// Clears everything tied to the previous query and invalidates its
    /// outstanding calls and timers.
    pub(crate) fn reset(&mut self) {
        let token = self.token.next();
        *self = Self {
            token,
            draft_text: std::mem::take(&mut self.draft_text),
            normalize_options: self.normalize_options,
            ..Self::default()
        };
    }

    pub(crate) fn issue_token(&mut self) -> RequestToken {
        self.token = self.token.next();
        self.token
    }
}
