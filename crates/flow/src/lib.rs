//! Route discovery flow: a pure reducer over [`FlowState`] plus the
//! [`FlowController`] shell that performs its effects.

pub mod controller;
pub mod event;
pub mod map;
pub mod reducer;
pub mod state;

pub use controller::{FlowController, FlowTimings};
pub use event::{Effect, Event, PathPurpose, UserAction};
pub use map::{map_view, MapView, MapWaypoint};
pub use reducer::{reduce, Outcome, Transition};
pub use state::{FlowState, PendingCall, RequestToken, Step, TimerKind};
