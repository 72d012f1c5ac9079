use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Transport(String),
    #[error("extraction service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("extraction response was malformed: {0}")]
    Malformed(String),
    #[error("no destination could be extracted")]
    MissingDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PathError {
    #[error("location not found: {0}")]
    LocationNotFound(String),
    #[error("no routes between the requested locations")]
    NoRoutes,
    #[error("path retrieval failed: {message}")]
    Other { status: Option<u16>, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("backend found no matching waypoints")]
    NoWaypoints,
    #[error("backend generated no routes")]
    NoRoutes,
    #[error("backend request timed out")]
    Timeout,
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend response was malformed: {0}")]
    Malformed(String),
}

/// Any failure a pipeline attempt can surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "source", content = "error", rename_all = "snake_case")]
pub enum FlowError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(_) => {
                "Sorry, I couldn't understand that request. Try naming where you'd like to go."
                    .to_string()
            }
            Self::Path(PathError::LocationNotFound(query)) => format!(
                "Couldn't find \"{query}\". Try a more specific address, including the city."
            ),
            Self::Path(PathError::NoRoutes) => {
                "No route exists between those locations. Try different start or end points."
                    .to_string()
            }
            Self::Path(PathError::Other {
                status: Some(status),
                ..
            }) => format!("Route lookup failed (status {status}). Please try again."),
            Self::Path(PathError::Other { message, .. }) => {
                format!("Route lookup failed: {message}. Please try again.")
            }
            Self::Pipeline(PipelineError::NoWaypoints) => {
                "No scenic stops matched your request. Add preference keywords such as parks, waterfront or viewpoints."
                    .to_string()
            }
            Self::Pipeline(PipelineError::NoRoutes) => {
                "No routes could be generated for that request. Try a different query.".to_string()
            }
            Self::Pipeline(_) => {
                "Route generation failed. Please try again in a moment.".to_string()
            }
        }
    }
}
