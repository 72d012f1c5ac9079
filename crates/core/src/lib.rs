pub mod display;
pub mod error;
pub mod labels;
pub mod models;
pub mod normalize;
pub mod query;
pub mod score;

pub use error::{ExtractionError, FlowError, PathError, PipelineError};
pub use models::*;
pub use normalize::{
    display_id, index_for_id, normalize, normalize_backend_routes, normalize_paths, route_title,
    NormalizeOptions, RawRoutes,
};
pub use query::{is_current_location, normalize_text, same_query};
pub use score::{Score, ScoreError, SubScores};
