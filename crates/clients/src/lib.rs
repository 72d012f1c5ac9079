pub mod backend;
pub mod cache;
pub mod config;
pub mod extractor;
pub mod retriever;

pub use backend::{HttpRoutePipeline, RoutePipeline};
pub use cache::GeocodeCache;
pub use config::ClientConfig;
pub use extractor::{LocationExtractor, OpenAiExtractor};
pub use retriever::{MapboxRetriever, PathRetriever};
