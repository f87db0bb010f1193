pub mod api;
pub mod config;
pub mod error;

pub use api::{
    Caption, ChunkOutcome, Classification, HttpTransport, Transport, Video, VideoClient,
    VideoProperties, VideoQuery,
};
pub use config::ClientConfig;
pub use error::ApiError;
