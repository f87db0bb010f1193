//! Client for a video hosting REST API.
//!
//! The API manages videos (metadata records plus the uploaded content and everything derived
//! from it) and their captions.
//!
//! # Uploads
//!
//! Content is uploaded with [`VideoClient::upload`]. Small files go up in one multipart request.
//! Files larger than the configured chunk size are sent as a sequence of multipart requests,
//! one per byte range, each carrying a `Content-Range` header so the server can reassemble
//! them. See the [`upload`] module for how answers to the individual requests are handled.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tokio_stream::StreamExt;
//! use vidhost_client::{ClientConfig, VideoClient, VideoProperties, VideoQuery};
//!
//! # async fn example() -> eyre::Result<()> {
//! let client = VideoClient::new(ClientConfig::sandbox(), "access-token")?;
//!
//! let video = client
//!     .upload(std::path::Path::new("holiday.mp4"), VideoProperties::titled("Holiday"), None)
//!     .await?;
//! println!("uploaded: {video:?}");
//!
//! let mut videos = std::pin::pin!(client.search(VideoQuery::titled("Holiday")));
//! while let Some(video) = videos.next().await {
//!     let video = video?;
//!     println!("{} ({})", video.title, video.video_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod captions;
pub mod chunker;
pub mod client;
pub mod transport;
pub mod types;
pub mod upload;
pub mod videos;

#[cfg(test)]
pub(crate) mod mock;

pub use captions::{Caption, Captions};
pub use chunker::{ByteRangeChunker, UploadChunk};
pub use client::VideoClient;
pub use transport::{HttpTransport, Response, Transport, UploadRequest};
pub use types::{Page, PageParts, PagedStream, Pagination};
pub use upload::{ChunkOutcome, Classification, classify_status};
pub use videos::{SortOrder, Video, VideoProperties, VideoQuery};
