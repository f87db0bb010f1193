//! Uploading video content, in one request or in ranged chunks.
//!
//! A source no larger than [`ClientConfig::chunk_size`](crate::ClientConfig) goes up as a
//! single multipart request. Anything larger is cut into consecutive chunks by
//! [`ByteRangeChunker`], and each chunk is sent as its own request with a `Content-Range`
//! header. Chunks are strictly sequential: the next chunk is not even read until the previous
//! one has been answered.
//!
//! Every answer is sorted into a [`ChunkOutcome`]:
//!
//! - **Success** (2xx): the body is a video; it becomes the upload's result so far.
//! - **Continue**: an informational status (exactly 100, or anything below 400 reported as a
//!   failure). The upload moves on without touching the result so far.
//! - **Fatal**: everything else. The upload stops right there and the error is returned as-is.
//!
//! If no chunk produced a Success the upload returns `Ok(None)`. A failed upload does not
//! delete the video record it may have created; the caller decides whether to retry or clean up.

use crate::api::chunker::ByteRangeChunker;
use crate::api::client::{VideoClient, video_path};
use crate::api::transport::{Response, Transport, UploadRequest};
use crate::api::videos::{Video, VideoProperties};
use crate::error::ApiError;
use eyre::Context;
use http::{Method, StatusCode};
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::instrument;

/// How one upload answer affects the rest of the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Continue,
    Fatal,
}

/// Classifies an upload answer by status code alone.
///
/// Only codes that are not exactly `100` *and* at least `400` abort an upload. This leaves
/// `101..400` on the non-fatal side along with `100`.
pub fn classify_status(status: StatusCode) -> Classification {
    if status.is_success() {
        Classification::Success
    } else if status != StatusCode::CONTINUE && status.as_u16() >= 400 {
        Classification::Fatal
    } else {
        Classification::Continue
    }
}

/// The result of sending one upload request, after classification.
#[derive(Debug)]
pub enum ChunkOutcome {
    Success(Response),
    Continue(StatusCode),
    Fatal(eyre::Report),
}

impl ChunkOutcome {
    /// Classifies what the transport produced for an upload to `path`.
    ///
    /// Handles both ways a transport may report a non-2xx answer: as a returned [`Response`]
    /// or as an [`ApiError::Status`] failure. Failures without a status are always fatal.
    pub fn from_result(result: eyre::Result<Response>, path: &str) -> Self {
        match result {
            Ok(response) => match classify_status(response.status) {
                Classification::Success => Self::Success(response),
                Classification::Continue => Self::Continue(response.status),
                Classification::Fatal => Self::Fatal(
                    ApiError::Status {
                        method: Method::POST,
                        path: path.to_string(),
                        status: response.status,
                        body: response.text(),
                    }
                    .into(),
                ),
            },
            Err(report) => match crate::error::status_of(&report) {
                Some(status) if classify_status(status) != Classification::Fatal => {
                    Self::Continue(status)
                }
                _ => Self::Fatal(report),
            },
        }
    }

    pub fn classification(&self) -> Classification {
        match self {
            Self::Success(_) => Classification::Success,
            Self::Continue(_) => Classification::Continue,
            Self::Fatal(_) => Classification::Fatal,
        }
    }
}

impl<T: Transport> VideoClient<T> {
    /// Uploads the file at `source` as the content of a video.
    ///
    /// Without a `video_id`, a new video is created first from `properties`, titled after the
    /// file name unless a title is given. With one, `properties` is ignored and the content of
    /// that existing video is replaced.
    ///
    /// Returns the video as of the last successful upload answer, or `None` if the server never
    /// answered with a video (every answer was informational).
    #[instrument(skip(self, source, properties), fields(source = %source.display()))]
    pub async fn upload(
        &self,
        source: &Path,
        properties: VideoProperties,
        video_id: Option<&str>,
    ) -> eyre::Result<Option<Video>> {
        let unreadable = |e| ApiError::SourceUnreadable {
            name: source.display().to_string(),
            source: e,
        };
        let file = tokio::fs::File::open(source).await.map_err(unreadable)?;
        let source_length = file.metadata().await.map_err(unreadable)?.len();
        // checked before creating anything so an empty file never leaves a record behind
        if source_length == 0 {
            return Err(ApiError::EmptySource.into());
        }

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());

        let video_id = match video_id {
            Some(video_id) => video_id.to_string(),
            None => {
                let mut properties = properties;
                if properties.title.is_none() {
                    properties.title = Some(file_name.clone());
                }
                let video = self
                    .create(&properties)
                    .await
                    .context("create video to upload into")?;
                video.video_id
            }
        };

        self.upload_reader(file, source_length, &file_name, &video_id)
            .await
    }

    /// Uploads `source_length` bytes read from `reader` as the content of video `video_id`.
    ///
    /// `file_name` is what the server is told the file is called.
    #[instrument(skip(self, reader))]
    pub async fn upload_reader<R>(
        &self,
        reader: R,
        source_length: u64,
        file_name: &str,
        video_id: &str,
    ) -> eyre::Result<Option<Video>>
    where
        R: AsyncRead + Unpin + Send,
    {
        if source_length == 0 {
            return Err(ApiError::EmptySource.into());
        }

        let path = format!("{}/source", video_path(video_id));
        let chunk_size = self.config.chunk_size;

        if source_length <= chunk_size {
            let mut chunker = ByteRangeChunker::new(reader, source_length, source_length)?
                .with_source_name(file_name);
            let whole = chunker.next_chunk().await?.ok_or_else(|| {
                ApiError::InvalidSource(format!("{file_name} produced no bytes"))
            })?;
            let request = UploadRequest::whole(&path, file_name, whole.bytes);
            let result = self.transport.submit(request).await;

            return match ChunkOutcome::from_result(result, &path) {
                ChunkOutcome::Success(response) => {
                    let video = Video::from_json(&response.body)?;
                    tracing::debug!(video_id, source_length, "uploaded video in one request");
                    Ok(Some(video))
                }
                ChunkOutcome::Continue(status) => {
                    tracing::warn!(video_id, %status, "upload answered without a video");
                    Ok(None)
                }
                ChunkOutcome::Fatal(e) => {
                    Err(e.wrap_err(format!("upload {file_name} to video {video_id}")))
                }
            };
        }

        let mut chunker =
            ByteRangeChunker::new(reader, source_length, chunk_size)?.with_source_name(file_name);
        let chunk_count = chunker.chunk_count();
        let mut last_response = None;
        let mut bytes_copied = 0;

        while let Some(chunk) = chunker.next_chunk().await? {
            // the buffer moves into the request and is dropped once it has been sent
            let (offset, end) = (chunk.offset, chunk.end);
            let request = UploadRequest::chunk(&path, file_name, chunk)?;
            tracing::trace!(video_id, offset, end, chunk_count, "sending chunk");
            let result = self.transport.submit(request).await;

            match ChunkOutcome::from_result(result, &path) {
                ChunkOutcome::Success(response) => {
                    last_response = Some(Video::from_json(&response.body).with_context(|| {
                        format!("decode answer to bytes {offset}..{end} of {file_name}")
                    })?);
                }
                ChunkOutcome::Continue(status) => {
                    tracing::warn!(video_id, offset, end, %status, "chunk answered without a video");
                }
                ChunkOutcome::Fatal(e) => {
                    return Err(e.wrap_err(format!(
                        "upload bytes {offset}..{end} of {file_name} to video {video_id}"
                    )));
                }
            }

            bytes_copied = end;
            tracing::debug!(video_id, bytes_copied, source_length, "uploaded chunk");
        }

        debug_assert_eq!(bytes_copied, source_length);
        Ok(last_response)
    }
}
