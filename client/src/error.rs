//! Classifiable failures of the video hosting client.
//!
//! Most plumbing in this crate returns [`eyre::Result`] with human-readable context. The
//! failures that callers (and the upload loop itself) need to branch on are represented by
//! [`ApiError`], which travels inside the [`eyre::Report`] and can be recovered with
//! [`eyre::Report::downcast_ref`].

use http::{Method, StatusCode};

/// Error kinds surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The upload source could not be opened or read.
    #[error("cannot read upload source {name}")]
    SourceUnreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The upload source has zero length.
    #[error("upload source is empty")]
    EmptySource,

    /// The chunker was given a length or chunk size it cannot work with.
    #[error("invalid upload source: {0}")]
    InvalidSource(String),

    /// The server payload did not have the shape we expect.
    #[error("malformed {what} in API response")]
    MalformedResponse {
        what: &'static str,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The API answered with a status code we do not treat as success.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },
}

impl ApiError {
    /// The HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn malformed(what: &'static str, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            what,
            source: Some(source),
        }
    }
}

/// Extracts the status code of an [`ApiError::Status`] buried anywhere in a report.
pub fn status_of(report: &eyre::Report) -> Option<StatusCode> {
    report.downcast_ref::<ApiError>().and_then(ApiError::status)
}
