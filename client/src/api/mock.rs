//! Scripted in-memory transport for exercising the client without a server.
//!
//! Replies are queued up front and handed out in order. Every request is recorded so tests can
//! assert on exactly what the client sent (and, just as importantly, what it did not send).

use crate::api::transport::{Response, Transport, UploadRequest};
use crate::error::ApiError;
use http::header::{CONTENT_RANGE, EXPECT, HeaderName};
use http::{Method, StatusCode};
use std::collections::VecDeque;
use std::sync::Mutex;

/// How the mock answers one request.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Returns a response with this status and JSON body.
    Respond(StatusCode, serde_json::Value),
    /// Fails with [`ApiError::Status`] carrying this status.
    Raise(StatusCode),
    /// Fails with an error that carries no status at all.
    Broken(&'static str),
}

/// A request as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
    pub content_range: Option<String>,
    pub expect: Option<String>,
    pub file_name: Option<String>,
    pub len: usize,
}

impl Recorded {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            json: None,
            content_range: None,
            expect: None,
            file_name: None,
            len: 0,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with("/source"))
            .collect()
    }

    pub fn unused_replies(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn answer(&self, request: Recorded) -> eyre::Result<Response> {
        let method = request.method.clone();
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        let Some(reply) = self.replies.lock().unwrap().pop_front() else {
            eyre::bail!("unexpected request {method} {path}");
        };
        match reply {
            Reply::Respond(status, body) => Ok(Response::new(status, body.to_string())),
            Reply::Raise(status) => Err(ApiError::Status {
                method,
                path,
                status,
                body: String::new(),
            }
            .into()),
            Reply::Broken(why) => Err(eyre::eyre!("{why}")),
        }
    }
}

impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> eyre::Result<Response> {
        let mut recorded = Recorded::new(Method::GET, path);
        recorded.query = query.to_vec();
        self.answer(recorded)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> eyre::Result<Response> {
        let mut recorded = Recorded::new(Method::POST, path);
        recorded.json = Some(body.clone());
        self.answer(recorded)
    }

    async fn patch_json(&self, path: &str, body: &serde_json::Value) -> eyre::Result<Response> {
        let mut recorded = Recorded::new(Method::PATCH, path);
        recorded.json = Some(body.clone());
        self.answer(recorded)
    }

    async fn delete(&self, path: &str) -> eyre::Result<Response> {
        self.answer(Recorded::new(Method::DELETE, path))
    }

    async fn submit(&self, request: UploadRequest) -> eyre::Result<Response> {
        let header = |name: HeaderName| {
            request
                .headers
                .get(name)
                .map(|v| v.to_str().unwrap().to_string())
        };
        let mut recorded = Recorded::new(Method::POST, &request.path);
        recorded.content_range = header(CONTENT_RANGE);
        recorded.expect = header(EXPECT);
        recorded.file_name = Some(request.file_name.clone());
        recorded.len = request.bytes.len();
        self.answer(recorded)
    }
}

/// A minimal, valid video body for replies.
pub(crate) fn video_json(video_id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "videoId": video_id,
        "title": title,
        "description": "",
        "tags": [],
        "metadata": [],
        "source": { "uri": format!("/videos/{video_id}/source") },
        "assets": {},
        "publishedAt": "2023-05-01T12:00:00+00:00",
    })
}
