//! The HTTP boundary: requests the client issues and the transport that carries them.

use crate::api::chunker::UploadChunk;
use crate::config::ClientConfig;
use crate::error::ApiError;
use bytes::Bytes;
use eyre::Context;
use http::header::{CONTENT_RANGE, EXPECT, HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::instrument;

/// Form field that carries the uploaded file.
pub const FILE_FIELD: &str = "file";

/// What came back from the API for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns a non-2xx response into [`ApiError::Status`].
    pub fn error_for_status(self, method: &Method, path: &str) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                method: method.clone(),
                path: path.to_string(),
                status: self.status,
                body: self.text(),
            })
        }
    }

    /// Decodes the body as JSON, reporting a mismatch as [`ApiError::MalformedResponse`].
    pub fn json<T: DeserializeOwned>(&self, what: &'static str) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::malformed(what, e))
    }
}

/// A multipart file upload, either a whole source or one chunk of it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: String,
    pub file_name: String,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl UploadRequest {
    /// A single-request upload of an entire source. Carries no `Content-Range`.
    pub fn whole(path: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        // some HTTP stacks otherwise negotiate `100-continue` for large bodies
        headers.insert(EXPECT, HeaderValue::from_static(""));
        Self {
            path: path.into(),
            file_name: file_name.into(),
            headers,
            bytes,
        }
    }

    /// The upload of one chunk, described to the server with `Content-Range`.
    ///
    /// Takes the chunk by value so its buffer moves into the request instead of being shared.
    pub fn chunk(
        path: impl Into<String>,
        file_name: impl Into<String>,
        chunk: UploadChunk,
    ) -> eyre::Result<Self> {
        let range = chunk.content_range().ok_or_else(|| {
            ApiError::InvalidSource(format!("empty chunk at byte {}", chunk.offset))
        })?;
        let range = HeaderValue::from_str(&range)
            .with_context(|| format!("{range:?} is not a valid Content-Range"))?;

        let mut request = Self::whole(path, file_name, chunk.bytes);
        request.headers.insert(CONTENT_RANGE, range);
        Ok(request)
    }

    pub fn content_range(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Carries requests to the API.
///
/// Implementations may report a non-2xx answer either by returning a [`Response`] with that
/// status, or by failing with [`ApiError::Status`]. Callers handle both.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = eyre::Result<Response>> + Send;

    fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = eyre::Result<Response>> + Send;

    fn patch_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = eyre::Result<Response>> + Send;

    fn delete(&self, path: &str) -> impl Future<Output = eyre::Result<Response>> + Send;

    /// Sends a multipart file upload as a `POST`.
    fn submit(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = eyre::Result<Response>> + Send;
}

/// [`Transport`] over HTTPS using `reqwest`, authenticated with a bearer token.
///
/// Non-2xx answers are raised as [`ApiError::Status`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    access_token: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, access_token: impl Into<String>) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("build HTTP client")?;
        Ok(Self::with_client(
            config.base_url.clone(),
            access_token,
            client,
        ))
    }

    /// Uses an existing HTTP client, for sharing connection pools.
    pub fn with_client(
        base_url: Url,
        access_token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url,
            access_token: access_token.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Starts an authenticated request against `path`.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", self.access_token))
    }

    /// Sends a request built by [`Self::request`] with common status handling.
    #[instrument(skip(self, request), ret, level = tracing::Level::TRACE)]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> eyre::Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("send {method} request to {path}"))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("read body of {method} {path} response"))?;
        let response = Response { status, body };

        Ok(response.error_for_status(&method, path)?)
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> eyre::Result<Response> {
        let request = self.request(Method::GET, path).query(query);
        self.execute(Method::GET, path, request).await
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> eyre::Result<Response> {
        let request = self.request(Method::POST, path).json(body);
        self.execute(Method::POST, path, request).await
    }

    async fn patch_json(&self, path: &str, body: &serde_json::Value) -> eyre::Result<Response> {
        let request = self.request(Method::PATCH, path).json(body);
        self.execute(Method::PATCH, path, request).await
    }

    async fn delete(&self, path: &str) -> eyre::Result<Response> {
        let request = self.request(Method::DELETE, path);
        self.execute(Method::DELETE, path, request).await
    }

    async fn submit(&self, request: UploadRequest) -> eyre::Result<Response> {
        let UploadRequest {
            path,
            file_name,
            headers,
            bytes,
        } = request;

        let len = bytes.len() as u64;
        let part = Part::stream_with_length(reqwest::Body::from(bytes), len).file_name(file_name);
        let form = Form::new().part(FILE_FIELD, part);
        let request = self
            .request(Method::POST, &path)
            .headers(headers)
            .multipart(form);
        self.execute(Method::POST, &path, request).await
    }
}
