//! The public client and its video operations.

use crate::api::captions::Captions;
use crate::api::transport::{HttpTransport, Response, Transport};
use crate::api::types::{Page, PagedStream};
use crate::api::videos::{Video, VideoPage, VideoProperties, VideoQuery};
use crate::config::ClientConfig;
use eyre::Context;
use http::Method;
use jiff::Timestamp;
use serde_json::json;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::instrument;

/// Client for the video hosting API.
///
/// Cheap to clone; clones share the transport and configuration. The transport defaults to
/// [`HttpTransport`], but anything implementing [`Transport`] will do.
#[derive(Debug)]
pub struct VideoClient<T = HttpTransport> {
    pub(crate) transport: Arc<T>,
    pub(crate) config: Arc<ClientConfig>,
}

impl<T> Clone for VideoClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl VideoClient<HttpTransport> {
    /// Creates a client that talks HTTPS to `config.base_url` with the given bearer token.
    pub fn new(config: ClientConfig, access_token: impl Into<String>) -> eyre::Result<Self> {
        let transport = HttpTransport::new(&config, access_token)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> VideoClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Operations on the captions of videos.
    pub fn captions(&self) -> Captions<'_, T> {
        Captions::new(self)
    }

    /// Creates a video record with no content yet.
    ///
    /// Content is added afterwards with [`Self::upload`].
    #[instrument(skip(self), ret)]
    pub async fn create(&self, properties: &VideoProperties) -> eyre::Result<Video> {
        let body = serde_json::to_value(properties).context("serialize video properties")?;
        let response = self
            .transport
            .post_json("/videos", &body)
            .await
            .context("create video")?;
        let video = cast_video(response, &Method::POST, "/videos")?;

        tracing::debug!(video_id = video.video_id, "created video");
        Ok(video)
    }

    /// Fetches a single video by its ID.
    #[instrument(skip(self), ret)]
    pub async fn get(&self, video_id: &str) -> eyre::Result<Video> {
        let path = video_path(video_id);
        let response = self
            .transport
            .get(&path, &[])
            .await
            .with_context(|| format!("get video {video_id}"))?;
        cast_video(response, &Method::GET, &path)
    }

    /// Returns a paginated stream of all videos matching `query`.
    ///
    /// Pages are fetched lazily as the stream is consumed.
    #[instrument(skip(self))]
    pub fn search(
        &self,
        query: VideoQuery,
    ) -> impl Stream<Item = eyre::Result<Video>> + use<'_, T> {
        PagedStream::new(move |page| {
            let query = query.clone();
            async move {
                let page = self.search_page(&query, page).await?;
                Ok(page.into_parts())
            }
        })
    }

    /// Fetches one page of the videos matching `query`. Pages count from 1.
    #[instrument(skip(self))]
    pub async fn search_page(&self, query: &VideoQuery, page: u32) -> eyre::Result<VideoPage> {
        let params = query.to_query_params(page);
        let response = self
            .transport
            .get("/videos", &params)
            .await
            .with_context(|| format!("list videos, page {page}"))?
            .error_for_status(&Method::GET, "/videos")?;
        let videos: Page<Video> = response.json("video list")?;

        tracing::debug!(
            page,
            items_total = videos.pagination.items_total,
            returned_items = videos.data.len(),
            "fetched videos"
        );
        Ok(videos)
    }

    /// Changes the fields of a video that are set in `properties`.
    #[instrument(skip(self), ret)]
    pub async fn update(&self, video_id: &str, properties: &VideoProperties) -> eyre::Result<Video> {
        let body = serde_json::to_value(properties).context("serialize video properties")?;
        self.patch_video(video_id, body, "update").await
    }

    /// Deletes a video and everything attached to it.
    #[instrument(skip(self))]
    pub async fn delete(&self, video_id: &str) -> eyre::Result<()> {
        let path = video_path(video_id);
        self.transport
            .delete(&path)
            .await
            .with_context(|| format!("delete video {video_id}"))?
            .error_for_status(&Method::DELETE, &path)?;

        tracing::debug!(video_id, "deleted video");
        Ok(())
    }

    /// Makes a video publicly visible.
    #[instrument(skip(self), ret)]
    pub async fn publish(&self, video_id: &str) -> eyre::Result<Video> {
        self.patch_video(video_id, json!({ "public": true }), "publish")
            .await
    }

    /// Makes a video private again.
    #[instrument(skip(self), ret)]
    pub async fn unpublish(&self, video_id: &str) -> eyre::Result<Video> {
        self.patch_video(video_id, json!({ "public": false }), "unpublish")
            .await
    }

    /// Schedules a video to become visible at `at`.
    #[instrument(skip(self), ret)]
    pub async fn schedule(&self, video_id: &str, at: Timestamp) -> eyre::Result<Video> {
        let body = json!({ "publishedAt": at });
        self.patch_video(video_id, body, "schedule").await
    }

    /// Removes any scheduled publication time from a video.
    #[instrument(skip(self), ret)]
    pub async fn unschedule(&self, video_id: &str) -> eyre::Result<Video> {
        let body = json!({ "publishedAt": null });
        self.patch_video(video_id, body, "unschedule").await
    }

    async fn patch_video(
        &self,
        video_id: &str,
        body: serde_json::Value,
        action: &str,
    ) -> eyre::Result<Video> {
        let path = video_path(video_id);
        let response = self
            .transport
            .patch_json(&path, &body)
            .await
            .with_context(|| format!("{action} video {video_id}"))?;
        let video = cast_video(response, &Method::PATCH, &path)?;

        tracing::debug!(video_id, action, "patched video");
        Ok(video)
    }
}

pub(crate) fn video_path(video_id: &str) -> String {
    format!("/videos/{video_id}")
}

/// Checks the status of a response and turns its body into a [`Video`].
fn cast_video(response: Response, method: &Method, path: &str) -> eyre::Result<Video> {
    let response = response.error_for_status(method, path)?;
    Ok(Video::from_json(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockTransport, Reply, video_json};
    use crate::error::{ApiError, status_of};
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use tokio_stream::StreamExt;

    fn client(replies: impl IntoIterator<Item = Reply>) -> VideoClient<MockTransport> {
        VideoClient::with_transport(MockTransport::new(replies), ClientConfig::default())
    }

    fn ok(body: serde_json::Value) -> Reply {
        Reply::Respond(StatusCode::OK, body)
    }

    fn page(ids: &[&str], current_page: u32, pages_total: u32) -> Reply {
        ok(json!({
            "data": ids.iter().map(|id| video_json(id, "t")).collect::<Vec<_>>(),
            "pagination": {
                "currentPage": current_page,
                "pageSize": 2,
                "pagesTotal": pages_total,
                "itemsTotal": 3
            }
        }))
    }

    #[tokio::test]
    async fn create_posts_properties() {
        let client = client([Reply::Respond(StatusCode::CREATED, video_json("vi1", "Maths"))]);
        let video = client
            .create(&VideoProperties::titled("Maths"))
            .await
            .unwrap();
        assert_eq!(video.video_id, "vi1");

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/videos");
        assert_eq!(requests[0].json, Some(json!({ "title": "Maths" })));
    }

    #[tokio::test]
    async fn get_surfaces_status_either_way() {
        let client = client([
            Reply::Raise(StatusCode::NOT_FOUND),
            Reply::Respond(StatusCode::NOT_FOUND, json!({ "title": "not found" })),
        ]);

        let raised = client.get("vi404").await.unwrap_err();
        assert_eq!(status_of(&raised), Some(StatusCode::NOT_FOUND));

        let returned = client.get("vi404").await.unwrap_err();
        assert_eq!(status_of(&returned), Some(StatusCode::NOT_FOUND));
        assert_eq!(client.transport().requests()[1].path, "/videos/vi404");
    }

    #[tokio::test]
    async fn get_rejects_malformed_video() {
        let client = client([ok(json!({ "videoId": "vi1" }))]);
        let err = client.get("vi1").await.unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ApiError>(),
                Some(ApiError::MalformedResponse { .. })
            ),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn search_walks_pages() {
        let client = client([page(&["vi1", "vi2"], 1, 2), page(&["vi3"], 2, 2)]);
        let ids: Vec<String> = client
            .search(VideoQuery::titled("t"))
            .map(|v| v.unwrap().video_id)
            .collect()
            .await;
        assert_eq!(ids, ["vi1", "vi2", "vi3"]);

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].query,
            [
                ("currentPage".to_string(), "2".to_string()),
                ("title".to_string(), "t".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn search_stops_on_error() {
        let client = client([
            page(&["vi1", "vi2"], 1, 3),
            Reply::Raise(StatusCode::BAD_GATEWAY),
        ]);
        let results: Vec<_> = client.search(VideoQuery::default()).collect().await;
        assert_eq!(results.len(), 3);
        assert!(results[2].is_err());
        assert_eq!(client.transport().unused_replies(), 0);
    }

    #[tokio::test]
    async fn publishing_and_scheduling_patch_the_video() {
        let at: Timestamp = "2030-01-01T09:00:00Z".parse().unwrap();
        let client = client((0..4).map(|_| ok(video_json("vi1", "t"))));

        client.publish("vi1").await.unwrap();
        client.unpublish("vi1").await.unwrap();
        client.schedule("vi1", at).await.unwrap();
        client.unschedule("vi1").await.unwrap();

        let bodies: Vec<_> = client
            .transport()
            .requests()
            .into_iter()
            .map(|r| {
                assert_eq!(r.method, Method::PATCH);
                assert_eq!(r.path, "/videos/vi1");
                r.json.unwrap()
            })
            .collect();
        assert_eq!(
            bodies,
            [
                json!({ "public": true }),
                json!({ "public": false }),
                json!({ "publishedAt": "2030-01-01T09:00:00Z" }),
                json!({ "publishedAt": null }),
            ]
        );
    }

    #[tokio::test]
    async fn update_and_delete() {
        let client = client([
            ok(video_json("vi1", "New")),
            Reply::Respond(StatusCode::NO_CONTENT, json!(null)),
        ]);
        let video = client
            .update("vi1", &VideoProperties::titled("New"))
            .await
            .unwrap();
        assert_eq!(video.title, "New");
        client.delete("vi1").await.unwrap();

        let requests = client.transport().requests();
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[1].method, Method::DELETE);
        assert_eq!(requests[1].path, "/videos/vi1");
    }
}
