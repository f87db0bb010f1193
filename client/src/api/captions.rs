//! Captions attached to videos.

use crate::api::client::{VideoClient, video_path};
use crate::api::transport::{Transport, UploadRequest};
use crate::api::types::{Page, PagedStream};
use crate::error::ApiError;
use bytes::Bytes;
use eyre::Context;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tokio_stream::Stream;
use tracing::instrument;

/// A caption track for one language of a video.
///
/// See: <https://docs.api.video/reference/api/Captions>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub uri: String,
    /// Where the WebVTT file can be fetched.
    pub src: String,
    /// The language, as a BCP 47 tag.
    pub srclang: String,
    /// Whether players show this track by default.
    #[serde(default)]
    pub default: bool,
}

/// Caption operations, obtained from [`VideoClient::captions`].
#[derive(Debug)]
pub struct Captions<'a, T> {
    client: &'a VideoClient<T>,
}

impl<'a, T: Transport> Captions<'a, T> {
    pub(crate) fn new(client: &'a VideoClient<T>) -> Self {
        Self { client }
    }

    /// Uploads a WebVTT file as the `language` captions of a video, replacing any existing ones.
    #[instrument(skip(self, source), fields(source = %source.display()))]
    pub async fn upload(&self, source: &Path, video_id: &str, language: &str) -> eyre::Result<Caption> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| ApiError::SourceUnreadable {
                name: source.display().to_string(),
                source: e,
            })?;
        if bytes.is_empty() {
            return Err(ApiError::EmptySource.into());
        }
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{language}.vtt"));

        let path = caption_path(video_id, language);
        let request = UploadRequest::whole(&path, file_name, Bytes::from(bytes));
        let response = self
            .client
            .transport
            .submit(request)
            .await
            .with_context(|| format!("upload {language} captions for video {video_id}"))?
            .error_for_status(&Method::POST, &path)?;
        let caption: Caption = response.json("caption")?;

        tracing::debug!(video_id, language, "uploaded captions");
        Ok(caption)
    }

    #[instrument(skip(self), ret)]
    pub async fn get(&self, video_id: &str, language: &str) -> eyre::Result<Caption> {
        let path = caption_path(video_id, language);
        let response = self
            .client
            .transport
            .get(&path, &[])
            .await
            .with_context(|| format!("get {language} captions for video {video_id}"))?
            .error_for_status(&Method::GET, &path)?;
        Ok(response.json("caption")?)
    }

    /// Returns a paginated stream of every caption track of a video.
    #[instrument(skip(self))]
    pub fn list(&self, video_id: &str) -> impl Stream<Item = eyre::Result<Caption>> + use<'a, T> {
        let client = self.client;
        let path = format!("{}/captions", video_path(video_id));
        PagedStream::new(move |page: u32| {
            let path = path.clone();
            async move {
                let params = [("currentPage".to_string(), page.to_string())];
                let response = client
                    .transport
                    .get(&path, &params)
                    .await
                    .with_context(|| format!("list captions, page {page}"))?
                    .error_for_status(&Method::GET, &path)?;
                let captions: Page<Caption> = response.json("caption list")?;
                Ok(captions.into_parts())
            }
        })
    }

    /// Chooses whether the `language` track is shown by default.
    #[instrument(skip(self), ret)]
    pub async fn set_default(
        &self,
        video_id: &str,
        language: &str,
        default: bool,
    ) -> eyre::Result<Caption> {
        let path = caption_path(video_id, language);
        let response = self
            .client
            .transport
            .patch_json(&path, &json!({ "default": default }))
            .await
            .with_context(|| format!("update {language} captions for video {video_id}"))?
            .error_for_status(&Method::PATCH, &path)?;
        Ok(response.json("caption")?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, video_id: &str, language: &str) -> eyre::Result<()> {
        let path = caption_path(video_id, language);
        self.client
            .transport
            .delete(&path)
            .await
            .with_context(|| format!("delete {language} captions for video {video_id}"))?
            .error_for_status(&Method::DELETE, &path)?;
        Ok(())
    }
}

fn caption_path(video_id: &str, language: &str) -> String {
    format!("{}/captions/{language}", video_path(video_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockTransport, Reply};
    use crate::config::ClientConfig;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tokio_stream::StreamExt;

    fn caption_json(lang: &str, default: bool) -> serde_json::Value {
        json!({
            "uri": format!("/videos/vi1/captions/{lang}"),
            "src": format!("https://cdn.api.video/vod/vi1/captions/{lang}.vtt"),
            "srclang": lang,
            "default": default
        })
    }

    fn client(replies: impl IntoIterator<Item = Reply>) -> VideoClient<MockTransport> {
        VideoClient::with_transport(MockTransport::new(replies), ClientConfig::default())
    }

    #[tokio::test]
    async fn upload_sends_whole_file() {
        let mut file = tempfile::Builder::new().suffix(".vtt").tempfile().unwrap();
        let contents = b"WEBVTT\n\n00:00.000 --> 00:01.000\nhello\n";
        file.write_all(contents).unwrap();

        let client = client([Reply::Respond(StatusCode::OK, caption_json("en", false))]);
        let caption = client
            .captions()
            .upload(file.path(), "vi1", "en")
            .await
            .unwrap();
        assert_eq!(caption.srclang, "en");

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/videos/vi1/captions/en");
        assert_eq!(requests[0].content_range, None);
        assert_eq!(requests[0].len, contents.len());
    }

    #[tokio::test]
    async fn upload_of_missing_or_empty_file_sends_nothing() {
        let client = client([]);
        let err = client
            .captions()
            .upload(Path::new("/definitely/not/here.vtt"), "vi1", "en")
            .await
            .unwrap_err();
        assert!(
            matches!(err.downcast_ref::<ApiError>(), Some(ApiError::SourceUnreadable { .. })),
            "{err:?}"
        );

        let empty = tempfile::NamedTempFile::new().unwrap();
        let err = client
            .captions()
            .upload(empty.path(), "vi1", "en")
            .await
            .unwrap_err();
        assert!(
            matches!(err.downcast_ref::<ApiError>(), Some(ApiError::EmptySource)),
            "{err:?}"
        );
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn list_set_default_and_delete() {
        let client = client([
            Reply::Respond(
                StatusCode::OK,
                json!({
                    "data": [caption_json("en", true), caption_json("fr", false)],
                    "pagination": { "currentPage": 1, "pageSize": 25, "pagesTotal": 1, "itemsTotal": 2 }
                }),
            ),
            Reply::Respond(StatusCode::OK, caption_json("fr", true)),
            Reply::Respond(StatusCode::NO_CONTENT, json!(null)),
        ]);

        let langs: Vec<String> = client
            .captions()
            .list("vi1")
            .map(|c| c.unwrap().srclang)
            .collect()
            .await;
        assert_eq!(langs, ["en", "fr"]);

        let fr = client.captions().set_default("vi1", "fr", true).await.unwrap();
        assert!(fr.default);

        client.captions().delete("vi1", "en").await.unwrap();

        let requests = client.transport().requests();
        assert_eq!(requests[0].path, "/videos/vi1/captions");
        assert_eq!(requests[1].json, Some(json!({ "default": true })));
        assert_eq!(requests[2].method, Method::DELETE);
        assert_eq!(requests[2].path, "/videos/vi1/captions/en");
    }
}
