//! Video resources and the request shapes that create, change and search them.

use crate::api::types::Page;
use crate::error::ApiError;
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A hosted video.
///
/// Every API call hands back a fresh `Video`; values are never updated in place.
///
/// See: <https://docs.api.video/reference/api/Videos>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Server-assigned identifier, never empty.
    #[serde(deserialize_with = "non_empty")]
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(with = "metadata")]
    pub metadata: BTreeMap<String, String>,
    /// Where the video's content came from. Passed through untouched.
    pub source: serde_json::Value,
    /// Links to the derived outputs (player, thumbnail, HLS, ...). Passed through untouched.
    pub assets: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panoramic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp4_support: Option<bool>,
}

impl Video {
    /// Decodes a video from a raw response body.
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|e| ApiError::malformed("video", e))
    }

    /// Decodes a video from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::malformed("video", e))
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let id = String::deserialize(deserializer)?;
    if id.is_empty() {
        return Err(serde::de::Error::custom("videoId is empty"));
    }
    Ok(id)
}

/// The wire carries metadata as a list of `{key, value}` pairs, though plain objects also
/// turn up. Both decode to the same map; we always send pairs.
mod metadata {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Pair<K, V> {
        key: K,
        value: V,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Pairs(Vec<Pair<String, String>>),
        Map(BTreeMap<String, String>),
    }

    pub(super) fn serialize<S>(map: &BTreeMap<String, String>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_seq(map.iter().map(|(key, value)| Pair { key, value }))
    }

    pub(super) fn deserialize<'de, D>(d: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Wire::deserialize(d)? {
            Wire::Pairs(pairs) => pairs.into_iter().map(|p| (p.key, p.value)).collect(),
            Wire::Map(map) => map,
        })
    }

    pub(super) fn serialize_opt<S>(
        map: &Option<BTreeMap<String, String>>,
        s: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match map {
            Some(map) => serialize(map, s),
            None => s.serialize_none(),
        }
    }
}

/// The writable fields of a video, for `create` and `update`.
///
/// Fields left as `None` are not sent, so an update only touches what is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "metadata::serialize_opt"
    )]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panoramic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp4_support: Option<bool>,
}

impl VideoProperties {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters for [`crate::VideoClient::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Only videos carrying all of these tags.
    pub tags: Vec<String>,
    /// Only videos whose metadata has all of these entries.
    pub metadata: BTreeMap<String, String>,
    /// Field to sort by, such as `publishedAt` or `title`.
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Items per page; the server default applies when unset.
    pub page_size: Option<u32>,
}

impl VideoQuery {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Query parameters for fetching `page` of the results.
    pub(crate) fn to_query_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = vec![("currentPage".to_string(), page.to_string())];
        if let Some(page_size) = self.page_size {
            params.push(("pageSize".into(), page_size.to_string()));
        }
        if let Some(title) = &self.title {
            params.push(("title".into(), title.clone()));
        }
        if let Some(description) = &self.description {
            params.push(("description".into(), description.clone()));
        }
        for tag in &self.tags {
            params.push(("tags[]".into(), tag.clone()));
        }
        for (key, value) in &self.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy".into(), sort_by.clone()));
        }
        if let Some(sort_order) = self.sort_order {
            params.push(("sortOrder".into(), sort_order.as_str().into()));
        }
        params
    }
}

/// Response of the video list endpoint.
pub type VideoPage = Page<Video>;
