#![doc = "Contentful Management API client implementing the core `Cms` trait."]
//
//! # CMS Integration (CLI <-> Core)
//!
//! This module bridges the [`Cms`] abstraction from `docsync-core` to the Contentful
//! Management API over HTTP.
//!
//! - Construct [`ContentfulClient`] from the environment (`CONTENTFUL_API_KEY`,
//!   `CONTENTFUL_SPACE_ID`, optional `CONTENTFUL_ENVIRONMENT` and `CONTENTFUL_BASE_URL`).
//! - A `404` on lookup becomes [`Lookup::NotFound`]. Every other non-success status becomes a
//!   [`TransportError`] carrying the status and response body.
//! - Requests are sent once. There is no retry or backoff.

use anyhow::Result;
use async_trait::async_trait;
use docsync_core::contract::{Cms, Entry, EntryQuery, Fields, Lookup, Metadata, NewEntry, Tag};
use docsync_core::error::TransportError;
use docsync_core::reference::EntryType;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::load_config::{optional_env, required_env};

pub const DEFAULT_BASE_URL: &str = "https://api.contentful.com";
pub const DEFAULT_ENVIRONMENT: &str = "master";
pub const MEDIA_TYPE: &str = "application/vnd.contentful.management.v1+json";

const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";
const VERSION_HEADER: &str = "X-Contentful-Version";
const TAG_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone)]
pub struct ContentfulConfig {
    pub base_url: String,
    pub space_id: String,
    pub environment: String,
    pub access_token: String,
}

impl ContentfulConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            base_url: optional_env("CONTENTFUL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            space_id: required_env("CONTENTFUL_SPACE_ID")?,
            environment: optional_env("CONTENTFUL_ENVIRONMENT")
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            access_token: required_env("CONTENTFUL_API_KEY")?,
        };
        tracing::info!(
            base_url = %config.base_url,
            space_id = %config.space_id,
            environment = %config.environment,
            api_key_set = !config.access_token.is_empty(),
            "Initialized Contentful config from environment"
        );
        Ok(config)
    }

    /// URL of a resource inside the configured space environment.
    pub fn environment_url(&self, path: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.space_id,
            self.environment,
            path.trim_start_matches('/')
        )
    }

    pub fn entry_url(&self, id: &str) -> String {
        self.environment_url(&format!("entries/{id}"))
    }
}

pub struct ContentfulClient {
    http: reqwest::Client,
    config: ContentfulConfig,
}

#[derive(Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct RawTag {
    name: String,
    sys: RawTagSys,
}

#[derive(Deserialize)]
struct RawTagSys {
    id: String,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    fields: &'a Fields,
    metadata: &'a Metadata,
}

impl ContentfulClient {
    pub fn new(config: ContentfulConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("docsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn new_from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        Self::new(ContentfulConfig::from_env()?)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.access_token)
            .header(reqwest::header::CONTENT_TYPE, MEDIA_TYPE)
    }

    async fn send(builder: RequestBuilder, action: &str) -> Result<(u16, String), TransportError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = ?e, action, "[CMS] Request failed");
            TransportError::new(format!("{action}: request failed: {e}"))
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            TransportError::with_status(status, format!("{action}: failed to read response body: {e}"))
        })?;
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(
        builder: RequestBuilder,
        action: &str,
    ) -> Result<T, TransportError> {
        let (status, body) = Self::send(builder, action).await?;
        decode_response(status, &body, action)
    }
}

/// Decodes a JSON response body, turning non-success statuses into errors.
pub fn decode_response<T: DeserializeOwned>(
    status: u16,
    body: &str,
    action: &str,
) -> Result<T, TransportError> {
    if !StatusCode::from_u16(status).is_ok_and(|s| s.is_success()) {
        tracing::error!(status, action, "[CMS] API returned error. Response body: {body}");
        return Err(TransportError::with_status(
            status,
            format!("{action} failed with status {status}: {body}"),
        ));
    }
    serde_json::from_str(body).map_err(|e| {
        TransportError::with_status(status, format!("{action}: unexpected response payload: {e}"))
    })
}

/// Maps a lookup response onto the three-way [`Lookup`].
pub fn classify_lookup(status: u16, body: &str) -> Lookup {
    if status == StatusCode::NOT_FOUND.as_u16() {
        return Lookup::NotFound;
    }
    match decode_response::<Entry>(status, body, "get entry") {
        Ok(entry) => Lookup::Found(entry),
        Err(e) => Lookup::Failed(e),
    }
}

fn require_version(entry: &Entry) -> Result<u64, TransportError> {
    entry.sys.version.ok_or_else(|| {
        TransportError::new(format!("entry `{}` has no version to update", entry.id()))
    })
}

/// Query-string parameters for [`Cms::query_entries`].
pub fn query_params(query: &EntryQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(entry_type) = query.content_type {
        params.push(("content_type", entry_type.as_str().to_string()));
    }
    if let Some(tag) = &query.tag {
        params.push(("metadata.tags.sys.id[in]", tag.clone()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl Cms for ContentfulClient {
    async fn lookup_entry(&self, id: &str) -> Lookup {
        tracing::info!(entry_id = id, "[CMS] Fetching entry");
        let builder = self.request(Method::GET, &self.config.entry_url(id));
        match Self::send(builder, "get entry").await {
            Ok((status, body)) => classify_lookup(status, &body),
            Err(e) => Lookup::Failed(e),
        }
    }

    async fn create_entry(
        &self,
        entry_type: EntryType,
        id: &str,
        entry: NewEntry,
    ) -> Result<Entry, TransportError> {
        tracing::info!(entry_id = id, content_type = %entry_type, "[CMS] Creating entry");
        let builder = self
            .request(Method::PUT, &self.config.entry_url(id))
            .header(CONTENT_TYPE_HEADER, entry_type.as_str())
            .json(&entry);
        Self::send_json(builder, "create entry").await
    }

    async fn update_entry(&self, entry: Entry) -> Result<Entry, TransportError> {
        let version = require_version(&entry)?;
        tracing::info!(entry_id = entry.id(), version, "[CMS] Updating entry");
        let body = UpdateBody {
            fields: &entry.fields,
            metadata: &entry.metadata,
        };
        let builder = self
            .request(Method::PUT, &self.config.entry_url(entry.id()))
            .header(VERSION_HEADER, version)
            .json(&body);
        Self::send_json(builder, "update entry").await
    }

    async fn publish_entry(&self, entry: Entry) -> Result<Entry, TransportError> {
        let version = require_version(&entry)?;
        tracing::info!(entry_id = entry.id(), version, "[CMS] Publishing entry");
        let url = self.config.environment_url(&format!("entries/{}/published", entry.id()));
        let builder = self
            .request(Method::PUT, &url)
            .header(VERSION_HEADER, version);
        Self::send_json(builder, "publish entry").await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, TransportError> {
        let builder = self
            .request(Method::GET, &self.config.environment_url("tags"))
            .query(&[("limit", TAG_PAGE_LIMIT)]);
        let tags: Collection<RawTag> = Self::send_json(builder, "list tags").await?;
        tracing::info!(count = tags.items.len(), "[CMS] Fetched tags");
        Ok(tags
            .items
            .into_iter()
            .map(|raw| Tag {
                id: raw.sys.id,
                name: raw.name,
            })
            .collect())
    }

    async fn create_tag(&self, id: &str, name: &str) -> Result<Tag, TransportError> {
        tracing::info!(tag_id = id, "[CMS] Creating tag");
        let body = json!({
            "name": name,
            "sys": { "id": id, "visibility": "private" },
        });
        let builder = self
            .request(Method::PUT, &self.config.environment_url(&format!("tags/{id}")))
            .json(&body);
        let raw: RawTag = Self::send_json(builder, "create tag").await?;
        Ok(Tag {
            id: raw.sys.id,
            name: raw.name,
        })
    }

    async fn query_entries(&self, query: EntryQuery) -> Result<Vec<Entry>, TransportError> {
        tracing::info!(?query, "[CMS] Querying entries");
        let builder = self
            .request(Method::GET, &self.config.environment_url("entries"))
            .query(&query_params(&query));
        let entries: Collection<Entry> = Self::send_json(builder, "query entries").await?;
        Ok(entries.items)
    }
}
