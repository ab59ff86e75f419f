//! # contract: collaborator interfaces for the reconcilers
//!
//! The reconcilers only ever talk to two collaborators, both defined here as traits:
//! - [`Cms`]: the content-management system holding page, collection and tag records.
//! - [`DocumentSource`]: where document text is read from (normally the checked-out repository).
//!
//! Both traits are annotated for `mockall` so tests can script CMS state without a network.
//!
//! ## Record shapes
//! CMS records store every field as a map from locale to value. [`Fields`] makes that explicit:
//! values are keyed by [`Locale`], and [`Fields::set`] updates one locale's slice without
//! touching the others.
//!
//! ## Lookup
//! Fetching by reference id returns a three-way [`Lookup`] instead of using "not found" as an
//! error. The reconcilers branch on it to choose between update and create.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::TransportError;
use crate::locale::Locale;
use crate::reference::EntryType;

/// Per-locale values of one field.
pub type Localized<T> = BTreeMap<Locale, T>;

/// Field values of a CMS entry, keyed by field name then locale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, Localized<Value>>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str, locale: Locale) -> Option<&Value> {
        self.0.get(name)?.get(&locale)
    }

    pub fn get_str(&self, name: &str, locale: Locale) -> Option<&str> {
        self.get(name, locale)?.as_str()
    }

    pub fn get_i64(&self, name: &str, locale: Locale) -> Option<i64> {
        self.get(name, locale)?.as_i64()
    }

    /// Inserts or overwrites the value for one locale. Other locales of the field are kept.
    pub fn set(&mut self, name: &str, locale: Locale, value: impl Into<Value>) {
        self.0
            .entry(name.to_string())
            .or_default()
            .insert(locale, value.into());
    }

    /// Removes one locale's value, dropping the field once no locale holds a value.
    pub fn remove(&mut self, name: &str, locale: Locale) -> Option<Value> {
        let values = self.0.get_mut(name)?;
        let removed = values.remove(&locale);
        if values.is_empty() {
            self.0.remove(name);
        }
        removed
    }

    pub fn contains(&self, name: &str, locale: Locale) -> bool {
        self.get(name, locale).is_some()
    }
}

/// Reference to another record (entry, tag or content type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub kind: String,
    pub link_type: String,
    pub id: String,
}

impl Link {
    fn new(link_type: &str, id: &str) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".to_string(),
                link_type: link_type.to_string(),
                id: id.to_string(),
            },
        }
    }

    pub fn entry(id: &str) -> Self {
        Self::new("Entry", id)
    }

    pub fn tag(id: &str) -> Self {
        Self::new("Tag", id)
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }

    /// The link as a field value, for link-list fields such as a collection's `pages`.
    pub fn to_value(&self) -> Value {
        json!({
            "sys": {
                "type": self.sys.kind,
                "linkType": self.sys.link_type,
                "id": self.sys.id,
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub tags: Vec<Link>,
}

impl Metadata {
    pub fn tagged(tag_id: &str) -> Self {
        Self {
            tags: vec![Link::tag(tag_id)],
        }
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.id() == tag_id)
    }

    /// Attaches the tag unless already present.
    pub fn ensure_tag(&mut self, tag_id: &str) {
        if !self.has_tag(tag_id) {
            self.tags.push(Link::tag(tag_id));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    pub id: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub published_version: Option<u64>,
    #[serde(default)]
    pub content_type: Option<Link>,
}

/// A record as stored in the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Entry {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn content_type_id(&self) -> Option<&str> {
        self.sys.content_type.as_ref().map(Link::id)
    }
}

/// Payload for creating a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewEntry {
    pub fields: Fields,
    pub metadata: Metadata,
}

/// Provenance marker attached to every record produced from one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Filter for [`Cms::query_entries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub content_type: Option<EntryType>,
    pub tag: Option<String>,
    pub limit: Option<u32>,
}

/// Outcome of fetching a record by reference id.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Entry),
    NotFound,
    Failed(TransportError),
}

/// Capability set the reconcilers need from the CMS.
///
/// Implementors convert every transport-level problem into a [`TransportError`]; a missing
/// record on lookup must be reported as [`Lookup::NotFound`], never as an error.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Cms: Send + Sync {
    /// Fetch a single entry by id.
    async fn lookup_entry(&self, id: &str) -> Lookup;

    /// Create an entry of the given content type under a caller-chosen id.
    async fn create_entry(
        &self,
        entry_type: EntryType,
        id: &str,
        entry: NewEntry,
    ) -> Result<Entry, TransportError>;

    /// Persist the fields and metadata of a previously fetched entry.
    async fn update_entry(&self, entry: Entry) -> Result<Entry, TransportError>;

    /// Publish the current version of an entry.
    async fn publish_entry(&self, entry: Entry) -> Result<Entry, TransportError>;

    /// List all tags of the environment.
    async fn list_tags(&self) -> Result<Vec<Tag>, TransportError>;

    async fn create_tag(&self, id: &str, name: &str) -> Result<Tag, TransportError>;

    /// Query entries by content type and tag.
    async fn query_entries(&self, query: EntryQuery) -> Result<Vec<Entry>, TransportError>;
}

/// Source of document text.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DocumentSource: Send + Sync {
    /// Returns the file's text, or `None` when it cannot be read (most likely deleted).
    fn read_file(&self, path: &str) -> Option<String>;
}
