//! Collection reconciliation driven by the declarative collection config.
//!
//! The config is an ordered YAML mapping:
//!
//! ```yaml
//! collections:
//!   getting-started:
//!     title: Getting started
//!     slugs: [installation, first-steps]
//!   guides:
//!     title: Guides
//!     url: https://example.com/guides
//!     slugs: [configuration]
//! ```
//!
//! Each collection becomes a `collection` entry whose `order` is its position in the file and
//! whose `pages` link to the existing page entries of its slugs. A second pass then writes
//! every page's global position into its `order` field.

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::contract::{Cms, Fields, Link, Lookup, Metadata, NewEntry};
use crate::error::{ConfigError, SyncError, TransportError};
use crate::locale::Locale;
use crate::reference::{reference_id, EntryType, Repository};
use crate::report::{Outcome, RunLog};
use crate::validate::validate_slug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub id: String,
    pub title: String,
    pub slugs: Vec<String>,
    pub url: Option<String>,
}

/// Validated collection config. Every collection has a title and at least one slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    collections: Vec<CollectionSpec>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    collections: Option<serde_yaml::Mapping>,
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slugs: Option<Vec<String>>,
    #[serde(default)]
    url: Option<String>,
}

impl CollectionConfig {
    pub fn new(collections: Vec<CollectionSpec>) -> Result<Self, ConfigError> {
        for spec in &collections {
            if spec.title.trim().is_empty() {
                return Err(ConfigError::MissingTitle(spec.id.clone()));
            }
            if spec.slugs.is_empty() {
                return Err(ConfigError::MissingSlugs(spec.id.clone()));
            }
        }
        Ok(Self { collections })
    }

    /// Parses and validates the YAML config, keeping declaration order.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        let mapping = raw.collections.ok_or(ConfigError::NoCollections)?;

        let mut collections = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let id = match key {
                serde_yaml::Value::String(id) => id,
                serde_yaml::Value::Number(n) => n.to_string(),
                other => return Err(ConfigError::InvalidId(format!("{other:?}"))),
            };
            let raw: RawCollection = serde_yaml::from_value(value)?;
            let title = raw
                .title
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingTitle(id.clone()))?;
            let slugs = raw
                .slugs
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigError::MissingSlugs(id.clone()))?;
            collections.push(CollectionSpec {
                id,
                title,
                slugs,
                url: raw.url.filter(|u| !u.is_empty()),
            });
        }

        info!(collections = collections.len(), "[COLLECTIONS] Loaded collection config");
        Self::new(collections)
    }

    pub fn collections(&self) -> &[CollectionSpec] {
        &self.collections
    }

    /// All slugs of all collections, concatenated in declaration order.
    pub fn ordered_slugs(&self) -> Vec<&str> {
        self.collections
            .iter()
            .flat_map(|c| c.slugs.iter().map(String::as_str))
            .collect()
    }
}

/// Links to the page entries of `slugs` that already exist in the CMS.
///
/// Slugs that cannot name a page are left out, and so are pages that have not been created
/// yet. A failed lookup fails the whole collection.
pub async fn resolve_page_links<C>(
    cms: &C,
    repository: &Repository,
    slugs: &[String],
) -> Result<Vec<Link>, TransportError>
where
    C: Cms + ?Sized,
{
    let mut links = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if let Err(e) = validate_slug(slug) {
            warn!(slug = %slug, error = %e, "[COLLECTIONS] Omitting slug from collection pages");
            continue;
        }
        let ref_id = reference_id(repository, EntryType::Page, slug);
        match cms.lookup_entry(&ref_id).await {
            Lookup::Found(_) => links.push(Link::entry(&ref_id)),
            Lookup::NotFound => {
                warn!(slug = %slug, ref_id = %ref_id, "[COLLECTIONS] Page entry not found, omitting from collection pages");
            }
            Lookup::Failed(e) => return Err(e),
        }
    }
    Ok(links)
}

/// Writes title, order, pages and url of a collection into `fields`, all under the canonical locale.
pub fn write_collection_fields(
    fields: &mut Fields,
    spec: &CollectionSpec,
    order: usize,
    pages: &[Link],
) {
    let locale = Locale::CANONICAL;
    let pages: Vec<Value> = pages.iter().map(Link::to_value).collect();

    fields.set("title", locale, spec.title.as_str());
    fields.set("order", locale, order as i64);
    fields.set("pages", locale, pages);
    match &spec.url {
        Some(url) => fields.set("url", locale, url.as_str()),
        None => {
            fields.remove("url", locale);
        }
    }
}

pub async fn reconcile_collection<C>(
    cms: &C,
    spec: &CollectionSpec,
    order: usize,
    repository: &Repository,
) -> Result<(Outcome, String), SyncError>
where
    C: Cms + ?Sized,
{
    let ref_id = reference_id(repository, EntryType::Collection, &spec.id);
    info!(collection = %spec.id, ref_id = %ref_id, order, "[COLLECTIONS] Processing collection");
    let pages = resolve_page_links(cms, repository, &spec.slugs).await?;

    match cms.lookup_entry(&ref_id).await {
        Lookup::Found(mut entry) => {
            write_collection_fields(&mut entry.fields, spec, order, &pages);
            entry.metadata.ensure_tag(repository.short_name());
            let updated = cms.update_entry(entry).await?;
            let published = cms.publish_entry(updated).await?;
            Ok((
                Outcome::Updated,
                format!("Collection entry updated: {}", published.id()),
            ))
        }
        Lookup::NotFound => {
            info!(collection = %spec.id, "[COLLECTIONS] Creating new collection");
            let mut fields = Fields::new();
            write_collection_fields(&mut fields, spec, order, &pages);
            let new_entry = NewEntry {
                fields,
                metadata: Metadata::tagged(repository.short_name()),
            };
            let created = cms
                .create_entry(EntryType::Collection, &ref_id, new_entry)
                .await?;
            let published = cms.publish_entry(created).await?;
            Ok((
                Outcome::Created,
                format!("Collection entry created: {}", published.id()),
            ))
        }
        Lookup::Failed(e) => Err(e.into()),
    }
}

/// Reconciles every collection in declaration order, then the page order.
pub async fn reconcile_collections<C>(
    cms: &C,
    config: &CollectionConfig,
    repository: &Repository,
    log: &mut RunLog,
) where
    C: Cms + ?Sized,
{
    for (order, spec) in config.collections().iter().enumerate() {
        match reconcile_collection(cms, spec, order, repository).await {
            Ok((outcome, message)) => {
                info!(collection = %spec.id, outcome = ?outcome, "[COLLECTIONS] {message}");
                log.record(&spec.id, outcome, message);
            }
            Err(e) => {
                error!(collection = %spec.id, error = %e, "[COLLECTIONS][ERROR] Collection reconciliation failed");
                log.record(&spec.id, Outcome::Failed, e.to_string());
            }
        }
    }

    reconcile_page_order(cms, config, repository, log).await;
}

async fn set_page_order<C>(
    cms: &C,
    ref_id: &str,
    position: usize,
) -> Result<(Outcome, String), SyncError>
where
    C: Cms + ?Sized,
{
    match cms.lookup_entry(ref_id).await {
        Lookup::Found(mut entry) => {
            entry
                .fields
                .set("order", Locale::CANONICAL, position as i64);
            let updated = cms.update_entry(entry).await?;
            let published = cms.publish_entry(updated).await?;
            Ok((
                Outcome::Updated,
                format!("Page order set to {position}: {}", published.id()),
            ))
        }
        Lookup::NotFound => Ok((
            Outcome::Skipped,
            format!("Page entry not found; order {position} not set"),
        )),
        Lookup::Failed(e) => Err(e.into()),
    }
}

/// Writes each page's position in the flattened slug sequence into its `order` field.
///
/// Must run after every page has been created, since pages are looked up by reference id.
/// A slug listed more than once ends up with the position of its last occurrence.
pub async fn reconcile_page_order<C>(
    cms: &C,
    config: &CollectionConfig,
    repository: &Repository,
    log: &mut RunLog,
) where
    C: Cms + ?Sized,
{
    let slugs = config.ordered_slugs();
    info!(pages = slugs.len(), "[ORDER] Reconciling page order");

    for (position, slug) in slugs.into_iter().enumerate() {
        let ref_id = reference_id(repository, EntryType::Page, slug);
        if let Err(e) = validate_slug(slug) {
            warn!(slug, error = %e, "[ORDER] Skipping invalid slug");
            log.record(&ref_id, Outcome::Skipped, e.to_string());
            continue;
        }

        match set_page_order(cms, &ref_id, position).await {
            Ok((outcome, message)) => {
                info!(ref_id = %ref_id, outcome = ?outcome, "[ORDER] {message}");
                log.record(&ref_id, outcome, message);
            }
            Err(e) => {
                error!(ref_id = %ref_id, error = %e, "[ORDER][ERROR] Page order update failed");
                log.record(&ref_id, Outcome::Failed, e.to_string());
            }
        }
    }
}
