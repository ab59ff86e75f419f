//! High-level pipeline: orchestrates tag → pages → collections for one repository.
//!
//! This module sequences a whole run:
//!   - Ensures the repository's provenance tag exists in the CMS
//!   - Selects and reads the documents to process, then reconciles them as pages
//!   - Loads the collection config and reconciles collections, then page order
//!   - Emits the run log whatever happened
//!
//! # Major Types
//! - [`SyncSettings`]: run inputs (repository, author, paths, ...)
//! - [`SynchroniseReport`]: the run log plus the fatal error that stopped the run, if any
//!
//! # Error Handling
//! Per-document and per-collection failures are recorded in the log and never stop the run.
//! A malformed collection config stops collection reconciliation only. A failure to ensure the
//! provenance tag stops the run.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Read-only listing: [`list_repository_entries`]

use tracing::{error, info};

pub use crate::config::SyncSettings;
use crate::collection::{reconcile_collections, CollectionConfig};
use crate::contract::{Cms, DocumentSource, Entry, EntryQuery};
use crate::document::{read_documents, select_paths};
use crate::error::{ConfigError, SyncError, TransportError};
use crate::page::reconcile_pages;
use crate::reference::{EntryType, Repository};
use crate::report::{Outcome, RunLog};

#[derive(Debug)]
pub struct SynchroniseReport {
    pub log: RunLog,
    /// The error that aborted the run. Per-item failures live in `log`.
    pub error: Option<SyncError>,
}

impl SynchroniseReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs every stage and returns the run log, which is emitted even when a stage aborts the run.
pub async fn synchronise<C, S>(cms: &C, source: &S, settings: &SyncSettings) -> SynchroniseReport
where
    C: Cms + ?Sized,
    S: DocumentSource + ?Sized,
{
    info!(repository = %settings.repository, "[SYNC] Starting synchronisation");
    let mut log = RunLog::new();

    let result = run_stages(cms, source, settings, &mut log).await;
    if let Err(e) = &result {
        error!(error = %e, "[SYNC][ERROR] Synchronisation aborted");
    }

    log.emit();
    SynchroniseReport {
        log,
        error: result.err(),
    }
}

async fn run_stages<C, S>(
    cms: &C,
    source: &S,
    settings: &SyncSettings,
    log: &mut RunLog,
) -> Result<(), SyncError>
where
    C: Cms + ?Sized,
    S: DocumentSource + ?Sized,
{
    ensure_tag(cms, settings.repository.short_name()).await?;

    let mut paths = select_paths(
        settings.files_changed.as_deref(),
        &settings.all_files,
        &settings.docs_prefix,
    );
    paths.retain(|path| path != &settings.config_path);
    let documents = read_documents(source, &paths);
    reconcile_pages(cms, &documents, &settings.page_context(), log).await;

    match load_collection_config(source, &settings.config_path) {
        Ok(config) => reconcile_collections(cms, &config, &settings.repository, log).await,
        Err(e) => {
            error!(config_path = %settings.config_path, error = %e, "[COLLECTIONS][ERROR] Skipping collection reconciliation");
            log.record(&settings.config_path, Outcome::Failed, e.to_string());
        }
    }

    info!("[SYNC] Synchronisation complete");
    Ok(())
}

/// Reads and validates the collection config through the document source.
pub fn load_collection_config<S>(source: &S, path: &str) -> Result<CollectionConfig, ConfigError>
where
    S: DocumentSource + ?Sized,
{
    let text = source
        .read_file(path)
        .ok_or_else(|| ConfigError::Missing(path.to_string()))?;
    CollectionConfig::from_yaml_str(&text)
}

/// Creates the provenance tag unless it already exists. Returns whether it was created.
pub async fn ensure_tag<C>(cms: &C, tag_id: &str) -> Result<bool, TransportError>
where
    C: Cms + ?Sized,
{
    let tags = cms.list_tags().await?;
    if tags.iter().any(|tag| tag.id == tag_id) {
        info!(tag = tag_id, "[TAGS] Provenance tag already present");
        return Ok(false);
    }
    cms.create_tag(tag_id, tag_id).await?;
    info!(tag = tag_id, "[TAGS] Created provenance tag");
    Ok(true)
}

/// Entries carrying the repository's provenance tag, optionally of a single content type.
pub async fn list_repository_entries<C>(
    cms: &C,
    repository: &Repository,
    entry_type: Option<EntryType>,
) -> Result<Vec<Entry>, TransportError>
where
    C: Cms + ?Sized,
{
    let query = EntryQuery {
        content_type: entry_type,
        tag: Some(repository.short_name().to_string()),
        limit: None,
    };
    let entries = cms.query_entries(query).await?;
    info!(count = entries.len(), repository = %repository, "[SYNC] Listed repository entries");
    Ok(entries)
}
