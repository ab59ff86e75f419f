//! Page reconciliation: one markdown document becomes one locale slice of a `page` entry.
//!
//! Per document the flow is parse, validate, resolve the locale, then look the page up by
//! reference id. A found page has its locale slice overwritten; a missing page is created with
//! only that slice populated. Every document is isolated: its failure is logged and the next
//! document is processed.
//!
//! A document with no content (most likely deleted) causes no remote action. Remote pages are
//! never deleted or unpublished by this module.

use tracing::{debug, error, info};

use crate::contract::{Cms, Entry, Fields, Lookup, Metadata, NewEntry};
use crate::document::Document;
use crate::error::{IdentityConflictError, SyncError, ValidationError};
use crate::front_matter::{self, FrontMatter};
use crate::locale::{resolve_locale, Locale};
use crate::reference::{reference_id, EntryType, Repository};
use crate::report::{Outcome, RunLog};
use crate::validate::{check_uuid_required, parse_order, validate_front_matter, ValidationRules};

pub const DELETED_MESSAGE: &str =
    "This file had no content, so the file may have been deleted. No action taken";
pub const NO_FRONT_MATTER_MESSAGE: &str = "No front matter block found; skipped";

/// Run-wide inputs for building page payloads.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub repository: Repository,
    pub author: String,
    /// Content revision written to the `sha` field.
    pub revision: Option<String>,
    /// Branch used in the `source` link.
    pub branch: String,
    pub rules: ValidationRules,
}

/// A validated document, ready to be written to the CMS.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft<'a> {
    pub path: &'a str,
    pub ref_id: String,
    pub locale: Locale,
    pub front_matter: FrontMatter,
    pub body: &'a str,
}

impl PageDraft<'_> {
    fn slug(&self) -> &str {
        self.front_matter.get("slug").unwrap_or_default()
    }

    fn uuid(&self) -> Option<&str> {
        self.front_matter.non_empty("uuid")
    }

    fn order(&self) -> Option<i64> {
        self.front_matter
            .non_empty("order")
            .and_then(|raw| parse_order(raw).ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prepared<'a> {
    Draft(PageDraft<'a>),
    /// Not publishable, with the reason. No CMS call is made.
    Skip(String),
}

/// Parses, validates and resolves a document without touching the CMS.
pub fn prepare_page<'a>(
    path: &'a str,
    content: &'a str,
    ctx: &PageContext,
) -> Result<Prepared<'a>, ValidationError> {
    let parsed = front_matter::parse(content);
    let Some(body) = parsed.body else {
        return Ok(Prepared::Skip(NO_FRONT_MATTER_MESSAGE.to_string()));
    };
    let front_matter = parsed.front_matter;

    validate_front_matter(&front_matter)?;

    let lang = front_matter.get("lang");
    let Some(locale) = resolve_locale(lang) else {
        return Ok(Prepared::Skip(format!(
            "Unsupported language `{}`; skipped",
            lang.unwrap_or_default()
        )));
    };

    let ref_id = reference_id(
        &ctx.repository,
        EntryType::Page,
        front_matter.get("slug").unwrap_or_default(),
    );
    debug!(path, ref_id = %ref_id, locale = %locale, "Prepared page draft");

    Ok(Prepared::Draft(PageDraft {
        path,
        ref_id,
        locale,
        front_matter,
        body,
    }))
}

/// Builds the payload of a page that does not exist yet.
///
/// Locale-scoped fields hold only the draft's locale. `slug` and the identity fields are
/// pinned to [`Locale::CANONICAL`].
pub fn build_new_page(draft: &PageDraft<'_>, ctx: &PageContext) -> NewEntry {
    let mut fields = Fields::new();
    write_locale_slice(&mut fields, draft, ctx);

    fields.set("slug", Locale::CANONICAL, draft.slug());
    if let Some(uuid) = draft.uuid() {
        fields.set("uuid", Locale::CANONICAL, uuid);
    }
    if let Some(order) = draft.order() {
        fields.set("order", Locale::CANONICAL, order);
    }
    if let Some(revision) = &ctx.revision {
        fields.set("sha", Locale::CANONICAL, revision.as_str());
    }

    NewEntry {
        fields,
        metadata: Metadata::tagged(ctx.repository.short_name()),
    }
}

/// Overwrites the draft's locale slice of an existing page. Other locales are left as they are.
pub fn apply_page_update(entry: &mut Entry, draft: &PageDraft<'_>, ctx: &PageContext) {
    let fields = &mut entry.fields;
    write_locale_slice(fields, draft, ctx);

    if !fields.contains("slug", Locale::CANONICAL) {
        fields.set("slug", Locale::CANONICAL, draft.slug());
    }
    if let Some(uuid) = draft.uuid() {
        if !fields.contains("uuid", Locale::CANONICAL) {
            fields.set("uuid", Locale::CANONICAL, uuid);
        }
    }
    if let Some(order) = draft.order() {
        fields.set("order", Locale::CANONICAL, order);
    }
    if let Some(revision) = &ctx.revision {
        fields.set("sha", Locale::CANONICAL, revision.as_str());
    }

    entry.metadata.ensure_tag(ctx.repository.short_name());
}

fn write_locale_slice(fields: &mut Fields, draft: &PageDraft<'_>, ctx: &PageContext) {
    let locale = draft.locale;
    fields.set("title", locale, draft.front_matter.get("title").unwrap_or_default());
    fields.set("author", locale, vec![ctx.author.clone()]);
    fields.set("source", locale, ctx.repository.source_url(&ctx.branch, draft.path));
    fields.set("markdown", locale, draft.body);
}

/// Fails when the document's uuid contradicts the remote record's.
pub fn check_identity(
    entry: &Entry,
    draft: &PageDraft<'_>,
    rules: &ValidationRules,
) -> Result<(), SyncError> {
    let remote = entry.fields.get_str("uuid", Locale::CANONICAL);
    let local = draft.uuid();
    if let (Some(remote), Some(local)) = (remote, local) {
        if remote != local {
            return Err(IdentityConflictError {
                ref_id: draft.ref_id.clone(),
                remote: remote.to_string(),
                local: local.to_string(),
            }
            .into());
        }
    }
    check_uuid_required(rules, local, remote)?;
    Ok(())
}

/// Reconciles one document against the CMS and returns the outcome to log.
pub async fn reconcile_page<C>(
    cms: &C,
    document: &Document,
    ctx: &PageContext,
) -> Result<(Outcome, String), SyncError>
where
    C: Cms + ?Sized,
{
    let Some(content) = document.content.as_deref() else {
        return Ok((Outcome::NoAction, DELETED_MESSAGE.to_string()));
    };

    let draft = match prepare_page(&document.path, content, ctx)? {
        Prepared::Draft(draft) => draft,
        Prepared::Skip(reason) => return Ok((Outcome::Skipped, reason)),
    };

    match cms.lookup_entry(&draft.ref_id).await {
        Lookup::Found(mut entry) => {
            check_identity(&entry, &draft, &ctx.rules)?;
            apply_page_update(&mut entry, &draft, ctx);
            let updated = cms.update_entry(entry).await?;
            let published = cms.publish_entry(updated).await?;
            Ok((
                Outcome::Updated,
                format!("Page entry updated: {}", published.id()),
            ))
        }
        Lookup::NotFound => {
            check_uuid_required(&ctx.rules, draft.uuid(), None)?;
            info!(ref_id = %draft.ref_id, "[PAGES] No existing page, creating");
            let created = cms
                .create_entry(EntryType::Page, &draft.ref_id, build_new_page(&draft, ctx))
                .await?;
            let published = cms.publish_entry(created).await?;
            Ok((
                Outcome::Created,
                format!("Page entry created: {}", published.id()),
            ))
        }
        Lookup::Failed(e) => Err(e.into()),
    }
}

/// Reconciles every document in order, recording one log entry per path.
pub async fn reconcile_pages<C>(
    cms: &C,
    documents: &[Document],
    ctx: &PageContext,
    log: &mut RunLog,
) where
    C: Cms + ?Sized,
{
    info!(documents = documents.len(), "[PAGES] Reconciling pages");
    for document in documents {
        match reconcile_page(cms, document, ctx).await {
            Ok((outcome, message)) => {
                info!(path = %document.path, outcome = ?outcome, "[PAGES] {message}");
                log.record(&document.path, outcome, message);
            }
            Err(e) => {
                error!(path = %document.path, error = %e, "[PAGES][ERROR] Page reconciliation failed");
                log.record(&document.path, Outcome::Failed, e.to_string());
            }
        }
    }
}
