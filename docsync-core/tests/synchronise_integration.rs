use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use docsync_core::contract::{
    Entry, EntryQuery, EntrySys, Lookup, MockCms, MockDocumentSource, NewEntry, Tag,
};
use docsync_core::error::{SyncError, TransportError};
use docsync_core::locale::Locale;
use docsync_core::reference::{EntryType, Repository};
use docsync_core::report::Outcome;
use docsync_core::synchronise::{
    ensure_tag, list_repository_entries, synchronise, SyncSettings,
};

const CONFIG: &str = "collections:\n  guides:\n    title: Guides\n    slugs: [intro]\n";
const INTRO: &str = "---\nslug: intro\ntitle: Introduction\nlang: en\n---\nWelcome.\n";

type Store = Arc<Mutex<HashMap<String, Entry>>>;

fn settings() -> SyncSettings {
    let mut settings = SyncSettings::new(Repository::parse("acme/handbook").unwrap(), "octocat");
    settings.revision = Some("abc123".to_string());
    settings.all_files = "docs/intro.md docs/notes.md".to_string();
    settings
}

fn source(files: &[(&'static str, &'static str)]) -> MockDocumentSource {
    let files: HashMap<&'static str, &'static str> = files.iter().copied().collect();
    let mut source = MockDocumentSource::new();
    source
        .expect_read_file()
        .returning(move |path: &str| files.get(path).map(|text| text.to_string()));
    source
}

/// A CMS mock backed by an in-memory entry store, so later stages see earlier writes.
fn stateful_cms(store: Store, existing_tags: Vec<Tag>) -> MockCms {
    let mut cms = MockCms::new();
    cms.expect_list_tags()
        .times(1)
        .returning(move || Ok(existing_tags.clone()));
    cms.expect_create_tag()
        .returning(|id: &str, name: &str| {
            Ok(Tag {
                id: id.to_string(),
                name: name.to_string(),
            })
        });

    let lookups = store.clone();
    cms.expect_lookup_entry()
        .returning(move |id: &str| match lookups.lock().unwrap().get(id) {
            Some(entry) => Lookup::Found(entry.clone()),
            None => Lookup::NotFound,
        });

    let creates = store.clone();
    cms.expect_create_entry()
        .returning(move |_, id: &str, new_entry: NewEntry| {
            let entry = Entry {
                sys: EntrySys {
                    id: id.to_string(),
                    version: Some(1),
                    published_version: None,
                    content_type: None,
                },
                fields: new_entry.fields,
                metadata: new_entry.metadata,
            };
            creates.lock().unwrap().insert(id.to_string(), entry.clone());
            Ok(entry)
        });

    let updates = store;
    cms.expect_update_entry().returning(move |mut entry: Entry| {
        entry.sys.version = entry.sys.version.map(|v| v + 1);
        updates
            .lock()
            .unwrap()
            .insert(entry.id().to_string(), entry.clone());
        Ok(entry)
    });
    cms.expect_publish_entry().returning(Ok);
    cms
}

#[tokio::test]
async fn full_run_publishes_pages_then_collections_then_order() {
    let store: Store = Arc::default();
    let cms = stateful_cms(store.clone(), vec![]);
    let source = source(&[
        ("docs/intro.md", INTRO),
        ("docs/notes.md", "# Notes\n"),
        ("docs/config.yml", CONFIG),
    ]);
    let mut settings = settings();
    settings.files_changed =
        Some("docs/intro.md src/main.rs docs/config.yml docs/notes.md".to_string());

    let report = synchronise(&cms, &source, &settings).await;

    assert!(report.is_success(), "unexpected error: {:?}", report.error);
    let keys: Vec<&str> = report.log.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "docs/intro.md",
            "docs/notes.md",
            "guides",
            "acme_handbook_page_intro",
        ]
    );
    assert_eq!(report.log.get("docs/intro.md").unwrap().outcome, Outcome::Created);
    assert_eq!(report.log.get("docs/notes.md").unwrap().outcome, Outcome::Skipped);
    assert_eq!(report.log.get("guides").unwrap().outcome, Outcome::Created);
    assert_eq!(
        report.log.get("acme_handbook_page_intro").unwrap().message,
        "Page order set to 0: acme_handbook_page_intro"
    );

    let store = store.lock().unwrap();
    let page = &store["acme_handbook_page_intro"];
    assert_eq!(page.fields.get_i64("order", Locale::CANONICAL), Some(0));
    assert_eq!(page.fields.get_str("sha", Locale::CANONICAL), Some("abc123"));
    assert!(store.contains_key("acme_handbook_collection_guides"));
}

#[tokio::test]
async fn second_run_updates_instead_of_creating() {
    let store: Store = Arc::default();
    let source = source(&[("docs/intro.md", INTRO), ("docs/config.yml", CONFIG)]);
    let settings = settings();

    let first = synchronise(&stateful_cms(store.clone(), vec![]), &source, &settings).await;
    assert_eq!(first.log.get("docs/intro.md").unwrap().outcome, Outcome::Created);

    let tag = Tag {
        id: "handbook".to_string(),
        name: "handbook".to_string(),
    };
    let second = synchronise(&stateful_cms(store.clone(), vec![tag]), &source, &settings).await;

    assert_eq!(second.log.get("docs/intro.md").unwrap().outcome, Outcome::Updated);
    assert_eq!(second.log.get("guides").unwrap().outcome, Outcome::Updated);
    assert_eq!(store.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn manual_trigger_processes_all_known_paths() {
    let store: Store = Arc::default();
    let cms = stateful_cms(store, vec![]);
    let source = source(&[("docs/intro.md", INTRO), ("docs/config.yml", CONFIG)]);

    let report = synchronise(&cms, &source, &settings()).await;

    assert_eq!(report.log.get("docs/intro.md").unwrap().outcome, Outcome::Created);
    assert_eq!(
        report.log.get("docs/notes.md").unwrap().outcome,
        Outcome::NoAction
    );
}

#[tokio::test]
async fn failing_tag_check_aborts_the_run() {
    let mut cms = MockCms::new();
    cms.expect_list_tags()
        .returning(|| Err(TransportError::with_status(401, "unauthorized")));
    cms.expect_lookup_entry().times(0);
    let source = MockDocumentSource::new();

    let report = synchronise(&cms, &source, &settings()).await;

    assert!(!report.is_success());
    assert!(matches!(report.error, Some(SyncError::Transport(ref e)) if e.status == Some(401)));
    assert!(report.log.is_empty());
}

#[tokio::test]
async fn missing_collection_config_is_logged_but_pages_are_kept() {
    let store: Store = Arc::default();
    let cms = stateful_cms(store, vec![]);
    let source = source(&[("docs/intro.md", INTRO)]);
    let mut settings = settings();
    settings.all_files = "docs/intro.md".to_string();

    let report = synchronise(&cms, &source, &settings).await;

    assert!(report.is_success());
    assert_eq!(report.log.get("docs/intro.md").unwrap().outcome, Outcome::Created);
    let config = report.log.get("docs/config.yml").unwrap();
    assert_eq!(config.outcome, Outcome::Failed);
    assert_eq!(config.message, "Collection config `docs/config.yml` could not be read");
}

#[tokio::test]
async fn malformed_collection_config_makes_no_collection_calls() {
    let mut cms = MockCms::new();
    cms.expect_list_tags().returning(|| {
        Ok(vec![Tag {
            id: "handbook".to_string(),
            name: "handbook".to_string(),
        }])
    });
    cms.expect_create_tag().times(0);
    cms.expect_lookup_entry().times(0);
    let source = source(&[(
        "docs/config.yml",
        "collections:\n  guides:\n    title: Guides\n",
    )]);
    let mut settings = settings();
    settings.all_files = String::new();

    let report = synchronise(&cms, &source, &settings).await;

    assert!(report.is_success());
    assert_eq!(report.log.len(), 1);
    assert!(report
        .log
        .get("docs/config.yml")
        .unwrap()
        .message
        .contains("must list at least one slug"));
}

#[tokio::test]
async fn ensure_tag_creates_only_when_absent() {
    let mut cms = MockCms::new();
    cms.expect_list_tags().returning(|| Ok(vec![]));
    cms.expect_create_tag()
        .withf(|id: &str, name: &str| id == "handbook" && name == "handbook")
        .times(1)
        .returning(|id: &str, name: &str| {
            Ok(Tag {
                id: id.to_string(),
                name: name.to_string(),
            })
        });

    assert!(ensure_tag(&cms, "handbook").await.unwrap());
}

#[tokio::test]
async fn listing_filters_by_provenance_tag() {
    let mut cms = MockCms::new();
    cms.expect_query_entries()
        .withf(|query: &EntryQuery| {
            query.tag.as_deref() == Some("handbook")
                && query.content_type == Some(EntryType::Page)
        })
        .times(1)
        .returning(|_| Ok(vec![]));

    let repo = Repository::parse("acme/handbook").unwrap();
    let entries = list_repository_entries(&cms, &repo, Some(EntryType::Page))
        .await
        .unwrap();
    assert!(entries.is_empty());
}
