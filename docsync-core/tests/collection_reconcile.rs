use docsync_core::collection::{
    reconcile_collections, resolve_page_links, write_collection_fields, CollectionConfig,
    CollectionSpec,
};
use docsync_core::contract::{Entry, EntrySys, Fields, Link, Lookup, Metadata, MockCms, NewEntry};
use docsync_core::error::{ConfigError, TransportError};
use docsync_core::locale::Locale;
use docsync_core::reference::{EntryType, Repository};
use docsync_core::report::{Outcome, RunLog};

const CONFIG: &str = r#"
collections:
  getting-started:
    title: Getting started
    slugs:
      - installation
      - first-steps
  guides:
    title: Guides
    url: https://example.com/guides
    slugs: [configuration]
"#;

fn repository() -> Repository {
    Repository::parse("acme/handbook").unwrap()
}

fn entry(id: &str, fields: Fields) -> Entry {
    Entry {
        sys: EntrySys {
            id: id.to_string(),
            version: Some(5),
            published_version: Some(4),
            content_type: None,
        },
        fields,
        metadata: Metadata::default(),
    }
}

fn created(id: &str, new_entry: NewEntry) -> Entry {
    Entry {
        metadata: new_entry.metadata,
        ..entry(id, new_entry.fields)
    }
}

#[test]
fn config_keeps_declaration_order() {
    let config = CollectionConfig::from_yaml_str(CONFIG).unwrap();
    let ids: Vec<&str> = config.collections().iter().map(|c| c.id.as_str()).collect();

    assert_eq!(ids, vec!["getting-started", "guides"]);
    assert_eq!(
        config.ordered_slugs(),
        vec!["installation", "first-steps", "configuration"]
    );
    assert_eq!(config.collections()[0].url, None);
    assert_eq!(
        config.collections()[1].url.as_deref(),
        Some("https://example.com/guides")
    );
}

#[test]
fn collection_without_slugs_is_rejected() {
    let err = CollectionConfig::from_yaml_str("collections:\n  guides:\n    title: Guides\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingSlugs(id) if id == "guides"));

    let err = CollectionConfig::from_yaml_str(
        "collections:\n  guides:\n    title: Guides\n    slugs: []\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingSlugs(_)));
}

#[test]
fn collection_without_title_is_rejected() {
    let err = CollectionConfig::from_yaml_str("collections:\n  guides:\n    slugs: [a]\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingTitle(id) if id == "guides"));
}

#[test]
fn config_without_collections_is_rejected() {
    assert!(matches!(
        CollectionConfig::from_yaml_str("other: 1\n"),
        Err(ConfigError::NoCollections)
    ));
    assert!(matches!(
        CollectionConfig::from_yaml_str("collections: [unclosed"),
        Err(ConfigError::Yaml(_))
    ));
}

#[tokio::test]
async fn page_links_skip_invalid_slugs_and_missing_pages() {
    let mut cms = MockCms::new();
    cms.expect_lookup_entry()
        .withf(|id: &str| id != "acme_handbook_page_bad_slug")
        .times(3)
        .returning(|id: &str| {
            if id == "acme_handbook_page_ghost" {
                Lookup::NotFound
            } else {
                Lookup::Found(entry(id, Fields::new()))
            }
        });

    let slugs = vec![
        "intro".to_string(),
        "bad_slug".to_string(),
        "ghost".to_string(),
        "setup".to_string(),
    ];
    let ids: Vec<String> = resolve_page_links(&cms, &repository(), &slugs)
        .await
        .unwrap()
        .iter()
        .map(|link| link.id().to_string())
        .collect();

    assert_eq!(
        ids,
        vec!["acme_handbook_page_intro", "acme_handbook_page_setup"]
    );
}

#[tokio::test]
async fn collection_never_links_a_page_that_does_not_exist() {
    let config = CollectionConfig::from_yaml_str(
        "collections:\n  guides:\n    title: Guides\n    slugs: [ghost, intro]\n",
    )
    .unwrap();

    let mut cms = MockCms::new();
    cms.expect_lookup_entry().returning(|id: &str| {
        if id == "acme_handbook_page_intro" {
            Lookup::Found(entry(id, Fields::new()))
        } else {
            Lookup::NotFound
        }
    });
    cms.expect_create_entry()
        .withf(|_: &EntryType, _: &str, new_entry: &NewEntry| {
            new_entry.fields.get("pages", Locale::CANONICAL)
                == Some(&serde_json::json!([
                    Link::entry("acme_handbook_page_intro").to_value()
                ]))
        })
        .times(1)
        .returning(|_, id, new_entry| Ok(created(id, new_entry)));
    cms.expect_update_entry().times(1).returning(Ok);
    cms.expect_publish_entry().times(2).returning(Ok);

    let mut log = RunLog::new();
    reconcile_collections(&cms, &config, &repository(), &mut log).await;

    assert_eq!(log.get("guides").unwrap().outcome, Outcome::Created);
    assert_eq!(
        log.get("acme_handbook_page_ghost").unwrap().outcome,
        Outcome::Skipped
    );
    assert!(!log.has_failures());
}

#[tokio::test]
async fn failed_page_lookup_fails_only_that_collection() {
    let config = CollectionConfig::from_yaml_str(
        "collections:\n  broken:\n    title: Broken\n    slugs: [flaky]\n  guides:\n    title: Guides\n    slugs: [intro]\n",
    )
    .unwrap();

    let mut cms = MockCms::new();
    cms.expect_lookup_entry().returning(|id: &str| match id {
        "acme_handbook_page_flaky" => {
            Lookup::Failed(TransportError::with_status(503, "service unavailable"))
        }
        "acme_handbook_page_intro" => Lookup::Found(entry(id, Fields::new())),
        _ => Lookup::NotFound,
    });
    cms.expect_create_entry()
        .withf(|_: &EntryType, id: &str, _: &NewEntry| id == "acme_handbook_collection_guides")
        .times(1)
        .returning(|_, id, new_entry| Ok(created(id, new_entry)));
    cms.expect_update_entry().times(1).returning(Ok);
    cms.expect_publish_entry().times(2).returning(Ok);

    let mut log = RunLog::new();
    reconcile_collections(&cms, &config, &repository(), &mut log).await;

    let broken = log.get("broken").unwrap();
    assert_eq!(broken.outcome, Outcome::Failed);
    assert_eq!(broken.message, "service unavailable");
    assert_eq!(log.get("guides").unwrap().outcome, Outcome::Created);
    assert_eq!(
        log.get("acme_handbook_page_flaky").unwrap().outcome,
        Outcome::Failed
    );
    assert_eq!(
        log.get("acme_handbook_page_intro").unwrap().message,
        "Page order set to 1: acme_handbook_page_intro"
    );
}

#[tokio::test]
async fn failures_are_isolated_per_collection_and_per_page_order() {
    let config = CollectionConfig::from_yaml_str(
        "collections:\n  broken:\n    title: Broken\n    slugs: [intro]\n  guides:\n    title: Guides\n    slugs: [setup]\n",
    )
    .unwrap();

    let mut cms = MockCms::new();
    cms.expect_lookup_entry().returning(|id: &str| match id {
        "acme_handbook_collection_broken" => {
            Lookup::Failed(TransportError::with_status(500, "internal error"))
        }
        "acme_handbook_collection_guides" => Lookup::NotFound,
        _ => Lookup::Found(entry(id, Fields::new())),
    });
    cms.expect_create_entry()
        .withf(|_: &EntryType, id: &str, _: &NewEntry| id == "acme_handbook_collection_guides")
        .times(1)
        .returning(|_, id, new_entry| Ok(created(id, new_entry)));
    cms.expect_update_entry().times(2).returning(|e: Entry| {
        if e.id() == "acme_handbook_page_intro" {
            Err(TransportError::with_status(409, "version conflict"))
        } else {
            Ok(e)
        }
    });
    cms.expect_publish_entry().times(2).returning(Ok);

    let mut log = RunLog::new();
    reconcile_collections(&cms, &config, &repository(), &mut log).await;

    assert_eq!(log.get("broken").unwrap().outcome, Outcome::Failed);
    assert_eq!(log.get("guides").unwrap().outcome, Outcome::Created);
    let intro = log.get("acme_handbook_page_intro").unwrap();
    assert_eq!(intro.outcome, Outcome::Failed);
    assert_eq!(intro.message, "version conflict");
    assert_eq!(
        log.get("acme_handbook_page_setup").unwrap().message,
        "Page order set to 1: acme_handbook_page_setup"
    );
    assert_eq!(log.count(Outcome::Failed), 2);
}

#[test]
fn collection_fields_live_under_the_canonical_locale() {
    let spec = CollectionSpec {
        id: "guides".to_string(),
        title: "Guides".to_string(),
        slugs: vec!["configuration".to_string()],
        url: None,
    };
    let mut fields = Fields::new();
    fields.set("url", Locale::CANONICAL, "https://old.example.com");

    let pages = vec![Link::entry("acme_handbook_page_configuration")];
    write_collection_fields(&mut fields, &spec, 1, &pages);

    assert_eq!(fields.get_str("title", Locale::CANONICAL), Some("Guides"));
    assert_eq!(fields.get_i64("order", Locale::CANONICAL), Some(1));
    assert!(!fields.contains("url", Locale::CANONICAL));
    assert_eq!(
        fields.get("pages", Locale::CANONICAL),
        Some(&serde_json::json!([
            { "sys": { "type": "Link", "linkType": "Entry", "id": "acme_handbook_page_configuration" } }
        ]))
    );
}

#[tokio::test]
async fn reconciles_collections_then_page_order() {
    let config = CollectionConfig::from_yaml_str(CONFIG).unwrap();

    let mut cms = MockCms::new();
    cms.expect_lookup_entry().returning(|id: &str| match id {
        "acme_handbook_collection_getting-started" => Lookup::Found(entry(id, Fields::new())),
        "acme_handbook_page_installation" | "acme_handbook_page_configuration" => {
            Lookup::Found(entry(id, Fields::new()))
        }
        _ => Lookup::NotFound,
    });
    cms.expect_create_entry()
        .withf(|entry_type: &EntryType, id: &str, new_entry: &NewEntry| {
            *entry_type == EntryType::Collection
                && id == "acme_handbook_collection_guides"
                && new_entry.fields.get_i64("order", Locale::CANONICAL) == Some(1)
                && new_entry.metadata.has_tag("handbook")
        })
        .times(1)
        .returning(|_, id, new_entry| Ok(created(id, new_entry)));
    cms.expect_update_entry()
        .withf(|e: &Entry| {
            let order = e.fields.get_i64("order", Locale::CANONICAL);
            match e.id() {
                "acme_handbook_collection_getting-started" => {
                    order == Some(0)
                        && e.metadata.has_tag("handbook")
                        && e.fields.get("pages", Locale::CANONICAL)
                            == Some(&serde_json::json!([
                                Link::entry("acme_handbook_page_installation").to_value()
                            ]))
                }
                "acme_handbook_page_installation" => order == Some(0),
                "acme_handbook_page_configuration" => order == Some(2),
                _ => false,
            }
        })
        .times(3)
        .returning(Ok);
    cms.expect_publish_entry().times(4).returning(Ok);

    let mut log = RunLog::new();
    reconcile_collections(&cms, &config, &repository(), &mut log).await;

    assert_eq!(log.get("getting-started").unwrap().outcome, Outcome::Updated);
    assert_eq!(
        log.get("getting-started").unwrap().message,
        "Collection entry updated: acme_handbook_collection_getting-started"
    );
    assert_eq!(log.get("guides").unwrap().outcome, Outcome::Created);
    assert_eq!(
        log.get("acme_handbook_page_installation").unwrap().message,
        "Page order set to 0: acme_handbook_page_installation"
    );
    assert_eq!(
        log.get("acme_handbook_page_first-steps").unwrap().outcome,
        Outcome::Skipped
    );
    assert_eq!(
        log.get("acme_handbook_page_configuration").unwrap().message,
        "Page order set to 2: acme_handbook_page_configuration"
    );
    assert!(!log.has_failures());
}

#[tokio::test]
async fn slug_listed_twice_keeps_its_last_position() {
    let config = CollectionConfig::from_yaml_str(
        "collections:\n  a:\n    title: A\n    slugs: [intro, setup]\n  b:\n    title: B\n    slugs: [intro]\n",
    )
    .unwrap();

    let mut cms = MockCms::new();
    cms.expect_lookup_entry().returning(|id: &str| {
        if id.contains("_page_") {
            Lookup::Found(entry(id, Fields::new()))
        } else {
            Lookup::NotFound
        }
    });
    cms.expect_create_entry()
        .times(2)
        .returning(|_, id, new_entry| Ok(created(id, new_entry)));
    cms.expect_update_entry().times(3).returning(Ok);
    cms.expect_publish_entry().returning(Ok);

    let mut log = RunLog::new();
    reconcile_collections(&cms, &config, &repository(), &mut log).await;

    assert_eq!(
        log.get("acme_handbook_page_intro").unwrap().message,
        "Page order set to 2: acme_handbook_page_intro"
    );
    assert_eq!(
        log.get("acme_handbook_page_setup").unwrap().message,
        "Page order set to 1: acme_handbook_page_setup"
    );
}
