//! End-to-end tests for folio-engine
//!
//! These tests drive the resource manager, form engine and browse engine
//! together against the in-memory store.

use folio_engine::{
    BrowseConfig, BrowseEngine, BrowseIntent, CollectionConfig, DocumentStore, FieldDescriptor,
    FieldError, FieldErrors, FieldKind, FieldSchema, Fields, FormEngine, Lifecycle, MemoryStore,
    PageQuery, Pagination, ResourceManager, SelectOption, SubmitError,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::sync::Arc;

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn stories_schema() -> Arc<FieldSchema> {
    Arc::new(
        FieldSchema::new(vec![
            FieldDescriptor::text("title", "Title").required(),
            FieldDescriptor::select(
                "type",
                "Type",
                vec![
                    SelectOption::new("Story", "story"),
                    SelectOption::new("Novel", "novel"),
                ],
            )
            .required(),
            FieldDescriptor::new("year", "Year", FieldKind::Numeric),
        ])
        .unwrap(),
    )
}

fn stories() -> (Arc<MemoryStore>, ResourceManager) {
    let store = Arc::new(MemoryStore::new());
    let config = CollectionConfig::new("narratives")
        .with_label("narratives")
        .with_type_field("type")
        .with_search_fields(["title"]);
    (store.clone(), ResourceManager::for_store(store, config))
}

// ============================================================================
// Resource Manager
// ============================================================================

#[tokio::test]
async fn newest_record_comes_first() {
    let (_, manager) = stories();
    for title in ["first", "second", "third"] {
        manager.create(fields(json!({"title": title}))).await.unwrap();
    }

    let page = manager.fetch_page(PageQuery::new(1, 10)).await.unwrap();
    let titles: Vec<_> = page
        .records
        .iter()
        .map(|r| r.fields["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("third"), json!("second"), json!("first")]);
}

#[tokio::test]
async fn create_round_trips_with_empty_subresources() {
    let (store, manager) = stories();
    let input = fields(json!({"title": "Araby", "type": "story", "year": 1914}));
    let created = manager.create(input.clone()).await.unwrap();

    let page = manager.fetch(1, 10, None, None).await.unwrap();
    let fetched = &page.records[0];
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.fields, input);
    assert!(fetched.likes.is_empty());
    assert!(fetched.comments.is_empty());

    let stored = store.read(&format!("narratives/{}", created.id)).await.unwrap();
    assert!(stored.unwrap().get("id").is_none());
}

#[tokio::test]
async fn counts_by_type() {
    let (_, manager) = stories();
    for kind in ["story", "novel", "story"] {
        manager
            .create(fields(json!({"title": "t", "type": kind})))
            .await
            .unwrap();
    }

    let counts = manager.fetch_counts().await.unwrap();
    assert_eq!(counts.total_count, 3);
    assert_eq!(counts.counts_by_type.get("story"), Some(&2));
    assert_eq!(counts.counts_by_type.get("novel"), Some(&1));
    assert_eq!(manager.state().counts_by_type, counts.counts_by_type);
}

#[tokio::test]
async fn counts_of_empty_collection() {
    let (_, manager) = stories();
    let counts = manager.fetch_counts().await.unwrap();
    assert_eq!(counts.total_count, 0);
    assert!(counts.counts_by_type.is_empty());
}

#[tokio::test]
async fn delete_all_empties_state_and_store() {
    let (store, manager) = stories();
    for title in ["a", "b"] {
        manager.create(fields(json!({"title": title}))).await.unwrap();
    }
    manager.fetch_counts().await.unwrap();

    manager.delete_all().await.unwrap();

    let state = manager.state();
    assert!(state.items.is_empty());
    assert_eq!(state.total_count, 0);
    assert!(state.counts_by_type.is_empty());
    assert_eq!(store.read("narratives").await.unwrap(), None);
}

#[tokio::test]
async fn update_keeps_likes_and_comments() {
    let (_, manager) = stories();
    let record = manager
        .create(fields(json!({"title": "Emma", "type": "novel"})))
        .await
        .unwrap();
    manager.toggle_like(&record.id, "ada").await.unwrap();
    manager.add_comment(&record.id, "Ada", "Classic").await.unwrap();

    manager
        .update(&record.id, fields(json!({"title": "Emma (1815)", "type": "novel"})))
        .await
        .unwrap();

    let page = manager.fetch(1, 10, None, None).await.unwrap();
    let fetched = &page.records[0];
    assert_eq!(fetched.fields["title"], json!("Emma (1815)"));
    assert!(fetched.is_liked_by("ada"));
    assert_eq!(fetched.comment_count(), 1);
}

#[tokio::test]
async fn failed_fetch_records_last_error() {
    let (store, manager) = stories();
    manager.create(fields(json!({"title": "Dune"}))).await.unwrap();
    manager.fetch(1, 10, None, None).await.unwrap();

    store.set_offline(true);
    assert!(manager.fetch_counts().await.is_err());

    let state = manager.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.lifecycle, Lifecycle::Failed);
    assert!(state
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("store unavailable"));
}

#[tokio::test]
async fn search_is_case_insensitive_and_unicode_safe() {
    let (_, manager) = stories();
    for title in ["Привет мир", "Hello World", "日本語テスト"] {
        manager.create(fields(json!({"title": title}))).await.unwrap();
    }

    let page = manager.fetch(1, 10, None, Some("привет")).await.unwrap();
    assert_eq!(page.total_count, 1);

    let page = manager.fetch(1, 10, None, Some("WORLD")).await.unwrap();
    assert_eq!(page.records[0].fields["title"], json!("Hello World"));
}

#[tokio::test]
async fn page_edge_cases() {
    let (_, manager) = stories();
    for title in ["a", "b", "c"] {
        manager.create(fields(json!({"title": title}))).await.unwrap();
    }

    let page_zero = manager.fetch(0, 2, None, None).await.unwrap();
    assert_eq!(page_zero.records.len(), 2);

    let empty = manager.fetch(1, 0, None, None).await.unwrap();
    assert!(empty.records.is_empty());
    assert_eq!(empty.total_count, 3);

    let past_end = manager.fetch(9, 2, None, None).await.unwrap();
    assert!(past_end.records.is_empty());
    assert_eq!(past_end.total_count, 3);
}

#[tokio::test]
async fn malformed_children_are_skipped() {
    let (store, manager) = stories();
    manager.create(fields(json!({"title": "ok"}))).await.unwrap();
    store
        .write("narratives/broken", json!("not a record"))
        .await
        .unwrap();

    let page = manager.fetch(1, 10, None, None).await.unwrap();
    assert_eq!(page.total_count, 1);
}

// ============================================================================
// Form + Manager + Browse
// ============================================================================

#[tokio::test]
async fn invalid_submission_never_reaches_the_store() {
    let (store, manager) = stories();
    let mut form = FormEngine::new(stories_schema());
    form.set_value("title", json!("")).unwrap();
    form.set_value("type", json!("story")).unwrap();

    let manager_ref = &manager;
    let result = form
        .submit(|submission| async move {
            manager_ref.create(submission.values).await.map(|_| ())
        })
        .await;

    let expected = FieldErrors::from([("title".to_string(), FieldError::Required)]);
    assert_eq!(result, Err(SubmitError::Invalid(expected)));
    assert_eq!(store.read("narratives").await.unwrap(), None);
}

#[tokio::test]
async fn form_to_list_flow() {
    let (_, manager) = stories();

    let mut form = FormEngine::new(stories_schema());
    form.set_value("title", json!(" The Lottery ")).unwrap();
    form.set_value("type", json!("story")).unwrap();
    form.set_value("year", json!("1948")).unwrap();
    let manager_ref = &manager;
    form.submit(|submission| async move {
        manager_ref.create(submission.values).await.map(|_| ())
    })
    .await
    .unwrap();

    manager
        .create(fields(json!({"title": "Dune", "type": "novel", "year": 1965})))
        .await
        .unwrap();

    let mut browse = BrowseEngine::new(
        stories_schema(),
        BrowseConfig {
            search_fields: vec!["title".into()],
            type_field: Some("type".into()),
            page_size: 10,
            pagination: Pagination::Client,
        },
    )
    .with_viewer("ada");
    manager.fetch_page(PageQuery::new(1, 100)).await.unwrap();
    browse.sync(&manager.state());

    browse.set_type_filter(Some("story".into()));
    let cards = browse.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].fields[0].display, "The Lottery");
    assert_eq!(cards[0].fields[2].display, "1948");

    let id = cards[0].id.clone();
    manager.apply(browse.toggle_like(id.clone(), "ada")).await.unwrap();
    browse.sync(&manager.state());
    assert!(browse.cards()[0].liked);

    manager.apply(BrowseIntent::Delete { id }).await.unwrap();
    browse.sync(&manager.state());
    assert!(browse.cards().is_empty());
}

#[tokio::test]
async fn edit_modal_updates_through_manager() {
    let (_, manager) = stories();
    let record = manager
        .create(fields(json!({"title": "Emma", "type": "novel"})))
        .await
        .unwrap();

    let mut browse = BrowseEngine::new(stories_schema(), BrowseConfig::default());
    browse.sync(&manager.state());
    browse.begin_edit(&record);
    browse
        .edit_form()
        .unwrap()
        .set_value("title", json!("Persuasion"))
        .unwrap();

    let manager_ref = &manager;
    browse
        .submit_modal(|submission| async move {
            let id = submission.id.unwrap_or_default();
            manager_ref.update(&id, submission.values).await.map(|_| ())
        })
        .await
        .unwrap();

    assert_eq!(
        manager.state().find(&record.id).unwrap().fields["title"],
        json!("Persuasion")
    );
}

// ============================================================================
// Properties
// ============================================================================

fn seeded(n: usize) -> (tokio::runtime::Runtime, ResourceManager) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (_, manager) = stories();
    runtime.block_on(async {
        for i in 0..n {
            manager
                .create(fields(json!({"title": format!("t{}", i)})))
                .await
                .unwrap();
        }
    });
    (runtime, manager)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_page_size_invariant(n in 0usize..30, page_size in 1usize..8, page in 1usize..8) {
        let (runtime, manager) = seeded(n);
        let result = runtime
            .block_on(manager.fetch_page(PageQuery::new(page, page_size)))
            .unwrap();

        let expected = page_size.min(n.saturating_sub((page - 1) * page_size));
        prop_assert_eq!(result.records.len(), expected);
        prop_assert_eq!(result.total_count, n);
    }

    #[test]
    fn prop_like_toggle_parity(toggles in 1usize..7) {
        let (runtime, manager) = seeded(1);
        let id = manager.state().items[0].id.clone();

        let liked = RefCell::new(false);
        runtime.block_on(async {
            for _ in 0..toggles {
                *liked.borrow_mut() = manager.toggle_like(&id, "ada").await.unwrap();
            }
        });

        prop_assert_eq!(*liked.borrow(), toggles % 2 == 1);
        prop_assert_eq!(manager.state().items[0].is_liked_by("ada"), toggles % 2 == 1);
    }
}
