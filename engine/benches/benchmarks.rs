//! Performance benchmarks for folio-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use folio_engine::{
    BrowseConfig, BrowseEngine, CollectionConfig, FieldDescriptor, FieldKind, FieldSchema, Fields,
    FormEngine, PageQuery, Pagination, Record, ResourceManager, MemoryStore, SelectOption,
};
use serde_json::json;
use std::sync::Arc;

fn create_test_schema() -> Arc<FieldSchema> {
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
            ),
            FieldDescriptor::new("tags", "Tags", FieldKind::TagList),
            FieldDescriptor::text("contact", "Contact").email(),
        ])
        .unwrap(),
    )
}

fn record_fields(i: usize) -> Fields {
    json!({
        "title": format!("Record {}", i),
        "type": if i % 3 == 0 { "novel" } else { "story" },
        "tags": ["fiction", "classic"],
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn seeded_manager(runtime: &tokio::runtime::Runtime, size: usize) -> ResourceManager {
    let store = Arc::new(MemoryStore::new());
    let config = CollectionConfig::new("narratives")
        .with_type_field("type")
        .with_search_fields(["title"]);
    let manager = ResourceManager::for_store(store, config);
    runtime.block_on(async {
        for i in 0..size {
            manager.create(record_fields(i)).await.unwrap();
        }
    });
    manager
}

fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    for size in [100, 1000].iter() {
        let manager = seeded_manager(&runtime, *size);

        group.bench_with_input(BenchmarkId::new("fetch_page", size), size, |b, _| {
            b.to_async(&runtime)
                .iter(|| manager.fetch_page(black_box(PageQuery::new(3, 10))))
        });

        group.bench_with_input(BenchmarkId::new("fetch_filtered", size), size, |b, _| {
            b.to_async(&runtime).iter(|| {
                manager.fetch_page(black_box(
                    PageQuery::new(1, 10)
                        .with_filter("type", "novel")
                        .with_search("record 9"),
                ))
            })
        });

        group.bench_with_input(BenchmarkId::new("fetch_counts", size), size, |b, _| {
            b.to_async(&runtime).iter(|| manager.fetch_counts())
        });
    }

    group.finish();
}

fn bench_browse(c: &mut Criterion) {
    let mut group = c.benchmark_group("browse");

    for size in [100, 1000].iter() {
        let records: Vec<Record> = (0..*size)
            .map(|i| Record::new(format!("r{}", i), record_fields(i)))
            .collect();
        let mut engine = BrowseEngine::new(
            create_test_schema(),
            BrowseConfig {
                search_fields: vec!["title".into()],
                type_field: Some("type".into()),
                page_size: 20,
                pagination: Pagination::Client,
            },
        );
        engine.set_items(records, 0);
        engine.set_search("record 1");
        engine.set_type_filter(Some("story".into()));

        group.bench_with_input(BenchmarkId::new("cards", size), size, |b, _| {
            b.iter(|| black_box(&engine).cards())
        });

        group.bench_with_input(BenchmarkId::new("table", size), size, |b, _| {
            b.iter(|| black_box(&engine).table())
        });
    }

    group.finish();
}

fn bench_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("form");

    group.bench_function("set_value", |b| {
        let mut form = FormEngine::new(create_test_schema());
        b.iter(|| form.set_value(black_box("contact"), black_box(json!("ada@example.com"))))
    });

    group.bench_function("prepare", |b| {
        let mut form = FormEngine::new(create_test_schema());
        form.set_value("title", json!("Dune")).unwrap();
        form.set_value("type", json!("novel")).unwrap();
        form.set_value("tags", json!("sci-fi, desert")).unwrap();
        b.iter(|| form.prepare())
    });

    group.finish();
}

criterion_group!(benches, bench_manager, bench_browse, bench_form);
criterion_main!(benches);
