use catalog_hub_core::hierarchy::{CategoryNode, PathResolver, DEFAULT_MAX_DEPTH};
use catalog_hub_core::queue::{claim_pending, ClaimSpec};
use catalog_hub_core::storage::{DocumentStore, FileStore, Filter, WriteOptions};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn bench_resolve_chain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let tempdir = TempDir::new().unwrap();
    let store = FileStore::open(tempdir.path()).unwrap();
    let depth = 32;
    rt.block_on(async {
        for i in 0..depth {
            let pid = if i == 0 { Value::Null } else { json!(i - 1) };
            store
                .insert(
                    "platform_categories",
                    object(json!({
                        "_key": format!("n{i:02}"),
                        "source": "acme",
                        "id": i,
                        "pid": pid,
                        "name": format!("level {i}"),
                    })),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
    });
    let leaf = rt.block_on(async {
        let doc = store
            .document("platform_categories", &format!("n{:02}", depth - 1))
            .await
            .unwrap();
        CategoryNode::from_document(&doc).unwrap()
    });
    let resolver = PathResolver::new(&store, "platform_categories", DEFAULT_MAX_DEPTH);

    c.bench_function("resolve_depth_32", |b| {
        b.iter(|| rt.block_on(resolver.resolve(&leaf)).unwrap())
    });
}

fn bench_claim_batch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let tempdir = TempDir::new().unwrap();
    let store = FileStore::open(tempdir.path()).unwrap();
    rt.block_on(async {
        for i in 0..1000 {
            store
                .insert(
                    "platform_properties",
                    object(json!({
                        "_key": format!("p{i:04}"),
                        "status": "pending",
                        "mappingId": i,
                    })),
                    WriteOptions::default(),
                )
                .await
                .unwrap();
        }
    });

    c.bench_function("claim_500_of_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .update_where(
                        "platform_properties",
                        &Filter::not_null("mappingId"),
                        object(json!({"status": "pending"})),
                        None,
                    )
                    .await
                    .unwrap();
                claim_pending(&store, "platform_properties", ClaimSpec::PROPERTY_SYNC, 500)
                    .await
                    .unwrap()
            })
        })
    });
}

criterion_group!(benches, bench_resolve_chain, bench_claim_batch);
criterion_main!(benches);
