//! Index-vs-scan lookup benchmarks.
//!
//! Run with: `cargo bench`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memdex::expr::field_eq;
use memdex::{as_indexed_queryable, IndexedQuery};
use serde_json::{json, Value};

const PREFIXES: [&str; 4] = ["GOT", "DEA", "GAU", "ZEE"];

/// 40_000 rows, 10_000 distinct customer ids, 4 rows each.
fn orders() -> Vec<Value> {
    let mut rows = Vec::with_capacity(40_000);
    for i in 1..=2500 {
        for prefix in PREFIXES {
            for _ in 0..4 {
                rows.push(json!({
                    "customer_id": format!("{}{}", prefix, i),
                    "order_number": rows.len() as i64 + 1,
                }));
            }
        }
    }
    rows
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_equality");

    let indexed = as_indexed_queryable(orders(), &["customer_id"]).unwrap();
    group.bench_function("indexed_40k", |b| {
        b.iter(|| {
            let filtered = indexed.filter(field_eq("customer_id", black_box("GAU1")));
            black_box(filtered.execute().unwrap())
        })
    });

    let plain = IndexedQuery::new(orders());
    group.bench_function("scan_40k", |b| {
        b.iter(|| {
            let filtered = plain.filter(field_eq("customer_id", black_box("GAU1")));
            black_box(filtered.execute().unwrap())
        })
    });

    group.finish();
}

fn bench_prepared(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepared_filter");

    let indexed = as_indexed_queryable(orders(), &["customer_id"]).unwrap();
    let prepared = indexed
        .prepare(1, |args| {
            indexed.filter(memdex::expr::field_eq_key(
                "customer_id",
                args[0].clone(),
            ))
        })
        .unwrap();

    group.bench_function("invoke_40k", |b| {
        b.iter(|| black_box(prepared.invoke(&[json!("ZEE7")]).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_filter, bench_prepared);
criterion_main!(benches);
