use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgshape::{Column, FieldSchema, Relation, RequestedFields, field_graph, prepare_query};
use std::sync::Arc;

/// A schema with `n` plain columns, one filtered column and one relation.
fn build_schema(n: usize) -> FieldSchema {
    let related = Arc::new(
        FieldSchema::new("data.comments")
            .column("id", "data.comments.id")
            .column("body", "data.comments.body"),
    );

    let mut schema = FieldSchema::new("data.articles");
    for i in 0..n {
        schema = schema.column(format!("col{i}"), format!("data.articles.col{i}"));
    }
    schema
        .field(
            "price",
            Column::new("data.prices.amount AS price")
                .join("LEFT JOIN data.prices ON data.prices.article_id = data.articles.id")
                .filter("data.prices.currency = :currency")
                .bind("currency", "EUR"),
        )
        .field(
            "comments",
            Relation::many(related, "data.comments.article_id = data.articles.id"),
        )
}

fn requested(n: usize) -> RequestedFields {
    let mut requested = RequestedFields::flat((0..n).map(|i| format!("col{i}")));
    requested.add("price");
    requested.add_nested("comments", RequestedFields::flat(["id", "body"]));
    requested
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_graph/compile");

    for n in [1, 5, 10, 50, 100] {
        let schema = build_schema(n);
        let requested = requested(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(field_graph(&schema).requested(requested.clone()).build()));
        });
    }

    group.finish();
}

fn bench_compile_and_finish(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_graph/compile_and_finish");

    for n in [1, 5, 10, 50, 100] {
        let schema = build_schema(n);
        let requested = requested(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let Ok(graph) = field_graph(&schema).requested(requested.clone()).build() else {
                    return;
                };
                let compiled = graph.finish().sorting_table("data.articles").build();
                if let Ok(compiled) = compiled {
                    black_box(compiled.bindings.to_positional(&compiled.query).map(|(sql, _)| sql).ok());
                }
            });
        });
    }

    group.finish();
}

fn bench_finish_only(c: &mut Criterion) {
    c.bench_function("finish/no_filters", |b| {
        b.iter(|| black_box(prepare_query("SELECT * FROM data.articles", Vec::new()).build()));
    });
}

criterion_group!(benches, bench_compile, bench_compile_and_finish, bench_finish_only);
criterion_main!(benches);
