use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sql_bridge::dialect::{MsDialect, PgDialect};
use sql_bridge::prelude::*;

fn wide_record(fields: usize) -> Record {
    Record::Pairs(
        (0..fields)
            .map(|i| (format!("col{i}"), RowValues::Int(i as i64)))
            .collect(),
    )
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");
    for fields in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("postgres", fields), &fields, |b, &n| {
            b.iter(|| {
                let qb = QueryBuilder::new(&PgDialect).find(
                    "users",
                    wide_record(n),
                    QueryOptions::default().order("id").limit(20).offset(40),
                );
                black_box(qb.sql().len())
            });
        });
        group.bench_with_input(BenchmarkId::new("mssql", fields), &fields, |b, &n| {
            b.iter(|| {
                let qb = QueryBuilder::new(&MsDialect).find(
                    "users",
                    wide_record(n),
                    QueryOptions::default().order("id").limit(20).offset(40),
                );
                black_box(qb.sql().len())
            });
        });
    }
    group.finish();
}

fn bench_insert_statement(c: &mut Criterion) {
    let record = wide_record(16);
    c.bench_function("insert_statement_postgres", |b| {
        b.iter(|| {
            let stmt = QueryBuilder::new(&PgDialect)
                .insert("events", record.clone())
                .statement()
                .map(|s| s.params.len());
            black_box(stmt)
        });
    });
}

fn bench_translation(c: &mut Criterion) {
    let sql = "UPDATE accounts SET balance = @balance, note = '@not_a_param' WHERE id = @id AND owner = @owner";
    let names = ["balance", "id", "owner"];
    c.bench_function("translate_named_to_postgres", |b| {
        b.iter(|| {
            black_box(sql_bridge::translation::translate_named_placeholders(
                black_box(sql),
                &names,
                sql_bridge::translation::PlaceholderStyle::Postgres,
            ))
        });
    });
}

criterion_group!(benches, bench_find, bench_insert_statement, bench_translation);
criterion_main!(benches);
