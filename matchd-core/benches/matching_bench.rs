use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use matchd_core::prelude::*;
use rand::Rng;

fn limit_order(id: u64, side: Side, price: u64, qty: &str, stamp: u64) -> Order {
    let mut order = Order::new(
        format!("ORD-{id}"),
        format!("user-{id}"),
        "BTC-USD".to_string(),
        side,
        OrderKind::Limit,
        parse_amount(&price.to_string()).unwrap(),
        parse_amount(qty).unwrap(),
    );
    order.accepted_at = stamp;
    order
}

fn seed_book(depth: u64) -> SymbolBook {
    let book = SymbolBook::new("BTC-USD");
    let mut rng = rand::rng();
    for i in 0..depth {
        let price = 1_000 + rng.random_range(0..500);
        book.insert(limit_order(i, Side::Sell, price, "10", 1_000 + i))
            .unwrap();
    }
    book
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan against 10k resting sells");
    group.throughput(Throughput::Elements(1));
    group.bench_function("plan crossing buy", |b| {
        let book = seed_book(10_000);
        let taker = limit_order(u64::MAX, Side::Buy, 1_500, "100", 100_000);

        // plan() never mutates the book, so one seeding serves every iteration
        b.iter(|| plan(&taker, &book));
    });
    group.finish();
}

fn bench_cross_and_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross and commit");
    group.throughput(Throughput::Elements(1));
    group.bench_function("consume 1k-deep book", |b| {
        b.iter_batched(
            || seed_book(1_000),
            |book| {
                let taker = limit_order(u64::MAX, Side::Buy, 1_500, "10000", 100_000);
                let match_plan = plan(&taker, &book);
                commit(&taker, &match_plan, &book).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_plan, bench_cross_and_commit);
criterion_main!(benches);
