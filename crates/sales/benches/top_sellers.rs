use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use storefront_core::{OrderId, ProductId, UserId};
use storefront_sales::{quarterly_top_sellers, Order, OrderLine, TOP_SELLERS_LIMIT};

/// Paid orders spread over two years, three lines each, drawn from a pool of
/// 50 products.
fn seed_orders(count: usize) -> Vec<Order> {
    let products: Vec<ProductId> = (0..50).map(|_| ProductId::new()).collect();
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    (0..count)
        .map(|i| {
            let created = start + Duration::hours((i as i64 * 7) % (24 * 730));
            let lines = (0..3)
                .map(|j| {
                    let product = products[(i * 3 + j) % products.len()];
                    OrderLine {
                        product,
                        name: format!("Product {}", (i * 3 + j) % products.len()),
                        quantity: (j as u32) + 1,
                        price: 9.99,
                    }
                })
                .collect();
            let mut order = Order::place(OrderId::new(), UserId::new(), lines, created).unwrap();
            if i % 4 != 0 {
                order.mark_paid(created).unwrap();
            }
            order
        })
        .collect()
}

fn bench_quarterly_top_sellers(c: &mut Criterion) {
    let mut group = c.benchmark_group("quarterly_top_sellers");

    for order_count in [100usize, 1_000, 10_000].iter() {
        let orders = seed_orders(*order_count);
        group.throughput(Throughput::Elements(*order_count as u64));
        group.bench_with_input(
            BenchmarkId::new("aggregate", order_count),
            &orders,
            |b, orders| {
                b.iter(|| {
                    let report = quarterly_top_sellers(black_box(orders), TOP_SELLERS_LIMIT);
                    black_box(report);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_quarterly_top_sellers);
criterion_main!(benches);
