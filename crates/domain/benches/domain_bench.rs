use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    AddItem, AggregateId, ConfirmOrder, CreateOrder, Currency, CustomerId, CustomerOrder,
    InMemoryOrderRepository, Money, OrderItem, OrderService, PayOrder, ProductId,
};
use rust_decimal_macros::dec;

fn make_item(cents: i64) -> OrderItem {
    let price = Money::new(rust_decimal::Decimal::new(cents, 2), Currency::USD).unwrap();
    OrderItem::new(ProductId::new(), "Benchmark Widget", price, 3).unwrap()
}

fn bench_money_arithmetic(c: &mut Criterion) {
    let price = Money::new(dec!(19.995), Currency::USD).unwrap();
    let other = Money::new(dec!(0.335), Currency::USD).unwrap();

    c.bench_function("domain/money_multiply_add", |b| {
        b.iter(|| price.multiply(7).unwrap().add(other).unwrap());
    });
}

fn bench_order_with_50_items(c: &mut Criterion) {
    let items: Vec<_> = (1..=50).map(|n| make_item(n * 100 + 99)).collect();

    c.bench_function("domain/add_50_items_and_confirm", |b| {
        b.iter(|| {
            let mut order = CustomerOrder::new(AggregateId::new(), CustomerId::new(), 1).unwrap();
            for item in &items {
                order.add_item(item.clone()).unwrap();
            }
            order.confirm().unwrap();
            order.take_domain_events()
        });
    });
}

fn bench_change_quantity(c: &mut Criterion) {
    let mut order = CustomerOrder::new(AggregateId::new(), CustomerId::new(), 1).unwrap();
    let items: Vec<_> = (1..=50).map(|n| make_item(n * 10)).collect();
    for item in &items {
        order.add_item(item.clone()).unwrap();
    }
    let target = items[25].product_id();

    c.bench_function("domain/change_quantity_50_items", |b| {
        let mut quantity = 1;
        b.iter(|| {
            quantity = quantity % 10 + 1;
            order.change_quantity(target, quantity).unwrap();
        });
    });
}

fn bench_full_command_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/full_create_add_confirm_pay", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = OrderService::new(InMemoryOrderRepository::new());
                let cmd = CreateOrder::for_customer(CustomerId::new(), 1);
                let order_id = cmd.order_id;
                service.create_order(cmd).await.unwrap();

                service
                    .add_item(AddItem::new(order_id, make_item(1000)))
                    .await
                    .unwrap();

                service
                    .confirm_order(ConfirmOrder::new(order_id))
                    .await
                    .unwrap();
                service.pay_order(PayOrder::new(order_id)).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_money_arithmetic,
    bench_order_with_50_items,
    bench_change_quantity,
    bench_full_command_cycle,
);
criterion_main!(benches);
