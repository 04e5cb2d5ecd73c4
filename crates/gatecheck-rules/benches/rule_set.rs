use criterion::{black_box, criterion_group, criterion_main, Criterion as Bench};
use gatecheck_core::{Criterion, EvaluationContext, Metadata};
use gatecheck_rules::RuleSetFile;
use serde_json::json;

const ORDERS: &str = r#"
criteria:
  - name: OrderValidationCriterion
    entity_type: order
    transition: approve
    states: [submitted]
    rules:
      - { id: customer_email, check: { type: matches, field: customer.email, pattern: email } }
      - { id: items_present, check: { type: length, field: items, min: 1 } }
      - id: items
        check:
          type: each
          field: items
          checks:
            - { type: required, field: sku }
            - { type: in_range, field: quantity, min: 1, max: 1000 }
      - id: totals
        check: { type: sum_equals, terms: [items.*.lineTotal, shipping], total: total }
      - { id: currency, check: { type: matches, field: currency, pattern: currency } }
"#;

fn bench_rule_set(c: &mut Bench) {
    let orders = RuleSetFile::compile_yaml(ORDERS).expect("bench rule set compiles").remove(0);
    let ctx = EvaluationContext::new();
    let metadata = Metadata::in_state("submitted");

    let items: Vec<_> = (0..50)
        .map(|i| json!({ "sku": format!("SKU-{i}"), "quantity": 2, "lineTotal": 10.0 }))
        .collect();
    let order = json!({
        "customer": { "email": "buyer@example.com" },
        "items": items,
        "shipping": 5.0,
        "total": 505.0,
        "currency": "EUR"
    });

    c.bench_function("order_rule_set_pass", |b| {
        b.iter(|| orders.evaluate(black_box(Some(&order)), &metadata, &ctx))
    });

    let mut broken = order.clone();
    broken["customer"]["email"] = json!("buyer@example");
    c.bench_function("order_rule_set_first_rule_fails", |b| {
        b.iter(|| orders.evaluate(black_box(Some(&broken)), &metadata, &ctx))
    });
}

criterion_group!(benches, bench_rule_set);
criterion_main!(benches);
