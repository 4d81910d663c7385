use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loyalty_rules::workbook::{Sheet, Workbook, DATA_START};
use loyalty_rules::{
    compile, validate, DiscountRequest, Evaluator, Registry, RequestField, ResponseField,
    RuleBaseBuilder,
};

const TIERS: [&str; 4] = ["BRZ", "SLV", "GLD", "PLT"];

fn country(i: usize) -> String {
    let a = (b'A' + (i / 26 % 26) as u8) as char;
    let b = (b'A' + (i % 26) as u8) as char;
    format!("{a}{b}")
}

/// `n` rules, one per country and tier; only the last one matches the request.
fn build_evaluator(n: usize) -> (Evaluator, DiscountRequest) {
    let mut builder = RuleBaseBuilder::new("loyalty");
    for i in 0..n {
        let code = country(i / TIERS.len());
        let tier = TIERS[i % TIERS.len()];
        builder = builder.rule(&format!("r{i}"), |r| {
            r.when_eq(RequestField::Country, &code)
                .when_eq(RequestField::LoyaltyTier, tier)
                .then(ResponseField::ConversionRateUsd, "0.7")
                .then(ResponseField::DiscountPercentage, "0.10")
        });
    }
    let registry = Arc::new(Registry::new());
    registry.publish(builder.build().unwrap());

    let last = n - 1;
    let request = DiscountRequest::new(
        country(last / TIERS.len()),
        "NSW",
        "SYD",
        TIERS[last % TIERS.len()],
        "1",
    );
    (Evaluator::new(registry), request)
}

fn rule_sheet(n: usize) -> Workbook {
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); DATA_START];
    rows[0] = vec!["RuleSet".into(), "loyalty".into()];
    rows[4] = vec!["RuleTable Discounts".into()];
    rows[5] = ["", "CONDITION", "CONDITION", "CONDITION", "CONDITION", "CONDITION", "ACTION", "ACTION"]
        .map(str::to_owned)
        .to_vec();
    rows[7] = [
        "",
        "country",
        "state",
        "city",
        "loyaltyTier",
        "loyaltyPeriod",
        "conversionRateUSD",
        "discountPercentage",
    ]
    .map(str::to_owned)
    .to_vec();
    for i in 0..n {
        rows.push(vec![
            String::new(),
            country(i / TIERS.len()),
            "NSW".into(),
            "SYD".into(),
            TIERS[i % TIERS.len()].into(),
            (i % 99 + 1).to_string(),
            "0.7".into(),
            "0.10".into(),
        ]);
    }
    Workbook::new(vec![Sheet::new("Discounts", rows)])
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_eval");

    for &n in &[5, 50, 500] {
        let (evaluator, request) = build_evaluator(n);
        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| evaluator.evaluate(black_box(&request)));
        });
        group.bench_function(format!("{n}_rules_detailed"), |b| {
            b.iter(|| evaluator.evaluate_detailed(black_box(&request)));
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_and_compile");

    for &n in &[50, 500] {
        let workbook = rule_sheet(n);
        group.bench_function(format!("{n}_rows"), |b| {
            b.iter(|| {
                validate(black_box(&workbook)).unwrap();
                compile(&workbook, "loyalty", "bench").unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_build);
criterion_main!(benches);
