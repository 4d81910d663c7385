use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use loyalty_rules::{
    DiscountRequest, Evaluator, Registry, RequestField, ResponseField, RuleBase, RuleBaseBuilder,
};

/// A base whose two response fields are written by two separate rules, both
/// carrying `marker`.
fn marked_base(marker: &str) -> RuleBase {
    RuleBaseBuilder::new("loyalty")
        .version_tag(marker)
        .rule("rate", |r| {
            r.when_eq(RequestField::Country, "AU")
                .then(ResponseField::ConversionRateUsd, marker)
        })
        .rule("discount", |r| {
            r.when_eq(RequestField::LoyaltyTier, "BRZ")
                .then(ResponseField::DiscountPercentage, marker)
        })
        .build()
        .unwrap()
}

#[test]
fn evaluations_never_observe_a_mixed_base() {
    let registry = Arc::new(Registry::new());
    registry.publish(marked_base("old"));
    let done = Arc::new(AtomicBool::new(false));

    let publisher = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..2_000 {
                registry.publish(marked_base(if i % 2 == 0 { "new" } else { "old" }));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let evaluator = Evaluator::new(Arc::clone(&registry));
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let request = DiscountRequest::new("AU", "NSW", "SYD", "BRZ", "1");
                let mut seen = 0_usize;
                while !done.load(Ordering::SeqCst) || seen == 0 {
                    let report = evaluator.evaluate_detailed(&request).unwrap();
                    let resp = report.response();
                    assert_eq!(resp.conversion_rate_usd, resp.discount_percentage);
                    assert_eq!(resp.conversion_rate_usd.as_deref(), Some(report.version_tag()));
                    assert_eq!(report.fired(), &["rate", "discount"]);
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    publisher.join().unwrap();
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn evaluate_across_threads() {
    let registry = Arc::new(Registry::new());
    registry.publish(
        RuleBaseBuilder::new("loyalty")
            .rule("au_bronze", |r| {
                r.when_eq(RequestField::Country, "AU")
                    .when_eq(RequestField::LoyaltyTier, "BRZ")
                    .then(ResponseField::DiscountPercentage, "0.66")
            })
            .rule("nz_any", |r| {
                r.when_eq(RequestField::Country, "NZ")
                    .then(ResponseField::DiscountPercentage, "0.15")
            })
            .build()
            .unwrap(),
    );

    let cases = [
        (DiscountRequest::new("AU", "NSW", "SYD", "BRZ", "1"), Some("0.66")),
        (DiscountRequest::new("NZ", "AKL", "AKL", "GLD", "3"), Some("0.15")),
        (DiscountRequest::new("AU", "VIC", "MEL", "SLV", "2"), None),
        (DiscountRequest::new("US", "CA", "LAX", "BRZ", "1"), None),
    ];

    let handles: Vec<_> = cases
        .iter()
        .cloned()
        .map(|(request, _)| {
            let evaluator = Evaluator::new(Arc::clone(&registry));
            thread::spawn(move || evaluator.evaluate(&request).ok())
        })
        .collect();

    for (handle, (_, expected)) in handles.into_iter().zip(cases.iter()) {
        let resp = handle.join().unwrap();
        assert_eq!(
            resp.and_then(|r| r.discount_percentage),
            expected.map(str::to_owned)
        );
    }
}
