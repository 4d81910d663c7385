
use std::sync::Arc;

use fixtures::{WorkbookFixture, AU_BRONZE, NZ_GOLD};
use loyalty_rules::store::{BlobStore, DirBlobStore};
use loyalty_rules::{
    ApiError, DiscountRequest, DiscountService, ReloadConfig, ReloadManager, ReloadOutcome,
};

fn write(root: &std::path::Path, key: &str, bytes: &[u8]) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn directory_bucket_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = ReloadConfig::from_toml_str(
        r#"
        [rules]
        bucket = "local"
        prefix = "uploads/"
        alias_key = "uploads/current.xlsx"
        poll_ms = 100
        "#,
    )
    .unwrap();

    write(
        dir.path(),
        "uploads/2024-05-01.xlsx",
        &WorkbookFixture::new()
            .index_sheet("Master")
            .rule_sheet("Discounts", "loyalty", &[AU_BRONZE, NZ_GOLD])
            .to_bytes(),
    );

    let store: Arc<dyn BlobStore> = Arc::new(DirBlobStore::new(dir.path()));
    let manager = ReloadManager::new(Arc::clone(&store), config).unwrap();

    let outcome = manager.reload_if_changed().await;
    assert!(matches!(outcome, ReloadOutcome::Published { rules: 2, .. }));
    assert!(dir.path().join("uploads/current.xlsx").exists());
    assert!(matches!(manager.reload_if_changed().await, ReloadOutcome::Unchanged));

    let service = DiscountService::new(manager.evaluator());
    let resp = service
        .fetch_discount(&DiscountRequest::new("NZ", "AKL", "AKL", "GLD", "12"))
        .unwrap();
    assert_eq!(resp.conversion_rate_usd.as_deref(), Some("0.6"));
    assert_eq!(resp.discount_percentage.as_deref(), Some("0.15"));

    let err = service
        .fetch_discount(&DiscountRequest::new("NZ", "AKL", "AKL", "GLD", "13"))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.to_response().status, 404);
}
