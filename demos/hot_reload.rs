//! Watch a local directory for rule workbooks and evaluate a request against
//! whatever is published.
//!
//! ```text
//! cargo run --example hot_reload -- <bucket-dir> [reload.toml]
//! ```
//!
//! Drop `.xlsx` files under `<bucket-dir>/rules/` while it runs; the newest
//! one is promoted and published on the next poll.

use std::sync::Arc;
use std::time::Duration;

use loyalty_rules::store::{BlobStore, DirBlobStore};
use loyalty_rules::{DiscountRequest, DiscountService, ReloadConfig, ReloadManager};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "bucket".to_owned());
    let config = match args.next() {
        Some(path) => ReloadConfig::from_file(path)?,
        None => ReloadConfig::default(),
    };

    let store: Arc<dyn BlobStore> = Arc::new(DirBlobStore::new(&root));
    let manager = Arc::new(ReloadManager::new(store, config)?);
    let service = DiscountService::new(manager.evaluator());

    let cancel = CancellationToken::new();
    let reloader = Arc::clone(&manager).spawn(cancel.clone());

    let request = DiscountRequest::new("AU", "NSW", "SYD", "BRZ", "1");
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        match service.fetch_discount(&request) {
            Ok(resp) => tracing::info!(
                conversion_rate_usd = resp.conversion_rate_usd.as_deref().unwrap_or("-"),
                discount_percentage = resp.discount_percentage.as_deref().unwrap_or("-"),
                "discount"
            ),
            Err(e) => tracing::warn!(status = e.status(), error = %e, "lookup failed"),
        }
    }

    cancel.cancel();
    reloader.await?;
    Ok(())
}
