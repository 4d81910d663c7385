//! The reload cycle: promote, detect change, fetch, validate, compile,
//! publish.
//!
//! A failed cycle leaves the published rule base alone and is retried from
//! scratch on the next tick. The last applied version tag only advances once
//! a rule base has been published, so a rejected document is fetched again
//! each tick until it is replaced.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ReloadConfig};
use crate::error::ReloadError;
use crate::evaluate::Evaluator;
use crate::promote::promote;
use crate::registry::Registry;
use crate::store::BlobStore;
use crate::RuleBase;

/// What one call to [`ReloadManager::reload_if_changed`] did.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The alias still carries the last applied version.
    Unchanged,
    /// A new rule base was published.
    Published { version_tag: String, rules: usize },
    /// The cycle failed; the previous rule base is still published.
    Failed(ReloadError),
}

impl ReloadOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, ReloadOutcome::Published { .. })
    }
}

/// Keeps a [`Registry`] in step with the newest rule document in a store.
pub struct ReloadManager {
    store: Arc<dyn BlobStore>,
    config: ReloadConfig,
    registry: Arc<Registry>,
    /// Serializes cycles and holds the version tag of the published base.
    last_applied: Mutex<Option<String>>,
}

impl std::fmt::Debug for ReloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ReloadManager {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails [`ReloadConfig::check`].
    pub fn new(store: Arc<dyn BlobStore>, config: ReloadConfig) -> Result<Self, ConfigError> {
        Self::with_registry(store, config, Arc::new(Registry::new()))
    }

    /// Publish into an existing registry instead of a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails [`ReloadConfig::check`].
    pub fn with_registry(
        store: Arc<dyn BlobStore>,
        config: ReloadConfig,
        registry: Arc<Registry>,
    ) -> Result<Self, ConfigError> {
        config.check()?;
        Ok(Self {
            store,
            config,
            registry,
            last_applied: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// An evaluator reading this manager's registry.
    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(Arc::clone(&self.registry))
    }

    #[must_use]
    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    /// Run one full cycle. Errors are logged and returned in the outcome,
    /// never raised. Concurrent callers queue behind the running cycle.
    pub async fn reload_if_changed(&self) -> ReloadOutcome {
        let mut last_applied = self.last_applied.lock().await;
        match self.cycle(last_applied.as_deref()).await {
            Ok(Some(base)) => {
                let version_tag = base.version_tag().to_owned();
                let rules = base.len();
                tracing::info!(
                    alias = %self.config.alias_key,
                    version = %version_tag,
                    rules,
                    namespace = base.namespace(),
                    "rules hot-reloaded"
                );
                self.registry.publish(base);
                *last_applied = Some(version_tag.clone());
                ReloadOutcome::Published { version_tag, rules }
            }
            Ok(None) => {
                tracing::info!(alias = %self.config.alias_key, "no change in rule document");
                ReloadOutcome::Unchanged
            }
            Err(e) => {
                tracing::error!(error = %e, "rule reload failed; keeping previous rule base");
                ReloadOutcome::Failed(e)
            }
        }
    }

    /// `Ok(None)` when the alias is unchanged since `last_applied`.
    async fn cycle(&self, last_applied: Option<&str>) -> Result<Option<RuleBase>, ReloadError> {
        let store = self.store.as_ref();
        let alias = self.config.alias_key.as_str();

        promote(store, &self.config.prefix, alias).await?;

        let head = store.head(alias).await?;
        if last_applied == Some(head.as_str()) {
            return Ok(None);
        }

        let document = store.get(alias).await?;
        tracing::debug!(
            version = %document.version_tag,
            bytes = document.bytes.len(),
            "fetched rule document"
        );
        let base = RuleBase::from_bytes(&document.bytes, &document.version_tag)?;
        Ok(Some(base))
    }

    /// Run one cycle now, then one per poll interval until `cancel` fires.
    ///
    /// A tick that comes due while a cycle is still running is delayed, so
    /// cycles never overlap.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_ms = self.config.poll_ms,
            prefix = %self.config.prefix,
            alias = %self.config.alias_key,
            "rule reloader started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("rule reloader stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.reload_if_changed().await;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
