use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::RuleBase;

/// Holder of the currently published [`RuleBase`].
///
/// Readers take a snapshot with [`current()`](Self::current) and keep using
/// it for as long as they like; a later [`publish()`](Self::publish) never
/// affects a snapshot already taken. Neither operation takes a lock.
#[derive(Debug, Default)]
pub struct Registry {
    current: ArcSwapOption<RuleBase>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The published rule base, or `None` before the first publication.
    #[must_use]
    pub fn current(&self) -> Option<Arc<RuleBase>> {
        self.current.load_full()
    }

    /// Replace the published rule base in a single atomic store and return
    /// the one it replaced.
    pub fn publish(&self, base: RuleBase) -> Option<Arc<RuleBase>> {
        self.current.swap(Some(Arc::new(base)))
    }

    /// Version tag of the published rule base.
    #[must_use]
    pub fn version_tag(&self) -> Option<String> {
        self.current()
            .map(|base| base.version_tag().to_owned())
    }
}
