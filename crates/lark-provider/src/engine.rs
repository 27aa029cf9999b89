//! Construct-once cell for transport engines.

use crate::error::ProviderError;
use crate::traits::Transport;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Holds a provider's transport engine, built on first use.
///
/// Concurrent first callers wait for a single initializer; no caller ever
/// sees a half-built engine. A failed initialization is not cached, so a
/// later call (for example after the provider was configured) tries again.
#[derive(Default)]
pub struct LazyEngine {
    cell: OnceCell<Arc<dyn Transport>>,
}

impl LazyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the engine, running `init` if none has been built yet.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<dyn Transport>, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Transport>, ProviderError>>,
    {
        self.cell.get_or_try_init(init).await.cloned()
    }

    pub fn get(&self) -> Option<Arc<dyn Transport>> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl std::fmt::Debug for LazyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEngine")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
