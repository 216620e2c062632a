//! Fan-out of concurrent children over one join barrier.
//!
//! Every child contributes exactly one `Result` to the collection, failures
//! included, so the caller decides at the top what to surface.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::barrier::JoinBarrier;
use crate::errors::Result;

/// A group of concurrent children sharing one barrier.
pub struct FanOut<K, T> {
    barrier: JoinBarrier,
    handle: Handle,
    results: Arc<Mutex<Vec<(K, Result<T>)>>>,
}

impl<K, T> FanOut<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// New group whose completion is dispatched on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            barrier: JoinBarrier::new(),
            handle,
            results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn a child. Its result is recorded before its barrier leg closes.
    pub fn spawn<F>(&self, key: K, child: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let guard = self.barrier.enter_guard();
        let results = self.results.clone();
        self.handle.spawn(async move {
            let _guard = guard;
            let result = child.await;
            results
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((key, result));
        });
    }

    /// Record a child that failed before it could be spawned.
    pub fn record(&self, key: K, result: Result<T>) {
        let _guard = self.barrier.enter_guard();
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((key, result));
    }

    /// Wait for every child and return their results in completion order.
    pub async fn join(self) -> Vec<(K, Result<T>)> {
        let (tx, rx) = oneshot::channel();
        self.barrier.notify(&self.handle, move || {
            let _ = tx.send(());
        });
        if rx.await.is_err() {
            tracing::error!("Fan-out completion was dropped before the barrier closed");
        }

        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *results)
    }
}
