/*!
 * Bounded worker pool.
 *
 * Units of work run concurrently up to the pool size; results come back in
 * input order regardless of completion order.
 */

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Called with `(completed, total)` after each unit finishes
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct WorkerPool {
    size: usize,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` over every item and return the results in input order
    pub async fn map_ordered<T, R, F, Fut>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        F: Fn(usize, T) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = items.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let mut results: Vec<(usize, R)> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let unit = f(index, item);
                let progress = self.progress.clone();
                async move {
                    let result = unit.await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = progress {
                        callback(done, total);
                    }
                    (index, result)
                }
            })
            .buffer_unordered(self.size)
            .collect()
            .await;

        // Sort results by index to maintain original order
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}
