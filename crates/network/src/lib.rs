//! Bounded-concurrency primitive shared by the cache and installer.
//!
//! Grounded on `pacquet-network`'s `ThrottledClient`, generalized from "wraps
//! one `reqwest::Client`" to "wraps any async work", since this cap applies
//! to *all* extraction-or-download tasks, not just HTTP sends.

use std::future::Future;
use tokio::sync::Semaphore;

/// Default concurrency cap for extraction-or-download tasks.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Limits how many async tasks submitted through [`Throttle::run`] execute
/// concurrently.
#[derive(Debug)]
pub struct Throttle {
    semaphore: Semaphore,
}

impl Throttle {
    /// Construct a throttle with the given number of permits.
    pub fn new(permits: usize) -> Self {
        Throttle { semaphore: Semaphore::new(permits.max(1)) }
    }

    /// Run `task` once a permit is available, releasing the permit when
    /// `task` completes (successfully or not).
    pub async fn run<Task, Output>(&self, task: Task) -> Output
    where
        Task: Future<Output = Output>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed for the lifetime of a Throttle");
        task.await
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Throttle::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_the_permit_count() {
        let throttle = Arc::new(Throttle::new(2));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let throttle = throttle.clone();
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                throttle
                    .run(async {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
