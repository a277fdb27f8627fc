//! Bounded pool for CPU-bound work (payload decoding, file writes).
//!
//! Jobs run on tokio's blocking threads; a semaphore caps how many run at
//! once so a burst of large payloads cannot monopolize the blocking pool.

use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrent offloaded jobs.
pub const DEFAULT_OFFLOAD_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct CpuPool {
    permits: Arc<Semaphore>,
    size: usize,
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle<T> {
    inner: JoinHandle<Result<T>>,
}

impl CpuPool {
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "cpu pool size must be > 0");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs currently holding a permit.
    pub fn busy(&self) -> usize {
        self.size - self.permits.available_permits()
    }

    /// Submit a blocking job. It starts once a permit is free.
    pub fn submit<F, T>(&self, job: F) -> JobHandle<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let inner = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::Other("cpu pool is closed".to_string()))?;
            match tokio::task::spawn_blocking(job).await {
                Ok(result) => result,
                Err(e) => Err(Error::Other(format!("offloaded job failed: {e}"))),
            }
        });
        JobHandle { inner }
    }
}

impl Default for CpuPool {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLOAD_WORKERS)
    }
}

impl<T> JobHandle<T> {
    /// Wait for the job. A panic inside the job surfaces as an error.
    pub async fn join(self) -> Result<T> {
        match self.inner.await {
            Ok(result) => result,
            Err(e) => Err(Error::Other(format!("offload task failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn job_result_is_returned() {
        let pool = CpuPool::new(2);
        let value = pool.submit(|| Ok(21 * 2)).join().await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn panicking_job_becomes_an_error() {
        let pool = CpuPool::new(1);
        let result: Result<()> = pool.submit(|| panic!("bad payload")).join().await;
        assert!(result.is_err());
        // The permit was released.
        assert_eq!(pool.submit(|| Ok(1)).join().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrency_is_capped_at_pool_size() {
        let pool = CpuPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
