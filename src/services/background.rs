//! Detached background work.
//!
//! Side effects that must never slow down or fail a request (last-used
//! timestamps, model-mapping seeding) are submitted here as boxed futures.
//!
//! The queue is bounded. A full queue drops the new job with a warning rather
//! than growing or blocking the submitter. The worker runs up to `concurrency`
//! jobs at once, so one slow job never holds back the ones behind it. There is
//! no result channel: jobs log their own failures.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::{
    sync::{Semaphore, mpsc},
    task::{JoinHandle, JoinSet},
};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Sizing for the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundLimits {
    /// Jobs waiting to start before new submissions are dropped
    pub capacity: usize,

    /// Jobs running at the same time
    pub concurrency: usize,
}

impl Default for BackgroundLimits {
    fn default() -> Self {
        Self {
            capacity: 1024,
            concurrency: 16,
        }
    }
}

/// Handle for submitting fire-and-forget jobs.
#[derive(Clone)]
pub struct BackgroundQueue {
    tx: mpsc::Sender<(&'static str, Job)>,
}

impl BackgroundQueue {
    /// Start the worker on the current tokio runtime.
    ///
    /// The worker exits once every `BackgroundQueue` clone has been dropped,
    /// the queue is drained and all started jobs have finished.
    pub fn spawn(limits: BackgroundLimits) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<(&'static str, Job)>(limits.capacity.max(1));
        let slots = Arc::new(Semaphore::new(limits.concurrency.max(1)));

        let handle = tokio::spawn(async move {
            let mut running = JoinSet::new();

            while let Some((name, job)) = rx.recv().await {
                let Ok(permit) = slots.clone().acquire_owned().await else {
                    break;
                };
                tracing::trace!(job = name, "starting background job");
                running.spawn(async move {
                    job.await;
                    drop(permit);
                });

                // Reap finished jobs so the set does not accumulate handles.
                while let Some(result) = running.try_join_next() {
                    log_panic(result);
                }
            }

            while let Some(result) = running.join_next().await {
                log_panic(result);
            }
            tracing::debug!("background queue closed");
        });

        (Self { tx }, handle)
    }

    /// Queue `job`. Never blocks; the job is dropped if the queue is full or the
    /// worker is gone. Returns whether the job was accepted.
    pub fn submit<F>(&self, name: &'static str, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tx.try_send((name, Box::pin(job))) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(job = name, "background queue full, job dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(job = name, "background worker stopped, job dropped");
                false
            }
        }
    }
}

fn log_panic(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "background job panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::{Notify, oneshot};

    #[tokio::test]
    async fn every_job_runs_and_worker_drains_on_close() {
        let (queue, handle) = BackgroundQueue::spawn(BackgroundLimits::default());
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran = ran.clone();
            assert!(queue.submit("count", async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(queue);
        handle.await.unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn slow_job_does_not_hold_back_later_ones() {
        let (queue, _handle) = BackgroundQueue::spawn(BackgroundLimits::default());
        let release = Arc::new(Notify::new());

        let gate = release.clone();
        queue.submit("slow", async move { gate.notified().await });

        let (done_tx, done_rx) = oneshot::channel();
        queue.submit("fast", async move {
            let _ = done_tx.send(());
        });

        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("fast job waited behind the slow one")
            .unwrap();
        release.notify_one();
    }

    #[tokio::test]
    async fn full_queue_drops_new_jobs() {
        // Current-thread runtime: the worker cannot drain until this test yields.
        let (queue, _handle) = BackgroundQueue::spawn(BackgroundLimits {
            capacity: 1,
            concurrency: 1,
        });

        assert!(queue.submit("first", async {}));
        assert!(!queue.submit("overflow", async {}));
    }

    #[tokio::test]
    async fn submit_after_worker_exit_is_dropped_quietly() {
        let (queue, handle) = BackgroundQueue::spawn(BackgroundLimits::default());
        handle.abort();
        let _ = handle.await;

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let accepted = queue.submit("late", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;
        assert!(!accepted);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
