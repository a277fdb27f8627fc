//! Restart wrapper around a worker loop.
//!
//! Each run of the loop is its own tokio task, so a panic escaping task
//! handling is contained in the `JoinHandle`. The supervisor logs it, waits
//! for the cooldown and starts a fresh loop on the same queue. The task that
//! was running when the loop crashed is dropped, which resolves its signal as
//! abandoned.

use super::kind::ResourceKind;
use super::pipeline::Worker;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::any::Any;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Default pause between a crash and the restart.
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(1);

pub(crate) async fn supervise<R: ResourceKind>(
    worker: Worker<R>,
    cooldown: Duration,
    shutdown: watch::Receiver<bool>,
) {
    let mut restarts: u64 = 0;

    loop {
        let run = tokio::spawn({
            let worker = worker.clone();
            let shutdown = shutdown.clone();
            async move { worker.run(shutdown).await }
        });

        match run.await {
            Ok(()) => {
                info!(kind = R::NAME, restarts, "worker stopped");
                return;
            }
            Err(e) if e.is_panic() => {
                restarts += 1;
                let message = panic_message(e.into_panic());
                error!(
                    kind = R::NAME,
                    restarts,
                    error = %message,
                    "worker crashed, restarting after cooldown"
                );
                metrics::worker_restarts().add(1, &[KeyValue::new("kind", R::NAME)]);
            }
            Err(e) => {
                warn!(kind = R::NAME, "worker task cancelled: {e}");
                return;
            }
        }

        if *shutdown.borrow() {
            info!(kind = R::NAME, "shutdown requested, not restarting worker");
            worker.abandon_queued().await;
            return;
        }
        tokio::time::sleep(cooldown).await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }
}
