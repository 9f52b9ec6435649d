use crate::SpindownToken;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Thread-safe growable storage of registered workloads, with the ability to
/// wait for all of them to signal completion within a shared deadline.
pub(crate) struct SpindownRegistry {
    workloads: Mutex<Vec<Workload>>,
    timeout: Duration,
}

/// A registered workload: a human-readable name plus the token that its owner
/// punches out upon graceful completion.
struct Workload {
    name: String,
    token: CancellationToken,
}

/// Marker for a spindown that did not complete within the timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub(crate) struct SpindownTimeout {
    pub(crate) spun_down: usize,
    pub(crate) timed_out: usize,
}

impl SpindownRegistry {
    /// Internal constructor.
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            workloads: Mutex::new(Vec::new()),
            timeout,
        }
    }

    /// Adds a workload under the given name and returns the corresponding
    /// [`SpindownToken`].
    pub(crate) fn register(&self, name: &str) -> SpindownToken {
        let token = CancellationToken::new();

        self.workloads.lock().push(Workload {
            name: name.to_string(),
            token: token.clone(),
        });

        SpindownToken::new(token)
    }
}

impl SpindownRegistry {
    /// Waits until all previously registered workloads have signaled
    /// completion, under a single shared deadline.
    ///
    /// Workloads registered while earlier ones are being awaited are drained
    /// in follow-up cycles. Returns the count of workloads that completed, or
    /// [`SpindownTimeout`] if the deadline ran out first.
    pub(crate) async fn spun_down(&self) -> Result<usize, SpindownTimeout> {
        // Announce
        info!("Spindown initiated");

        // One deadline is shared by all cycles
        let deadline = Instant::now() + self.timeout;
        let mut completed = 0usize;

        loop {
            // Take the currently registered workloads, leaving an empty vector behind
            let workloads = std::mem::take(&mut *self.workloads.lock());

            // Claim success once no more workloads are found
            if workloads.is_empty() {
                info!(completed, "Spindown completed");
                return Ok(completed);
            }

            info!(
                "Waiting for {} registered workload(s) to complete",
                workloads.len(),
            );

            // Await each workload in turn; the shared deadline caps the total wait
            for (index, workload) in workloads.iter().enumerate() {
                let waited =
                    tokio::time::timeout_at(deadline, workload.token.cancelled()).await;

                if waited.is_err() {
                    // Deadline ran out: report this and every remaining workload
                    for straggler in &workloads[index..] {
                        error!(
                            workload = straggler.name.as_str(),
                            "Did not complete in time during spindown",
                        );
                    }

                    return Err(SpindownTimeout {
                        spun_down: completed,
                        timed_out: workloads.len() - index,
                    });
                }

                info!(workload = workload.name.as_str(), "Completed gracefully");
                completed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper to create a registry with a custom timeout.
    fn make_registry(timeout: Duration) -> SpindownRegistry {
        SpindownRegistry::new(timeout)
    }

    #[tokio::test]
    async fn no_workloads() {
        // Given
        let registry = make_registry(Duration::from_secs(5));
        let start = Instant::now();

        // When
        let count = registry.spun_down().await.unwrap();
        let elapsed = start.elapsed();

        // Then
        assert_eq!(count, 0);
        assert!(
            elapsed < Duration::from_millis(50),
            "spun_down() should return immediately when no workloads are registered",
        );
    }

    #[tokio::test]
    async fn all_workloads_complete() {
        // Given
        let registry = make_registry(Duration::from_secs(5));
        let token_a = registry.register("workload_a");
        let token_b = registry.register("workload_b");

        // When
        token_a.punch_out();
        token_b.punch_out();

        let count = registry.spun_down().await.unwrap();

        // Then
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn timeout() {
        // Given
        let registry = make_registry(Duration::from_millis(100));
        let _token = registry.register("workload_stuck");

        // When
        let start = Instant::now();
        let error = registry.spun_down().await.unwrap_err();
        let elapsed = start.elapsed();

        // Then
        assert_eq!(
            error,
            SpindownTimeout {
                spun_down: 0,
                timed_out: 1,
            },
        );
        assert!(
            elapsed >= Duration::from_millis(100),
            "spun_down() should wait until the deadline when a workload never completes",
        );
    }

    #[tokio::test]
    async fn token_drop_counts_as_punch_out() {
        // Given
        let registry = make_registry(Duration::from_secs(5));
        {
            let _token = registry.register("dropped_workload");
            // _token goes out of scope here, invoking its Drop impl
        }

        // When
        let count = registry.spun_down().await.unwrap();

        // Then
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn late_registration_is_drained_in_follow_up_cycle() {
        // Given
        let registry = make_registry(Duration::from_secs(5));
        let token_a = registry.register("workload_a");
        token_a.punch_out();

        // When: a second workload registers after the first already completed
        let token_b = registry.register("workload_b");
        token_b.punch_out();
        let count = registry.spun_down().await.unwrap();

        // Then
        assert_eq!(count, 2);
    }
}
