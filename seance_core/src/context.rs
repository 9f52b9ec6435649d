use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// Every part of the running agent shares this one token: alive until
// shutdown begins, cancelled forever after
static TOKEN: OnceLock<CancellationToken> = OnceLock::new();

// Whether the signal relay has been installed for this process
static RELAYING: AtomicBool = AtomicBool::new(false);

/// Facade over the global shutdown state of the running agent.
///
/// Every long-running loop in the fabric (the bus ingresses, the asker's
/// reply printer, the terminal prompt loops) holds a
/// [`terminated`](AgentContext::terminated) branch in its `select!` and winds
/// down once the context flips. The context flips at most once, either
/// [explicitly](AgentContext::terminate) or through the signal relay
/// installed by [`auto_terminate`](AgentContext::auto_terminate).
pub struct AgentContext;

impl AgentContext {
    fn token() -> &'static CancellationToken {
        TOKEN.get_or_init(CancellationToken::new)
    }

    /// Completes once the agent has begun shutting down.
    ///
    /// Safe to await from any number of tasks, including after the context
    /// has already flipped, in which case it completes immediately.
    pub async fn terminated() {
        Self::token().cancelled().await;
    }

    /// Flips the context into the shutting-down state, unblocking every task
    /// that [waits](AgentContext::terminated) on it. Idempotent beyond the
    /// `tracing` event.
    pub fn terminate() {
        info!("Terminating agent context");

        Self::token().cancel();
    }

    /// Reports whether shutdown has begun, as a point-in-time check. To wait
    /// for shutdown, use [`terminated`](AgentContext::terminated) instead.
    pub fn is_terminated() -> bool {
        Self::token().is_cancelled()
    }

    /// Reports whether the agent is still running normally.
    pub fn is_alive() -> bool {
        !Self::token().is_cancelled()
    }

    /// Installs the process-wide signal relay: the first `SIGINT`/`SIGTERM`
    /// (or `ctrl_c` off Unix) terminates this context instead of killing the
    /// process, giving the agent its drain-and-disconnect window; the next
    /// one exits with a non-zero status, for the operator who is done
    /// waiting.
    ///
    /// Installing the relay is irreversible, and only the first call has any
    /// effect. The returned future completes once the relay is listening.
    pub async fn auto_terminate() {
        if RELAYING.swap(true, Ordering::Relaxed) {
            return;
        }

        tokio::spawn(Self::relay_signals());

        // Give the relay task a chance to install its listeners before the
        // caller proceeds to the main agent logic
        tokio::task::yield_now().await;
    }

    /// Turns the first shutdown signal into a context termination, and the
    /// second into a forced exit.
    async fn relay_signals() -> ! {
        let mut signals = ShutdownSignals::install();

        signals.next().await;
        info!("Shutdown signal received; draining before exit");
        Self::token().cancel();

        signals.next().await;
        warn!("Repeated shutdown signal received; exiting immediately");
        std::process::exit(1);
    }
}

/// The OS shutdown signals an agent listens for.
#[cfg(unix)]
struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        Self {
            sigint: signal(SignalKind::interrupt()).expect("failed to install SIGINT handler"),
            sigterm: signal(SignalKind::terminate()).expect("failed to install SIGTERM handler"),
        }
    }

    /// Completes on the next signal of either kind.
    async fn next(&mut self) {
        tokio::select! {
            biased;
            _ = self.sigint.recv() => {}
            _ = self.sigterm.recv() => {}
        }
    }
}

/// Off Unix, only the `ctrl_c` action is available.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Self {
        Self
    }

    async fn next(&mut self) {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl_c");
    }
}
