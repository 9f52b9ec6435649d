use self::registry::SpindownRegistry;
use crate::SpindownToken;
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

mod registry;
pub mod token;

// Global singleton spindown registry
static GLOBAL: OnceLock<SpindownRegistry> = OnceLock::new();

// Spindown timeout (stored statically to allow customizing)
const DEFAULT_TIMEOUT_SECS: u64 = 2;
static TIMEOUT_SECS: Mutex<u64> = Mutex::new(DEFAULT_TIMEOUT_SECS);

/// Facade over the agent's global spindown registry.
///
/// Background tasks that hold resources (bus connections, store clients)
/// [register](AgentSpindown::register) themselves and receive a
/// [`SpindownToken`]. When the agent shuts down, the main task
/// [waits](AgentSpindown::completed), within a timeout, for every registered
/// workload to punch out its token, which gives those tasks a window to close
/// their resources cleanly instead of being killed mid-write.
pub struct AgentSpindown;

impl AgentSpindown {
    /// Registers a workload under the given human-readable name (names need
    /// not be unique) and returns the token it must
    /// [punch out](SpindownToken::punch_out) upon graceful completion.
    ///
    /// Dropping the token punches it out as well.
    pub fn register(name: impl AsRef<str>) -> SpindownToken {
        Self::global_registry().register(name.as_ref())
    }

    /// Customizes the spindown timeout of the global registry. Must be called
    /// before the first interaction with the registry; later calls have no
    /// effect.
    pub fn set_timeout_secs(timeout_secs: impl Into<u64>) {
        *TIMEOUT_SECS.lock() = timeout_secs.into();
    }

    /// Waits, within the configured timeout, for every previously
    /// [registered](AgentSpindown::register) workload to signal completion.
    ///
    /// Workloads that register while earlier ones are being awaited are picked
    /// up in follow-up cycles under the same shared timeout. Does **not**
    /// signal the workloads to begin shutting down; that is the job of
    /// [`AgentContext`](crate::AgentContext).
    pub async fn completed() {
        let _ = Self::global_registry().spun_down().await;
    }

    /// Retrieves the global (singleton) [`SpindownRegistry`], lazily
    /// initialized.
    fn global_registry() -> &'static SpindownRegistry {
        GLOBAL.get_or_init(|| SpindownRegistry::new(Duration::from_secs(*TIMEOUT_SECS.lock())))
    }
}
