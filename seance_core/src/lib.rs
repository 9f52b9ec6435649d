#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

//! Process-wide lifecycle facades shared by every seance agent: the global
//! cancellation context and the spindown registry that lets background
//! workloads finish their cleanup before the process exits.

/// Exposes the global application context.
mod context;
pub use self::context::AgentContext;

/// Exposes the global spindown registry.
mod spindown;
pub use self::spindown::token::SpindownToken;
pub use self::spindown::AgentSpindown;
