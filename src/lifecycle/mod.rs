//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM received → trigger() → server stops accepting → watcher exits
//! ```
//!
//! # Design Decisions
//! - One coordinator per server; several servers in one process stop independently

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
