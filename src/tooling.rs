//! Tooling & Integration Layer
//!
//! Command-line entry points that wire configuration, hardware, registry and
//! event transports into a [`ReconciliationLoop`](crate::reconcile::ReconciliationLoop).

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
