//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC request:
//!     → timeouts.rs (per-request deadline)
//!
//! Receipt wait:
//!     → timeouts.rs (overall deadline)
//!     → backoff.rs (growing delay between polls)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only reads are repeated (receipt polls); submissions happen exactly once

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, PollBackoff};
pub use timeouts::{with_timeout, Deadline, Elapsed};
