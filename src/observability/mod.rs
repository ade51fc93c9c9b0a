//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → tracing.rs (run span with correlation ID)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (tx hash, nonce, address)
//! - Run ID flows through all subsystems via the span
//! - Secrets are never recorded

pub mod logging;
pub mod tracing;

pub use logging::init_logging;
pub use self::tracing::{new_run_id, run_span};
