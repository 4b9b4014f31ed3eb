//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Idempotent call to request service or chain node:
//!     → reqwest client timeout (every external call has a deadline)
//!     → On transient failure: retries.rs (retry with backoff.rs delay)
//!     → Still failing: error surfaces to the loop, retried next cycle
//! ```

pub mod backoff;
pub mod retries;

pub use retries::{retry_idempotent, Transient};
