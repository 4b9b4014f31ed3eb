//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciler loops, gateway and chain client produce:
//!     → logging.rs (structured log events, one span per cycle)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
