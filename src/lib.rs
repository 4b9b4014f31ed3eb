//! Funding reconciler library.
//!
//! Drives funding requests from `open` through `pending` and `fundprocessed`
//! to `processed`, creating accounts and transferring funds on the Bazo chain.

// Outer systems
pub mod blockchain;
pub mod requests;

// Core
pub mod config;
pub mod reconciler;

// Operations
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ReconcilerConfig;
pub use lifecycle::Shutdown;
pub use reconciler::{Reconciler, ReconcilerHandle};
