//! entity-gateway - request dispatch for entity storage
//!
//! Definitions declare entity, user and custom behaviour; the dispatcher
//! validates, authorizes, normalizes and executes every request against
//! them and publishes version diffs for successful updates.

pub mod cli;
pub mod client;
pub mod core;
pub mod observability;
pub mod standards;
pub mod versioning;
