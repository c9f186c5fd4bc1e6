//! HTTP front end for packforge runs.

pub mod api;
pub mod metrics;
pub mod state;
