//! HTTP surface for the launch pipeline.

pub mod api;
pub mod metrics;
pub mod state;
