//! Outbound HTTP clients.

pub mod prediction;
pub mod retry;

pub use prediction::{EndpointResponse, PredictionClient, ProbeOutcome};
pub use retry::{Backoff, RetryPolicy};
