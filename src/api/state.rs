//! Shared state handed to every API handler.

use std::sync::Arc;
use std::time::Duration;

use crate::client::PredictionClient;
use crate::storage::SubmissionStore;
use crate::worker::QueueScheduler;

pub struct ApiState {
    pub store: Arc<dyn SubmissionStore>,
    pub scheduler: Arc<QueueScheduler>,
    pub client: PredictionClient,
    /// Timeout of the reachability probe made on submission
    pub probe_timeout: Duration,
    /// Probe endpoints before queueing them
    pub probe_on_submit: bool,
}

impl ApiState {
    pub fn new(
        scheduler: Arc<QueueScheduler>,
        client: PredictionClient,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store: Arc::clone(scheduler.store()),
            scheduler,
            client,
            probe_timeout,
            probe_on_submit: true,
        }
    }

    pub fn without_probe(mut self) -> Self {
        self.probe_on_submit = false;
        self
    }
}
