use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::outbound::envelope::build_envelope;
use crate::outbound::http_client::{BroadcastRequest, BroadcastSink};
use crate::outbound::queue::MessageQueue;
use crate::outbound::token::{SigningError, TokenIssuer};

/// Errors that abandon a single tick. Logged and swallowed by the loop;
/// never a reason to stop the timer.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to serialize payload: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Running,
    Stopped,
}

/// Outcome of a completed dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Queue items for which a send was started.
    pub attempted: u64,
}

/// Drives the timed consume-and-send loop.
///
/// One recurring timer is the sole clock. Each tick pulls the next payload,
/// wraps it, mints a fresh token, and fires the delivery as an independent
/// spawned task; the timer never waits for a send to complete and in-flight
/// sends from earlier ticks may still be resolving after the queue has
/// advanced. Queue exhaustion (non-cyclic mode) is the only way the loop
/// stops.
pub struct Dispatcher<S> {
    queue: MessageQueue,
    issuer: TokenIssuer,
    sink: Arc<S>,
    channel: String,
    client_id: String,
    period: Duration,
    state: DispatcherState,
    attempted: u64,
}

impl<S: BroadcastSink + Send + Sync + 'static> Dispatcher<S> {
    pub fn new(queue: MessageQueue, issuer: TokenIssuer, sink: Arc<S>, config: &Config) -> Self {
        Self {
            queue,
            issuer,
            sink,
            channel: config.channel.clone(),
            client_id: config.extension.clone(),
            period: Duration::from_millis(config.interval),
            state: DispatcherState::Running,
            attempted: 0,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Run until the queue is exhausted. Cyclic queues with at least one
    /// item never exhaust, so this only returns in non-cyclic mode (or for
    /// an initially empty queue).
    pub async fn run(mut self) -> DispatchSummary {
        info!(
            messages = self.queue.len(),
            interval_ms = self.period.as_millis() as u64,
            cyclic = self.queue.is_cyclic(),
            "starting dispatch loop"
        );

        // First tick fires one full period after start; missed ticks burst
        // rather than being skipped or coalesced.
        let mut ticker = interval_at(Instant::now() + self.period, self.period);

        loop {
            ticker.tick().await;

            let Some(item) = self.queue.take_next() else {
                self.state = DispatcherState::Stopped;
                info!(attempted = self.attempted, "message queue drained, stopping dispatch loop");
                break;
            };

            self.attempted += 1;
            if let Err(e) = self.dispatch(item) {
                error!(error = %e, "failed to prepare broadcast, skipping tick");
            }
        }

        DispatchSummary {
            attempted: self.attempted,
        }
    }

    /// Prepare and fire one send.
    ///
    /// Envelope and token building happen on the tick; the network round trip
    /// is spawned so the tick handler never blocks the timer. The spawned
    /// task owns its own success/failure logging.
    fn dispatch(&self, item: Value) -> Result<(), DispatchError> {
        let envelope = build_envelope(&item)?;
        let body = envelope.to_json()?;
        debug!(payload = %body, "sending payload");

        let token = self.issuer.issue()?;
        let request = BroadcastRequest {
            channel_id: self.channel.clone(),
            token,
            client_id: self.client_id.clone(),
            body,
        };

        let sink = self.sink.clone();
        tokio::spawn(async move {
            match sink.deliver(request).await {
                Ok(receipt) => {
                    info!(status_code = receipt.status, "broadcast response");
                    debug!(headers = ?receipt.headers, "response headers");
                    if !receipt.body.is_empty() {
                        info!(body = %receipt.body, "response body");
                    }
                }
                Err(e) => {
                    error!(error = %e, "broadcast delivery failed");
                }
            }
        });

        Ok(())
    }
}
