// Outbound broadcast module
//
// Leaf components (no dependency on each other):
//   envelope, queue, token
//
// Loop components:
//   http_client – the BroadcastSink seam and its reqwest implementation
//   dispatcher  – timer-driven loop pulling from the queue into the sink

pub mod dispatcher;
pub mod envelope;
pub mod http_client;
pub mod queue;
pub mod token;

// Re-export commonly used types
pub use dispatcher::{DispatchError, DispatchSummary, Dispatcher, DispatcherState};
pub use envelope::{Envelope, build_envelope};
pub use http_client::{
    BroadcastHttpClient, BroadcastRequest, BroadcastSink, DeliveryError, DeliveryReceipt,
};
pub use queue::MessageQueue;
pub use token::{Claims, PubsubPerms, SigningError, TokenIssuer};
