//! Watch-event transports.
//!
//! The reconciliation loop only ever sees structured [`WatchEvent`] values
//! handed over by an [`EventSource`]. Decoding transport details (process
//! environment, channels, backend subscribers) stays in these adapters.

mod channel;
mod env;

pub use channel::{ChannelEventSource, EventSender};
pub use env::EnvEventSource;

use crate::error::AgentError;
use crate::types::WatchEvent;
use async_trait::async_trait;

#[async_trait]
pub trait EventSource: Send {
    /// Next event in registry order, or `None` once the stream has ended.
    async fn next_event(&mut self) -> Result<Option<WatchEvent>, AgentError>;
}
