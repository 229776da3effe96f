use crate::error::AgentError;
use crate::types::WatchEvent;
use crate::watch::EventSource;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Producer half of a [`ChannelEventSource`].
///
/// Producers that decode events themselves send `Err` when a change cannot be
/// decoded; the consumer sees it as the result of `next_event`.
pub type EventSender = mpsc::UnboundedSender<Result<WatchEvent, AgentError>>;

/// Events pushed by an in-process producer, ending when every sender is gone.
pub struct ChannelEventSource {
    rx: mpsc::UnboundedReceiver<Result<WatchEvent, AgentError>>,
}

impl ChannelEventSource {
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Result<Option<WatchEvent>, AgentError> {
        self.rx.recv().await.transpose()
    }
}
