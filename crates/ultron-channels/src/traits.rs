use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use ultron_common::{ChannelId, InboundMessage, Result};

/// Lifecycle management for a messaging channel (connect, disconnect, status).
#[async_trait]
pub trait ChannelLifecycle: Send {
    /// Start the channel, connecting to the external service.
    ///
    /// Returns once the connection task is running; connection progress and
    /// failures are reported as [`ChannelEvent::StatusChanged`].
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the external service.
    async fn disconnect(&mut self) -> Result<()>;

    /// Current connection status.
    fn status(&self) -> ChannelStatus;

    /// Receive inbound messages and status changes.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Create a send-only handle. Only available after [`connect`](Self::connect).
    fn create_sender(&self) -> Result<Arc<dyn ChannelSender>>;
}

/// Send-only interface for delivering output to a channel.
///
/// Shared via `Arc` by every per-message task.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Show the "bot is typing" indicator in `channel_id`.
    async fn send_typing(&self, channel_id: &ChannelId) -> Result<()>;

    /// Reply to `message` in its channel.
    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

#[derive(Debug, Clone)]
pub enum ChannelEvent {
    MessageReceived(InboundMessage),
    StatusChanged(ChannelStatus),
}
