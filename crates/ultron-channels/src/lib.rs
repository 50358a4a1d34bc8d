pub mod traits;

#[cfg(feature = "discord")]
pub mod discord;

pub use traits::{ChannelEvent, ChannelLifecycle, ChannelSender, ChannelStatus};

#[cfg(feature = "discord")]
pub use discord::{DiscordChannel, DiscordConfig};
