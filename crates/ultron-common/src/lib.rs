pub mod error;
pub mod message;
pub mod types;

pub use error::{Error, Result, ToolError};
pub use message::InboundMessage;
pub use types::{ChannelId, UserId};
