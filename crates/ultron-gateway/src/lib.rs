pub mod cooldown;
pub mod history;
pub mod orchestrator;
pub mod server;

pub use cooldown::CooldownTracker;
pub use history::{ConversationEntry, ConversationStore, EntryRole};
pub use orchestrator::{IgnoreReason, Orchestrator, OrchestratorConfig, Outcome};
pub use server::BotServer;
