pub mod slack;

use anyhow::Result;
use async_trait::async_trait;

/// A channel visible to the bot, captured once at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

/// A member of the workspace, captured once at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

/// A chat message received from the platform.
///
/// Fields the wire event may omit stay optional; the orchestrator decides
/// what qualifies for a reply.
#[derive(Debug, Clone, Default)]
pub struct MessageEvent {
    /// Channel id (Slack: `C...` for channels, `D...` for DMs).
    pub channel: Option<String>,
    /// Sender user id.
    pub user: Option<String>,
    pub text: Option<String>,
}

/// Events a messaging session delivers to the orchestrator.
#[derive(Debug)]
pub enum SessionEvent {
    /// The connection is up and the workspace snapshot has been loaded.
    /// Emitted exactly once per session, before any `Message`.
    Started {
        channels: Vec<ChannelInfo>,
        users: Vec<UserInfo>,
    },
    /// One inbound chat message.
    Message(MessageEvent),
}

/// The one send operation a session exposes. Posts as the bot identity.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, channel_name: &str, text: &str) -> Result<()>;
}
