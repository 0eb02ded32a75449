//! Platform primitives.
//!
//! Everything the bot needs from the messaging platform, behind one trait:
//! account configuration, chat/contact/message access, and the event
//! stream. Two backends exist: [`memory::MemoryPlatform`] for tests and
//! local development, and [`rpc::RpcPlatform`] speaking JSON-RPC to a
//! `deltachat-rpc-server` process.

pub mod memory;
pub mod rpc;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Identifier of a chat (group) on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub u64);

/// Identifier of a contact within the account's address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

/// Identifier of a message in the account's local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgId(pub u64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable view of a message in the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub id: MsgId,
    pub chat_id: ChatId,
    pub sender: ContactId,
    pub text: String,
    /// Path of the attached file, if any.
    pub file: Option<PathBuf>,
    /// System/info messages (member-added notices etc.) are never content.
    pub is_info: bool,
}

/// Unfiltered platform events the raw monitor cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Progress of the invite handshake for a joiner, 0..=1000.
    SecureJoinInviterProgress { chat_id: ChatId, progress: u32 },
    /// Transport connectivity established. Recurs on reconnect.
    Connected,
    /// Anything else; carried for debug logging only.
    Other { kind: String },
}

/// The three event categories delivered to the bot, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewMessage(MessageSnapshot),
    MembershipChanged {
        chat_id: ChatId,
        member: ContactId,
        added: bool,
    },
    Raw(RawEvent),
}

/// Errors surfaced by platform calls.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The chat no longer exists locally. Benign for handlers that may
    /// run after a teardown already removed the chat.
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),

    #[error("contact {0} not found")]
    ContactNotFound(ContactId),

    #[error("send to chat {chat_id} failed: {reason}")]
    SendFailed { chat_id: ChatId, reason: String },

    #[error("rpc transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// The platform surface consumed by the bot.
///
/// One logical event consumer per account: `next_event` is polled by a
/// single loop and every handler runs to completion before the next event
/// is taken, so implementations need no per-call ordering guarantees
/// beyond completing or failing each call outright.
#[async_trait]
pub trait Platform: Send + Sync {
    /// The bot's own contact id on this account.
    fn self_contact(&self) -> ContactId;

    /// Write a persisted account configuration value.
    async fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Invite link (QR payload) admitting a new member to the chat.
    async fn invite_link(&self, chat_id: ChatId) -> Result<String>;

    /// Invite link for contacting the account itself.
    async fn self_invite_link(&self) -> Result<String>;

    /// Send a fresh message to a chat.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        file: Option<&Path>,
    ) -> Result<MsgId>;

    /// All messages of a chat in chronological order.
    async fn chat_messages(&self, chat_id: ChatId) -> Result<Vec<MessageSnapshot>>;

    /// Current member list of a chat.
    async fn chat_members(&self, chat_id: ChatId) -> Result<Vec<ContactId>>;

    /// Delete messages from the local store. Local-only; other
    /// participants keep their copies.
    async fn delete_messages(&self, msg_ids: &[MsgId]) -> Result<()>;

    /// Delete a chat record from the local store.
    async fn delete_chat(&self, chat_id: ChatId) -> Result<()>;

    /// Delete a contact record from the local store.
    async fn delete_contact(&self, contact_id: ContactId) -> Result<()>;

    /// Next event from the platform, or `None` once the stream has ended.
    async fn next_event(&self) -> Option<Event>;
}
