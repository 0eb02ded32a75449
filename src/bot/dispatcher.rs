//! Command dispatcher.
//!
//! Turns a parsed command plus its triggering message into at most one
//! outgoing message, then enforces the ephemeral-inbox policy: the
//! triggering message of any other sender is deleted from the local store
//! immediately after handling, command or not.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::bot::HELP_TEXT;
use crate::commands::{self, Command};
use crate::platform::{MessageSnapshot, MsgId, Platform};

/// Command dispatcher, constructed once at startup and passed into the
/// event loop. Holds everything command handling needs beyond the
/// platform itself.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Path of the bundled editor template sent by /editor.
    editor_template: PathBuf,
}

impl Dispatcher {
    pub fn new(editor_template: PathBuf) -> Self {
        Self { editor_template }
    }

    /// Handle one incoming message end to end: dispatch the command, then
    /// clean up. Cleanup runs even when the send failed - a command
    /// message is acted upon at most once and never retried, so it must
    /// not survive to be picked up again.
    pub async fn handle_message(
        &self,
        platform: &dyn Platform,
        msg: &MessageSnapshot,
    ) -> anyhow::Result<()> {
        let outcome = self.dispatch(platform, msg).await;

        if msg.sender != platform.self_contact() {
            match platform.delete_messages(&[msg.id]).await {
                Ok(()) => debug!("deleted message {}", msg.id),
                Err(e) => warn!("deleting message {} failed: {}", msg.id, e),
            }
        }

        // Help and invite replies are transient: they are deleted from the
        // local store right after sending so the resend protocol never
        // re-broadcasts them as group content.
        if let Ok(Some(reply_id)) = &outcome {
            if let Err(e) = platform.delete_messages(&[*reply_id]).await {
                warn!("deleting reply {} failed: {}", reply_id, e);
            }
        }

        outcome.map(|_| ())
    }

    /// Dispatch a message's command into an outgoing action.
    ///
    /// Returns the id of a transient reply (help or invite text) that
    /// should not remain in the local store, or `None` when the outgoing
    /// message is content, or when nothing was sent.
    async fn dispatch(
        &self,
        platform: &dyn Platform,
        msg: &MessageSnapshot,
    ) -> anyhow::Result<Option<MsgId>> {
        let Some(command) = commands::parse(&msg.text, msg.file.as_deref()) else {
            return Ok(None);
        };

        debug!("dispatching {:?} in chat {}", command, msg.chat_id);

        match command {
            Command::Help => {
                let reply = platform.send_message(msg.chat_id, HELP_TEXT, None).await?;
                Ok(Some(reply))
            }
            Command::Invite => {
                let link = platform.invite_link(msg.chat_id).await?;
                let reply = platform.send_message(msg.chat_id, &link, None).await?;
                Ok(Some(reply))
            }
            Command::Pin { text, file } => {
                platform
                    .send_message(msg.chat_id, &text, file.as_deref())
                    .await?;
                info!("pinned message in chat {}", msg.chat_id);
                Ok(None)
            }
            Command::Editor { title } => {
                platform
                    .send_message(msg.chat_id, &title, Some(&self.editor_template))
                    .await?;
                info!("sent editor to chat {}", msg.chat_id);
                Ok(None)
            }
        }
    }
}
