//! Membership synchronization protocols.
//!
//! The platform gives every account only a private per-device message
//! store, so content the bot sent before a member joined is invisible to
//! that member. `resend_messages` closes the gap by re-broadcasting the
//! bot's own content, and `delete_chat_data` tears down all local state
//! once the bot itself is no longer part of a group.

use tracing::{debug, info, warn};

use crate::platform::{ChatId, Platform, PlatformError};

/// Re-send all of the bot's own content messages in a chat as fresh
/// messages, in original chronological order.
///
/// Info/system messages are never resent. Each send is best-effort: a
/// failure for one message is logged and the remaining messages are still
/// delivered. Repeated invocation re-broadcasts the full set again - a
/// newly joined member must see current content no matter how often the
/// protocol ran before their join.
pub async fn resend_messages(platform: &dyn Platform, chat_id: ChatId) -> anyhow::Result<()> {
    let self_contact = platform.self_contact();

    let messages = match platform.chat_messages(chat_id).await {
        Ok(messages) => messages,
        Err(PlatformError::ChatNotFound(_)) => {
            debug!("chat {} is gone, nothing to resend", chat_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut resent = 0usize;
    for msg in &messages {
        if msg.sender != self_contact || msg.is_info {
            continue;
        }
        match platform
            .send_message(chat_id, &msg.text, msg.file.as_deref())
            .await
        {
            Ok(new_id) => {
                debug!("resent message {} as {} in chat {}", msg.id, new_id, chat_id);
                resent += 1;
            }
            Err(e) => warn!("resend of message {} in chat {} failed: {}", msg.id, chat_id, e),
        }
    }

    info!("resent {} message(s) in chat {}", resent, chat_id);
    Ok(())
}

/// Delete a chat the bot has left, together with the contact records of
/// everyone who was in it.
///
/// The member set is snapshotted before the chat record is deleted, since
/// members can no longer be enumerated afterwards. Contact deletion is
/// best-effort: one failing contact does not block the rest, and does not
/// mark the teardown as failed.
pub async fn delete_chat_data(platform: &dyn Platform, chat_id: ChatId) -> anyhow::Result<()> {
    let self_contact = platform.self_contact();

    let members = match platform.chat_members(chat_id).await {
        Ok(members) => members,
        Err(PlatformError::ChatNotFound(_)) => {
            debug!("chat {} already torn down", chat_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    platform.delete_chat(chat_id).await?;
    info!("deleted chat {}", chat_id);

    for member in members {
        if member == self_contact {
            continue;
        }
        match platform.delete_contact(member).await {
            Ok(()) => debug!("deleted contact {}", member),
            Err(e) => warn!("deleting contact {} failed: {}", member, e),
        }
    }

    Ok(())
}
