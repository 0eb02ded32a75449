//! Membership lifecycle handler.
//!
//! Reacts to member-list changes: a join triggers the resend protocol so
//! the new member sees current content, and the bot's own removal
//! triggers teardown of the now-unreachable group.

use tracing::debug;

use crate::platform::{ChatId, ContactId, Platform};
use crate::sync;

/// Handle one membership-changed notification.
///
/// Joins are never distinguished from rejoins; resend runs either way.
/// Removal only matters when the removed identity is the bot's own -
/// other members leaving keeps the group active. A notification for a
/// chat that was already torn down is a no-op, not an error.
pub async fn handle_member_change(
    platform: &dyn Platform,
    chat_id: ChatId,
    member: ContactId,
    added: bool,
) -> anyhow::Result<()> {
    debug!(
        "member {} was {} in chat {}",
        member,
        if added { "added" } else { "removed" },
        chat_id
    );

    if added {
        sync::resend_messages(platform, chat_id).await
    } else if member == platform.self_contact() {
        sync::delete_chat_data(platform, chat_id).await
    } else {
        Ok(())
    }
}
