//! Raw event monitor.
//!
//! A pass-through observer over the unfiltered event stream. Covers the
//! one join path the membership notification does not reliably cover
//! (the secure-join handshake) and applies account configuration once
//! transport connectivity is up.

use tracing::{debug, info, warn};

use crate::bot::HELP_TEXT;
use crate::config::Config;
use crate::platform::{Platform, RawEvent};
use crate::sync;

/// Progress value signalling a completed secure-join handshake.
const SECUREJOIN_COMPLETE: u32 = 1000;

/// Handle one raw platform event.
///
/// A completed secure-join triggers a resend for the joined chat; the
/// membership handler may fire for the same join as well, which is safe
/// since resend tolerates repetition. The connected event re-applies the
/// account's status text and retention setting on every reconnect,
/// last-write-wins.
pub async fn handle_raw_event(
    platform: &dyn Platform,
    config: &Config,
    event: RawEvent,
) -> anyhow::Result<()> {
    match event {
        RawEvent::SecureJoinInviterProgress { chat_id, progress } => {
            if progress >= SECUREJOIN_COMPLETE {
                info!("secure-join complete for chat {}", chat_id);
                sync::resend_messages(platform, chat_id).await?;
            }
            Ok(())
        }
        RawEvent::Connected => {
            platform.set_config("selfstatus", HELP_TEXT).await?;
            platform
                .set_config("delete_device_after", &config.delete_device_after)
                .await?;
            match platform.self_invite_link().await {
                Ok(link) => info!("the bot can be reached via this invite link: {}", link),
                Err(e) => warn!("fetching own invite link failed: {}", e),
            }
            Ok(())
        }
        RawEvent::Other { kind } => {
            debug!("ignoring raw event {}", kind);
            Ok(())
        }
    }
}
