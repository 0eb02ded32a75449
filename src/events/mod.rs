//! Event handler system.
//!
//! All platform events funnel through one [`Handler::handle`] match over
//! the event sum type, so the whole state machine is unit-testable
//! without a live platform connection.

pub mod membership;
pub mod raw;

use std::sync::Arc;

use crate::bot::Dispatcher;
use crate::config::Config;
use crate::platform::{Event, Platform};

/// The bot's single event entry point.
pub struct Handler {
    platform: Arc<dyn Platform>,
    dispatcher: Dispatcher,
    config: Config,
}

impl Handler {
    pub fn new(platform: Arc<dyn Platform>, dispatcher: Dispatcher, config: Config) -> Self {
        Self {
            platform,
            dispatcher,
            config,
        }
    }

    /// Handle one event to completion. Events are delivered serially per
    /// account, so side effects within one invocation are ordered.
    pub async fn handle(&self, event: Event) -> anyhow::Result<()> {
        match event {
            Event::NewMessage(msg) => {
                self.dispatcher
                    .handle_message(self.platform.as_ref(), &msg)
                    .await
            }
            Event::MembershipChanged {
                chat_id,
                member,
                added,
            } => {
                membership::handle_member_change(self.platform.as_ref(), chat_id, member, added)
                    .await
            }
            Event::Raw(raw) => {
                raw::handle_raw_event(self.platform.as_ref(), &self.config, raw).await
            }
        }
    }
}
