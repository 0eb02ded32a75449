//! Bot runtime - the blocking event loop.

use std::sync::Arc;

use tracing::{error, info};

use crate::events::Handler;
use crate::platform::Platform;

/// Consume the platform's event stream until it ends.
///
/// One event at a time: each handler runs to completion before the next
/// event is taken, which keeps mutation of the local chat/contact/message
/// store single-writer without any locking. Handler errors are logged and
/// never abort the loop.
pub async fn run(platform: Arc<dyn Platform>, handler: Handler) {
    info!("entering event loop");

    while let Some(event) = platform.next_event().await {
        if let Err(e) = handler.handle(event).await {
            error!("event handler failed: {:#}", e);
        }
    }

    info!("event stream ended, shutting down");
}
