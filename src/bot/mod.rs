//! Core bot functionality: command dispatch and the event run loop.

pub mod dispatcher;
pub mod runtime;

pub use dispatcher::Dispatcher;

/// Fixed help text, also used as the account's public status line.
pub const HELP_TEXT: &str = "I am a bot that manages editors in groups.\n\n\
To create a new shared editor for the group, you can write:\n\n\
/editor Shopping List for Friday's Example Party\n\n\
I will send an editor to the group, which anyone can edit; \
and if new members are added, they will see it, too.";
