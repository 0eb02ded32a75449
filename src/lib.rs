//! Padbot - a group editor bot.
//!
//! Keeps a shared webxdc editor visible to every member of a group, on a
//! messaging platform where each account only has a private per-device
//! message store: members who join after a message was sent never receive
//! it retroactively. The bot therefore re-sends its own content whenever
//! the member list grows, and tears down all local state for a group once
//! it has been removed from it.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `platform` - Account/chat/message primitives behind a trait, with an
//!   in-memory backend and a `deltachat-rpc-server` backend
//! - `commands` - Command grammar (`/help`, `/invite`, `/pin`, `/editor`)
//! - `bot` - Command dispatcher and the event run loop
//! - `events` - Handlers for message, membership, and raw platform events
//! - `sync` - Resend and teardown protocols

pub mod bot;
pub mod commands;
pub mod config;
pub mod events;
pub mod platform;
pub mod sync;
