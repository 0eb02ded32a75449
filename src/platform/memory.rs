//! In-memory platform backend.
//!
//! A self-contained stand-in for the real platform: chats, contacts and
//! message histories live in a single lock-guarded state, and events are
//! fed through an in-process queue. The integration tests drive the bot
//! entirely through this backend.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::{
    ChatId, ContactId, Event, MessageSnapshot, MsgId, Platform, PlatformError, Result,
};

#[derive(Debug, Default)]
struct ChatRecord {
    members: Vec<ContactId>,
    messages: Vec<MessageSnapshot>,
}

#[derive(Debug, Default)]
struct State {
    chats: BTreeMap<ChatId, ChatRecord>,
    contacts: BTreeSet<ContactId>,
    config: BTreeMap<String, String>,
    next_chat_id: u64,
    next_contact_id: u64,
    next_msg_id: u64,
    /// When set, sends whose text contains this marker fail.
    send_failure_marker: Option<String>,
    /// Every successful outgoing send, kept even after local deletion.
    sent_log: Vec<MessageSnapshot>,
}

/// In-memory [`Platform`] implementation.
pub struct MemoryPlatform {
    self_contact: ContactId,
    state: Mutex<State>,
    events_tx: Mutex<Option<UnboundedSender<Event>>>,
    events_rx: tokio::sync::Mutex<UnboundedReceiver<Event>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        let mut state = State {
            next_chat_id: 1,
            next_contact_id: 2,
            next_msg_id: 1,
            ..State::default()
        };
        let self_contact = ContactId(1);
        state.contacts.insert(self_contact);
        Self {
            self_contact,
            state: Mutex::new(state),
            events_tx: Mutex::new(Some(tx)),
            events_rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Register a new contact.
    pub fn add_contact(&self) -> ContactId {
        let mut state = self.state.lock();
        let id = ContactId(state.next_contact_id);
        state.next_contact_id += 1;
        state.contacts.insert(id);
        id
    }

    /// Create a chat with the given members (the bot itself included, if
    /// it is meant to be part of the group).
    pub fn add_chat(&self, members: &[ContactId]) -> ChatId {
        let mut state = self.state.lock();
        let id = ChatId(state.next_chat_id);
        state.next_chat_id += 1;
        state.chats.insert(
            id,
            ChatRecord {
                members: members.to_vec(),
                messages: Vec::new(),
            },
        );
        id
    }

    /// Append an incoming message to a chat's history and return its
    /// snapshot, as if another participant had sent it.
    pub fn receive_message(
        &self,
        chat_id: ChatId,
        sender: ContactId,
        text: &str,
        file: Option<&Path>,
        is_info: bool,
    ) -> MessageSnapshot {
        let mut state = self.state.lock();
        let id = MsgId(state.next_msg_id);
        state.next_msg_id += 1;
        let snapshot = MessageSnapshot {
            id,
            chat_id,
            sender,
            text: text.to_string(),
            file: file.map(Path::to_path_buf),
            is_info,
        };
        if let Some(chat) = state.chats.get_mut(&chat_id) {
            chat.messages.push(snapshot.clone());
        }
        snapshot
    }

    /// Queue an event for delivery through `next_event`.
    pub fn push_event(&self, event: Event) {
        if let Some(tx) = self.events_tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// End the event stream.
    pub fn close_events(&self) {
        self.events_tx.lock().take();
    }

    /// Make sends whose text contains `marker` fail.
    pub fn fail_sends_containing(&self, marker: &str) {
        self.state.lock().send_failure_marker = Some(marker.to_string());
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.state.lock().chats.keys().copied().collect()
    }

    pub fn contact_ids(&self) -> Vec<ContactId> {
        self.state.lock().contacts.iter().copied().collect()
    }

    pub fn config_value(&self, key: &str) -> Option<String> {
        self.state.lock().config.get(key).cloned()
    }

    /// All outgoing sends in order, unaffected by later local deletion.
    pub fn sent_log(&self) -> Vec<MessageSnapshot> {
        self.state.lock().sent_log.clone()
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    fn self_contact(&self) -> ContactId {
        self.self_contact
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn invite_link(&self, chat_id: ChatId) -> Result<String> {
        let state = self.state.lock();
        if !state.chats.contains_key(&chat_id) {
            return Err(PlatformError::ChatNotFound(chat_id));
        }
        Ok(format!("https://i.delta.chat/#chat-{}", chat_id))
    }

    async fn self_invite_link(&self) -> Result<String> {
        Ok("https://i.delta.chat/#self".to_string())
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        file: Option<&Path>,
    ) -> Result<MsgId> {
        let mut state = self.state.lock();
        if let Some(marker) = &state.send_failure_marker {
            if text.contains(marker.as_str()) {
                return Err(PlatformError::SendFailed {
                    chat_id,
                    reason: "injected failure".to_string(),
                });
            }
        }
        if !state.chats.contains_key(&chat_id) {
            return Err(PlatformError::ChatNotFound(chat_id));
        }
        let id = MsgId(state.next_msg_id);
        state.next_msg_id += 1;
        let snapshot = MessageSnapshot {
            id,
            chat_id,
            sender: self.self_contact,
            text: text.to_string(),
            file: file.map(Path::to_path_buf),
            is_info: false,
        };
        state
            .chats
            .get_mut(&chat_id)
            .expect("chat checked above")
            .messages
            .push(snapshot.clone());
        state.sent_log.push(snapshot);
        Ok(id)
    }

    async fn chat_messages(&self, chat_id: ChatId) -> Result<Vec<MessageSnapshot>> {
        let state = self.state.lock();
        state
            .chats
            .get(&chat_id)
            .map(|chat| chat.messages.clone())
            .ok_or(PlatformError::ChatNotFound(chat_id))
    }

    async fn chat_members(&self, chat_id: ChatId) -> Result<Vec<ContactId>> {
        let state = self.state.lock();
        state
            .chats
            .get(&chat_id)
            .map(|chat| chat.members.clone())
            .ok_or(PlatformError::ChatNotFound(chat_id))
    }

    async fn delete_messages(&self, msg_ids: &[MsgId]) -> Result<()> {
        let mut state = self.state.lock();
        for chat in state.chats.values_mut() {
            chat.messages.retain(|m| !msg_ids.contains(&m.id));
        }
        Ok(())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<()> {
        let mut state = self.state.lock();
        state
            .chats
            .remove(&chat_id)
            .map(|_| ())
            .ok_or(PlatformError::ChatNotFound(chat_id))
    }

    async fn delete_contact(&self, contact_id: ContactId) -> Result<()> {
        let mut state = self.state.lock();
        if state.contacts.remove(&contact_id) {
            Ok(())
        } else {
            Err(PlatformError::ContactNotFound(contact_id))
        }
    }

    async fn next_event(&self) -> Option<Event> {
        self.events_rx.lock().await.recv().await
    }
}
