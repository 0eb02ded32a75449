//! JSON-RPC platform backend.
//!
//! Talks to a spawned `deltachat-rpc-server` process over stdio, one
//! JSON-RPC 2.0 request per line. Raw platform events are pulled with
//! `get_next_event` and translated into the [`Event`] sum type here, so
//! the handlers never see wire-level JSON.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{
    ChatId, ContactId, Event, MessageSnapshot, MsgId, Platform, PlatformError, RawEvent, Result,
};
use crate::config::{BOT_DISPLAY_NAME, Config};

/// The platform reserves contact id 1 for the account itself.
const SELF_CONTACT: ContactId = ContactId(1);

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>>>;

/// JSON-RPC 2.0 client over a child process's stdio.
struct RpcClient {
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: Pending,
    next_id: AtomicU64,
    _child: Child,
}

impl RpcClient {
    fn spawn(bin: &str, accounts_dir: &Path) -> anyhow::Result<Self> {
        let mut child = Command::new(bin)
            .env("DC_ACCOUNTS_PATH", accounts_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().expect("stdin piped");
        let stdout = child.stdout.take().expect("stdout piped");

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(value) = serde_json::from_str::<Value>(&line) else {
                    warn!("unparseable rpc line: {}", line);
                    continue;
                };
                let Some(id) = value.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                let outcome = if let Some(err) = value.get("error") {
                    Err(err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown rpc error")
                        .to_string())
                } else {
                    Ok(value.get("result").cloned().unwrap_or(Value::Null))
                };
                if let Some(tx) = reader_pending.lock().remove(&id) {
                    let _ = tx.send(outcome);
                }
            }
            debug!("rpc server stdout closed");
        });

        Ok(Self {
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            _child: child,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        let mut line = serde_json::to_string(&request)
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        line.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;
            stdin
                .flush()
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;
        }

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(PlatformError::Transport(message)),
            Err(_) => Err(PlatformError::Transport("rpc server closed".to_string())),
        }
    }
}

/// [`Platform`] implementation backed by `deltachat-rpc-server`.
pub struct RpcPlatform {
    client: RpcClient,
    account_id: u64,
}

impl RpcPlatform {
    /// Spawn the RPC server, pick or create the bot account, configure
    /// it if needed, and start its network I/O.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.accounts_dir)?;
        let client = RpcClient::spawn(&config.rpc_server_bin, &config.accounts_dir)?;

        let accounts = client.call("get_all_account_ids", json!([])).await?;
        let account_id = match accounts.as_array().and_then(|a| a.first()).and_then(Value::as_u64) {
            Some(id) => id,
            None => client
                .call("add_account", json!([]))
                .await?
                .as_u64()
                .ok_or_else(|| PlatformError::Transport("add_account returned no id".into()))?,
        };

        let platform = Self { client, account_id };

        let configured = platform
            .client
            .call("is_configured", json!([account_id]))
            .await?
            .as_bool()
            .unwrap_or(false);

        if !configured {
            let (Some(addr), Some(mail_pw)) = (&config.addr, &config.mail_pw) else {
                anyhow::bail!("account is not configured and ADDR/MAIL_PW are not set");
            };
            info!("configuring account {} as {}", account_id, addr);
            platform
                .client
                .call(
                    "batch_set_config",
                    json!([account_id, { "addr": addr, "mail_pw": mail_pw }]),
                )
                .await?;
            platform.client.call("configure", json!([account_id])).await?;
        }

        // Advertise a display name once; leave any operator-chosen name alone.
        let name = platform
            .client
            .call("get_config", json!([account_id, "displayname"]))
            .await?;
        if name.as_str().map(str::is_empty).unwrap_or(true) {
            platform.set_config("displayname", BOT_DISPLAY_NAME).await?;
        }

        platform.client.call("start_io", json!([account_id])).await?;
        info!("account {} online", account_id);
        Ok(platform)
    }

    fn snapshot_from(&self, msg: &Value) -> Option<MessageSnapshot> {
        Some(MessageSnapshot {
            id: MsgId(msg.get("id")?.as_u64()?),
            chat_id: ChatId(msg.get("chatId")?.as_u64()?),
            sender: ContactId(msg.get("fromId")?.as_u64()?),
            text: msg
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            file: msg.get("file").and_then(Value::as_str).map(Into::into),
            is_info: msg.get("isInfo").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    async fn get_message(&self, msg_id: u64) -> Result<Value> {
        self.client
            .call("get_message", json!([self.account_id, msg_id]))
            .await
    }

    /// Whether the account is still listed as a member of the chat.
    async fn self_in_group(&self, chat_id: ChatId) -> Result<bool> {
        let chat = self
            .client
            .call("get_full_chat_by_id", json!([self.account_id, chat_id.0]))
            .await?;
        Ok(chat
            .get("selfInGroup")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Translate one raw wire event, or `None` when it carries nothing
    /// the bot reacts to and nothing worth logging as unknown.
    async fn translate(&self, kind: &str, event: &Value) -> Option<Event> {
        match kind {
            "IncomingMsg" => {
                let msg_id = event.get("msgId")?.as_u64()?;
                let msg = match self.get_message(msg_id).await {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("fetching message {} failed: {}", msg_id, e);
                        return None;
                    }
                };
                let snapshot = self.snapshot_from(&msg)?;
                let system_type = msg
                    .get("systemMessageType")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown");
                match system_type {
                    // The member-added notice does not name the added
                    // contact; the handlers only need the chat anyway.
                    "MemberAddedToGroup" => Some(Event::MembershipChanged {
                        chat_id: snapshot.chat_id,
                        member: snapshot.sender,
                        added: true,
                    }),
                    // The removal notice does not name the removed
                    // contact either, so re-check whether the account is
                    // still in the member list and report a self-removal
                    // only when it is not.
                    "MemberRemovedFromGroup" => {
                        let still_member =
                            self.self_in_group(snapshot.chat_id).await.unwrap_or(true);
                        let member = if still_member {
                            snapshot.sender
                        } else {
                            SELF_CONTACT
                        };
                        Some(Event::MembershipChanged {
                            chat_id: snapshot.chat_id,
                            member,
                            added: false,
                        })
                    }
                    _ => Some(Event::NewMessage(snapshot)),
                }
            }
            "SecurejoinInviterProgress" => Some(Event::Raw(RawEvent::SecureJoinInviterProgress {
                chat_id: ChatId(event.get("chatId")?.as_u64()?),
                progress: event.get("progress")?.as_u64()? as u32,
            })),
            "ImapConnected" => Some(Event::Raw(RawEvent::Connected)),
            other => Some(Event::Raw(RawEvent::Other {
                kind: other.to_string(),
            })),
        }
    }
}

#[async_trait]
impl Platform for RpcPlatform {
    fn self_contact(&self) -> ContactId {
        SELF_CONTACT
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.client
            .call("set_config", json!([self.account_id, key, value]))
            .await
            .map(|_| ())
    }

    async fn invite_link(&self, chat_id: ChatId) -> Result<String> {
        let qr = self
            .client
            .call(
                "get_chat_securejoin_qr_code",
                json!([self.account_id, chat_id.0]),
            )
            .await?;
        qr.as_str()
            .map(ToString::to_string)
            .ok_or_else(|| PlatformError::Transport("invite code was not a string".into()))
    }

    async fn self_invite_link(&self) -> Result<String> {
        let qr = self
            .client
            .call("get_chat_securejoin_qr_code", json!([self.account_id, null]))
            .await?;
        qr.as_str()
            .map(ToString::to_string)
            .ok_or_else(|| PlatformError::Transport("invite code was not a string".into()))
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        file: Option<&Path>,
    ) -> Result<MsgId> {
        let data = json!({ "text": text, "file": file });
        let result = self
            .client
            .call("send_msg", json!([self.account_id, chat_id.0, data]))
            .await
            .map_err(|e| PlatformError::SendFailed {
                chat_id,
                reason: e.to_string(),
            })?;
        result
            .as_u64()
            .map(MsgId)
            .ok_or_else(|| PlatformError::SendFailed {
                chat_id,
                reason: "send_msg returned no id".into(),
            })
    }

    async fn chat_messages(&self, chat_id: ChatId) -> Result<Vec<MessageSnapshot>> {
        let ids = self
            .client
            .call(
                "get_message_ids",
                json!([self.account_id, chat_id.0, false, false]),
            )
            .await?;
        let ids: Vec<u64> = ids
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_message(id).await {
                Ok(msg) => {
                    if let Some(snapshot) = self.snapshot_from(&msg) {
                        snapshots.push(snapshot);
                    }
                }
                Err(e) => warn!("fetching message {} failed: {}", id, e),
            }
        }
        Ok(snapshots)
    }

    async fn chat_members(&self, chat_id: ChatId) -> Result<Vec<ContactId>> {
        let contacts = self
            .client
            .call("get_chat_contacts", json!([self.account_id, chat_id.0]))
            .await?;
        Ok(contacts
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_u64).map(ContactId).collect())
            .unwrap_or_default())
    }

    async fn delete_messages(&self, msg_ids: &[MsgId]) -> Result<()> {
        let ids: Vec<u64> = msg_ids.iter().map(|m| m.0).collect();
        self.client
            .call("delete_messages", json!([self.account_id, ids]))
            .await
            .map(|_| ())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<()> {
        self.client
            .call("delete_chat", json!([self.account_id, chat_id.0]))
            .await
            .map(|_| ())
    }

    async fn delete_contact(&self, contact_id: ContactId) -> Result<()> {
        self.client
            .call("delete_contact", json!([self.account_id, contact_id.0]))
            .await
            .map(|_| ())
    }

    async fn next_event(&self) -> Option<Event> {
        loop {
            let envelope = match self.client.call("get_next_event", json!([])).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("event stream ended: {}", e);
                    return None;
                }
            };

            // Events for other accounts on the same server are not ours.
            let context = envelope.get("contextId").and_then(Value::as_u64);
            if context.is_some_and(|id| id != self.account_id) {
                continue;
            }

            let Some(event) = envelope.get("event") else {
                continue;
            };
            let kind = event.get("kind").and_then(Value::as_str).unwrap_or("");
            if let Some(translated) = self.translate(kind, event).await {
                return Some(translated);
            }
        }
    }
}
