//! Integration tests for the membership lifecycle: join-triggered
//! resend, self-removal teardown, and the raw event monitor.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use padbot::bot::{Dispatcher, HELP_TEXT};
use padbot::config::Config;
use padbot::events::{Handler, membership, raw};
use padbot::platform::memory::MemoryPlatform;
use padbot::platform::{ChatId, ContactId, Event, Platform, RawEvent};
use padbot::sync;

fn test_config(dir: &tempfile::TempDir) -> Config {
    let template = dir.path().join("editor.xdc");
    fs::write(&template, b"xdc-template-bytes").unwrap();
    Config {
        addr: None,
        mail_pw: None,
        accounts_dir: dir.path().join("accounts"),
        rpc_server_bin: "deltachat-rpc-server".to_string(),
        editor_template: template,
        delete_device_after: "0".to_string(),
    }
}

/// Helper: platform with one group of {bot, creator}.
fn setup() -> (MemoryPlatform, ChatId, ContactId) {
    let platform = MemoryPlatform::new();
    let creator = platform.add_contact();
    let chat = platform.add_chat(&[platform.self_contact(), creator]);
    (platform, chat, creator)
}

async fn bot_texts(platform: &MemoryPlatform, chat: ChatId) -> Vec<String> {
    platform
        .chat_messages(chat)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.sender == platform.self_contact())
        .map(|m| m.text)
        .collect()
}

// ---------------------------------------------------------------------------
// Resend protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn member_added_resends_bot_content_in_order() {
    let (platform, chat, creator) = setup();
    let bot = platform.self_contact();

    platform.receive_message(chat, bot, "first", None, false);
    platform.receive_message(chat, creator, "user chatter", None, false);
    platform.receive_message(chat, bot, "second", None, false);

    let joiner = platform.add_contact();
    membership::handle_member_change(&platform, chat, joiner, true)
        .await
        .unwrap();

    assert_eq!(
        bot_texts(&platform, chat).await,
        vec!["first", "second", "first", "second"]
    );
}

#[tokio::test]
async fn info_messages_are_never_resent() {
    let (platform, chat, _creator) = setup();
    let bot = platform.self_contact();

    platform.receive_message(chat, bot, "content", None, false);
    platform.receive_message(chat, bot, "Member X added", None, true);

    sync::resend_messages(&platform, chat).await.unwrap();

    assert_eq!(
        bot_texts(&platform, chat).await,
        vec!["content", "Member X added", "content"]
    );
}

#[tokio::test]
async fn resend_twice_rebroadcasts_the_full_set_both_times() {
    let (platform, chat, _creator) = setup();
    let bot = platform.self_contact();

    platform.receive_message(chat, bot, "a", None, false);
    platform.receive_message(chat, bot, "b", None, false);

    sync::resend_messages(&platform, chat).await.unwrap();
    // The second run also re-broadcasts the copies the first run made.
    sync::resend_messages(&platform, chat).await.unwrap();

    assert_eq!(
        bot_texts(&platform, chat).await,
        vec!["a", "b", "a", "b", "a", "b", "a", "b"]
    );
}

#[tokio::test]
async fn resend_continues_past_a_failing_message() {
    let (platform, chat, _creator) = setup();
    let bot = platform.self_contact();

    platform.receive_message(chat, bot, "keep-1", None, false);
    platform.receive_message(chat, bot, "poison", None, false);
    platform.receive_message(chat, bot, "keep-2", None, false);

    platform.fail_sends_containing("poison");
    sync::resend_messages(&platform, chat).await.unwrap();

    assert_eq!(
        bot_texts(&platform, chat).await,
        vec!["keep-1", "poison", "keep-2", "keep-1", "keep-2"]
    );
}

#[tokio::test]
async fn resend_of_a_deleted_chat_is_a_noop() {
    let (platform, chat, _creator) = setup();
    platform.delete_chat(chat).await.unwrap();

    sync::resend_messages(&platform, chat).await.unwrap();
    assert!(platform.chat_ids().is_empty());
}

// ---------------------------------------------------------------------------
// Teardown protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn self_removal_tears_down_chat_and_member_contacts() {
    let platform = MemoryPlatform::new();
    let bot = platform.self_contact();
    let a = platform.add_contact();
    let b = platform.add_contact();
    let chat = platform.add_chat(&[bot, a, b]);

    membership::handle_member_change(&platform, chat, bot, false)
        .await
        .unwrap();

    assert!(platform.chat_ids().is_empty());
    // Both member contacts are gone; the account's own contact stays.
    assert_eq!(platform.contact_ids(), vec![bot]);
}

#[tokio::test]
async fn other_member_removal_leaves_everything_untouched() {
    let platform = MemoryPlatform::new();
    let bot = platform.self_contact();
    let a = platform.add_contact();
    let b = platform.add_contact();
    let chat = platform.add_chat(&[bot, a, b]);

    membership::handle_member_change(&platform, chat, a, false)
        .await
        .unwrap();

    assert_eq!(platform.chat_ids(), vec![chat]);
    assert_eq!(platform.contact_ids(), vec![bot, a, b]);
}

#[tokio::test]
async fn removal_notification_for_a_torn_down_chat_is_a_noop() {
    let (platform, chat, creator) = setup();
    platform.delete_chat(chat).await.unwrap();

    // A delayed notification after teardown already ran.
    membership::handle_member_change(&platform, chat, platform.self_contact(), false)
        .await
        .unwrap();

    assert_eq!(
        platform.contact_ids(),
        vec![platform.self_contact(), creator]
    );
}

#[tokio::test]
async fn teardown_survives_a_failing_contact_deletion() {
    let platform = MemoryPlatform::new();
    let bot = platform.self_contact();
    let a = platform.add_contact();
    let b = platform.add_contact();
    let chat = platform.add_chat(&[bot, a, b]);

    // Contact already gone elsewhere; deleting it again fails.
    platform.delete_contact(a).await.unwrap();

    sync::delete_chat_data(&platform, chat).await.unwrap();

    assert!(platform.chat_ids().is_empty());
    assert_eq!(platform.contact_ids(), vec![bot]);
}

// ---------------------------------------------------------------------------
// Raw event monitor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_secure_join_triggers_resend() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let (platform, chat, _creator) = setup();
    platform.receive_message(chat, platform.self_contact(), "pad", None, false);

    raw::handle_raw_event(
        &platform,
        &config,
        RawEvent::SecureJoinInviterProgress {
            chat_id: chat,
            progress: 1000,
        },
    )
    .await
    .unwrap();

    assert_eq!(bot_texts(&platform, chat).await, vec!["pad", "pad"]);
}

#[tokio::test]
async fn partial_secure_join_progress_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let (platform, chat, _creator) = setup();
    platform.receive_message(chat, platform.self_contact(), "pad", None, false);

    raw::handle_raw_event(
        &platform,
        &config,
        RawEvent::SecureJoinInviterProgress {
            chat_id: chat,
            progress: 400,
        },
    )
    .await
    .unwrap();

    assert_eq!(bot_texts(&platform, chat).await, vec!["pad"]);
}

#[tokio::test]
async fn connected_applies_account_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let platform = MemoryPlatform::new();

    raw::handle_raw_event(&platform, &config, RawEvent::Connected)
        .await
        .unwrap();

    assert_eq!(platform.config_value("selfstatus").as_deref(), Some(HELP_TEXT));
    assert_eq!(
        platform.config_value("delete_device_after").as_deref(),
        Some("0")
    );

    // Reconnects repeat the writes, last-write-wins.
    raw::handle_raw_event(&platform, &config, RawEvent::Connected)
        .await
        .unwrap();
    assert_eq!(platform.config_value("selfstatus").as_deref(), Some(HELP_TEXT));
}

// ---------------------------------------------------------------------------
// End to end through the event loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn editor_then_join_delivers_a_fresh_copy() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let template = config.editor_template.clone();

    let platform = Arc::new(MemoryPlatform::new());
    let creator = platform.add_contact();
    let chat = platform.add_chat(&[platform.self_contact(), creator]);

    let dispatcher = Dispatcher::new(template.clone());
    let handler = Handler::new(platform.clone(), dispatcher, config);

    let msg = platform.receive_message(chat, creator, "/editor Party List", None, false);
    platform.push_event(Event::NewMessage(msg));

    let joiner = platform.add_contact();
    platform.push_event(Event::MembershipChanged {
        chat_id: chat,
        member: joiner,
        added: true,
    });
    platform.close_events();

    padbot::bot::runtime::run(platform.clone(), handler).await;

    // One editor from the command, one fresh copy from the join.
    let sent = platform.sent_log();
    assert_eq!(sent.len(), 2);
    for m in &sent {
        assert_eq!(m.text, "Party List");
        assert_eq!(m.file.as_deref(), Some(template.as_path()));
    }
}

#[tokio::test]
async fn removal_from_a_group_forgets_chat_and_creator() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let platform = Arc::new(MemoryPlatform::new());
    let bot = platform.self_contact();
    let creator = platform.add_contact();
    let chat = platform.add_chat(&[bot, creator]);

    let dispatcher = Dispatcher::new(PathBuf::from("unused.xdc"));
    let handler = Handler::new(platform.clone(), dispatcher, config);

    platform.push_event(Event::MembershipChanged {
        chat_id: chat,
        member: bot,
        added: false,
    });
    platform.close_events();

    padbot::bot::runtime::run(platform.clone(), handler).await;

    assert!(platform.chat_ids().is_empty());
    assert_eq!(platform.contact_ids(), vec![bot]);
}
