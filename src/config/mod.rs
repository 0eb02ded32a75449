//! Configuration module for padbot.
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Display name the account advertises once it is first configured.
pub const BOT_DISPLAY_NAME: &str = "Group Editor Bot";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Login address for initial account configuration.
    /// Optional - an already-configured account database needs none.
    pub addr: Option<String>,

    /// Login password for initial account configuration.
    pub mail_pw: Option<String>,

    /// Directory holding the platform account database.
    pub accounts_dir: PathBuf,

    /// Executable name or path of the platform RPC server.
    pub rpc_server_bin: String,

    /// Path of the bundled editor template sent by /editor.
    pub editor_template: PathBuf,

    /// Value written to the platform's device-side message retention
    /// setting on every reconnect. "0" disables device-side expiry.
    pub delete_device_after: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let accounts_dir = env::var("ACCOUNTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("accounts"));

        let editor_template = env::var("EDITOR_TEMPLATE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/durian-realtime-editor.xdc"));

        Self {
            addr: env::var("ADDR").ok().filter(|s| !s.is_empty()),
            mail_pw: env::var("MAIL_PW").ok().filter(|s| !s.is_empty()),
            accounts_dir,
            rpc_server_bin: env::var("RPC_SERVER")
                .unwrap_or_else(|_| "deltachat-rpc-server".to_string()),
            editor_template,
            delete_device_after: env::var("DELETE_DEVICE_AFTER")
                .unwrap_or_else(|_| "0".to_string()),
        }
    }

    /// Whether the DEBUG env toggle is set.
    pub fn debug() -> bool {
        env::var("DEBUG").map(|v| v == "true").unwrap_or(false)
    }
}
