//! Configuration and settings management
//!
//! Loads settings from environment variables and defines tunable constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Comma-separated list of operator chat IDs (allow-list and forward targets)
    #[serde(rename = "operator_ids")]
    pub operator_ids_str: Option<String>,

    /// Chat ID receiving new-member payment announcements
    #[serde(rename = "new_member_operator")]
    pub new_member_operator_str: Option<String>,
    /// Chat ID receiving old-member payment announcements
    #[serde(rename = "old_member_operator")]
    pub old_member_operator_str: Option<String>,

    /// Contact handle shown to new members (e.g. `@gatekeeper`)
    pub operator_handle_new: Option<String>,
    /// Contact handle shown to old members
    pub operator_handle_old: Option<String>,

    /// Google Sheets API key for read-only verification lookups
    pub sheets_api_key: Option<String>,
    /// Spreadsheet holding the verification records
    pub spreadsheet_id: Option<String>,
    /// Comma-separated A1 ranges scanned for new members
    #[serde(rename = "new_member_ranges")]
    pub new_member_ranges_str: Option<String>,
    /// Comma-separated A1 ranges scanned for old members
    #[serde(rename = "old_member_ranges")]
    pub old_member_ranges_str: Option<String>,

    /// Admission form URL, passed through to users verbatim
    #[serde(default = "default_form_url")]
    pub form_url: String,

    /// Listen port for the liveness HTTP endpoint
    #[serde(rename = "health_port")]
    pub health_port_str: Option<String>,
}

fn default_form_url() -> String {
    "https://forms.gle/YOUR_GOOGLE_FORM_LINK".to_string()
}

fn parse_id_list(raw: Option<&String>) -> Vec<i64> {
    raw.map(|s| {
        s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .filter_map(|id| id.parse::<i64>().ok())
            .collect()
    })
    .unwrap_or_default()
}

fn parse_range_list(raw: Option<&String>, defaults: &[&str]) -> Vec<String> {
    let parsed: Vec<String> = raw
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if parsed.is_empty() {
        defaults.iter().map(|r| (*r).to_string()).collect()
    } else {
        parsed
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the Telegram token is
    /// missing. The token is the only fatal setting; everything else
    /// degrades at the point of use.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;

        if settings.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN must not be empty".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Ordered list of operator chat IDs; also the relay forward targets
    #[must_use]
    pub fn operator_ids(&self) -> Vec<i64> {
        parse_id_list(self.operator_ids_str.as_ref())
    }

    /// Set of chat IDs allowed to use operator-only actions
    #[must_use]
    pub fn operators(&self) -> HashSet<i64> {
        self.operator_ids().into_iter().collect()
    }

    /// Chat ID announced to for new-member payment codes.
    ///
    /// Falls back to the first allow-list entry when unset.
    #[must_use]
    pub fn new_member_operator(&self) -> Option<i64> {
        parse_id_list(self.new_member_operator_str.as_ref())
            .first()
            .copied()
            .or_else(|| self.operator_ids().first().copied())
    }

    /// Chat ID announced to for old-member payment codes.
    ///
    /// Falls back to the second allow-list entry, then the first.
    #[must_use]
    pub fn old_member_operator(&self) -> Option<i64> {
        parse_id_list(self.old_member_operator_str.as_ref())
            .first()
            .copied()
            .or_else(|| {
                let ids = self.operator_ids();
                ids.get(1).or_else(|| ids.first()).copied()
            })
    }

    /// A1 ranges scanned for new-member verification rows, in order
    #[must_use]
    pub fn new_member_ranges(&self) -> Vec<String> {
        parse_range_list(self.new_member_ranges_str.as_ref(), NEW_MEMBER_RANGES)
    }

    /// A1 ranges scanned for old-member verification rows, in order
    #[must_use]
    pub fn old_member_ranges(&self) -> Vec<String> {
        parse_range_list(self.old_member_ranges_str.as_ref(), OLD_MEMBER_RANGES)
    }

    /// Liveness endpoint port
    #[must_use]
    pub fn health_port(&self) -> u16 {
        self.health_port_str
            .as_ref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_HEALTH_PORT)
    }
}

// Rate limiting for user -> operator messages
/// Maximum relayed messages per window
pub const RATE_LIMIT_MAX_MESSAGES: usize = 3;
/// Rate-limit window in seconds
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Maximum length of a user message relayed to operators
pub const USER_MESSAGE_MAX_CHARS: usize = 500;

/// TTL for cached verification outcomes
pub const VERIFY_CACHE_TTL_SECS: u64 = 20;
/// Maximum cached verification outcomes
pub const VERIFY_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Default ranges scanned for new members, in priority order
pub const NEW_MEMBER_RANGES: &[&str] = &["Sheet1!A:Q", "Sheet2!A:D"];
/// Default ranges scanned for old members
pub const OLD_MEMBER_RANGES: &[&str] = &["Sheet3!A:D"];

/// Default liveness endpoint port
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

// Telegram API retry tuning
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum retry attempts for Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Length of issued payment codes
pub const PAYMENT_CODE_LEN: usize = 8;
/// Alphabet for payment codes; ambiguous characters (I, O, 0, 1) excluded
pub const PAYMENT_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
