//! Utility functions: safe truncation, Telegram retry wrapper, payment
//! code generation.

use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use gatedesk::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Generates a one-time payment code.
///
/// Eight characters drawn from an alphabet without visually ambiguous
/// symbols, so codes survive being retyped from a phone screen.
#[must_use]
pub fn generate_payment_code() -> String {
    use crate::config::{PAYMENT_CODE_CHARSET, PAYMENT_CODE_LEN};

    let mut rng = rand::thread_rng();
    (0..PAYMENT_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..PAYMENT_CODE_CHARSET.len());
            PAYMENT_CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Retry a Telegram API operation with exponential backoff.
///
/// The retry strategy uses exponential backoff with jitter to avoid
/// thundering herd:
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (configurable via constants in `config.rs`)
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}
