//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Wrappers around send/edit that retry transient network failures using
//! exponential backoff with jitter, plus an edit-or-send fallback for menu
//! re-rendering on messages that can no longer be edited.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode};
use tracing::{debug, warn};

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(m) = markup.clone() {
            req = req.reply_markup(m);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(m) = markup.clone() {
            req = req.reply_markup(m);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Edit the pressed message, falling back to a fresh send when the edit is
/// rejected (message too old, deleted, or identical content).
///
/// # Errors
///
/// Returns an error only when both the edit and the fallback send fail.
pub async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: Option<MessageId>,
    text: &str,
    markup: InlineKeyboardMarkup,
) -> Result<()> {
    const ERROR_NOT_MODIFIED: &str = "message is not modified";

    if let Some(msg_id) = msg_id {
        match edit_message_resilient(bot, chat_id, msg_id, text, Some(markup.clone())).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains(ERROR_NOT_MODIFIED) {
                    debug!("Edit skipped: {err_msg}");
                    return Ok(());
                }
                warn!("Edit failed, sending a new message instead: {e}");
            }
        }
    }

    send_message_resilient(bot, chat_id, text, Some(markup)).await?;
    Ok(())
}
