//! Operator relay protocol
//!
//! Forwards user messages to every configured operator chat with a
//! reply-binding button, and routes an operator's bound reply back to the
//! originating user with distinct framing, a delivery confirmation, and a
//! timestamped audit log entry in the operator's chat.

use crate::bot::resilient::send_message_resilient;
use crate::bot::views;
use crate::config::{Settings, USER_MESSAGE_MAX_CHARS};
use crate::utils::truncate_str;
use anyhow::{anyhow, Result};
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::{error, info};

/// Forwarded-message header + body shown in operator chats
#[must_use]
pub fn forward_text(handle: Option<&str>, user_id: i64, text: &str) -> String {
    let handle = handle.unwrap_or("no username");
    format!(
        "📨 New message from @{} (ID: {}):\n\n{}",
        html_escape::encode_text(handle),
        user_id,
        html_escape::encode_text(text)
    )
}

/// "Now replying" annotation appended to a forwarded message once an
/// operator binds to it
#[must_use]
pub fn reply_annotation(original: &str) -> String {
    format!("{original}\n\n✍️ You are now replying to this user.\nType your message below:")
}

/// Operator-reply framing delivered to the user; explicitly distinct from
/// ordinary bot output
#[must_use]
pub fn operator_reply_text(text: &str) -> String {
    format!(
        "💬 <b>Operator Reply:</b>\n\n{}",
        html_escape::encode_text(text)
    )
}

/// Audit log entry posted to the operator chat after a delivered reply
#[must_use]
pub fn audit_log_text(target: i64, text: &str) -> String {
    format!(
        "🔷 Operator Reply Log\n\n👤 User ID: {}\n🕒 Time: {}\n📝 Message: {}",
        target,
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        html_escape::encode_text(text)
    )
}

/// Forwards a user's message to every configured operator chat.
///
/// The message is truncated to the relay cap and carries a reply-binding
/// button encoding the source user. Forwarding succeeds if at least one
/// operator chat accepted the message; per-target failures are logged.
///
/// # Errors
///
/// Returns an error when no operators are configured or every delivery
/// failed; the caller reports this to the user with a retry affordance.
pub async fn forward_to_operators(
    bot: &Bot,
    settings: &Settings,
    user_id: i64,
    handle: Option<&str>,
    text: &str,
) -> Result<()> {
    let targets = settings.operator_ids();
    if targets.is_empty() {
        return Err(anyhow!("no operator chats configured"));
    }

    let capped = truncate_str(text, USER_MESSAGE_MAX_CHARS);
    let body = forward_text(handle, user_id, &capped);

    let mut delivered = 0usize;
    for target in &targets {
        match send_message_resilient(
            bot,
            ChatId(*target),
            body.clone(),
            Some(views::reply_keyboard(user_id)),
        )
        .await
        {
            Ok(_) => delivered += 1,
            Err(e) => error!("Failed to forward message to operator {}: {}", target, e),
        }
    }

    if delivered == 0 {
        return Err(anyhow!("delivery failed to all {} operator chats", targets.len()));
    }

    info!(
        "Relayed message from user {} to {}/{} operator chats",
        user_id,
        delivered,
        targets.len()
    );
    Ok(())
}

/// Delivers an operator's reply to the bound user, then confirms delivery
/// and posts the audit log entry back in the operator's chat.
///
/// State handling stays with the caller: the binding is cleared regardless
/// of delivery outcome, and a failure here is reported to the operator.
///
/// # Errors
///
/// Returns an error when delivery to the user fails.
pub async fn deliver_operator_reply(
    bot: &Bot,
    operator_chat: ChatId,
    target: i64,
    text: &str,
) -> Result<()> {
    send_message_resilient(bot, ChatId(target), operator_reply_text(text), None).await?;

    // Confirmation and audit entry are best-effort: the reply already
    // reached the user
    if let Err(e) = send_message_resilient(
        bot,
        operator_chat,
        format!("✅ Reply sent to user {target}"),
        None,
    )
    .await
    {
        error!("Failed to confirm reply delivery to operator: {}", e);
    }
    if let Err(e) =
        send_message_resilient(bot, operator_chat, audit_log_text(target, text), None).await
    {
        error!("Failed to post reply audit log: {}", e);
    }

    info!("Operator reply delivered to user {}", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_text_escapes_user_content() {
        let body = forward_text(Some("alice"), 42, "look: <b>bold</b> & stuff");
        assert!(body.contains("@alice"));
        assert!(body.contains("(ID: 42)"));
        assert!(body.contains("&lt;b&gt;bold&lt;/b&gt; &amp; stuff"));
    }

    #[test]
    fn test_forward_text_without_handle() {
        let body = forward_text(None, 7, "hi");
        assert!(body.contains("@no username"));
    }

    #[test]
    fn test_operator_reply_framing() {
        let framed = operator_reply_text("all set <ok>");
        assert!(framed.starts_with("💬 <b>Operator Reply:</b>"));
        assert!(framed.contains("&lt;ok&gt;"));
    }

    #[test]
    fn test_audit_log_contains_target_and_timestamp() {
        let entry = audit_log_text(99, "done");
        assert!(entry.contains("User ID: 99"));
        assert!(entry.contains("🕒 Time: "));
        assert!(entry.contains("done"));
    }
}
