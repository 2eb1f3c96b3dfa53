//! Command, callback-query, and free-text handlers
//!
//! Every inbound event is classified into exactly one of command, button
//! press, or free text. Buttons are parsed into [`CallbackAction`]; free
//! text goes through [`route_text`] by sender role and dialogue state.

use crate::bot::callbacks::CallbackAction;
use crate::bot::relay;
use crate::bot::resilient::{edit_or_send, send_message_resilient};
use crate::bot::router::{route_text, TextRoute};
use crate::bot::state::State;
use crate::bot::views;
use crate::config::{Settings, USER_MESSAGE_MAX_CHARS};
use crate::limiter::RateLimiter;
use crate::sheets::SheetsClient;
use crate::verify::{MemberCategory, Verifier};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::dispatching::dialogue::{InMemStorage, InMemStorageError};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::warn;

/// Dialogue storage shared across handlers
pub type StateStorage = Arc<InMemStorage<State>>;
/// Per-chat dialogue handle
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;
/// Verifier wired to the production row source
pub type SheetsVerifier = Verifier<SheetsClient>;

/// Supported commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message and main menu
    #[command(description = "Open the main menu.")]
    Start,
    /// Show the help screen
    #[command(description = "How to reach the operators.")]
    Help,
    /// Liveness probe over chat
    #[command(description = "Check that the bot is responsive.")]
    Healthcheck,
}

/// Extracts the sender ID, or 0 for channel posts without a sender
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Whether `sender` may use operator-only affordances
#[must_use]
pub fn is_authorized_operator(sender: i64, settings: &Settings) -> bool {
    settings.operators().contains(&sender)
}

/// Clears any stored dialogue for the chat.
///
/// A chat that never stored a dialogue is already idle, so a missing entry
/// is not an error; back/cancel must work for fresh chats too.
pub async fn reset_dialogue(dialogue: &BotDialogue) {
    match dialogue.exit().await {
        Ok(()) | Err(InMemStorageError::DialogueNotFound) => {}
    }
}

/// Handles /start: welcome text plus the main menu.
///
/// # Errors
///
/// Returns an error if the Telegram send fails after retries.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let first_name = msg
        .from
        .as_ref()
        .map_or("there", |u| u.first_name.as_str());
    send_message_resilient(
        &bot,
        msg.chat.id,
        views::welcome_text(first_name),
        Some(views::main_menu()),
    )
    .await?;
    Ok(())
}

/// Handles /help.
///
/// # Errors
///
/// Returns an error if the Telegram send fails after retries.
pub async fn help(bot: Bot, msg: Message, settings: Arc<Settings>) -> Result<()> {
    send_message_resilient(
        &bot,
        msg.chat.id,
        views::help_text(settings.operator_handle_new.as_deref()),
        Some(views::help_keyboard()),
    )
    .await?;
    Ok(())
}

/// Handles /healthcheck.
///
/// # Errors
///
/// Returns an error if the Telegram send fails after retries.
pub async fn healthcheck(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, "OK").await?;
    Ok(())
}

/// Context for one callback press: the pressed message and the presser
struct Pressed {
    chat_id: ChatId,
    msg_id: Option<MessageId>,
    sender: i64,
    handle: Option<String>,
    original_text: Option<String>,
}

impl Pressed {
    fn from_query(q: &CallbackQuery) -> Self {
        let chat_id = q
            .message
            .as_ref()
            .map_or(ChatId(q.from.id.0.cast_signed()), |m| m.chat().id);
        Self {
            chat_id,
            msg_id: q.message.as_ref().map(teloxide::types::MaybeInaccessibleMessage::id),
            sender: q.from.id.0.cast_signed(),
            handle: q.from.username.clone(),
            original_text: q
                .regular_message()
                .and_then(|m| m.text())
                .map(str::to_string),
        }
    }
}

/// Handles every inline button press.
///
/// # Errors
///
/// Returns an error if a Telegram operation fails after retries; state is
/// mutated before any outbound call, so delivery failures never corrupt it.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    storage: StateStorage,
    settings: Arc<Settings>,
    verifier: Arc<SheetsVerifier>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;

    let pressed = Pressed::from_query(&q);
    let dialogue = BotDialogue::new(storage, pressed.chat_id);

    let Some(action) = CallbackAction::parse(data) else {
        warn!("Malformed callback data from {}: {:?}", pressed.sender, data);
        reset_dialogue(&dialogue).await;
        return edit_or_send(
            &bot,
            pressed.chat_id,
            pressed.msg_id,
            views::UNRECOGNIZED_ACTION_TEXT,
            views::main_menu(),
        )
        .await;
    };

    match action {
        CallbackAction::Rules => {
            edit_screen(&bot, &pressed, views::RULES_TEXT, views::rules_keyboard(&settings.form_url)).await
        }
        CallbackAction::Form => {
            edit_screen(&bot, &pressed, &views::form_text(&settings.form_url), views::form_keyboard())
                .await
        }
        CallbackAction::Help => {
            let text = views::help_text(settings.operator_handle_new.as_deref());
            edit_screen(&bot, &pressed, &text, views::help_keyboard()).await
        }
        CallbackAction::Back => back_to_menu(&bot, &pressed, &dialogue).await,
        CallbackAction::KycStart => {
            edit_screen(&bot, &pressed, views::MEMBER_TYPE_PROMPT, views::kyc_member_type_menu())
                .await
        }
        CallbackAction::PaymentInfoStart => {
            edit_screen(&bot, &pressed, views::MEMBER_TYPE_PROMPT, views::payment_member_type_menu())
                .await
        }
        CallbackAction::KycCheck(category) => {
            kyc_check(&bot, &pressed, &settings, &verifier, category).await
        }
        CallbackAction::PaymentInfo(category) => {
            let text = views::payment_info_text(category, operator_handle(&settings, category));
            edit_screen(&bot, &pressed, &text, views::back_menu()).await
        }
        CallbackAction::IssuePaymentCode(category) => {
            issue_payment_code(&bot, &pressed, &settings, category).await
        }
        CallbackAction::ContactOperators => contact_operators(&bot, &pressed, &settings, &dialogue).await,
        CallbackAction::CancelMessage => {
            reset_dialogue(&dialogue).await;
            edit_screen(&bot, &pressed, views::MESSAGE_CANCELLED_TEXT, views::main_menu()).await
        }
        CallbackAction::BindReply(target) => {
            bind_reply(&bot, &pressed, &settings, &dialogue, target).await
        }
        CallbackAction::CancelReply => cancel_reply(&bot, &pressed, &dialogue).await,
    }
}

async fn edit_screen(
    bot: &Bot,
    pressed: &Pressed,
    text: &str,
    markup: teloxide::types::InlineKeyboardMarkup,
) -> Result<()> {
    edit_or_send(bot, pressed.chat_id, pressed.msg_id, text, markup).await
}

async fn back_to_menu(bot: &Bot, pressed: &Pressed, dialogue: &BotDialogue) -> Result<()> {
    // Idempotent: clearing an already-idle dialogue is a no-op beyond the
    // re-render
    reset_dialogue(dialogue).await;
    edit_screen(bot, pressed, views::MENU_TEXT, views::main_menu()).await
}

fn operator_handle(settings: &Settings, category: MemberCategory) -> Option<&str> {
    match category {
        MemberCategory::NewMember => settings.operator_handle_new.as_deref(),
        MemberCategory::OldMember => settings.operator_handle_old.as_deref(),
    }
}

async fn kyc_check(
    bot: &Bot,
    pressed: &Pressed,
    settings: &Settings,
    verifier: &SheetsVerifier,
    category: MemberCategory,
) -> Result<()> {
    let fallback = format!("user_{}", pressed.sender);
    let handle = pressed.handle.as_deref().unwrap_or(&fallback);

    let outcome = verifier.resolve(handle, category).await;
    let text = views::kyc_outcome_text(handle, &outcome);
    let keyboard = views::kyc_outcome_keyboard(&outcome, category, &settings.form_url);
    edit_screen(bot, pressed, &text, keyboard).await
}

async fn issue_payment_code(
    bot: &Bot,
    pressed: &Pressed,
    settings: &Settings,
    category: MemberCategory,
) -> Result<()> {
    let operator_chat = match category {
        MemberCategory::NewMember => settings.new_member_operator(),
        MemberCategory::OldMember => settings.old_member_operator(),
    };
    let Some(operator_chat) = operator_chat else {
        return edit_screen(bot, pressed, views::NO_OPERATORS_TEXT, views::back_menu()).await;
    };

    let code = crate::utils::generate_payment_code();
    let fallback = format!("user_{}", pressed.sender);
    let handle = pressed.handle.as_deref().unwrap_or(&fallback);

    // Announce first so the user never holds a code no operator knows about
    let announcement = views::payment_announcement_text(handle, pressed.sender, category, &code);
    if let Err(e) =
        send_message_resilient(bot, ChatId(operator_chat), announcement, None).await
    {
        warn!("Payment announcement to operator {} failed: {}", operator_chat, e);
        return edit_screen(
            bot,
            pressed,
            views::PAYMENT_FAILED_TEXT,
            views::payment_retry_keyboard(category),
        )
        .await;
    }

    let text = views::payment_code_text(&code, operator_handle(settings, category));
    edit_screen(bot, pressed, &text, views::back_menu()).await
}

async fn contact_operators(
    bot: &Bot,
    pressed: &Pressed,
    settings: &Settings,
    dialogue: &BotDialogue,
) -> Result<()> {
    // Operators never hold the composing state; their chats receive
    // forwarded messages directly
    if is_authorized_operator(pressed.sender, settings) {
        return edit_screen(bot, pressed, views::OPERATOR_CONTACT_TEXT, views::main_menu()).await;
    }

    dialogue
        .update(State::AwaitingUserMessage)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    edit_screen(
        bot,
        pressed,
        &views::contact_prompt(USER_MESSAGE_MAX_CHARS),
        views::cancel_message_keyboard(),
    )
    .await
}

async fn bind_reply(
    bot: &Bot,
    pressed: &Pressed,
    settings: &Settings,
    dialogue: &BotDialogue,
    target: i64,
) -> Result<()> {
    if !is_authorized_operator(pressed.sender, settings) {
        warn!(
            "Unauthorized reply binding attempt by {} for user {}",
            pressed.sender, target
        );
        // Denied without touching state; the forwarded message is kept intact
        send_message_resilient(bot, pressed.chat_id, views::OPERATORS_ONLY_TEXT, None).await?;
        return Ok(());
    }

    dialogue
        .update(State::AwaitingOperatorReply { target })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    let original = pressed.original_text.as_deref().unwrap_or_default();
    edit_screen(
        bot,
        pressed,
        &relay::reply_annotation(&html_escape::encode_text(original)),
        views::cancel_reply_keyboard(),
    )
    .await
}

async fn cancel_reply(bot: &Bot, pressed: &Pressed, dialogue: &BotDialogue) -> Result<()> {
    let state = dialogue
        .get()
        .await
        .map_err(|e| anyhow!(e.to_string()))?
        .unwrap_or_default();

    if let State::AwaitingOperatorReply { target } = state {
        dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
        edit_screen(
            bot,
            pressed,
            &format!("❌ Reply to user {target} cancelled"),
            views::reply_anyway_keyboard(target),
        )
        .await
    } else {
        send_message_resilient(bot, pressed.chat_id, views::NO_ACTIVE_REPLY_TEXT, None).await?;
        Ok(())
    }
}

/// Handles every free-text message.
///
/// # Errors
///
/// Returns an error if a Telegram operation fails after retries.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<Settings>,
    limiter: Arc<RateLimiter>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let sender = get_user_id_safe(&msg);
    let is_operator = settings.operators().contains(&sender);
    let state = dialogue
        .get()
        .await
        .map_err(|e| anyhow!(e.to_string()))?
        .unwrap_or_default();

    match route_text(sender, is_operator, &state, &limiter) {
        TextRoute::RelayToOperators => {
            relay_user_message(&bot, &msg, &settings, &dialogue, text).await
        }
        TextRoute::RateLimited => {
            // Composing state is kept so the user can retry after the window
            send_message_resilient(
                &bot,
                msg.chat.id,
                views::RATE_LIMITED_TEXT,
                Some(views::cancel_message_keyboard()),
            )
            .await?;
            Ok(())
        }
        TextRoute::DeliverOperatorReply { target } => {
            // Binding is single-use: cleared before delivery is attempted
            dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
            if let Err(e) = relay::deliver_operator_reply(&bot, msg.chat.id, target, text).await {
                send_message_resilient(
                    &bot,
                    msg.chat.id,
                    format!("⚠️ Failed to send reply to {target}: {e}"),
                    Some(views::reply_anyway_keyboard(target)),
                )
                .await?;
            }
            Ok(())
        }
        TextRoute::OperatorNoTarget => {
            send_message_resilient(&bot, msg.chat.id, views::NO_REPLY_TARGET_TEXT, None).await?;
            Ok(())
        }
        TextRoute::Ignore => Ok(()),
    }
}

async fn relay_user_message(
    bot: &Bot,
    msg: &Message,
    settings: &Settings,
    dialogue: &BotDialogue,
    text: &str,
) -> Result<()> {
    let sender = get_user_id_safe(msg);
    let handle = msg.from.as_ref().and_then(|u| u.username.as_deref());

    // The transition back to Idle is committed regardless of delivery
    // outcome; a failure is reported with a retry affordance instead
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;

    match relay::forward_to_operators(bot, settings, sender, handle, text).await {
        Ok(()) => {
            send_message_resilient(
                bot,
                msg.chat.id,
                views::MESSAGE_SENT_TEXT,
                Some(views::main_menu()),
            )
            .await?;
        }
        Err(e) => {
            warn!("Relay from user {} failed: {}", sender, e);
            let text = if settings.operator_ids().is_empty() {
                views::NO_OPERATORS_TEXT
            } else {
                views::MESSAGE_FAILED_TEXT
            };
            send_message_resilient(
                bot,
                msg.chat.id,
                text,
                Some(views::relay_retry_keyboard()),
            )
            .await?;
        }
    }
    Ok(())
}
