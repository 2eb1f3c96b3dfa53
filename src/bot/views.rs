//! Keyboards and message texts for the membership desk UI
//!
//! All texts are authored Telegram HTML; user-provided strings must be
//! escaped by the caller before interpolation.

use crate::bot::callbacks::{
    CallbackAction, CB_BACK, CB_CANCEL_MESSAGE, CB_CANCEL_REPLY, CB_CONTACT, CB_FORM, CB_HELP,
    CB_KYC_START, CB_PAYMENT_INFO_START, CB_RULES,
};
use crate::verify::{MemberCategory, VerificationOutcome};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Main menu shown on /start and after "back"
#[must_use]
pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📌 Rules", CB_RULES)],
        vec![InlineKeyboardButton::callback("📝 Admission Form", CB_FORM)],
        vec![InlineKeyboardButton::callback("🆔 KYC Check", CB_KYC_START)],
        vec![InlineKeyboardButton::callback(
            "💳 Payment Info",
            CB_PAYMENT_INFO_START,
        )],
        vec![InlineKeyboardButton::callback("📞 Contact Us", CB_CONTACT)],
        vec![InlineKeyboardButton::callback("ℹ️ Help", CB_HELP)],
    ])
}

/// Member-type selection; `encode` maps a category to its callback data
fn member_type_menu(encode: fn(MemberCategory) -> &'static str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "New Member",
            encode(MemberCategory::NewMember),
        )],
        vec![InlineKeyboardButton::callback(
            "Old Member",
            encode(MemberCategory::OldMember),
        )],
        vec![back_button()],
    ])
}

/// Member-type selection for a KYC check
#[must_use]
pub fn kyc_member_type_menu() -> InlineKeyboardMarkup {
    member_type_menu(CallbackAction::encode_kyc_check)
}

/// Member-type selection for payment info
#[must_use]
pub fn payment_member_type_menu() -> InlineKeyboardMarkup {
    member_type_menu(CallbackAction::encode_payment_info)
}

/// Single row returning to the main menu
#[must_use]
pub fn back_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![back_button()]])
}

fn back_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback("🔙 Back to Menu", CB_BACK)
}

/// Keyboard under the rules screen
#[must_use]
pub fn rules_keyboard(form_url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![form_link_button(form_url)],
        vec![back_button()],
    ])
}

/// Keyboard under the form screen
#[must_use]
pub fn form_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ I've Submitted", CB_BACK)],
        vec![back_button()],
    ])
}

/// Keyboard under the help screen
#[must_use]
pub fn help_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📞 Contact Us", CB_CONTACT)],
        vec![back_button()],
    ])
}

/// Cancel affordance while composing a message to the operators
#[must_use]
pub fn cancel_message_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Cancel",
        CB_CANCEL_MESSAGE,
    )]])
}

/// Cancel affordance while an operator composes a reply
#[must_use]
pub fn cancel_reply_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Cancel",
        CB_CANCEL_REPLY,
    )]])
}

/// Reply affordance attached to a forwarded user message
#[must_use]
pub fn reply_keyboard(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "📩 Reply",
        CallbackAction::encode_reply(user_id),
    )]])
}

/// Offered after an operator cancels a reply binding
#[must_use]
pub fn reply_anyway_keyboard(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "📩 Reply Anyway",
        CallbackAction::encode_reply(user_id),
    )]])
}

/// Offered to a user after a relay delivery failure
#[must_use]
pub fn relay_retry_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![back_button()],
        vec![InlineKeyboardButton::callback("🔄 Try Again", CB_CONTACT)],
    ])
}

/// Keyboard under a KYC status screen; shape depends on the outcome
#[must_use]
pub fn kyc_outcome_keyboard(
    outcome: &VerificationOutcome,
    category: MemberCategory,
    form_url: &str,
) -> InlineKeyboardMarkup {
    let refresh = InlineKeyboardButton::callback(
        "🔄 Refresh Status",
        CallbackAction::encode_kyc_check(category),
    );

    match outcome {
        VerificationOutcome::Pending { .. } => {
            InlineKeyboardMarkup::new(vec![vec![refresh], vec![back_button()]])
        }
        VerificationOutcome::Rejected { .. } => InlineKeyboardMarkup::new(vec![
            vec![form_link_button(form_url)],
            vec![refresh],
            vec![back_button()],
        ]),
        VerificationOutcome::Verified { .. } => InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback(
                "💳 Proceed to Payment",
                CallbackAction::encode_payment(category),
            )],
            vec![back_button()],
        ]),
    }
}

/// Retry affordance after a failed payment-code issuance
#[must_use]
pub fn payment_retry_keyboard(category: MemberCategory) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "🔄 Try Again",
            CallbackAction::encode_payment(category),
        )],
        vec![back_button()],
    ])
}

fn form_link_button(form_url: &str) -> InlineKeyboardButton {
    reqwest::Url::parse(form_url).map_or_else(
        |_| InlineKeyboardButton::callback("📝 Admission Form", CB_FORM),
        |url| InlineKeyboardButton::url("📝 Admission Form", url),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Welcome text for /start
#[must_use]
pub fn welcome_text(first_name: &str) -> String {
    format!(
        "Hello {}!\n\nWelcome to the <b>Membership Desk</b>. Please choose an option below:",
        html_escape::encode_text(first_name)
    )
}

/// Text shown when returning to the main menu
pub const MENU_TEXT: &str = "👋 Welcome back! Select an option:";

/// Verification rules screen
pub const RULES_TEXT: &str = "\
📜 <b>VERIFICATION REQUIREMENTS</b>\n\n\
✅ <b>MUST HAVE</b>\n\
1. A public Telegram username (@yourname)\n\
2. Clear profile photo (not default)\n\
3. Social profile link in bio (2+ years old)\n\
4. Matching name &amp; photo across all platforms\n\n\
🚫 <b>PROHIBITED</b>\n\
1. No blank/private profiles\n\
2. No recently created accounts\n\
3. No mismatched information\n\n\
⚠️ <b>NOTE</b>\n\
Fake profiles will be banned permanently.\n\
All info must match your government ID.";

/// Admission form screen
#[must_use]
pub fn form_text(form_url: &str) -> String {
    format!(
        "📝 <b>Admission Form</b>\n\nPlease fill out the form carefully with accurate \
         information.\nAll fields are required for verification.\n\n{}",
        html_escape::encode_text(form_url)
    )
}

/// Help screen
#[must_use]
pub fn help_text(contact_handle: Option<&str>) -> String {
    let contact = contact_handle.unwrap_or("the operators via Contact Us");
    format!(
        "❓ <b>Help Center</b>\n\nFor any assistance, please contact our operator team.\n\n\
         Contact: {}",
        html_escape::encode_text(contact)
    )
}

/// Member-type prompt
pub const MEMBER_TYPE_PROMPT: &str = "Please select your member type:";

/// Prompt shown when the user starts composing a message to the operators
#[must_use]
pub fn contact_prompt(max_chars: usize) -> String {
    format!("✉️ Please type your message for the operators (max {max_chars} characters):")
}

/// Rate-limit rejection notice; composing state is kept
pub const RATE_LIMITED_TEXT: &str =
    "⏳ Please wait a minute before sending another message. Your draft was not sent.";

/// Confirmation after a successful relay
pub const MESSAGE_SENT_TEXT: &str = "✅ Your message has been sent to the operators!";

/// Relay delivery failure notice
pub const MESSAGE_FAILED_TEXT: &str =
    "⚠️ Failed to deliver your message. Please try again.";

/// Notice when no operators are configured
pub const NO_OPERATORS_TEXT: &str =
    "⚠️ No operators are available right now. Please try again later.";

/// Composing cancelled
pub const MESSAGE_CANCELLED_TEXT: &str = "❌ Message cancelled";

/// KYC status screen per outcome
#[must_use]
pub fn kyc_outcome_text(handle: &str, outcome: &VerificationOutcome) -> String {
    let handle = html_escape::encode_text(handle);
    match outcome {
        VerificationOutcome::Pending { reason } => format!(
            "⏳ <b>KYC Status</b>\n\n{}.\nPlease check back later.",
            html_escape::encode_text(reason)
        ),
        VerificationOutcome::Rejected { reason } => format!(
            "🔍 <b>KYC Status for</b> @{}\n\n• Status: Not Verified\n• Reason: {}\n\n\
             Please complete verification again.",
            handle,
            html_escape::encode_text(reason)
        ),
        VerificationOutcome::Verified { .. } => format!(
            "✅ <b>KYC Verified</b>\n\nCongratulations @{handle}!\n\
             Your account has been successfully verified."
        ),
    }
}

/// Payment instructions per category
#[must_use]
pub fn payment_info_text(category: MemberCategory, contact_handle: Option<&str>) -> String {
    let contact = contact_handle.unwrap_or("the operators via Contact Us");
    format!(
        "💳 <b>Payment Instructions</b> ({})\n\n\
         1. Complete your KYC verification first\n\
         2. Payment methods available:\n\
            • Cryptocurrency (USDT)\n\
            • Binance\n\
            • Mexc\n\
         3. Contact the operator for payment details\n\n\
         Operator: {}",
        category.label(),
        html_escape::encode_text(contact)
    )
}

/// Payment code screen shown to the user
#[must_use]
pub fn payment_code_text(code: &str, contact_handle: Option<&str>) -> String {
    let contact = contact_handle.unwrap_or("the operators via Contact Us");
    format!(
        "✅ <b>Payment Verification</b>\n\n🔐 Your code: <code>{}</code>\n\nSend this to {}",
        html_escape::encode_text(code),
        html_escape::encode_text(contact)
    )
}

/// Payment announcement sent to the category operator chat
#[must_use]
pub fn payment_announcement_text(
    handle: &str,
    user_id: i64,
    category: MemberCategory,
    code: &str,
) -> String {
    format!(
        "🆕 Payment request from @{}\n🔢 Code: <code>{}</code>\n🆔 User ID: {}\n👤 Type: {}",
        html_escape::encode_text(handle),
        html_escape::encode_text(code),
        user_id,
        category.label()
    )
}

/// Payment-code issuance failure notice
pub const PAYMENT_FAILED_TEXT: &str =
    "⚠️ Payment processing failed. Please try again.";

/// Denial for operator-only affordances
pub const OPERATORS_ONLY_TEXT: &str = "🚫 This action is for operators only.";

/// Shown when an operator presses the contact button
pub const OPERATOR_CONTACT_TEXT: &str =
    "ℹ️ You are an operator; user messages arrive in this chat directly.";

/// Notice for an operator reply without a bound target
pub const NO_REPLY_TARGET_TEXT: &str =
    "⚠️ No user selected to reply to. Use the Reply button under a forwarded message.";

/// Notice when cancelling a reply with no binding in flight
pub const NO_ACTIVE_REPLY_TEXT: &str = "No active reply to cancel.";

/// Fallback when a button payload cannot be understood
pub const UNRECOGNIZED_ACTION_TEXT: &str =
    "⚠️ That button is no longer valid. Returning to the main menu.";
