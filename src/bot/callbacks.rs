//! Callback-data parsing into typed actions
//!
//! Every inline button encodes one of a closed set of actions. Parsing is a
//! fixed match table: exact identifiers first, then the single prefix
//! pattern (`reply_<user_id>`), so a category-suffixed identifier can never
//! be swallowed by a shorter prefix.

use crate::verify::MemberCategory;

// ─────────────────────────────────────────────────────────────────────────────
// Callback constants
// ─────────────────────────────────────────────────────────────────────────────

/// Show the verification rules screen
pub const CB_RULES: &str = "rules";
/// Show the admission form link
pub const CB_FORM: &str = "form";
/// Show the help screen
pub const CB_HELP: &str = "help";
/// Return to the main menu, clearing any in-flight state
pub const CB_BACK: &str = "back";
/// Open the member-type selection for a KYC check
pub const CB_KYC_START: &str = "kyc_check_start";
/// Open the member-type selection for payment info
pub const CB_PAYMENT_INFO_START: &str = "payment_info_start";
/// Start composing a message to the operators
pub const CB_CONTACT: &str = "contact_operators";
/// Abort composing a message to the operators
pub const CB_CANCEL_MESSAGE: &str = "cancel_message";
/// Abort an in-flight operator reply
pub const CB_CANCEL_REPLY: &str = "cancel_reply";
/// Prefix binding an operator to a reply target
pub const CB_REPLY_PREFIX: &str = "reply_";

const CB_KYC_CHECK_NEW: &str = "kyc_check_new";
const CB_KYC_CHECK_OLD: &str = "kyc_check_old";
const CB_PAYMENT_INFO_NEW: &str = "payment_info_new";
const CB_PAYMENT_INFO_OLD: &str = "payment_info_old";
const CB_PAYMENT_NEW: &str = "payment_new";
const CB_PAYMENT_OLD: &str = "payment_old";

/// Typed action behind a pressed inline button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show verification rules
    Rules,
    /// Show the admission form link
    Form,
    /// Show the help screen
    Help,
    /// Return to the main menu
    Back,
    /// Ask which member type to run a KYC check for
    KycStart,
    /// Run a KYC check for the given category
    KycCheck(MemberCategory),
    /// Ask which member type to show payment info for
    PaymentInfoStart,
    /// Show payment instructions for the given category
    PaymentInfo(MemberCategory),
    /// Issue a payment code for the given category
    IssuePaymentCode(MemberCategory),
    /// Begin composing a message to the operators
    ContactOperators,
    /// Cancel composing a message to the operators
    CancelMessage,
    /// Bind the pressing operator to reply to this user
    BindReply(i64),
    /// Cancel an in-flight operator reply
    CancelReply,
}

impl CallbackAction {
    /// Parses raw callback data into an action.
    ///
    /// Returns `None` for unknown or malformed data (including a `reply_`
    /// payload that is not a valid ID).
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            CB_RULES => Some(Self::Rules),
            CB_FORM => Some(Self::Form),
            CB_HELP => Some(Self::Help),
            CB_BACK => Some(Self::Back),
            CB_KYC_START => Some(Self::KycStart),
            CB_KYC_CHECK_NEW => Some(Self::KycCheck(MemberCategory::NewMember)),
            CB_KYC_CHECK_OLD => Some(Self::KycCheck(MemberCategory::OldMember)),
            CB_PAYMENT_INFO_START => Some(Self::PaymentInfoStart),
            CB_PAYMENT_INFO_NEW => Some(Self::PaymentInfo(MemberCategory::NewMember)),
            CB_PAYMENT_INFO_OLD => Some(Self::PaymentInfo(MemberCategory::OldMember)),
            CB_PAYMENT_NEW => Some(Self::IssuePaymentCode(MemberCategory::NewMember)),
            CB_PAYMENT_OLD => Some(Self::IssuePaymentCode(MemberCategory::OldMember)),
            CB_CONTACT => Some(Self::ContactOperators),
            CB_CANCEL_MESSAGE => Some(Self::CancelMessage),
            CB_CANCEL_REPLY => Some(Self::CancelReply),
            other => other
                .strip_prefix(CB_REPLY_PREFIX)
                .and_then(|id| id.parse::<i64>().ok())
                .map(Self::BindReply),
        }
    }

    /// Callback data for a category-qualified KYC check button
    #[must_use]
    pub fn encode_kyc_check(category: MemberCategory) -> &'static str {
        match category {
            MemberCategory::NewMember => CB_KYC_CHECK_NEW,
            MemberCategory::OldMember => CB_KYC_CHECK_OLD,
        }
    }

    /// Callback data for a category-qualified payment info button
    #[must_use]
    pub fn encode_payment_info(category: MemberCategory) -> &'static str {
        match category {
            MemberCategory::NewMember => CB_PAYMENT_INFO_NEW,
            MemberCategory::OldMember => CB_PAYMENT_INFO_OLD,
        }
    }

    /// Callback data for a category-qualified payment code button
    #[must_use]
    pub fn encode_payment(category: MemberCategory) -> &'static str {
        match category {
            MemberCategory::NewMember => CB_PAYMENT_NEW,
            MemberCategory::OldMember => CB_PAYMENT_OLD,
        }
    }

    /// Callback data binding a reply to `user_id`
    #[must_use]
    pub fn encode_reply(user_id: i64) -> String {
        format!("{CB_REPLY_PREFIX}{user_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_identifiers_win_over_prefixes() {
        // "kyc_check_start" shares a prefix with the category checks and
        // must parse as the selection menu, not a check
        assert_eq!(CallbackAction::parse("kyc_check_start"), Some(CallbackAction::KycStart));
        assert_eq!(
            CallbackAction::parse("kyc_check_new"),
            Some(CallbackAction::KycCheck(MemberCategory::NewMember))
        );
        assert_eq!(
            CallbackAction::parse("payment_info_start"),
            Some(CallbackAction::PaymentInfoStart)
        );
        assert_eq!(
            CallbackAction::parse("payment_info_old"),
            Some(CallbackAction::PaymentInfo(MemberCategory::OldMember))
        );
        assert_eq!(
            CallbackAction::parse("payment_new"),
            Some(CallbackAction::IssuePaymentCode(MemberCategory::NewMember))
        );
    }

    #[test]
    fn test_reply_binding_roundtrip() {
        let data = CallbackAction::encode_reply(5512534898);
        assert_eq!(
            CallbackAction::parse(&data),
            Some(CallbackAction::BindReply(5512534898))
        );
    }

    #[test]
    fn test_malformed_data_rejected() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("reply_"), None);
        assert_eq!(CallbackAction::parse("reply_abc"), None);
        assert_eq!(CallbackAction::parse("kyc_check_"), None);
        assert_eq!(CallbackAction::parse("unknown_button"), None);
    }
}
