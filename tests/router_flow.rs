//! End-to-end conversation flow scenarios over the real state store,
//! limiter, callback table, and router — everything except the Telegram
//! transport itself.

use gatedesk::bot::callbacks::CallbackAction;
use gatedesk::bot::handlers::{is_authorized_operator, reset_dialogue};
use gatedesk::bot::router::{route_text, TextRoute};
use gatedesk::bot::state::State;
use gatedesk::config::Settings;
use gatedesk::limiter::RateLimiter;
use gatedesk::verify::MemberCategory;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::ChatId;

type TestDialogue = Dialogue<State, InMemStorage<State>>;

fn dialogue(storage: &Arc<InMemStorage<State>>, chat: i64) -> TestDialogue {
    Dialogue::new(storage.clone(), ChatId(chat))
}

fn test_settings(operator_ids: &str) -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        operator_ids_str: Some(operator_ids.to_string()),
        new_member_operator_str: None,
        old_member_operator_str: None,
        operator_handle_new: Some("@desk".to_string()),
        operator_handle_old: None,
        sheets_api_key: None,
        spreadsheet_id: None,
        new_member_ranges_str: None,
        old_member_ranges_str: None,
        form_url: "https://example.com/form".to_string(),
        health_port_str: None,
    }
}

async fn state_of(dialogue: &TestDialogue) -> State {
    dialogue.get().await.expect("storage read").unwrap_or_default()
}

/// Scenario: contact flow with rate limiting. Three messages pass within
/// the window, the fourth is rejected and the composing state survives the
/// rejection.
#[tokio::test]
async fn contact_flow_respects_rate_limit() {
    let storage = InMemStorage::<State>::new();
    let settings = test_settings("900");
    let limiter = RateLimiter::new(3, Duration::from_secs(60));
    let user = 100;
    let d = dialogue(&storage, user);

    for round in 0..3 {
        // "Contact Us" button arms the composing state
        assert_eq!(
            CallbackAction::parse("contact_operators"),
            Some(CallbackAction::ContactOperators)
        );
        assert!(!is_authorized_operator(user, &settings));
        d.update(State::AwaitingUserMessage).await.expect("update");

        let route = route_text(user, false, &state_of(&d).await, &limiter);
        assert_eq!(route, TextRoute::RelayToOperators, "message {round} should relay");

        // Relay completed: back to Idle
        d.exit().await.expect("exit");
        assert_eq!(state_of(&d).await, State::Idle);
    }

    // Fourth message within the same window: rejected, state kept
    d.update(State::AwaitingUserMessage).await.expect("update");
    let route = route_text(user, false, &state_of(&d).await, &limiter);
    assert_eq!(route, TextRoute::RateLimited);
    assert_eq!(state_of(&d).await, State::AwaitingUserMessage);
}

/// Scenario: an unauthorized identity pressing a reply affordance is denied
/// and no reply binding is ever created for it.
#[tokio::test]
async fn unauthorized_reply_binding_is_denied() {
    let storage = InMemStorage::<State>::new();
    let settings = test_settings("900, 901");
    let intruder = 555;

    // The button data itself parses fine; authorization is what stops it
    assert_eq!(
        CallbackAction::parse("reply_100"),
        Some(CallbackAction::BindReply(100))
    );
    assert!(!is_authorized_operator(intruder, &settings));
    assert!(is_authorized_operator(900, &settings));
    assert!(is_authorized_operator(901, &settings));

    // Denial performs no state mutation
    let d = dialogue(&storage, intruder);
    assert_eq!(state_of(&d).await, State::Idle);
}

/// Scenario: two operators bound to two different users concurrently;
/// each reply routes to its own bound target.
#[tokio::test]
async fn operator_bindings_are_independent() {
    let storage = InMemStorage::<State>::new();
    let limiter = RateLimiter::new(3, Duration::from_secs(60));
    let (op_a, op_b) = (900, 901);
    let (user_1, user_2) = (100, 200);

    let da = dialogue(&storage, op_a);
    let db = dialogue(&storage, op_b);
    da.update(State::AwaitingOperatorReply { target: user_1 })
        .await
        .expect("bind a");
    db.update(State::AwaitingOperatorReply { target: user_2 })
        .await
        .expect("bind b");

    assert_eq!(
        route_text(op_a, true, &state_of(&da).await, &limiter),
        TextRoute::DeliverOperatorReply { target: user_1 }
    );
    assert_eq!(
        route_text(op_b, true, &state_of(&db).await, &limiter),
        TextRoute::DeliverOperatorReply { target: user_2 }
    );

    // A's binding is consumed without touching B's
    da.exit().await.expect("exit a");
    assert_eq!(state_of(&da).await, State::Idle);
    assert_eq!(
        state_of(&db).await,
        State::AwaitingOperatorReply { target: user_2 }
    );
}

/// Scenario: operator free text without a binding yields the no-target
/// notice; user free text with no active conversation is dropped silently.
#[tokio::test]
async fn unbound_text_routes() {
    let storage = InMemStorage::<State>::new();
    let limiter = RateLimiter::new(3, Duration::from_secs(60));

    let op = dialogue(&storage, 900);
    assert_eq!(
        route_text(900, true, &state_of(&op).await, &limiter),
        TextRoute::OperatorNoTarget
    );

    let user = dialogue(&storage, 100);
    assert_eq!(
        route_text(100, false, &state_of(&user).await, &limiter),
        TextRoute::Ignore
    );
}

/// Back navigation resets any state and is idempotent, including for chats
/// that never stored a dialogue at all.
#[tokio::test]
async fn back_resets_state_idempotently() {
    let storage = InMemStorage::<State>::new();
    let d = dialogue(&storage, 100);

    d.update(State::AwaitingUserMessage).await.expect("update");
    assert_eq!(CallbackAction::parse("back"), Some(CallbackAction::Back));
    reset_dialogue(&d).await;
    assert_eq!(state_of(&d).await, State::Idle);

    // Second back is a no-op beyond the re-render
    reset_dialogue(&d).await;
    assert_eq!(state_of(&d).await, State::Idle);

    // A fresh chat with nothing stored can also navigate back
    let fresh = dialogue(&storage, 200);
    reset_dialogue(&fresh).await;
    assert_eq!(state_of(&fresh).await, State::Idle);
}

/// Category-qualified buttons keep their category through the parse table.
#[test]
fn category_buttons_parse_to_their_category() {
    assert_eq!(
        CallbackAction::parse(CallbackAction::encode_kyc_check(MemberCategory::OldMember)),
        Some(CallbackAction::KycCheck(MemberCategory::OldMember))
    );
    assert_eq!(
        CallbackAction::parse(CallbackAction::encode_payment(MemberCategory::NewMember)),
        Some(CallbackAction::IssuePaymentCode(MemberCategory::NewMember))
    );
    assert_eq!(
        CallbackAction::parse(CallbackAction::encode_payment_info(MemberCategory::OldMember)),
        Some(CallbackAction::PaymentInfo(MemberCategory::OldMember))
    );
}
