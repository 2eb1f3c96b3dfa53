//! Free-text routing decisions
//!
//! Classifies an inbound free-text message by sender role and current
//! conversation state into exactly one route. Kept free of Telegram types
//! so the state machine is testable without a live transport.

use crate::bot::state::State;
use crate::limiter::RateLimiter;

/// What to do with a free-text message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextRoute {
    /// Relay the user's message to the operators and return to `Idle`
    RelayToOperators,
    /// Rejection notice; the composing state is kept so the user can retry
    RateLimited,
    /// Deliver the operator's text to the bound user and return to `Idle`
    DeliverOperatorReply {
        /// User the reply is bound to
        target: i64,
    },
    /// Operator text with no binding in flight: notice, stay at `Idle`
    OperatorNoTarget,
    /// No active conversation: drop silently, no transition, no reply
    Ignore,
}

/// Routes one free-text message.
///
/// Role is checked before state: an operator's text is never treated as a
/// user-to-operator message even if stale state says otherwise. The rate
/// limiter is only consulted on the relay path, so a rejected attempt is
/// the only case that both keeps state and produces no relay.
pub fn route_text(sender: i64, is_operator: bool, state: &State, limiter: &RateLimiter) -> TextRoute {
    if is_operator {
        return match state {
            State::AwaitingOperatorReply { target } => {
                TextRoute::DeliverOperatorReply { target: *target }
            }
            State::Idle | State::AwaitingUserMessage => TextRoute::OperatorNoTarget,
        };
    }

    match state {
        State::AwaitingUserMessage => {
            if limiter.admit(sender) {
                TextRoute::RelayToOperators
            } else {
                TextRoute::RateLimited
            }
        }
        State::Idle | State::AwaitingOperatorReply { .. } => TextRoute::Ignore,
    }
}
