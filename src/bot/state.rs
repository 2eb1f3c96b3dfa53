use serde::{Deserialize, Serialize};

/// Represents the current step of a chat's multi-turn interaction.
///
/// One state per chat, last-write-wins, held in `InMemStorage` and lost on
/// restart. Ordinary users only ever occupy `Idle` and `AwaitingUserMessage`;
/// operators only `Idle` and `AwaitingOperatorReply`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum State {
    /// No multi-turn interaction in flight
    #[default]
    Idle,
    /// User pressed "contact operators" and is composing a message
    AwaitingUserMessage,
    /// Operator pressed a reply button and is composing a reply
    AwaitingOperatorReply {
        /// User the reply is bound to
        target: i64,
    },
}
