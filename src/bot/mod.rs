/// Callback-data parsing into typed actions
pub mod callbacks;
/// General command, callback, and message handlers
pub mod handlers;
/// Operator relay protocol
pub mod relay;
/// Resilient send/edit wrappers with retry
pub mod resilient;
/// Free-text routing decisions
pub mod router;
/// User state and dialogue management
pub mod state;
/// Keyboards and message texts
pub mod views;
