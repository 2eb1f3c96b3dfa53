//! Gatedesk membership bot library.
//!
//! Conversation routing, per-user rate limiting, KYC verification lookups
//! against Google Sheets, and the user/operator relay protocol.

/// Telegram handlers, views, and the conversation state machine.
pub mod bot;
/// Configuration management.
pub mod config;
/// Liveness HTTP endpoint.
pub mod health;
/// Per-identity sliding-window rate limiter.
pub mod limiter;
/// Google Sheets row source.
pub mod sheets;
/// Utility functions.
pub mod utils;
/// Verification status resolution.
pub mod verify;
