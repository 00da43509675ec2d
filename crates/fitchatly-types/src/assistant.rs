//! The reserved assistant identity.
//!
//! One well-known user row authors every generated reply. It is seeded by
//! the database migrations and is not a real account: no credentials, no
//! email, no username.

pub const ASSISTANT_USER_ID: &str = "gpt-assistant-user-id";
pub const ASSISTANT_NAME: &str = "AI Fitness Assistant";
pub const ASSISTANT_ROLE: &str = "assistant";

/// Fixed system instruction sent with every completion request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI fitness assistant.";
