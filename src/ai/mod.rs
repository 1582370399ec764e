//! AI gateway and analysis plumbing.
//!
//! One chat-completion abstraction over an upstream multi-model routing
//! API, a bounded escalating-tier JSON repair loop, and the typed shapes
//! analyses are parsed into.

mod client;
mod json_repair;
mod models;
pub mod schema;

pub use client::{AiClient, AiConfig, AiError, AiMessage, AiRequest, AiResponse, ChatBackend, Usage};
pub use json_repair::{repair_json, JsonRepairError, JsonRepairOptions};
pub use models::{repair_tier_for_attempt, ModelTier, TierModels};
