//! LLM-backed JSON repair.
//!
//! Guarantees a text blob becomes valid JSON by iteratively asking a model
//! to fix it, escalating through tiers as cheaper attempts fail. Written
//! as an explicit bounded loop with an attempt counter rather than
//! recursion, so stack depth stays flat and the retry policy is testable
//! on its own.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::client::{AiMessage, AiRequest, ChatBackend};
use super::models::{repair_tier_for_attempt, TierModels};
use super::AiError;

/// Hard cap on repair retries; requests above it are rejected outright.
pub const MAX_REPAIR_RETRIES: usize = 5;

const REPAIR_SYSTEM_PROMPT: &str = "You repair malformed JSON. Respond with ONLY the corrected \
     JSON document. No markdown, no code fences, no backticks, no commentary. Preserve all \
     existing escaping exactly; do not re-encode string contents.";

/// Options for a repair run.
#[derive(Debug, Clone)]
pub struct JsonRepairOptions {
    /// Repair attempts after the initial parse (capped at
    /// [`MAX_REPAIR_RETRIES`]).
    pub max_retries: usize,
}

impl Default for JsonRepairOptions {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Errors from the repair loop.
#[derive(Debug, Error)]
pub enum JsonRepairError {
    #[error("max_retries {requested} exceeds cap of {MAX_REPAIR_RETRIES}")]
    TooManyRetries { requested: usize },

    #[error("JSON still invalid after {attempts} parse attempts")]
    Exhausted {
        attempts: usize,
        /// Last raw text, kept for diagnostics.
        last_raw: String,
    },

    #[error(transparent)]
    Backend(#[from] AiError),
}

/// Parse `raw` as JSON, repairing it through the backend on failure.
///
/// Attempt 0 parses the raw text directly; a well-formed input returns
/// without any backend call. Each subsequent attempt sends the broken text
/// plus the parser error to the tier selected for that attempt and parses
/// the reply. Exhaustion carries the final raw text.
pub async fn repair_json<B: ChatBackend + ?Sized>(
    backend: &B,
    tiers: &TierModels,
    raw: &str,
    options: &JsonRepairOptions,
) -> Result<Value, JsonRepairError> {
    if options.max_retries > MAX_REPAIR_RETRIES {
        return Err(JsonRepairError::TooManyRetries {
            requested: options.max_retries,
        });
    }

    let mut current = strip_code_fences(raw).to_string();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let parse_error = match serde_json::from_str::<Value>(&current) {
            Ok(value) => return Ok(value),
            Err(e) => e.to_string(),
        };

        // attempts counts parse attempts; repairs used so far is attempts-1
        let repairs_used = attempts - 1;
        if repairs_used >= options.max_retries {
            return Err(JsonRepairError::Exhausted {
                attempts,
                last_raw: current,
            });
        }

        let tier = repair_tier_for_attempt(repairs_used);
        let model = tiers.model_for(tier);
        debug!(
            "JSON parse failed ({}), repair attempt {} via {} tier ({})",
            parse_error,
            repairs_used + 1,
            format!("{:?}", tier).to_lowercase(),
            model
        );

        let prompt = format!(
            "The following text should be a single valid JSON document but fails to parse.\n\
             Parser error: {parse_error}\n\nBroken JSON:\n{current}"
        );
        let request = AiRequest::new(vec![
            AiMessage::system(REPAIR_SYSTEM_PROMPT),
            AiMessage::user(prompt),
        ])
        .with_model(model)
        .with_temperature(0.0);

        let response = backend.chat(request).await?;
        let content = response.first_content()?;
        current = strip_code_fences(content).to_string();
    }
}

/// Remove a surrounding markdown code fence, if the model added one anyway.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}
