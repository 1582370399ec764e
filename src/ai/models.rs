//! Model tier routing.
//!
//! Three capability tiers back the JSON repair escalation: cheap models
//! first, expensive ones only after cheaper attempts fail.

use serde::{Deserialize, Serialize};

/// Capability tier of a configured model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Low,
    Medium,
    High,
}

/// Model names configured per tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierModels {
    #[serde(default = "default_low")]
    pub low: String,
    #[serde(default = "default_medium")]
    pub medium: String,
    #[serde(default = "default_high")]
    pub high: String,
}

fn default_low() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_medium() -> String {
    "openai/gpt-4o".to_string()
}

fn default_high() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            low: default_low(),
            medium: default_medium(),
            high: default_high(),
        }
    }
}

impl TierModels {
    /// Model name for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Low => &self.low,
            ModelTier::Medium => &self.medium,
            ModelTier::High => &self.high,
        }
    }
}

/// Tier used for the Nth JSON repair attempt: low, medium, then high for
/// every remaining attempt.
pub fn repair_tier_for_attempt(attempt: usize) -> ModelTier {
    match attempt {
        0 => ModelTier::Low,
        1 => ModelTier::Medium,
        _ => ModelTier::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_tier_escalation_sequence() {
        let tiers: Vec<ModelTier> = (0..5).map(repair_tier_for_attempt).collect();
        assert_eq!(
            tiers,
            vec![
                ModelTier::Low,
                ModelTier::Medium,
                ModelTier::High,
                ModelTier::High,
                ModelTier::High,
            ]
        );
    }

    #[test]
    fn test_model_for_tier() {
        let tiers = TierModels::default();
        assert_eq!(tiers.model_for(ModelTier::Low), tiers.low);
        assert_eq!(tiers.model_for(ModelTier::High), tiers.high);
    }
}
