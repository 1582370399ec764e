//! Typed analysis result shapes.
//!
//! Target JSON structures for each analysis, deserialized from repaired
//! model output and validated after parsing instead of trusting the model
//! to follow a schema pasted into the prompt.

use serde::{Deserialize, Deserializer, Serialize};

/// Safety verdict shared by every analysis type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SafetyVerdict {
    /// 0 (dangerous) to 100 (safe).
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: u8,
    /// Flags raised by the model, e.g. "phishing", "adult", "malware".
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Accept whatever number shape the model produced for the score (floats,
/// out-of-range values, null) and clamp it into 0-100.
fn lenient_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(raw.clamp(0.0, 100.0).round() as u8)
}

impl SafetyVerdict {
    /// Clamp out-of-range scores, for verdicts built outside deserialization.
    pub fn normalize(&mut self) {
        if self.score > 100 {
            self.score = 100;
        }
    }
}

/// Full-page content/safety analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtmlAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub safety: SafetyVerdict,
}

/// Visual analysis of a full-page screenshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotAnalysis {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub design_quality: Option<String>,
    #[serde(default)]
    pub safety: SafetyVerdict,
}

/// Analysis of one extracted image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub safety: SafetyVerdict,
}

/// Analysis of one extracted outbound link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkAnalysis {
    #[serde(default)]
    pub url: String,
    /// "low", "medium", or "high".
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_analysis_tolerates_missing_fields() {
        let analysis: HtmlAnalysis =
            serde_json::from_str(r#"{"summary": "A shop."}"#).unwrap();
        assert_eq!(analysis.summary, "A shop.");
        assert!(analysis.keywords.is_empty());
        assert_eq!(analysis.safety.score, 0);
    }

    #[test]
    fn test_safety_normalize_clamps_score() {
        let mut verdict = SafetyVerdict {
            score: 250,
            flags: vec![],
        };
        verdict.normalize();
        assert_eq!(verdict.score, 100);
    }

    #[test]
    fn test_score_parses_floats() {
        let verdict: SafetyVerdict =
            serde_json::from_str(r#"{"score": 87.5, "flags": []}"#).unwrap();
        assert_eq!(verdict.score, 88);
    }

    #[test]
    fn test_score_clamps_out_of_range_values() {
        let high: SafetyVerdict = serde_json::from_str(r#"{"score": 300}"#).unwrap();
        assert_eq!(high.score, 100);

        let negative: SafetyVerdict = serde_json::from_str(r#"{"score": -5}"#).unwrap();
        assert_eq!(negative.score, 0);

        let null: SafetyVerdict = serde_json::from_str(r#"{"score": null}"#).unwrap();
        assert_eq!(null.score, 0);
    }

    #[test]
    fn test_analysis_with_float_score_still_parses() {
        let analysis: HtmlAnalysis = serde_json::from_str(
            r#"{"summary": "A shop.", "safety": {"score": 92.4, "flags": ["ads"]}}"#,
        )
        .unwrap();
        assert_eq!(analysis.safety.score, 92);
        assert_eq!(analysis.safety.flags, vec!["ads"]);
    }

    #[test]
    fn test_full_roundtrip() {
        let analysis = ImageAnalysis {
            url: "https://example.com/a.png".to_string(),
            description: "A logo.".to_string(),
            safety: SafetyVerdict {
                score: 95,
                flags: vec![],
            },
        };
        let json = serde_json::to_string(&analysis).unwrap();
        let back: ImageAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, analysis.url);
        assert_eq!(back.safety.score, 95);
    }
}
