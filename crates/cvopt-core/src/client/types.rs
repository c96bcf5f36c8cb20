//! Wire and domain types for the CV optimizer API.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mime;

/// A résumé file selected for upload.
///
/// Bytes are shared so the file can sit in workflow state and be handed to a
/// request task without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadFile {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk and detects its MIME type.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is empty.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes.is_empty() {
            anyhow::bail!("{} is empty", path.display());
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        let mime_type = mime::detect_mime_type(path, &bytes).to_string();
        Ok(Self::new(filename, mime_type, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Body of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl TokenResponse {
    /// Returns the token if the server sent a usable one.
    pub fn into_token(self) -> Option<String> {
        self.access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Body of `/auth/me`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "tier")]
    pub plan: Option<String>,
}

/// Coverage scores, all normalized to fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AtsScore {
    pub score_overall: f64,
    /// Per-category coverage (skills, experience, ...).
    pub categories: BTreeMap<String, f64>,
}

/// Optional AI-written suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AiSuggestions {
    pub improved_summary: Option<String>,
    pub improved_bullets: Vec<String>,
    pub cover_letter: Option<String>,
    pub suggestions: Vec<String>,
}

impl AiSuggestions {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self {
                improved_summary: Some(text),
                ..Self::default()
            }),
            Value::Object(_) => serde_json::from_value::<Self>(value)
                .ok()
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.improved_summary.is_none()
            && self.improved_bullets.is_empty()
            && self.cover_letter.is_none()
            && self.suggestions.is_empty()
    }
}

/// Reading-level estimate for the CV.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Readability {
    pub label: Option<String>,
    pub grade_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadabilityWire {
    label: Option<String>,
    grade_level: Option<Value>,
}

impl ReadabilityWire {
    fn into_readability(self) -> Option<Readability> {
        // Grade level arrives as a number or as text.
        let grade_level = match self.grade_level {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        };
        let label = self.label.filter(|l| !l.trim().is_empty());
        if label.is_none() && grade_level.is_none() {
            return None;
        }
        Some(Readability { label, grade_level })
    }
}

/// Result of `/analyze` or `/analyze/text`.
///
/// Immutable once received; the next successful analysis replaces it whole.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "AnalysisWire")]
pub struct AnalysisResult {
    pub ats_score: AtsScore,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub ai_suggestions: Option<AiSuggestions>,
    pub readability: Option<Readability>,
    /// Uploaded filename, file analyses only.
    pub filename: Option<String>,
    /// Characters extracted from the CV.
    pub cv_chars: Option<u64>,
    /// Plain text the server extracted from an uploaded file.
    pub extracted_text: Option<String>,
}

/// Keywords and AI suggestions appear either nested or at top level
/// depending on the server version; both are accepted.
#[derive(Debug, Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default, alias = "characters")]
    length_cv_chars: Option<u64>,
    #[serde(default, alias = "ats_check", alias = "ats_score")]
    ats: Option<AtsWire>,
    #[serde(default, alias = "ai_suggestions")]
    ai: Option<Value>,
    #[serde(default)]
    matched_keywords: Vec<String>,
    #[serde(default)]
    missing_keywords: Vec<String>,
    #[serde(default, alias = "extracted_text", alias = "text")]
    cv_text: Option<String>,
    #[serde(default)]
    readability: Option<ReadabilityWire>,
    #[serde(default)]
    improved_summary: Option<String>,
    #[serde(default)]
    improved_bullets: Vec<String>,
    #[serde(default)]
    cover_letter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtsWire {
    #[serde(default, alias = "overall", alias = "score")]
    score_overall: Option<f64>,
    #[serde(default)]
    matched_keywords: Vec<String>,
    #[serde(default)]
    missing_keywords: Vec<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<AnalysisWire> for AnalysisResult {
    fn from(wire: AnalysisWire) -> Self {
        let ats = wire.ats.unwrap_or_default();

        let categories: BTreeMap<String, f64> = ats
            .rest
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), normalize_fraction(v))))
            .collect();

        let score_overall = match ats.score_overall {
            Some(score) => normalize_fraction(score),
            None if !categories.is_empty() => {
                categories.values().sum::<f64>() / categories.len() as f64
            }
            None => 0.0,
        };

        let top_level = AiSuggestions {
            improved_summary: wire.improved_summary.filter(|t| !t.trim().is_empty()),
            improved_bullets: wire.improved_bullets,
            cover_letter: wire.cover_letter.filter(|t| !t.trim().is_empty()),
            suggestions: Vec::new(),
        };
        let ai_suggestions = wire
            .ai
            .and_then(AiSuggestions::from_value)
            .or_else(|| (!top_level.is_empty()).then_some(top_level));

        let pick = |inner: Vec<String>, outer: Vec<String>| if inner.is_empty() { outer } else { inner };

        AnalysisResult {
            ats_score: AtsScore {
                score_overall,
                categories,
            },
            matched_keywords: pick(ats.matched_keywords, wire.matched_keywords),
            missing_keywords: pick(ats.missing_keywords, wire.missing_keywords),
            ai_suggestions,
            readability: wire.readability.and_then(ReadabilityWire::into_readability),
            filename: wire.filename,
            cv_chars: wire.length_cv_chars,
            extracted_text: wire.cv_text.filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Accepts both fractions (`0.72`) and percentages (`72`).
fn normalize_fraction(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    fraction.clamp(0.0, 1.0)
}

/// Result of `/rewrite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResult {
    #[serde(alias = "rewritten")]
    pub rewritten_text: String,
}

/// Result of `/resumes/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default, alias = "length_cv_chars")]
    pub characters: u64,
    #[serde(default)]
    pub preview: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_file_analysis_with_nested_keywords() {
        let body = json!({
            "filename": "resume.pdf",
            "length_cv_chars": 5234,
            "ats": {
                "score_overall": 0.72,
                "skills": 0.8,
                "experience": 0.65,
                "matched_keywords": ["rust", "postgres"],
                "missing_keywords": ["kubernetes"]
            },
            "ai": {"improved_summary": "Backend engineer...", "improved_bullets": ["Led X"]},
            "cv_text": "Jane Doe\nBackend engineer"
        });

        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert!((result.ats_score.score_overall - 0.72).abs() < f64::EPSILON);
        assert_eq!(result.ats_score.categories.len(), 2);
        assert_eq!(result.matched_keywords, vec!["rust", "postgres"]);
        assert_eq!(result.missing_keywords, vec!["kubernetes"]);
        assert_eq!(result.filename.as_deref(), Some("resume.pdf"));
        assert_eq!(result.cv_chars, Some(5234));
        assert_eq!(
            result.extracted_text.as_deref(),
            Some("Jane Doe\nBackend engineer")
        );
        let ai = result.ai_suggestions.unwrap();
        assert_eq!(ai.improved_bullets, vec!["Led X"]);
    }

    #[test]
    fn test_top_level_keywords_and_percent_scores() {
        let body = json!({
            "ats": {"score_overall": 85, "keywords": 90},
            "matched_keywords": ["go"],
            "missing_keywords": [],
            "ai": null
        });

        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert!((result.ats_score.score_overall - 0.85).abs() < 1e-9);
        assert!((result.ats_score.categories["keywords"] - 0.9).abs() < 1e-9);
        assert_eq!(result.matched_keywords, vec!["go"]);
        assert!(result.missing_keywords.is_empty());
        assert!(result.ai_suggestions.is_none());
    }

    #[test]
    fn test_missing_overall_uses_category_average() {
        let body = json!({"ats": {"skills": 0.5, "format": 1.0}});
        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert!((result.ats_score.score_overall - 0.75).abs() < 1e-9);

        let empty: AnalysisResult = serde_json::from_value(json!({})).unwrap();
        assert!(empty.ats_score.score_overall.abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_is_clamped() {
        assert!((normalize_fraction(250.0) - 1.0).abs() < f64::EPSILON);
        assert!(normalize_fraction(-3.0).abs() < f64::EPSILON);
        assert!(normalize_fraction(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ai_as_plain_text() {
        let body = json!({"ats": {"score_overall": 0.4}, "ai": "Tighten your summary."});
        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert_eq!(
            result.ai_suggestions.unwrap().improved_summary.as_deref(),
            Some("Tighten your summary.")
        );
    }

    #[test]
    fn test_readability_and_top_level_suggestions() {
        let body = json!({
            "readability": {"label": "Fairly easy", "grade_level": 9.5},
            "matched_keywords": ["rust"],
            "improved_summary": "Backend engineer focused on Rust.",
            "improved_bullets": ["Cut p99 latency by 40%"],
            "cover_letter": "Dear team,"
        });

        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert_eq!(
            result.readability,
            Some(Readability {
                label: Some("Fairly easy".into()),
                grade_level: Some("9.5".into()),
            })
        );
        let ai = result.ai_suggestions.unwrap();
        assert_eq!(ai.improved_summary.as_deref(), Some("Backend engineer focused on Rust."));
        assert_eq!(ai.improved_bullets, vec!["Cut p99 latency by 40%"]);
        assert_eq!(ai.cover_letter.as_deref(), Some("Dear team,"));
    }

    #[test]
    fn test_nested_suggestions_win_over_top_level() {
        let body = json!({
            "ai": {"improved_summary": "Nested"},
            "improved_summary": "Top level",
            "readability": {}
        });

        let result: AnalysisResult = serde_json::from_value(body).unwrap();
        assert_eq!(
            result.ai_suggestions.unwrap().improved_summary.as_deref(),
            Some("Nested")
        );
        assert!(result.readability.is_none());
    }

    #[test]
    fn test_rewrite_accepts_short_field_name() {
        let result: RewriteResult = serde_json::from_value(json!({"rewritten": "New CV"})).unwrap();
        assert_eq!(result.rewritten_text, "New CV");
    }

    #[test]
    fn test_token_response_ignores_blank_token() {
        let response: TokenResponse = serde_json::from_value(json!({"access_token": " "})).unwrap();
        assert_eq!(response.into_token(), None);
        let response: TokenResponse =
            serde_json::from_value(json!({"access_token": "abc", "token_type": "bearer"})).unwrap();
        assert_eq!(response.into_token().as_deref(), Some("abc"));
    }
}
