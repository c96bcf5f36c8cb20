//! Plain-text rendering of results for the terminal.
//!
//! Everything here is a pure function of its input.

use std::fmt::Write as _;

use comfy_table::{ContentArrangement, Table};

use crate::client::{
    Account, AiSuggestions, AnalysisResult, Failure, FailureKind, Readability, RewriteResult,
    UploadReceipt,
};

pub const UPGRADE_MESSAGE: &str = "Upgrade your plan to use this feature.";

const TABLE_WIDTH: u16 = 80;

/// Formats a `[0, 1]` fraction as a whole percentage.
pub fn percent(fraction: f64) -> String {
    format!("{:.0}%", (fraction * 100.0).round())
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_width(TABLE_WIDTH);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn keywords(list: &[String]) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(", ")
    }
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();

    if let Some(filename) = &result.filename {
        let _ = writeln!(out, "File: {filename}");
    }
    if let Some(chars) = result.cv_chars {
        let _ = writeln!(out, "CV length: {chars} characters");
    }
    if let Some(readability) = &result.readability {
        let _ = writeln!(out, "Readability: {}", render_readability(readability));
    }

    let mut scores = table();
    scores.set_header(vec!["Category", "Score"]);
    scores.add_row(vec!["Overall".to_string(), percent(result.ats_score.score_overall)]);
    for (name, value) in &result.ats_score.categories {
        scores.add_row(vec![title_case(name), percent(*value)]);
    }
    let _ = writeln!(out, "{scores}");

    let mut words = table();
    words.set_header(vec!["Matched keywords", "Missing keywords"]);
    words.add_row(vec![
        keywords(&result.matched_keywords),
        keywords(&result.missing_keywords),
    ]);
    let _ = writeln!(out, "{words}");

    if let Some(ai) = &result.ai_suggestions {
        out.push_str(&render_suggestions(ai));
    }
    out
}

fn render_readability(readability: &Readability) -> String {
    match (&readability.label, &readability.grade_level) {
        (Some(label), Some(grade)) => format!("{label} (grade {grade})"),
        (Some(label), None) => label.clone(),
        (None, Some(grade)) => format!("grade {grade}"),
        (None, None) => "-".to_string(),
    }
}

fn render_suggestions(ai: &AiSuggestions) -> String {
    let mut out = String::from("\nAI suggestions\n");
    if let Some(summary) = &ai.improved_summary {
        let _ = writeln!(out, "\nImproved summary:\n{}", summary.trim());
    }
    if !ai.improved_bullets.is_empty() {
        out.push_str("\nSuggested bullets:\n");
        for bullet in &ai.improved_bullets {
            let _ = writeln!(out, "  • {}", bullet.trim());
        }
    }
    if !ai.suggestions.is_empty() {
        out.push_str("\nTips:\n");
        for tip in &ai.suggestions {
            let _ = writeln!(out, "  • {}", tip.trim());
        }
    }
    if let Some(letter) = &ai.cover_letter {
        let _ = writeln!(out, "\nCover letter draft:\n{}", letter.trim());
    }
    out
}

pub fn render_rewrite(result: &RewriteResult) -> String {
    format!("Rewritten CV\n\n{}\n", result.rewritten_text.trim())
}

pub fn render_upload(receipt: &UploadReceipt) -> String {
    let mut out = format!(
        "Uploaded {} ({} characters extracted)\n",
        receipt.filename, receipt.characters
    );
    if !receipt.preview.trim().is_empty() {
        let _ = writeln!(out, "\n{}", receipt.preview.trim());
    }
    out
}

pub fn render_account(account: &Account) -> String {
    let email = account.email.as_deref().unwrap_or("unknown");
    match &account.plan {
        Some(plan) => format!("Signed in as {email} ({plan} plan)\n"),
        None => format!("Signed in as {email}\n"),
    }
}

/// User-facing text for a failure. Payment-required failures always point at
/// the upgrade path.
pub fn render_failure(failure: &Failure) -> String {
    match failure.kind {
        FailureKind::PaymentRequired => format!("{} {UPGRADE_MESSAGE}", failure.message),
        _ => failure.message.clone(),
    }
}

fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::AtsScore;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            ats_score: AtsScore {
                score_overall: 0.724,
                categories: BTreeMap::from([("hard_skills".to_string(), 0.5)]),
            },
            matched_keywords: vec!["rust".into(), "tokio".into()],
            missing_keywords: vec!["kubernetes".into()],
            ai_suggestions: Some(AiSuggestions {
                improved_bullets: vec!["Cut p99 latency by 40%".into()],
                ..AiSuggestions::default()
            }),
            readability: Some(Readability {
                label: Some("Standard".into()),
                grade_level: Some("10".into()),
            }),
            filename: Some("cv.pdf".into()),
            cv_chars: Some(1200),
            extracted_text: None,
        }
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(0.724), "72%");
        assert_eq!(percent(1.0), "100%");
        assert_eq!(percent(0.0), "0%");
    }

    #[test]
    fn test_analysis_report_lists_scores_and_keywords() {
        let text = render_analysis(&sample());
        assert!(text.contains("File: cv.pdf"));
        assert!(text.contains("1200 characters"));
        assert!(text.contains("Readability: Standard (grade 10)"));
        assert!(text.contains("72%"));
        assert!(text.contains("Hard Skills"));
        assert!(text.contains("kubernetes"));
        assert!(text.contains("Cut p99 latency by 40%"));
    }

    #[test]
    fn test_payment_required_points_to_upgrade() {
        let text = render_failure(&Failure::payment_required("This feature requires a paid plan."));
        assert!(text.contains(UPGRADE_MESSAGE));

        let text = render_failure(&Failure::rejected("Bad input"));
        assert_eq!(text, "Bad input");
    }
}
