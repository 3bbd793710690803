//! Export formatting for analysis results
//!
//! Pure functions, no I/O. The text form is what gets copied or printed; the
//! JSON form is for handing results to other tools.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

use super::types::AnalysisResult;

const DEGRADED_NOTE: &str = "(unavailable: analysis service did not respond)";

/// Plain-text summary of one file's analysis
pub fn format_summary(file_name: &str, result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", file_name);
    out.push('\n');

    let _ = writeln!(out, "Clauses ({}):", result.clauses.len());
    if result.degraded.clauses {
        let _ = writeln!(out, "  {}", DEGRADED_NOTE);
    } else if result.clauses.is_empty() {
        out.push_str("  None found\n");
    }
    for (i, clause) in result.clauses.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, clause.title);
        if !clause.snippet.is_empty() {
            let _ = writeln!(out, "     \"{}\"", clause.snippet);
        }
        if !clause.reason.is_empty() {
            let _ = writeln!(out, "     Why: {}", clause.reason);
        }
    }
    out.push('\n');

    let _ = writeln!(out, "Risks ({}):", result.risks.len());
    if result.degraded.risks {
        let _ = writeln!(out, "  {}", DEGRADED_NOTE);
    } else if result.risks.is_empty() {
        out.push_str("  None found\n");
    }
    for (i, risk) in result.risks.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. [{}] {}",
            i + 1,
            risk.severity.as_str().to_uppercase(),
            risk.risk
        );
        if !risk.explanation.is_empty() {
            let _ = writeln!(out, "     {}", risk.explanation);
        }
        if !risk.recommended_action.is_empty() {
            let _ = writeln!(out, "     Recommended: {}", risk.recommended_action);
        }
    }

    out
}

/// Summaries for a whole batch, sorted by file name
pub fn format_batch(results: &HashMap<String, AnalysisResult>) -> String {
    let mut names: Vec<&String> = results.keys().collect();
    names.sort();

    names
        .into_iter()
        .map(|name| format_summary(name, &results[name]))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportEntry<'a> {
    file_name: &'a str,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

/// Pretty-printed JSON array of results, sorted by file name
pub fn to_json(results: &HashMap<String, AnalysisResult>) -> serde_json::Result<String> {
    let mut entries: Vec<ExportEntry<'_>> = results
        .iter()
        .map(|(file_name, result)| ExportEntry { file_name, result })
        .collect();
    entries.sort_by(|a, b| a.file_name.cmp(b.file_name));

    serde_json::to_string_pretty(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Clause, Degraded, Risk, Severity};

    fn result() -> AnalysisResult {
        AnalysisResult {
            clauses: vec![
                Clause {
                    title: "Termination for convenience".to_string(),
                    snippet: "Either party may terminate".to_string(),
                    reason: "One-sided notice period".to_string(),
                },
                Clause {
                    title: "Governing law".to_string(),
                    snippet: String::new(),
                    reason: String::new(),
                },
            ],
            risks: vec![Risk {
                risk: "Uncapped liability".to_string(),
                severity: Severity::High,
                explanation: "No cap on damages".to_string(),
                recommended_action: "Add a liability cap".to_string(),
            }],
            degraded: Degraded::default(),
        }
    }

    #[test]
    fn test_summary_lists_in_order_with_severity() {
        let text = format_summary("contract.pdf", &result());

        assert!(text.starts_with("=== contract.pdf ==="));
        let first = text.find("1. Termination for convenience").unwrap();
        let second = text.find("2. Governing law").unwrap();
        assert!(first < second);
        assert!(text.contains("1. [HIGH] Uncapped liability"));
        assert!(text.contains("Recommended: Add a liability cap"));
        assert!(!text.contains("unavailable"));
    }

    #[test]
    fn test_degraded_sections_are_marked() {
        let degraded = AnalysisResult {
            clauses: Vec::new(),
            degraded: Degraded {
                clauses: true,
                risks: false,
            },
            ..result()
        };
        let text = format_summary("a.txt", &degraded);

        let clauses_at = text.find("Clauses (0):").unwrap();
        let note_at = text.find(DEGRADED_NOTE).unwrap();
        let risks_at = text.find("Risks (1):").unwrap();
        assert!(clauses_at < note_at && note_at < risks_at);
    }

    #[test]
    fn test_empty_result() {
        let text = format_summary("blank.txt", &AnalysisResult::default());
        assert_eq!(text.matches("None found").count(), 2);
    }

    #[test]
    fn test_batch_is_sorted_by_name() {
        let mut results = HashMap::new();
        results.insert("zeta.txt".to_string(), AnalysisResult::default());
        results.insert("alpha.pdf".to_string(), result());

        let text = format_batch(&results);
        assert!(text.find("alpha.pdf").unwrap() < text.find("zeta.txt").unwrap());
    }

    #[test]
    fn test_json_export() {
        let mut results = HashMap::new();
        results.insert("b.txt".to_string(), AnalysisResult::default());
        results.insert("a.pdf".to_string(), result());

        let json: serde_json::Value = serde_json::from_str(&to_json(&results).unwrap()).unwrap();
        assert_eq!(json[0]["fileName"], "a.pdf");
        assert_eq!(json[0]["risks"][0]["severity"], "high");
        assert_eq!(json[0]["risks"][0]["recommendedAction"], "Add a liability cap");
        assert_eq!(json[1]["degraded"]["clauses"], false);
    }
}
