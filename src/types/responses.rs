//! Structured shapes the LLM is asked to emit.
//!
//! These mirror the JSON contracts embedded in the tier prompts. Categories
//! arrive as free text and are coerced into [`ChangeCategory`] on conversion;
//! unknown names degrade to `Other` and are reported back to the caller so a
//! diagnostic can be recorded.

use crate::types::commit::{Change, ChangeCategory, CommitAnalysis};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One change entry as emitted by the LLM
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChangeEntry {
    /// Concise description of the change
    pub summary: String,
    /// Category name; one of the fixed changelog categories
    pub category: String,
}

/// Commit-tier response contract
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommitAnalysisResponse {
    /// Changes found in the commit
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
    /// Whether the commit contributes no user-visible behavior change
    #[serde(default)]
    pub trivial: bool,
}

/// Daily-tier response contract
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DailySummaryResponse {
    /// Short narrative describing the day's work
    pub narrative: String,
    /// Deduplicated changes across the day's commits
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
}

/// Convert loose LLM entries into validated changes.
///
/// Empty summaries are dropped, unknown categories coerce to `Other`.
/// Returns the changes plus the raw category names that needed coercion.
pub fn convert_entries(entries: Vec<ChangeEntry>) -> (Vec<Change>, Vec<String>) {
    let mut changes = Vec::with_capacity(entries.len());
    let mut coerced = Vec::new();
    for entry in entries {
        if entry.summary.trim().is_empty() {
            continue;
        }
        let (category, was_coerced) = ChangeCategory::coerce(&entry.category);
        if was_coerced {
            coerced.push(entry.category.clone());
        }
        changes.push(Change {
            summary: entry.summary,
            category,
        });
    }
    (changes, coerced)
}

impl CommitAnalysisResponse {
    /// Validate and convert into the domain form
    pub fn into_analysis(self) -> (CommitAnalysis, Vec<String>) {
        let trivial = self.trivial;
        let (changes, coerced) = convert_entries(self.changes);
        (CommitAnalysis { changes, trivial }, coerced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_entries_coerces_unknown_categories() {
        let entries = vec![
            ChangeEntry {
                summary: "add x".to_string(),
                category: "Added".to_string(),
            },
            ChangeEntry {
                summary: "tweak y".to_string(),
                category: "Tweaked".to_string(),
            },
        ];
        let (changes, coerced) = convert_entries(entries);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].category, ChangeCategory::Other);
        assert_eq!(coerced, vec!["Tweaked".to_string()]);
    }

    #[test]
    fn test_convert_entries_drops_empty_summaries() {
        let entries = vec![ChangeEntry {
            summary: "  ".to_string(),
            category: "Fixed".to_string(),
        }];
        let (changes, coerced) = convert_entries(entries);
        assert!(changes.is_empty());
        assert!(coerced.is_empty());
    }

    #[test]
    fn test_response_defaults_tolerate_missing_fields() {
        let parsed: CommitAnalysisResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.changes.is_empty());
        assert!(!parsed.trivial);
    }
}
