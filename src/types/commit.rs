//! Commit-level entities: commits, categorized changes, and per-commit
//! analysis results.

use crate::errors::{ChronicleError, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumIter;

/// A single commit as read from the repository.
///
/// Immutable snapshot; the diff is the full unified text diff against the
/// first parent (or the empty tree for a root commit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Full object id (hex)
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    /// Authored timestamp with its original offset
    pub authored_at: DateTime<FixedOffset>,
    /// First line of the commit message
    pub subject: String,
    /// Remaining message lines, if any
    pub body: Option<String>,
    /// Paths touched by this commit, in diff order
    pub changed_paths: Vec<String>,
    /// Full unified diff text
    pub diff: String,
    /// First parent id, `None` for a root commit
    pub first_parent: Option<String>,
}

impl Commit {
    /// Abbreviated id used in placeholders and log lines
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(8);
        self.id.get(..end).unwrap_or(&self.id)
    }
}

/// Fixed category set for changelog entries.
///
/// Categories are emitted in this declaration order in all artifacts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    EnumIter,
)]
pub enum ChangeCategory {
    Added,
    Changed,
    Deprecated,
    Removed,
    Fixed,
    Security,
    Performance,
    Infrastructure,
    Documentation,
    Testing,
    Other,
}

impl ChangeCategory {
    /// All categories in their fixed emission order
    pub const ALL: &'static [ChangeCategory] = &[
        Self::Added,
        Self::Changed,
        Self::Deprecated,
        Self::Removed,
        Self::Fixed,
        Self::Security,
        Self::Performance,
        Self::Infrastructure,
        Self::Documentation,
        Self::Testing,
        Self::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Changed => "Changed",
            Self::Deprecated => "Deprecated",
            Self::Removed => "Removed",
            Self::Fixed => "Fixed",
            Self::Security => "Security",
            Self::Performance => "Performance",
            Self::Infrastructure => "Infrastructure",
            Self::Documentation => "Documentation",
            Self::Testing => "Testing",
            Self::Other => "Other",
        }
    }

    /// Parse a category emitted by the LLM.
    ///
    /// Unknown names are coerced to `Other`; the caller records a diagnostic
    /// when the returned flag is true.
    pub fn coerce(raw: &str) -> (Self, bool) {
        match raw.trim().parse::<Self>() {
            Ok(category) => (category, false),
            Err(()) => (Self::Other, true),
        }
    }
}

impl FromStr for ChangeCategory {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or(())
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single categorized summary of a unit of repository modification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub summary: String,
    pub category: ChangeCategory,
}

impl Change {
    /// Construct a validated change; the summary must be non-empty.
    pub fn new(summary: impl Into<String>, category: ChangeCategory) -> Result<Self> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return Err(ChronicleError::validation(
                "change.summary",
                "must not be empty",
            ));
        }
        Ok(Self { summary, category })
    }

    /// Normalized summary used for deduplication: case-folded, whitespace
    /// collapsed.
    pub fn normalized_summary(&self) -> String {
        self.summary
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Deduplication key over (summary, category)
    pub fn dedup_key(&self) -> (String, ChangeCategory) {
        (self.normalized_summary(), self.category)
    }
}

/// The analysis result for one commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAnalysis {
    pub changes: Vec<Change>,
    pub trivial: bool,
}

impl CommitAnalysis {
    /// Synthetic analysis emitted when LLM or decoder failure prevents
    /// normal analysis. Keeps the commit present downstream.
    pub fn placeholder(short_id: &str) -> Self {
        Self {
            changes: vec![Change {
                summary: format!("unanalyzed commit {short_id}"),
                category: ChangeCategory::Other,
            }],
            trivial: false,
        }
    }

    /// Reduce per-chunk analyses of a split diff into one.
    ///
    /// Change lists are concatenated and deduplicated by (summary, category);
    /// `trivial` is the conjunction across chunks.
    pub fn reduce(chunks: Vec<Self>) -> Self {
        let mut trivial = !chunks.is_empty();
        let mut changes: Vec<Change> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for chunk in chunks {
            trivial &= chunk.trivial;
            for change in chunk.changes {
                if seen.insert(change.dedup_key()) {
                    changes.push(change);
                }
            }
        }
        Self { changes, trivial }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_coercion() {
        assert_eq!(ChangeCategory::coerce("Fixed"), (ChangeCategory::Fixed, false));
        assert_eq!(ChangeCategory::coerce("fixed"), (ChangeCategory::Fixed, false));
        assert_eq!(
            ChangeCategory::coerce("Bugfix"),
            (ChangeCategory::Other, true)
        );
        assert_eq!(
            ChangeCategory::coerce("  Security "),
            (ChangeCategory::Security, false)
        );
    }

    #[test]
    fn test_change_validation() {
        assert!(Change::new("add x", ChangeCategory::Added).is_ok());
        assert!(Change::new("   ", ChangeCategory::Added).is_err());
    }

    #[test]
    fn test_normalized_summary() {
        let change = Change {
            summary: "  Add   THE thing ".to_string(),
            category: ChangeCategory::Added,
        };
        assert_eq!(change.normalized_summary(), "add the thing");
    }

    #[test]
    fn test_reduce_dedups_and_conjoins_trivial() {
        let a = CommitAnalysis {
            changes: vec![Change {
                summary: "add x".to_string(),
                category: ChangeCategory::Added,
            }],
            trivial: true,
        };
        let b = CommitAnalysis {
            changes: vec![
                Change {
                    summary: "Add  X".to_string(),
                    category: ChangeCategory::Added,
                },
                Change {
                    summary: "fix y".to_string(),
                    category: ChangeCategory::Fixed,
                },
            ],
            trivial: false,
        };
        let reduced = CommitAnalysis::reduce(vec![a, b]);
        assert_eq!(reduced.changes.len(), 2);
        assert!(!reduced.trivial);
    }

    #[test]
    fn test_placeholder_carries_short_id() {
        let placeholder = CommitAnalysis::placeholder("bbbb1234");
        assert!(!placeholder.trivial);
        assert_eq!(placeholder.changes.len(), 1);
        assert_eq!(placeholder.changes[0].category, ChangeCategory::Other);
        assert!(placeholder.changes[0].summary.contains("bbbb1234"));
        assert!(placeholder.changes[0].summary.contains("unanalyzed"));
    }
}
