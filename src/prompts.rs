//! Deterministic prompt construction for each pipeline tier.
//!
//! Given identical structured input and the same [`PROMPT_VERSION`], every
//! builder emits byte-identical text: no timestamps, no randomness. The
//! version tag participates in every cache key, so reworking a prompt here
//! (and bumping the tag) invalidates exactly the entries it affects.

use crate::types::buckets::DailySynthesis;
use crate::types::commit::{Change, CommitAnalysis};
use crate::types::responses::{CommitAnalysisResponse, DailySummaryResponse};
use chrono::NaiveDate;
use std::fmt::Write;

/// Bumped whenever any prompt text changes shape
pub const PROMPT_VERSION: &str = "chronicle-prompt-v1";

fn schema_of<T: schemars::JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "{ \"error\": \"failed to serialize schema\" }".to_string())
}

/// Commit-tier prompt: classify one commit (or one chunk of its diff).
///
/// `part` is `(index, total)` when the diff was split by the fitter.
pub fn commit_prompt(
    subject: &str,
    body: Option<&str>,
    diff_chunk: &str,
    part: Option<(usize, usize)>,
) -> String {
    let mut prompt = String::from(
        "You are an assistant that analyzes a single Git commit and reports the \
         changes it makes. Work step-by-step and follow these guidelines exactly:\n\n\
         1. Read the commit message and diff, then list each distinct change.\n\
         2. Each change needs a concise summary in imperative mood, starting with a \
         capital letter and without a trailing period.\n\
         3. Assign each change one category from: Added, Changed, Deprecated, Removed, \
         Fixed, Security, Performance, Infrastructure, Documentation, Testing, Other.\n\
         4. Set \"trivial\" to true only when the commit contributes no user-visible \
         behavior change (formatting, typo fixes, comment-only edits).\n\
         5. Do not speculate beyond what the diff supports.\n\
         6. Respond with a JSON object only - no prose, no Markdown fences.\n\n\
         The response must match this JSON schema:\n\n",
    );
    prompt.push_str(&schema_of::<CommitAnalysisResponse>());

    prompt.push_str("\n\nCommit subject:\n");
    prompt.push_str(subject);
    if let Some(body) = body {
        prompt.push_str("\n\nCommit body:\n");
        prompt.push_str(body);
    }
    if let Some((index, total)) = part {
        let _ = write!(
            prompt,
            "\n\nThis is part {} of {} of the commit's diff; analyze only what \
             appears in this part.",
            index + 1,
            total
        );
    }
    prompt.push_str("\n\nDiff:\n");
    prompt.push_str(diff_chunk);
    prompt
}

/// Commit-tier reduce prompt: consolidate per-chunk analyses of one commit.
pub fn commit_reduce_prompt(partials: &[CommitAnalysis]) -> String {
    let mut prompt = String::from(
        "The diff of a single Git commit was analyzed in parts. Below are the \
         change lists extracted from each part. Merge them into one list:\n\n\
         1. Return the deduplicated union of all changes. Never drop a distinct \
         change; only collapse entries that describe the same modification.\n\
         2. Keep the original categories.\n\
         3. Respond with a JSON object only, matching this schema:\n\n",
    );
    prompt.push_str(&schema_of::<CommitAnalysisResponse>());
    prompt.push_str("\n\nPartial analyses:\n");
    for (i, partial) in partials.iter().enumerate() {
        let _ = write!(prompt, "\nPart {}:\n", i + 1);
        push_change_list(&mut prompt, &partial.changes);
    }
    prompt
}

/// Daily-tier prompt: synthesize one day from its commit analyses plus the
/// day's net diff (or one chunk of it).
pub fn daily_prompt(
    date: NaiveDate,
    analyses: &[(String, CommitAnalysis)],
    net_diff_chunk: &str,
    part: Option<(usize, usize)>,
) -> String {
    let mut prompt = String::from(
        "You are an assistant that writes a short engineering activity summary \
         for one day of work in a Git repository. Follow these guidelines:\n\n\
         1. Write a narrative of 2-5 sentences describing what was accomplished, \
         in plain language a stakeholder can follow.\n\
         2. Aggregate the commit-level changes into a deduplicated list; merge \
         entries that describe the same change.\n\
         3. Use the net diff to judge which changes actually survived the day.\n\
         4. Respond with a JSON object only, matching this schema:\n\n",
    );
    prompt.push_str(&schema_of::<DailySummaryResponse>());

    let _ = write!(prompt, "\n\nDate: {}\n", date.format("%Y-%m-%d"));
    prompt.push_str("\nCommit analyses, in commit order:\n");
    for (subject, analysis) in analyses {
        let _ = write!(
            prompt,
            "\n- {subject} (trivial: {}):\n",
            analysis.trivial
        );
        push_change_list(&mut prompt, &analysis.changes);
    }
    if let Some((index, total)) = part {
        let _ = write!(
            prompt,
            "\nThis is part {} of {} of the day's net diff.\n",
            index + 1,
            total
        );
    }
    prompt.push_str("\nNet diff for the day:\n");
    prompt.push_str(net_diff_chunk);
    prompt
}

/// Reduce prompt collapsing partial daily summaries into one.
pub fn daily_reduce_prompt(date: NaiveDate, partials: &[DailySummaryResponse]) -> String {
    let mut prompt = String::from(
        "Several partial summaries were produced for one day of repository work \
         because its diff was analyzed in parts. Collapse them into a single \
         summary:\n\n\
         1. Write one coherent narrative of 2-5 sentences.\n\
         2. Return the deduplicated union of the partial change lists; never \
         drop a distinct change.\n\
         3. Respond with a JSON object only, matching this schema:\n\n",
    );
    prompt.push_str(&schema_of::<DailySummaryResponse>());
    let _ = write!(prompt, "\n\nDate: {}\n", date.format("%Y-%m-%d"));
    for (i, partial) in partials.iter().enumerate() {
        let _ = write!(prompt, "\nPartial {}:\n{}\nChanges:\n", i + 1, partial.narrative);
        for entry in &partial.changes {
            let _ = write!(prompt, "- [{}] {}\n", entry.category, entry.summary);
        }
    }
    prompt
}

/// Weekly-narrative prompt: one stakeholder-facing section from the week's
/// daily syntheses plus the weekly net diff (or one chunk of it).
pub fn weekly_narrative_prompt(
    week_label: &str,
    days: &[DailySynthesis],
    net_diff_chunk: &str,
    part: Option<(usize, usize)>,
) -> String {
    let mut prompt = String::from(
        "You are an assistant that writes the weekly section of a stakeholder \
         progress document for a software project. Follow these guidelines:\n\n\
         1. Write 1-3 paragraphs of plain prose; no headings, no bullet lists.\n\
         2. Lead with the most significant outcomes of the week.\n\
         3. Stay grounded in the daily summaries and the net diff; do not invent \
         progress.\n\
         4. Avoid cliche words like 'enhance', 'streamline', or 'leverage'.\n\
         5. Respond with the narrative text only - no JSON, no fences.\n",
    );
    let _ = write!(prompt, "\nWeek: {week_label}\n");
    prompt.push_str("\nDaily summaries, in date order:\n");
    for day in days {
        let _ = write!(prompt, "\n{}:\n{}\n", day.date.format("%Y-%m-%d"), day.narrative);
    }
    if let Some((index, total)) = part {
        let _ = write!(
            prompt,
            "\nThis is part {} of {} of the week's net diff.\n",
            index + 1,
            total
        );
    }
    prompt.push_str("\nNet diff for the week:\n");
    prompt.push_str(net_diff_chunk);
    prompt
}

/// Reduce prompt collapsing partial weekly narratives into one.
pub fn weekly_reduce_prompt(week_label: &str, partials: &[String]) -> String {
    let mut prompt = String::from(
        "Several partial weekly narratives were produced because the week's diff \
         was analyzed in parts. Merge them into one section of 1-3 paragraphs, \
         keeping every distinct outcome they mention. Respond with the narrative \
         text only.\n",
    );
    let _ = write!(prompt, "\nWeek: {week_label}\n");
    for (i, partial) in partials.iter().enumerate() {
        let _ = write!(prompt, "\nPartial {}:\n{}\n", i + 1, partial);
    }
    prompt
}

fn push_change_list(prompt: &mut String, changes: &[Change]) {
    if changes.is_empty() {
        prompt.push_str("  (no changes)\n");
    }
    for change in changes {
        let _ = write!(prompt, "  - [{}] {}\n", change.category, change.summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::commit::ChangeCategory;

    fn analysis() -> CommitAnalysis {
        CommitAnalysis {
            changes: vec![Change {
                summary: "add parser".to_string(),
                category: ChangeCategory::Added,
            }],
            trivial: false,
        }
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let a = commit_prompt("feat: add x", Some("details"), "+line", Some((0, 3)));
        let b = commit_prompt("feat: add x", Some("details"), "+line", Some((0, 3)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_commit_prompt_carries_inputs() {
        let prompt = commit_prompt("feat: add x", Some("body text"), "+new line", None);
        assert!(prompt.contains("feat: add x"));
        assert!(prompt.contains("body text"));
        assert!(prompt.contains("+new line"));
        assert!(prompt.contains("trivial"));
    }

    #[test]
    fn test_part_marker_only_when_split() {
        let whole = commit_prompt("s", None, "d", None);
        let part = commit_prompt("s", None, "d", Some((1, 3)));
        assert!(!whole.contains("part 1 of"));
        assert!(part.contains("part 2 of 3"));
    }

    #[test]
    fn test_daily_prompt_orders_analyses() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("date");
        let prompt = daily_prompt(
            date,
            &[
                ("first commit".to_string(), analysis()),
                ("second commit".to_string(), analysis()),
            ],
            "+x",
            None,
        );
        let first = prompt.find("first commit").expect("present");
        let second = prompt.find("second commit").expect("present");
        assert!(first < second);
        assert!(prompt.contains("2025-03-14"));
    }

    #[test]
    fn test_weekly_prompt_mentions_week_label() {
        let days = vec![DailySynthesis {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
            narrative: "built things".to_string(),
            changes: vec![],
        }];
        let prompt = weekly_narrative_prompt("week-of-2025-03-10", &days, "+x", None);
        assert!(prompt.contains("week-of-2025-03-10"));
        assert!(prompt.contains("built things"));
    }
}
