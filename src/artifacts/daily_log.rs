//! Append-only daily activity log, newest date first.
//!
//! Each analyzed date gets a `## <ISO date>` section holding the day's
//! narrative and a bulleted list of its changes. A date already present in
//! the file is replaced by the current run's synthesis; other dates are
//! preserved verbatim.

use crate::types::buckets::{DailySynthesis, WeekArtifact};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Write;

const DEFAULT_PREAMBLE: &str = "# Daily Log\n\n";

struct Entry {
    date: NaiveDate,
    /// Body below the heading, verbatim for preserved entries
    body: String,
}

/// Merge the run's daily syntheses into the log.
pub fn merge(existing: Option<&str>, weeks: &[WeekArtifact]) -> String {
    let (preamble, mut entries) = parse(existing.unwrap_or(""));

    let mut replacements: HashMap<NaiveDate, &DailySynthesis> = weeks
        .iter()
        .flat_map(|w| w.days.iter())
        .map(|d| (d.date, d))
        .collect();

    for entry in &mut entries {
        if let Some(day) = replacements.remove(&entry.date) {
            entry.body = render_body(day);
        }
    }
    for day in replacements.into_values() {
        entries.push(Entry {
            date: day.date,
            body: render_body(day),
        });
    }

    entries.sort_by_key(|e| std::cmp::Reverse(e.date));

    let mut out = if preamble.trim().is_empty() {
        DEFAULT_PREAMBLE.to_string()
    } else {
        preamble
    };
    for entry in &entries {
        let _ = writeln!(out, "## {}", entry.date.format("%Y-%m-%d"));
        out.push_str(&entry.body);
    }
    out
}

fn render_body(day: &DailySynthesis) -> String {
    let mut body = String::from("\n");
    let narrative = day.narrative.trim();
    if narrative.is_empty() {
        body.push_str("_No synthesis available._\n");
    } else {
        body.push_str(narrative);
        body.push('\n');
    }
    if !day.changes.is_empty() {
        body.push('\n');
        for change in &day.changes {
            let _ = writeln!(body, "- [{}] {}", change.category, change.summary);
        }
    }
    body.push('\n');
    body
}

fn parse(content: &str) -> (String, Vec<Entry>) {
    let mut preamble = String::new();
    let mut entries: Vec<Entry> = Vec::new();
    let mut skipping_unknown = false;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if let Some(heading) = trimmed.strip_prefix("## ") {
            if let Ok(date) = NaiveDate::parse_from_str(heading.trim(), "%Y-%m-%d") {
                entries.push(Entry {
                    date,
                    body: String::new(),
                });
                skipping_unknown = false;
            } else {
                // Headings that are not dates are dropped on rewrite
                skipping_unknown = true;
            }
            continue;
        }
        if skipping_unknown {
            continue;
        }
        if let Some(entry) = entries.last_mut() {
            entry.body.push_str(line);
        } else {
            preamble.push_str(line);
        }
    }
    (preamble, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::commit::{Change, ChangeCategory};

    fn day(date: &str, narrative: &str) -> DailySynthesis {
        DailySynthesis {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
            narrative: narrative.to_string(),
            changes: vec![Change {
                summary: "Add x".to_string(),
                category: ChangeCategory::Added,
            }],
        }
    }

    fn week_of(days: Vec<DailySynthesis>) -> WeekArtifact {
        WeekArtifact {
            label: "week-of-2025-03-10".to_string(),
            week_start: NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
            narrative: String::new(),
            changes: vec![],
            days,
        }
    }

    #[test]
    fn test_fresh_log_newest_first() {
        let weeks = [week_of(vec![
            day("2025-03-10", "Started the parser."),
            day("2025-03-11", "Finished the parser."),
        ])];
        let out = merge(None, &weeks);
        assert!(out.starts_with("# Daily Log\n"));
        let newer = out.find("## 2025-03-11").expect("newer");
        let older = out.find("## 2025-03-10").expect("older");
        assert!(newer < older);
        assert!(out.contains("- [Added] Add x\n"));
    }

    #[test]
    fn test_existing_date_replaced_others_preserved() {
        let existing = "# Daily Log\n\n\
            ## 2025-03-11\n\nOld eleven.\n\n\
            ## 2025-03-09\n\nUntouched nine.\n\n";
        let weeks = [week_of(vec![day("2025-03-11", "New eleven.")])];
        let out = merge(Some(existing), &weeks);
        assert!(out.contains("New eleven."));
        assert!(!out.contains("Old eleven."));
        assert!(out.contains("Untouched nine."));
    }

    #[test]
    fn test_new_date_inserted_chronologically() {
        let existing = "# Daily Log\n\n\
            ## 2025-03-12\n\nTwelve.\n\n\
            ## 2025-03-09\n\nNine.\n\n";
        let weeks = [week_of(vec![day("2025-03-10", "Ten.")])];
        let out = merge(Some(existing), &weeks);
        let twelve = out.find("## 2025-03-12").expect("twelve");
        let ten = out.find("## 2025-03-10").expect("ten");
        let nine = out.find("## 2025-03-09").expect("nine");
        assert!(twelve < ten && ten < nine);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let weeks = [week_of(vec![day("2025-03-10", "Same.")])];
        let once = merge(None, &weeks);
        let twice = merge(Some(&once), &weeks);
        assert_eq!(once, twice);
    }
}
