//! Stakeholder narrative: week sections, most recent first.
//!
//! A run replaces the sections whose week overlaps its window and preserves
//! every other section verbatim, including any preamble above the first
//! section heading.

use crate::types::buckets::WeekArtifact;
use chrono::NaiveDate;
use std::collections::HashMap;

const DEFAULT_PREAMBLE: &str = "# Development Narrative\n\n";

/// One parsed `## <week label>` section with its raw body
struct Section {
    label: String,
    /// Body text below the heading, verbatim
    body: String,
}

/// Merge the run's week narratives into the existing document.
pub fn merge(existing: Option<&str>, weeks: &[WeekArtifact]) -> String {
    let (preamble, mut sections) = parse(existing.unwrap_or(""));

    let mut replacements: HashMap<&str, &WeekArtifact> =
        weeks.iter().map(|w| (w.label.as_str(), w)).collect();

    for section in &mut sections {
        if let Some(week) = replacements.remove(section.label.as_str()) {
            section.body = render_body(week);
        }
    }
    for week in weeks {
        if replacements.remove(week.label.as_str()).is_some() {
            sections.push(Section {
                label: week.label.clone(),
                body: render_body(week),
            });
        }
    }

    // Most recent week first; labels carry their Monday as an ISO date
    sections.sort_by_key(|s| std::cmp::Reverse(label_date(&s.label)));

    let mut out = if preamble.trim().is_empty() {
        DEFAULT_PREAMBLE.to_string()
    } else {
        preamble
    };
    for section in &sections {
        out.push_str("## ");
        out.push_str(&section.label);
        out.push('\n');
        out.push_str(&section.body);
    }
    out
}

fn render_body(week: &WeekArtifact) -> String {
    let narrative = week.narrative.trim();
    if narrative.is_empty() {
        "\n_No narrative available._\n\n".to_string()
    } else {
        format!("\n{narrative}\n\n")
    }
}

fn label_date(label: &str) -> Option<NaiveDate> {
    label
        .strip_prefix("week-of-")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Split a document into its preamble and `## ` sections, keeping bodies
/// byte-identical.
fn parse(content: &str) -> (String, Vec<Section>) {
    let mut preamble = String::new();
    let mut sections: Vec<Section> = Vec::new();

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if let Some(label) = trimmed.strip_prefix("## ") {
            sections.push(Section {
                label: label.trim().to_string(),
                body: String::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            section.body.push_str(line);
        } else {
            preamble.push_str(line);
        }
    }
    (preamble, sections)
}
