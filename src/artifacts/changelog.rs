//! Structured changelog in "keep a changelog" form.
//!
//! Only the `Unreleased` section is ever rewritten: new changes from the run
//! are folded into it, grouped by category and deduplicated by normalized
//! summary text. Prior version sections pass through byte-identically, which
//! is why they are kept as raw text rather than re-rendered. The parser is
//! forgiving about whitespace and bullet style so the file survives human
//! edits.

use crate::types::buckets::WeekArtifact;
use crate::types::commit::ChangeCategory;
use chrono::NaiveDate;
use strum::IntoEnumIterator;

const DEFAULT_PREAMBLE: &str = "# Changelog\n\n\
    All notable changes to this project will be documented in this file.\n\n\
    The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.1.0/),\n\
    and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).\n\n";

/// Entries per category, in insertion order
type CategoryEntries = Vec<(ChangeCategory, Vec<String>)>;

struct ParsedChangelog {
    preamble: String,
    unreleased: CategoryEntries,
    /// Version sections as raw text, heading included, in file order
    versions: Vec<String>,
}

/// Merge the run's changes into the changelog.
///
/// With `release_tag`, the merged `Unreleased` content is promoted under a
/// new `## [<tag>] - <today>` section and `Unreleased` empties.
pub fn merge(
    existing: Option<&str>,
    weeks: &[WeekArtifact],
    release_tag: Option<&str>,
    today: NaiveDate,
) -> String {
    let mut parsed = parse(existing.unwrap_or(""));

    for week in weeks {
        for change in &week.changes {
            insert_deduped(&mut parsed.unreleased, change.category, &change.summary);
        }
    }

    if let Some(tag) = release_tag {
        let body = render_categories(&parsed.unreleased);
        if !body.is_empty() {
            let section = format!("## [{tag}] - {}\n\n{body}", today.format("%Y-%m-%d"));
            parsed.versions.insert(0, section);
        }
        parsed.unreleased.clear();
    }

    render(&parsed)
}

fn insert_deduped(unreleased: &mut CategoryEntries, category: ChangeCategory, summary: &str) {
    let index = unreleased
        .iter()
        .position(|(c, _)| *c == category)
        .unwrap_or_else(|| {
            unreleased.push((category, Vec::new()));
            unreleased.len() - 1
        });
    let normalized = normalize(summary);
    let entries = &mut unreleased[index].1;
    if !entries.iter().any(|e| normalize(e) == normalized) {
        entries.push(summary.to_string());
    }
}

/// Case-folded, whitespace-collapsed form used for deduplication
fn normalize(summary: &str) -> String {
    summary
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn render(parsed: &ParsedChangelog) -> String {
    let mut out = if parsed.preamble.trim().is_empty() {
        DEFAULT_PREAMBLE.to_string()
    } else {
        parsed.preamble.clone()
    };
    if !out.ends_with("\n\n") {
        while out.ends_with('\n') {
            out.pop();
        }
        out.push_str("\n\n");
    }

    out.push_str("## [Unreleased]\n\n");
    out.push_str(&render_categories(&parsed.unreleased));

    for version in &parsed.versions {
        out.push_str(version);
    }
    out
}

/// Category subheadings in the fixed emission order, entries as hyphen
/// bullets in insertion order.
fn render_categories(unreleased: &CategoryEntries) -> String {
    let mut out = String::new();
    for category in ChangeCategory::iter() {
        let Some((_, entries)) = unreleased.iter().find(|(c, _)| *c == category) else {
            continue;
        };
        if entries.is_empty() {
            continue;
        }
        out.push_str("### ");
        out.push_str(category.as_str());
        out.push_str("\n\n");
        for entry in entries {
            out.push_str("- ");
            out.push_str(entry);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Split the document into preamble, the parsed `Unreleased` section, and
/// raw version sections.
fn parse(content: &str) -> ParsedChangelog {
    let mut preamble = String::new();
    let mut unreleased: CategoryEntries = Vec::new();
    let mut versions: Vec<String> = Vec::new();

    enum Zone {
        Preamble,
        Unreleased(Option<ChangeCategory>),
        Version,
    }
    let mut zone = Zone::Preamble;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("## ") {
            if is_unreleased_heading(heading) {
                zone = Zone::Unreleased(None);
            } else {
                versions.push(line.to_string());
                zone = Zone::Version;
            }
            continue;
        }

        match &mut zone {
            Zone::Preamble => preamble.push_str(line),
            Zone::Version => {
                if let Some(last) = versions.last_mut() {
                    last.push_str(line);
                }
            }
            Zone::Unreleased(current_category) => {
                if let Some(heading) = trimmed.strip_prefix("### ") {
                    let (category, _) = ChangeCategory::coerce(heading);
                    *current_category = Some(category);
                } else if let Some(entry) = trimmed
                    .strip_prefix("- ")
                    .or_else(|| trimmed.strip_prefix("* "))
                {
                    let category = current_category.unwrap_or(ChangeCategory::Other);
                    insert_deduped(&mut unreleased, category, entry.trim());
                }
                // Plain prose inside Unreleased is dropped on rewrite
            }
        }
    }

    ParsedChangelog {
        preamble,
        unreleased,
        versions,
    }
}

fn is_unreleased_heading(heading: &str) -> bool {
    let inner = heading
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    inner.eq_ignore_ascii_case("unreleased")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::commit::Change;

    fn week_with(changes: Vec<(&str, ChangeCategory)>) -> WeekArtifact {
        WeekArtifact {
            label: "week-of-2025-03-10".to_string(),
            week_start: NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
            narrative: String::new(),
            changes: changes
                .into_iter()
                .map(|(summary, category)| Change {
                    summary: summary.to_string(),
                    category,
                })
                .collect(),
            days: vec![],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("date")
    }

    #[test]
    fn test_fresh_changelog() {
        let weeks = [week_with(vec![
            ("Add x", ChangeCategory::Added),
            ("Fix y", ChangeCategory::Fixed),
        ])];
        let out = merge(None, &weeks, None, today());
        assert!(out.starts_with("# Changelog\n"));
        let unreleased = out.find("## [Unreleased]").expect("unreleased");
        let added = out.find("### Added").expect("added");
        let fixed = out.find("### Fixed").expect("fixed");
        assert!(unreleased < added && added < fixed);
        assert!(out.contains("- Add x\n"));
        assert!(out.contains("- Fix y\n"));
    }

    #[test]
    fn test_categories_emitted_in_fixed_order() {
        let weeks = [week_with(vec![
            ("Speed up z", ChangeCategory::Performance),
            ("Add x", ChangeCategory::Added),
            ("Document w", ChangeCategory::Documentation),
        ])];
        let out = merge(None, &weeks, None, today());
        let added = out.find("### Added").expect("added");
        let perf = out.find("### Performance").expect("perf");
        let docs = out.find("### Documentation").expect("docs");
        assert!(added < perf && perf < docs);
    }

    #[test]
    fn test_version_sections_preserved_byte_identically() {
        let existing = "# Changelog\n\n\
            ## [Unreleased]\n\n### Added\n\n- Old entry\n\n\
            ## [1.2.0] - 2025-01-01\n\n###  Added\n\n-  odd   spacing kept\n\n\
            ## [1.1.0] - 2024-12-01\n\n### Fixed\n\n- Old fix\n\n";
        let weeks = [week_with(vec![("Add x", ChangeCategory::Added)])];
        let out = merge(Some(existing), &weeks, None, today());

        assert!(out.contains("## [1.2.0] - 2025-01-01\n\n###  Added\n\n-  odd   spacing kept\n\n"));
        assert!(out.contains("## [1.1.0] - 2024-12-01\n\n### Fixed\n\n- Old fix\n\n"));
        assert!(out.contains("- Old entry\n"));
        assert!(out.contains("- Add x\n"));
    }

    #[test]
    fn test_dedup_by_normalized_summary() {
        let existing =
            "# Changelog\n\n## [Unreleased]\n\n### Added\n\n- Add the   parser\n\n";
        let weeks = [week_with(vec![
            ("add THE parser", ChangeCategory::Added),
            ("Add the parser", ChangeCategory::Added),
        ])];
        let out = merge(Some(existing), &weeks, None, today());
        assert_eq!(out.matches("parser").count(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let weeks = [week_with(vec![("Add x", ChangeCategory::Added)])];
        let once = merge(None, &weeks, None, today());
        let twice = merge(Some(&once), &weeks, None, today());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_release_promotion() {
        let existing = "# Changelog\n\n\
            ## [Unreleased]\n\n### Added\n\n- Add x\n\n\
            ## [1.0.0] - 2024-11-01\n\n### Added\n\n- First release\n\n";
        let out = merge(Some(existing), &[], Some("v1.2.0"), today());

        let unreleased = out.find("## [Unreleased]").expect("unreleased");
        let promoted = out.find("## [v1.2.0] - 2025-03-14").expect("promoted");
        let old = out.find("## [1.0.0] - 2024-11-01").expect("old");
        assert!(unreleased < promoted && promoted < old);

        // Unreleased is empty; the promoted section holds its former content
        let between = &out[unreleased..promoted];
        assert!(!between.contains("- Add x"));
        let promoted_body = &out[promoted..old];
        assert!(promoted_body.contains("### Added\n\n- Add x\n"));
    }

    #[test]
    fn test_unknown_category_heading_coerces_to_other() {
        let existing = "# Changelog\n\n## [Unreleased]\n\n### Tweaks\n\n- Odd entry\n\n";
        let out = merge(Some(existing), &[], None, today());
        assert!(out.contains("### Other\n\n- Odd entry\n"));
    }

    #[test]
    fn test_forgiving_bullet_styles() {
        let existing = "# Changelog\n\n## [unreleased]\n\n### Fixed\n\n* Star bullet\n\n";
        let out = merge(Some(existing), &[], None, today());
        assert!(out.contains("- Star bullet\n"));
    }
}
