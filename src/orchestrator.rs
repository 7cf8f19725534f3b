//! Tiered analysis pipeline over an analysis window.
//!
//! Stages run with barriers between them: every commit analysis in the
//! window completes before any daily synthesis starts, and every daily
//! synthesis in a week completes before that week's narrative is produced.
//! Fan-out inside a stage is bounded by counting semaphores.
//!
//! The no-commit-lost invariant shapes every failure path here: an LLM or
//! decode failure at the commit tier produces a placeholder analysis and the
//! pipeline continues; a daily or weekly failure degrades the narrative but
//! the structured changelog is still aggregated from commit-tier output.
//! Only repository failures (and cancellation) abort the run.

use crate::cache::{CacheKey, CacheNamespace, CacheStore};
use crate::decoder;
use crate::errors::{ChronicleError, Result};
use crate::fitter::DiffFitter;
use crate::git::RepoReader;
use crate::llm::{LlmGateway, Tier};
use crate::prompts::{
    PROMPT_VERSION, commit_prompt, commit_reduce_prompt, daily_prompt, daily_reduce_prompt,
    weekly_narrative_prompt, weekly_reduce_prompt,
};
use crate::types::buckets::{AnalysisWindow, DailySynthesis, DayBucket, WeekArtifact, WeekBucket};
use crate::types::commit::{Change, Commit, CommitAnalysis};
use crate::types::responses::DailySummaryResponse;
use crate::{log_debug, log_error};
use futures::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Upper bound on any synthesized narrative, in characters
const MAX_NARRATIVE_CHARS: usize = 4_000;

/// Tokens reserved for prompt scaffolding around a diff chunk
const PROMPT_MARGIN_TOKENS: usize = 2_048;

/// Per-tier fan-out bounds
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
    pub commit: usize,
    pub day: usize,
    pub week: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            commit: 5,
            day: 3,
            week: 2,
        }
    }
}

/// Kind of a locally recovered failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Llm,
    Parse,
    Validation,
    CacheIo,
    CoercedCategory,
}

impl DiagnosticKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::CacheIo => "cache-io",
            Self::CoercedCategory => "coerced-category",
        }
    }
}

/// One structured record of a local recovery, reported at run completion
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub tier: &'static str,
    /// Commit short id, date, or week label the recovery applied to
    pub subject: String,
    pub message: String,
}

/// Counters reported with the run result
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub commits: usize,
    pub days: usize,
    pub weeks: usize,
    pub cache_hits: usize,
    pub llm_calls: u64,
}

/// Everything a completed run hands to the merger and the caller
#[derive(Debug)]
pub struct RunReport {
    pub weeks: Vec<WeekArtifact>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: RunStats,
}

struct CommitOutcome {
    analysis: CommitAnalysis,
    diagnostics: Vec<Diagnostic>,
    cache_hit: bool,
}

struct DayOutcome {
    synthesis: DailySynthesis,
    diagnostics: Vec<Diagnostic>,
    cache_hit: bool,
}

/// Drives the full pipeline for one window
pub struct Orchestrator {
    reader: RepoReader,
    gateway: Arc<LlmGateway>,
    cache: Arc<CacheStore>,
    limits: ConcurrencyLimits,
}

impl Orchestrator {
    pub fn new(
        reader: RepoReader,
        gateway: Arc<LlmGateway>,
        cache: Arc<CacheStore>,
        limits: ConcurrencyLimits,
    ) -> Self {
        Self {
            reader,
            gateway,
            cache,
            limits,
        }
    }

    /// Execute the pipeline. On cancellation the error propagates and no
    /// partial result is returned, so nothing gets persisted as final
    /// artifacts.
    pub async fn run(
        &self,
        window: &AnalysisWindow,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let weeks = self.reader.week_buckets(window)?;
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut stats = RunStats {
            weeks: weeks.len(),
            ..RunStats::default()
        };

        if weeks.is_empty() {
            log_debug!("Window {} .. {} contains no commits", window.start, window.end);
            return Ok(RunReport {
                weeks: Vec::new(),
                diagnostics,
                stats,
            });
        }

        // Commit tier: fan out over every commit in the window.
        let commits: Vec<&Commit> = weeks.iter().flat_map(WeekBucket::commits).collect();
        stats.commits = commits.len();
        stats.days = weeks.iter().map(|w| w.days.len()).sum();

        let commit_sem = Arc::new(Semaphore::new(self.limits.commit.max(1)));
        let commit_outcomes = join_all(commits.iter().map(|commit| {
            let sem = Arc::clone(&commit_sem);
            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| ChronicleError::Cancelled)?;
                self.analyze_commit(commit, cancel).await
            }
        }))
        .await;

        let mut analyses: HashMap<&str, CommitAnalysis> = HashMap::new();
        for (commit, outcome) in commits.iter().zip(commit_outcomes) {
            let outcome = outcome?;
            diagnostics.extend(outcome.diagnostics);
            stats.cache_hits += usize::from(outcome.cache_hit);
            analyses.insert(commit.id.as_str(), outcome.analysis);
        }

        // Daily tier: one synthesis per day, all commit analyses settled.
        let day_sem = Arc::new(Semaphore::new(self.limits.day.max(1)));
        let day_refs: Vec<&DayBucket> = weeks.iter().flat_map(|w| w.days.iter()).collect();
        let day_outcomes = join_all(day_refs.iter().map(|day| {
            let sem = Arc::clone(&day_sem);
            let analyses = &analyses;
            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| ChronicleError::Cancelled)?;
                self.synthesize_day(day, analyses, cancel).await
            }
        }))
        .await;

        let mut syntheses: HashMap<chrono::NaiveDate, DailySynthesis> = HashMap::new();
        for outcome in day_outcomes {
            let outcome = outcome?;
            diagnostics.extend(outcome.diagnostics);
            stats.cache_hits += usize::from(outcome.cache_hit);
            syntheses.insert(outcome.synthesis.date, outcome.synthesis);
        }

        // Weekly tier: narrative plus aggregated changelog fragment.
        let week_sem = Arc::new(Semaphore::new(self.limits.week.max(1)));
        let week_results = join_all(weeks.iter().map(|week| {
            let sem = Arc::clone(&week_sem);
            let analyses = &analyses;
            let syntheses = &syntheses;
            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| ChronicleError::Cancelled)?;
                self.synthesize_week(week, analyses, syntheses, cancel).await
            }
        }))
        .await;

        let mut artifacts = Vec::with_capacity(weeks.len());
        for result in week_results {
            let (artifact, week_diagnostics, hits) = result?;
            diagnostics.extend(week_diagnostics);
            stats.cache_hits += hits;
            artifacts.push(artifact);
        }

        stats.llm_calls = self.gateway.calls_made();
        log_debug!(
            "Run complete: {} commits, {} days, {} weeks, {} cache hits, {} LLM calls",
            stats.commits,
            stats.days,
            stats.weeks,
            stats.cache_hits,
            stats.llm_calls
        );
        Ok(RunReport {
            weeks: artifacts,
            diagnostics,
            stats,
        })
    }

    /// Commit tier for one commit: cache check, chunked analysis, reduce.
    /// Recoverable failures produce a placeholder so the commit stays in the
    /// pipeline.
    async fn analyze_commit(
        &self,
        commit: &Commit,
        cancel: &CancellationToken,
    ) -> Result<CommitOutcome> {
        let mut diagnostics = Vec::new();
        let model = &self.gateway.settings(Tier::Fast).model;
        let structured = json!({
            "subject": commit.subject,
            "body": commit.body,
            "diff": commit.diff,
        });
        let key = CacheKey::derive(CacheNamespace::Commit, PROMPT_VERSION, model, &structured);

        match self.cache.get(CacheNamespace::Commit, &key) {
            Ok(Some(payload)) => {
                if let Ok(analysis) = serde_json::from_str::<CommitAnalysis>(&payload) {
                    return Ok(CommitOutcome {
                        analysis,
                        diagnostics,
                        cache_hit: true,
                    });
                }
                log_debug!("Stale cache payload for {}, recomputing", commit.short_id());
            }
            Ok(None) => {}
            Err(e) => self.record_cache_diagnostic(&mut diagnostics, "commit", commit.short_id(), &e),
        }

        match self
            .analyze_commit_uncached(commit, cancel, &mut diagnostics)
            .await
        {
            Ok(analysis) => {
                match serde_json::to_string(&analysis) {
                    Ok(payload) => {
                        if let Err(e) = self.cache.put(CacheNamespace::Commit, &key, &payload) {
                            self.record_cache_diagnostic(
                                &mut diagnostics,
                                "commit",
                                commit.short_id(),
                                &e,
                            );
                        }
                    }
                    Err(e) => log_error!("Failed to serialize analysis: {}", e),
                }
                Ok(CommitOutcome {
                    analysis,
                    diagnostics,
                    cache_hit: false,
                })
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log_error!("Commit {} analysis failed: {}", commit.short_id(), e);
                diagnostics.push(diagnostic_for(&e, "commit", commit.short_id()));
                Ok(CommitOutcome {
                    analysis: CommitAnalysis::placeholder(commit.short_id()),
                    diagnostics,
                    cache_hit: false,
                })
            }
        }
    }

    async fn analyze_commit_uncached(
        &self,
        commit: &Commit,
        cancel: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<CommitAnalysis> {
        let chunks = self.fitter_for(Tier::Fast).fit(&commit.diff);
        let total = chunks.len();
        let mut partials = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            let part = (total > 1).then_some((index, total));
            let prompt = commit_prompt(&commit.subject, commit.body.as_deref(), chunk, part);
            let raw = self.gateway.generate(Tier::Fast, &prompt, cancel).await?;
            let response = decoder::decode_as::<crate::types::CommitAnalysisResponse>(&raw)?;
            let (analysis, coerced) = response.into_analysis();
            self.record_coercions(diagnostics, "commit", commit.short_id(), coerced);
            partials.push(analysis);
        }

        let merged = CommitAnalysis::reduce(partials.clone());
        if total <= 1 {
            return Ok(merged);
        }

        // Reducing call consolidates phrasing across chunk results; the pure
        // union stays the fallback so no change is ever dropped.
        let prompt = commit_reduce_prompt(&partials);
        match self.gateway.generate(Tier::Fast, &prompt, cancel).await {
            Ok(raw) => match decoder::decode_as::<crate::types::CommitAnalysisResponse>(&raw) {
                Ok(response) => {
                    let (reduced, coerced) = response.into_analysis();
                    self.record_coercions(diagnostics, "commit", commit.short_id(), coerced);
                    if !reduced.changes.is_empty() {
                        return Ok(CommitAnalysis {
                            changes: reduced.changes,
                            trivial: merged.trivial,
                        });
                    }
                    Ok(merged)
                }
                Err(e) => {
                    diagnostics.push(diagnostic_for(&e, "commit", commit.short_id()));
                    Ok(merged)
                }
            },
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                diagnostics.push(diagnostic_for(&e, "commit", commit.short_id()));
                Ok(merged)
            }
        }
    }

    /// Daily tier for one day bucket. A failure degrades the narrative while
    /// the aggregated changes survive untouched.
    async fn synthesize_day(
        &self,
        day: &DayBucket,
        analyses: &HashMap<&str, CommitAnalysis>,
        cancel: &CancellationToken,
    ) -> Result<DayOutcome> {
        let mut diagnostics = Vec::new();
        let ordered: Vec<(String, CommitAnalysis)> = day
            .commits
            .iter()
            .filter_map(|c| {
                analyses
                    .get(c.id.as_str())
                    .map(|a| (c.subject.clone(), a.clone()))
            })
            .collect();
        let aggregated = aggregate_changes(ordered.iter().map(|(_, a)| a));

        // Repository failures here are fatal: the day's diff is part of the
        // contract, not an optional enrichment.
        let daily = self.reader.daily_diff(day)?;

        let model = &self.gateway.settings(Tier::Balanced).model;
        let structured = json!({
            "date": day.date.format("%Y-%m-%d").to_string(),
            "analyses": ordered,
            "diff": daily.diff,
        });
        let key = CacheKey::derive(CacheNamespace::Daily, PROMPT_VERSION, model, &structured);

        match self.cache.get(CacheNamespace::Daily, &key) {
            Ok(Some(payload)) => {
                if let Ok(synthesis) = serde_json::from_str::<DailySynthesis>(&payload) {
                    return Ok(DayOutcome {
                        synthesis,
                        diagnostics,
                        cache_hit: true,
                    });
                }
            }
            Ok(None) => {}
            Err(e) => self.record_cache_diagnostic(
                &mut diagnostics,
                "daily",
                &day.date.to_string(),
                &e,
            ),
        }

        let narrative = match self
            .narrate_day(day, &ordered, &daily.diff, cancel)
            .await
        {
            Ok(narrative) => narrative,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log_error!("Daily synthesis failed for {}: {}", day.date, e);
                diagnostics.push(diagnostic_for(&e, "daily", &day.date.to_string()));
                let synthesis = DailySynthesis {
                    date: day.date,
                    narrative: format!("Synthesis unavailable for {}.", day.date),
                    changes: aggregated,
                };
                return Ok(DayOutcome {
                    synthesis,
                    diagnostics,
                    cache_hit: false,
                });
            }
        };

        let synthesis = DailySynthesis {
            date: day.date,
            narrative: clamp_narrative(&narrative),
            changes: aggregated,
        };
        match serde_json::to_string(&synthesis) {
            Ok(payload) => {
                if let Err(e) = self.cache.put(CacheNamespace::Daily, &key, &payload) {
                    self.record_cache_diagnostic(
                        &mut diagnostics,
                        "daily",
                        &day.date.to_string(),
                        &e,
                    );
                }
            }
            Err(e) => log_error!("Failed to serialize daily synthesis: {}", e),
        }
        Ok(DayOutcome {
            synthesis,
            diagnostics,
            cache_hit: false,
        })
    }

    async fn narrate_day(
        &self,
        day: &DayBucket,
        ordered: &[(String, CommitAnalysis)],
        diff: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let chunks = self.fitter_for(Tier::Balanced).fit(diff);
        let total = chunks.len();
        let mut partials: Vec<DailySummaryResponse> = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            let part = (total > 1).then_some((index, total));
            let prompt = daily_prompt(day.date, ordered, chunk, part);
            let raw = self.gateway.generate(Tier::Balanced, &prompt, cancel).await?;
            partials.push(decoder::decode_as::<DailySummaryResponse>(&raw)?);
        }

        if total <= 1 {
            return Ok(partials
                .into_iter()
                .next()
                .map(|p| p.narrative)
                .unwrap_or_default());
        }

        let prompt = daily_reduce_prompt(day.date, &partials);
        let raw = self.gateway.generate(Tier::Balanced, &prompt, cancel).await?;
        Ok(decoder::decode_as::<DailySummaryResponse>(&raw)?.narrative)
    }

    /// Weekly tier for one week: narrative from the deep tier, changelog
    /// fragment aggregated purely from commit-tier output.
    async fn synthesize_week(
        &self,
        week: &WeekBucket,
        analyses: &HashMap<&str, CommitAnalysis>,
        syntheses: &HashMap<chrono::NaiveDate, DailySynthesis>,
        cancel: &CancellationToken,
    ) -> Result<(WeekArtifact, Vec<Diagnostic>, usize)> {
        let mut diagnostics = Vec::new();
        let mut cache_hits = 0;

        let days: Vec<DailySynthesis> = week
            .days
            .iter()
            .filter_map(|d| syntheses.get(&d.date).cloned())
            .collect();
        let changes = aggregate_changes(
            week.commits()
                .filter_map(|c| analyses.get(c.id.as_str())),
        );

        // The aggregated fragment is cached for cross-run stability even
        // though no LLM call produces it.
        let changelog_input = json!({ "label": week.label, "changes": changes });
        let changelog_key = CacheKey::derive(
            CacheNamespace::WeeklyChangelog,
            PROMPT_VERSION,
            "aggregation",
            &changelog_input,
        );
        match self.cache.get(CacheNamespace::WeeklyChangelog, &changelog_key) {
            Ok(Some(_)) => cache_hits += 1,
            Ok(None) => match serde_json::to_string(&changes) {
                Ok(payload) => {
                    if let Err(e) =
                        self.cache
                            .put(CacheNamespace::WeeklyChangelog, &changelog_key, &payload)
                    {
                        self.record_cache_diagnostic(&mut diagnostics, "weekly", &week.label, &e);
                    }
                }
                Err(e) => log_error!("Failed to serialize changelog fragment: {}", e),
            },
            Err(e) => self.record_cache_diagnostic(&mut diagnostics, "weekly", &week.label, &e),
        }

        let weekly = self.reader.weekly_diff(week)?;
        let model = &self.gateway.settings(Tier::Deep).model;
        let narrative_input = json!({
            "label": week.label,
            "days": days
                .iter()
                .map(|d| json!({"date": d.date.format("%Y-%m-%d").to_string(), "narrative": d.narrative}))
                .collect::<Vec<_>>(),
            "diff": weekly.diff,
        });
        let narrative_key = CacheKey::derive(
            CacheNamespace::WeeklyNarrative,
            PROMPT_VERSION,
            model,
            &narrative_input,
        );

        let cached_narrative = match self.cache.get(CacheNamespace::WeeklyNarrative, &narrative_key)
        {
            Ok(found) => {
                if found.is_some() {
                    cache_hits += 1;
                }
                found
            }
            Err(e) => {
                self.record_cache_diagnostic(&mut diagnostics, "weekly", &week.label, &e);
                None
            }
        };

        let narrative = if let Some(narrative) = cached_narrative {
            narrative
        } else {
            match self.narrate_week(week, &days, &weekly.diff, cancel).await {
                Ok(narrative) => {
                    let narrative = clamp_narrative(&narrative);
                    if let Err(e) =
                        self.cache
                            .put(CacheNamespace::WeeklyNarrative, &narrative_key, &narrative)
                    {
                        self.record_cache_diagnostic(&mut diagnostics, "weekly", &week.label, &e);
                    }
                    narrative
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log_error!("Weekly narrative failed for {}: {}", week.label, e);
                    diagnostics.push(diagnostic_for(&e, "weekly", &week.label));
                    format!("Synthesis unavailable for {}.", week.label)
                }
            }
        };

        let artifact = WeekArtifact {
            label: week.label.clone(),
            week_start: week.week_start,
            narrative,
            changes,
            days,
        };
        Ok((artifact, diagnostics, cache_hits))
    }

    async fn narrate_week(
        &self,
        week: &WeekBucket,
        days: &[DailySynthesis],
        diff: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let chunks = self.fitter_for(Tier::Deep).fit(diff);
        let total = chunks.len();
        let mut partials: Vec<String> = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            let part = (total > 1).then_some((index, total));
            let prompt = weekly_narrative_prompt(&week.label, days, chunk, part);
            let raw = self.gateway.generate(Tier::Deep, &prompt, cancel).await?;
            partials.push(raw.trim().to_string());
        }

        if total <= 1 {
            return Ok(partials.into_iter().next().unwrap_or_default());
        }

        let prompt = weekly_reduce_prompt(&week.label, &partials);
        let raw = self.gateway.generate(Tier::Deep, &prompt, cancel).await?;
        Ok(raw.trim().to_string())
    }

    fn fitter_for(&self, tier: Tier) -> DiffFitter {
        let budget = self
            .gateway
            .settings(tier)
            .max_input_tokens
            .saturating_sub(PROMPT_MARGIN_TOKENS)
            .max(256);
        DiffFitter::new(budget)
    }

    fn record_coercions(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
        tier: &'static str,
        subject: &str,
        coerced: Vec<String>,
    ) {
        for raw in coerced {
            log_debug!("Unknown category '{}' from {} coerced to Other", raw, subject);
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::CoercedCategory,
                tier,
                subject: subject.to_string(),
                message: format!("unknown category '{raw}' coerced to Other"),
            });
        }
    }

    fn record_cache_diagnostic(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
        tier: &'static str,
        subject: &str,
        error: &ChronicleError,
    ) {
        log_error!("Cache degraded to miss for {}: {}", subject, error);
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::CacheIo,
            tier,
            subject: subject.to_string(),
            message: error.to_string(),
        });
    }
}

/// Deduplicated union of changes from non-trivial analyses, in input order.
fn aggregate_changes<'a>(analyses: impl Iterator<Item = &'a CommitAnalysis>) -> Vec<Change> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for analysis in analyses {
        if analysis.trivial {
            continue;
        }
        for change in &analysis.changes {
            if seen.insert(change.dedup_key()) {
                out.push(change.clone());
            }
        }
    }
    out
}

fn clamp_narrative(narrative: &str) -> String {
    let trimmed = narrative.trim();
    if trimmed.chars().count() <= MAX_NARRATIVE_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_NARRATIVE_CHARS).collect()
}

fn diagnostic_for(error: &ChronicleError, tier: &'static str, subject: &str) -> Diagnostic {
    let kind = match error {
        ChronicleError::Parse { .. } => DiagnosticKind::Parse,
        ChronicleError::Validation { .. } => DiagnosticKind::Validation,
        ChronicleError::CacheIo { .. } => DiagnosticKind::CacheIo,
        _ => DiagnosticKind::Llm,
    };
    Diagnostic {
        kind,
        tier,
        subject: subject.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::commit::ChangeCategory;

    fn analysis(trivial: bool, summaries: &[&str]) -> CommitAnalysis {
        CommitAnalysis {
            changes: summaries
                .iter()
                .map(|s| Change {
                    summary: (*s).to_string(),
                    category: ChangeCategory::Added,
                })
                .collect(),
            trivial,
        }
    }

    #[test]
    fn test_aggregate_skips_trivial_and_dedups() {
        let analyses = vec![
            analysis(false, &["add x", "add y"]),
            analysis(true, &["format code"]),
            analysis(false, &["Add  X", "add z"]),
        ];
        let changes = aggregate_changes(analyses.iter());
        let summaries: Vec<&str> = changes.iter().map(|c| c.summary.as_str()).collect();
        assert_eq!(summaries, vec!["add x", "add y", "add z"]);
    }

    #[test]
    fn test_clamp_narrative() {
        let long: String = "x".repeat(MAX_NARRATIVE_CHARS + 100);
        assert_eq!(clamp_narrative(&long).chars().count(), MAX_NARRATIVE_CHARS);
        assert_eq!(clamp_narrative("  short  "), "short");
    }

    #[test]
    fn test_diagnostic_classification() {
        let parse = ChronicleError::Parse {
            input_len: 1,
            last_transform: "salvage",
        };
        assert_eq!(diagnostic_for(&parse, "commit", "abcd").kind, DiagnosticKind::Parse);
        let llm = ChronicleError::llm("boom");
        assert_eq!(diagnostic_for(&llm, "daily", "2025-03-10").kind, DiagnosticKind::Llm);
    }
}
