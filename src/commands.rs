//! Command handlers wiring configuration, the pipeline, and the merger.

use crate::artifacts::{ArtifactMerger, ArtifactPaths};
use crate::cache::{CacheNamespace, CacheStore};
use crate::common::{CommonParams, resolve_window};
use crate::config::Config;
use crate::git::{GitRepo, RepoReader};
use crate::llm::openai::OpenAiCompatProvider;
use crate::llm::{LlmGateway, Tier};
use crate::orchestrator::{Orchestrator, RunReport};
use crate::providers::Provider;
use crate::ui;
use crate::{log_debug, log_error};
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Release tags look like v1.2.3 or 1.2.3, with an optional pre-release part
static RELEASE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?\d+\.\d+\.\d+(?:[-+][0-9A-Za-z.-]+)?$")
        .expect("Failed to compile release tag regex pattern - this is a bug")
});

/// Handle the 'report' command: run the pipeline and merge the artifacts.
pub async fn handle_report(
    common: CommonParams,
    since: Option<String>,
    until: Option<String>,
    weeks: Option<u32>,
    release_tag: Option<String>,
    output: Option<String>,
    quiet: bool,
) -> Result<()> {
    let mut config = Config::load()?;
    common.apply_to_config(&mut config)?;
    config.validate()?;

    if let Some(tag) = release_tag.as_deref() {
        if !RELEASE_TAG_RE.is_match(tag) {
            return Err(anyhow!(
                "Invalid release tag '{tag}': expected a version like v1.2.0"
            ));
        }
    }

    let timezone = config.bucketing_timezone()?;
    let window = resolve_window(since.as_deref(), until.as_deref(), weeks, timezone)?;

    let repo_path = resolve_repo_path(common.repo_path.as_deref())?;
    let repo = GitRepo::open(&repo_path)?;
    let reader = RepoReader::new(repo, timezone);

    let output_dir = output
        .map(PathBuf::from)
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| repo_path.clone());
    let paths = ArtifactPaths::in_dir(&output_dir);

    let provider: Provider = config
        .provider()
        .ok_or_else(|| anyhow!("Invalid provider: {}", config.default_provider))?;
    let api_key = config.resolve_api_key()?;
    let base_url = config
        .get_provider_config(provider.name())
        .map_or_else(|| provider.base_url().to_string(), |p| {
            p.effective_base_url(provider).to_string()
        });

    let gateway = Arc::new(LlmGateway::new(
        Arc::new(OpenAiCompatProvider::new(base_url, api_key)),
        config.tier_settings(Tier::Fast),
        config.tier_settings(Tier::Balanced),
        config.tier_settings(Tier::Deep),
    ));
    let cache = Arc::new(CacheStore::new(config.cache_root()?));
    let orchestrator = Orchestrator::new(reader, gateway, cache, config.concurrency_limits());

    // Ctrl-C propagates as a cooperative cancel; nothing is merged after it.
    let cancel = CancellationToken::new();
    let cancel_on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_error!("Interrupt received, cancelling run");
            cancel_on_interrupt.cancel();
        }
    });

    let spinner = (!quiet).then(|| ui::create_spinner("Analyzing repository history..."));
    let result = orchestrator.run(&window, &cancel).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    if report.weeks.is_empty() {
        ui::print_info("No commits in the analysis window; artifacts unchanged.");
        return Ok(());
    }

    let merger = ArtifactMerger::new(paths.clone());
    let today = Utc::now().with_timezone(&timezone).date_naive();
    merger
        .merge(&report.weeks, release_tag.as_deref(), today)
        .context("Failed to merge artifacts")?;

    print_summary(&report, &paths, quiet);
    Ok(())
}

fn print_summary(report: &RunReport, paths: &ArtifactPaths, quiet: bool) {
    let stats = report.stats;
    ui::print_success(&format!(
        "Analyzed {} commit(s) across {} day(s) and {} week(s) ({} cache hit(s), {} LLM call(s)).",
        stats.commits, stats.days, stats.weeks, stats.cache_hits, stats.llm_calls
    ));
    if !quiet {
        for path in [&paths.narrative, &paths.changelog, &paths.daily_log] {
            println!("  {} {}", "wrote".dimmed(), path.display());
        }
    }

    if report.diagnostics.is_empty() {
        return;
    }
    ui::print_warning(&format!(
        "{} recovered issue(s) during the run:",
        report.diagnostics.len()
    ));
    for diagnostic in &report.diagnostics {
        ui::print_warning(&format!(
            "  [{}/{}] {}: {}",
            diagnostic.tier,
            diagnostic.kind.as_str(),
            diagnostic.subject,
            diagnostic.message
        ));
    }
}

/// Handle the 'clear-cache' command
pub fn handle_clear_cache(namespace: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let store = CacheStore::new(config.cache_root()?);

    let namespace = match namespace {
        Some(name) => Some(
            CacheNamespace::ALL
                .iter()
                .find(|ns| ns.as_str() == name)
                .copied()
                .ok_or_else(|| {
                    anyhow!(
                        "Unknown namespace '{}'. Expected one of: {}",
                        name,
                        CacheNamespace::ALL
                            .iter()
                            .map(|ns| ns.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                })?,
        ),
        None => None,
    };

    let removed = store.clear(namespace)?;
    ui::print_success(&format!("Removed {removed} cache entr(y/ies)."));
    Ok(())
}

/// Handle the 'config' command
pub fn handle_config(
    common: CommonParams,
    api_key: Option<String>,
    model: Option<String>,
    fast_model: Option<String>,
    token_limit: Option<usize>,
) -> Result<()> {
    let mut config = Config::load()?;
    let updating = common.provider.is_some()
        || common.timezone.is_some()
        || api_key.is_some()
        || model.is_some()
        || fast_model.is_some()
        || token_limit.is_some();

    if updating {
        config.update(
            common.provider,
            api_key,
            model,
            fast_model,
            token_limit,
            common.timezone,
        )?;
        config.save()?;
        ui::print_success("Configuration updated.");
        log_debug!("Configuration updated and saved");
        return Ok(());
    }

    print_config(&config);
    Ok(())
}

fn print_config(config: &Config) {
    println!("{}", "Current configuration:".bold());
    println!("  Provider: {}", config.default_provider);
    println!("  Timezone: {}", config.timezone);
    if let Some(provider) = config.provider() {
        if let Some(provider_config) = config.get_provider_config(provider.name()) {
            println!(
                "  Model (balanced/deep): {}",
                provider_config.effective_model(provider)
            );
            println!(
                "  Model (fast): {}",
                provider_config.effective_fast_model(provider)
            );
            println!(
                "  API key: {}",
                if provider_config.has_api_key() {
                    "configured"
                } else {
                    "from environment"
                }
            );
        }
    }
    if let Ok(cache_root) = config.cache_root() {
        println!("  Cache root: {}", cache_root.display());
    }
}

/// Exit code for an error, per the external contract: configuration and
/// repository failures are distinguishable from generic failures.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    use crate::errors::ChronicleError;
    match error.downcast_ref::<ChronicleError>() {
        Some(ChronicleError::Configuration(_)) => 2,
        Some(ChronicleError::Repository(_)) => 3,
        Some(ChronicleError::Cancelled) => 130,
        _ => 1,
    }
}

/// Resolve a repository path argument, defaulting to the current directory.
pub fn resolve_repo_path(path: Option<&str>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(Path::new(p).to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}
