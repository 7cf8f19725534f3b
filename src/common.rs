//! Shared CLI parameter handling and window resolution.

use crate::config::Config;
use crate::errors::ChronicleError;
use crate::providers::Provider;
use crate::types::AnalysisWindow;
use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use clap::Args;

/// Parameters shared by commands that run the pipeline
#[derive(Args, Clone, Default, Debug)]
pub struct CommonParams {
    /// Override default LLM provider
    #[arg(long, help = "Override default LLM provider", value_parser = available_providers_parser)]
    pub provider: Option<String>,

    /// Path to the repository to analyze
    #[arg(short = 'p', long = "path", help = "Path to the repository to analyze")]
    pub repo_path: Option<String>,

    /// Timezone for day bucketing (UTC or fixed offset like +02:00)
    #[arg(long, help = "Timezone for day bucketing (UTC or fixed offset like +02:00)")]
    pub timezone: Option<String>,
}

impl CommonParams {
    pub fn apply_to_config(&self, config: &mut Config) -> Result<()> {
        if let Some(provider) = &self.provider {
            let provider_name = if provider.to_lowercase() == "claude" {
                "anthropic".to_string()
            } else {
                provider.clone()
            };
            config.default_provider = provider_name;
        }
        if let Some(timezone) = &self.timezone {
            config.timezone.clone_from(timezone);
        }
        Ok(())
    }
}

/// Validates that a provider name is available in the system
pub fn available_providers_parser(s: &str) -> std::result::Result<String, String> {
    let mut provider_name = s.to_lowercase();
    if provider_name == "claude" {
        provider_name = "anthropic".to_string();
    }

    if Provider::all_names().iter().any(|p| *p == provider_name) {
        Ok(provider_name)
    } else {
        Err(format!(
            "Invalid provider '{}'. Available providers: {}",
            s,
            Provider::all_names().join(", ")
        ))
    }
}

/// Resolve the analysis window from either an explicit range or a relative
/// "last N weeks" form. Explicit bounds accept RFC 3339 timestamps or bare
/// dates, interpreted in the bucketing timezone.
pub fn resolve_window(
    since: Option<&str>,
    until: Option<&str>,
    weeks: Option<u32>,
    tz: FixedOffset,
) -> Result<AnalysisWindow> {
    if weeks.is_some() && (since.is_some() || until.is_some()) {
        return Err(anyhow!(
            "--weeks cannot be combined with --since/--until"
        ));
    }

    if let Some(weeks) = weeks {
        let now = Utc::now().with_timezone(&tz);
        return Ok(AnalysisWindow::last_weeks(weeks, now)?);
    }

    let since = since.ok_or_else(|| anyhow!("either --weeks or --since is required"))?;
    let start = parse_bound(since, tz, false)?;
    let end = match until {
        Some(until) => parse_bound(until, tz, true)?,
        None => Utc::now().with_timezone(&tz),
    };
    Ok(AnalysisWindow::new(start, end)?)
}

/// Parse one window bound. Bare dates expand to the start (or, for the upper
/// bound, the end) of that day in `tz`.
fn parse_bound(value: &str, tz: FixedOffset, is_end: bool) -> Result<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if is_end {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
        } else {
            NaiveTime::default()
        };
        return date
            .and_time(time)
            .and_local_timezone(tz)
            .single()
            .ok_or_else(|| anyhow!("ambiguous date '{value}'"));
    }
    Err(ChronicleError::Configuration(format!(
        "invalid window bound '{value}': expected RFC 3339 timestamp or YYYY-MM-DD"
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).expect("utc")
    }

    #[test]
    fn test_explicit_window_from_dates() {
        let window =
            resolve_window(Some("2025-03-01"), Some("2025-03-14"), None, utc()).expect("window");
        assert_eq!(window.start.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2025-03-14T23:59:59+00:00");
    }

    #[test]
    fn test_rfc3339_bounds() {
        let window = resolve_window(
            Some("2025-03-01T12:00:00+02:00"),
            Some("2025-03-02T12:00:00+02:00"),
            None,
            utc(),
        )
        .expect("window");
        assert!(window.start < window.end);
    }

    #[test]
    fn test_weeks_and_since_conflict() {
        assert!(resolve_window(Some("2025-03-01"), None, Some(2), utc()).is_err());
    }

    #[test]
    fn test_missing_bounds() {
        assert!(resolve_window(None, None, None, utc()).is_err());
    }

    #[test]
    fn test_invalid_bound_is_configuration_error() {
        let err = resolve_window(Some("yesterday"), None, None, utc()).expect_err("bad bound");
        assert!(err.to_string().contains("yesterday"));
    }
}
