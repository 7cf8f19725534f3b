//! LLM gateway: an abstract text-generation capability with tiering,
//! retries, timeouts, and cooperative cancellation.
//!
//! The pipeline never talks to a vendor SDK directly. It asks the gateway
//! for text at one of three tiers (`fast`, `balanced`, `deep`), each with its
//! own model, token budgets, temperature, timeout, and retry schedule. The
//! concrete provider sits behind [`TextGenerator`]; tests substitute
//! scripted stubs.

pub mod openai;

use crate::errors::{ChronicleError, Result};
use crate::{log_debug, log_error};
use async_trait::async_trait;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_util::sync::CancellationToken;

/// Invocation profile picked per pipeline operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Commit-level analysis
    Fast,
    /// Daily synthesis
    Balanced,
    /// Weekly narrative
    Deep,
}

impl Tier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-tier configuration, resolved from the config layer
#[derive(Debug, Clone)]
pub struct TierSettings {
    pub model: String,
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_attempts: u32,
    /// First backoff delay; subsequent delays double, with jitter
    pub backoff_base: Duration,
}

impl TierSettings {
    /// Sensible defaults for a tier; the config layer overrides fields.
    pub fn defaults_for(tier: Tier) -> Self {
        let (model, max_input_tokens, timeout_secs) = match tier {
            Tier::Fast => ("gpt-5-mini", 60_000, 60),
            Tier::Balanced => ("gpt-5.1", 100_000, 120),
            Tier::Deep => ("gpt-5.1", 160_000, 180),
        };
        Self {
            model: model.to_string(),
            max_input_tokens,
            max_output_tokens: 4_096,
            temperature: 0.2,
            timeout: Duration::from_secs(timeout_secs),
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Failure reported by a provider, split by retry class
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Abstract text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One attempt; the gateway owns retries and timeouts.
    async fn generate(
        &self,
        prompt: &str,
        settings: &TierSettings,
    ) -> std::result::Result<String, ProviderError>;
}

/// Tiered facade over a [`TextGenerator`]
pub struct LlmGateway {
    provider: Arc<dyn TextGenerator>,
    fast: TierSettings,
    balanced: TierSettings,
    deep: TierSettings,
    calls: AtomicU64,
}

impl LlmGateway {
    pub fn new(
        provider: Arc<dyn TextGenerator>,
        fast: TierSettings,
        balanced: TierSettings,
        deep: TierSettings,
    ) -> Self {
        Self {
            provider,
            fast,
            balanced,
            deep,
            calls: AtomicU64::new(0),
        }
    }

    pub fn settings(&self, tier: Tier) -> &TierSettings {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Balanced => &self.balanced,
            Tier::Deep => &self.deep,
        }
    }

    /// Total provider attempts issued so far (retries included)
    pub fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Generate text at `tier`, retrying retryable failures with exponential
    /// backoff and jitter, bailing out early on cancellation.
    pub async fn generate(
        &self,
        tier: Tier,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let settings = self.settings(tier);
        let mut backoff = ExponentialBackoff::from_millis(2)
            .factor(settings.backoff_base.as_millis().try_into().unwrap_or(500) / 2)
            .max_delay(Duration::from_secs(30));
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=settings.max_attempts.max(1) {
            if cancel.is_cancelled() {
                return Err(ChronicleError::Cancelled);
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => return Err(ChronicleError::Cancelled),
                outcome = tokio::time::timeout(
                    settings.timeout,
                    self.provider.generate(prompt, settings),
                ) => outcome,
            };
            self.calls.fetch_add(1, Ordering::Relaxed);

            let error = match outcome {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => e,
                Err(_elapsed) => ProviderError::retryable(format!(
                    "{tier} tier call timed out after {:?}",
                    settings.timeout
                )),
            };

            if !error.retryable {
                log_error!("Non-retryable {} tier failure: {}", tier, error);
                return Err(ChronicleError::Llm {
                    message: format!("{tier} tier failed: {error}"),
                    source: Some(Box::new(error)),
                });
            }

            log_debug!(
                "Retryable {} tier failure on attempt {}/{}: {}",
                tier,
                attempt,
                settings.max_attempts,
                error
            );
            last_error = Some(error);

            if attempt < settings.max_attempts {
                let delay = backoff.next().unwrap_or(settings.backoff_base);
                let jitter = rand::rng().random_range(Duration::ZERO..=delay / 2);
                tokio::select! {
                    () = cancel.cancelled() => return Err(ChronicleError::Cancelled),
                    () = tokio::time::sleep(delay + jitter) => {}
                }
            }
        }

        let cause = last_error.map_or_else(|| "no attempts made".to_string(), |e| e.message);
        Err(ChronicleError::Llm {
            message: format!(
                "{tier} tier exhausted {} attempts: {cause}",
                settings.max_attempts
            ),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Scripted provider for gateway tests
    struct ScriptedProvider {
        script: Mutex<Vec<std::result::Result<String, ProviderError>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<std::result::Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _settings: &TierSettings,
        ) -> std::result::Result<String, ProviderError> {
            self.script
                .lock()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::fatal("script exhausted")))
        }
    }

    fn quick_settings() -> TierSettings {
        TierSettings {
            backoff_base: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            ..TierSettings::defaults_for(Tier::Fast)
        }
    }

    fn gateway(provider: Arc<dyn TextGenerator>) -> LlmGateway {
        let s = quick_settings();
        LlmGateway::new(provider, s.clone(), s.clone(), s)
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let provider = ScriptedProvider::new(vec![Ok("hello".to_string())]);
        let gateway = gateway(provider);
        let cancel = CancellationToken::new();
        let text = gateway
            .generate(Tier::Fast, "prompt", &cancel)
            .await
            .expect("generate");
        assert_eq!(text, "hello");
        assert_eq!(gateway.calls_made(), 1);
    }

    #[tokio::test]
    async fn test_retries_retryable_then_succeeds() {
        // Script pops from the end
        let provider = ScriptedProvider::new(vec![
            Ok("recovered".to_string()),
            Err(ProviderError::retryable("rate limited")),
        ]);
        let gateway = gateway(provider);
        let cancel = CancellationToken::new();
        let text = gateway
            .generate(Tier::Fast, "prompt", &cancel)
            .await
            .expect("generate");
        assert_eq!(text, "recovered");
        assert_eq!(gateway.calls_made(), 2);
    }

    #[tokio::test]
    async fn test_fatal_fails_immediately() {
        let provider = ScriptedProvider::new(vec![
            Ok("never reached".to_string()),
            Err(ProviderError::fatal("bad credentials")),
        ]);
        let gateway = gateway(provider);
        let cancel = CancellationToken::new();
        let err = gateway
            .generate(Tier::Fast, "prompt", &cancel)
            .await
            .expect_err("should fail");
        assert!(matches!(err, ChronicleError::Llm { .. }));
        assert_eq!(gateway.calls_made(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_cause() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::retryable("third")),
            Err(ProviderError::retryable("second")),
            Err(ProviderError::retryable("first")),
        ]);
        let gateway = gateway(provider);
        let cancel = CancellationToken::new();
        let err = gateway
            .generate(Tier::Fast, "prompt", &cancel)
            .await
            .expect_err("should exhaust");
        assert!(err.to_string().contains("third"));
        assert_eq!(gateway.calls_made(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits() {
        let provider = ScriptedProvider::new(vec![Ok("unused".to_string())]);
        let gateway = gateway(provider);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = gateway
            .generate(Tier::Fast, "prompt", &cancel)
            .await
            .expect_err("cancelled");
        assert!(matches!(err, ChronicleError::Cancelled));
        assert_eq!(gateway.calls_made(), 0);
    }
}
