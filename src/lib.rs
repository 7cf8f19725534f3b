//! Git-Chronicle - AI-powered repository historian
//!
//! Analyzes a repository's commit history over a configurable window and
//! produces three artifacts: a stakeholder narrative, a structured
//! changelog, and a daily activity log. The pipeline is hierarchical
//! (commit -> day -> week), bounded in concurrency, cached by content, and
//! tolerant of imperfect LLM output - no commit in the window is ever lost
//! to a resource limit or a bad response.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine
#![allow(clippy::too_many_arguments)] // Some functions legitimately need many params

pub mod artifacts;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod fitter;
pub mod git;
pub mod llm;
pub mod logger;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod types;
pub mod ui;

// Re-export important structs for easier testing
pub use config::Config;
pub use errors::ChronicleError;
pub use providers::{Provider, ProviderConfig};

// Re-exports from types module
pub use types::{
    AnalysisWindow, Change, ChangeCategory, Commit, CommitAnalysis, DailySynthesis, DayBucket,
    WeekArtifact, WeekBucket,
};
