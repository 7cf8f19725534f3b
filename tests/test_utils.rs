//! Shared test infrastructure: fixture repositories with controlled author
//! timestamps and a scripted text generator for pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use git2::{Repository, Signature, Time};
use git_chronicle::llm::{ProviderError, TextGenerator, Tier, TierSettings};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a temporary Git repository with user config set
pub fn setup_git_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let repo = Repository::init(temp_dir.path()).expect("Failed to initialize repository");

    {
        let mut config = repo.config().expect("Failed to get repository config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user email");
    }

    (temp_dir, repo)
}

/// Write `content` to `filename` and commit it with the given author
/// timestamp (epoch seconds, UTC).
pub fn commit_file(
    repo: &Repository,
    workdir: &Path,
    filename: &str,
    content: &[u8],
    message: &str,
    authored_secs: i64,
) -> String {
    let file_path = workdir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dirs");
    }
    fs::write(&file_path, content).expect("Failed to write file");

    let mut index = repo.index().expect("Failed to get repository index");
    index
        .add_path(Path::new(filename))
        .expect("Failed to add file to index");
    index.write().expect("Failed to write index");

    let tree_id = index.write_tree().expect("Failed to write tree");
    let tree = repo.find_tree(tree_id).expect("Failed to find tree");
    let signature = Signature::new("Test User", "test@example.com", &Time::new(authored_secs, 0))
        .expect("Failed to create signature");

    let parent = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .expect("Failed to commit");
    oid.to_string()
}

/// Remove a file and commit the deletion
pub fn commit_removal(
    repo: &Repository,
    workdir: &Path,
    filename: &str,
    message: &str,
    authored_secs: i64,
) -> String {
    fs::remove_file(workdir.join(filename)).expect("Failed to remove file");
    let mut index = repo.index().expect("Failed to get repository index");
    index
        .remove_path(Path::new(filename))
        .expect("Failed to remove from index");
    index.write().expect("Failed to write index");

    let tree_id = index.write_tree().expect("Failed to write tree");
    let tree = repo.find_tree(tree_id).expect("Failed to find tree");
    let signature = Signature::new("Test User", "test@example.com", &Time::new(authored_secs, 0))
        .expect("Failed to create signature");
    let parent = repo
        .head()
        .expect("Failed to get HEAD")
        .peel_to_commit()
        .expect("Failed to peel HEAD");

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])
        .expect("Failed to commit");
    oid.to_string()
}

/// Epoch seconds for a date and hour, UTC
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> i64 {
    use chrono::{NaiveDate, NaiveTime};
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid date")
        .and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time"))
        .and_utc()
        .timestamp()
}

/// Which kind of prompt a scripted call saw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Commit,
    CommitReduce,
    Daily,
    DailyReduce,
    WeeklyNarrative,
    WeeklyReduce,
}

pub fn classify_prompt(prompt: &str) -> PromptKind {
    if prompt.contains("analyzed in parts") {
        if prompt.contains("single Git commit") {
            PromptKind::CommitReduce
        } else if prompt.contains("one day of repository work") {
            PromptKind::DailyReduce
        } else {
            PromptKind::WeeklyReduce
        }
    } else if prompt.contains("analyzes a single Git commit") {
        PromptKind::Commit
    } else if prompt.contains("one day of work") {
        PromptKind::Daily
    } else {
        PromptKind::WeeklyNarrative
    }
}

type Responder =
    Box<dyn Fn(PromptKind, &str) -> Result<String, ProviderError> + Send + Sync + 'static>;

/// Deterministic scripted generator: answers by prompt kind and counts calls
pub struct ScriptedGenerator {
    calls: AtomicUsize,
    by_kind: Mutex<HashMap<PromptKind, usize>>,
    responder: Responder,
}

impl ScriptedGenerator {
    pub fn new(
        responder: impl Fn(PromptKind, &str) -> Result<String, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            by_kind: Mutex::new(HashMap::new()),
            responder: Box::new(responder),
        })
    }

    /// Standard happy-path responder for end-to-end tests
    pub fn happy_path() -> Arc<Self> {
        Self::new(|kind, _prompt| {
            Ok(match kind {
                PromptKind::Commit | PromptKind::CommitReduce => {
                    r#"{"changes":[{"summary":"add x","category":"Added"}],"trivial":false}"#
                        .to_string()
                }
                PromptKind::Daily | PromptKind::DailyReduce => {
                    r#"{"narrative":"Work happened.","changes":[{"summary":"add x","category":"Added"}]}"#
                        .to_string()
                }
                PromptKind::WeeklyNarrative | PromptKind::WeeklyReduce => {
                    "A productive week.".to_string()
                }
            })
        })
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_of(&self, kind: PromptKind) -> usize {
        self.by_kind.lock().get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _settings: &TierSettings,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let kind = classify_prompt(prompt);
        *self.by_kind.lock().entry(kind).or_insert(0) += 1;
        (self.responder)(kind, prompt)
    }
}

/// Tier settings tuned for fast tests (no real backoff waits)
pub fn test_tier_settings(max_input_tokens: usize) -> TierSettings {
    TierSettings {
        max_input_tokens,
        backoff_base: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
        ..TierSettings::defaults_for(Tier::Fast)
    }
}
