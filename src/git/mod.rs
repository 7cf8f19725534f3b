//! Repository access: the three-lens reader over a local Git repository.

pub mod reader;
pub mod repository;

pub use reader::{DailyDiff, RepoReader, WeeklyDiff};
pub use repository::GitRepo;
