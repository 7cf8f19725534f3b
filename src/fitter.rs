//! Fitting oversized diffs into a token budget.
//!
//! Truncation is forbidden: every commit must influence the output, so a
//! diff that exceeds the model's input budget is split into chunks that are
//! analyzed independently and reduced afterwards. Splits happen on file
//! boundaries first, then hunk boundaries, then line boundaries; a single
//! line is only ever broken when it alone exceeds the budget, and then at
//! whitespace with a trailing continuation marker.
//!
//! Token counts use the same `cl100k_base` encoding the gateway budgets
//! with.

use once_cell::sync::Lazy;
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Marker appended to every non-final piece of a split line
pub const CONTINUATION_MARKER: &str = " \\";

static ENCODER: Lazy<CoreBPE> =
    Lazy::new(|| cl100k_base().expect("cl100k_base encoding is bundled with tiktoken-rs"));

/// Shared token counter over the gateway's encoding
#[derive(Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    pub fn new() -> Self {
        Self
    }

    pub fn count(&self, text: &str) -> usize {
        ENCODER.encode_ordinary(text).len()
    }
}

/// Splits diffs into budget-sized chunks without losing content.
pub struct DiffFitter {
    counter: TokenCounter,
    budget: usize,
}

/// One file's portion of a unified diff
struct FileSection<'a> {
    /// `diff --git` + extended header lines up to the first hunk
    header: Vec<&'a str>,
    /// Hunks, each starting with its `@@` line
    hunks: Vec<Vec<&'a str>>,
}

impl DiffFitter {
    /// `budget` is the per-chunk token allowance; it must leave headroom for
    /// the prompt template around the chunk (the caller's concern).
    pub fn new(budget: usize) -> Self {
        Self {
            counter: TokenCounter::new(),
            budget: budget.max(1),
        }
    }

    /// Split `diff` into chunks of at most `budget` tokens each.
    ///
    /// When a file is split across chunks its header lines are repeated in
    /// every chunk, so each chunk carries its file-boundary context. A chunk
    /// can exceed the budget only when a single whitespace-free token run is
    /// itself larger than the budget; content preservation wins over the
    /// bound in that degenerate case.
    pub fn fit(&self, diff: &str) -> Vec<String> {
        if self.counter.count(diff) <= self.budget {
            return vec![diff.to_string()];
        }

        let sections = split_into_files(diff);
        let mut builder = ChunkBuilder::new(self.counter, self.budget);

        for section in &sections {
            let section_text = section_to_text(section);
            if self.counter.count(&section_text) <= self.budget {
                builder.push_block(&section_text);
            } else {
                self.fit_section(section, &mut builder);
            }
        }
        builder.finish()
    }

    /// A single file exceeds the budget: pack hunk groups under the repeated
    /// file header.
    fn fit_section(&self, section: &FileSection<'_>, builder: &mut ChunkBuilder) {
        let header_text = section.header.join("\n");
        builder.flush();

        for hunk in &section.hunks {
            let hunk_text = hunk.join("\n");
            let piece = format!("{header_text}\n{hunk_text}");
            if self.counter.count(&piece) <= self.budget {
                builder.push_block_with_context(&header_text, &hunk_text);
            } else {
                self.fit_hunk(&header_text, hunk, builder);
            }
        }
        builder.flush();
    }

    /// A single hunk exceeds the budget: pack line groups under the repeated
    /// file header and hunk header.
    fn fit_hunk(&self, header_text: &str, hunk: &[&str], builder: &mut ChunkBuilder) {
        let (hunk_header, body) = match hunk.split_first() {
            Some((first, rest)) if first.starts_with("@@") => (Some(*first), rest),
            _ => (None, hunk),
        };
        let context = match hunk_header {
            Some(h) => format!("{header_text}\n{h}"),
            None => header_text.to_string(),
        };
        let line_budget = self
            .budget
            .saturating_sub(self.counter.count(&context) + 1)
            .max(1);

        builder.flush();
        for line in body {
            if self.counter.count(line) <= line_budget {
                builder.push_block_with_context(&context, line);
            } else {
                for piece in split_long_line(line, line_budget, self.counter) {
                    builder.push_block_with_context(&context, &piece);
                }
            }
        }
        builder.flush();
    }
}

/// Split a unified diff into per-file sections. Any preamble before the
/// first `diff --git` line becomes a headerless section of its own.
fn split_into_files(diff: &str) -> Vec<FileSection<'_>> {
    let mut sections: Vec<Vec<&str>> = Vec::new();
    for line in diff.lines() {
        if line.starts_with("diff --git ") || sections.is_empty() {
            if line.starts_with("diff --git ") {
                sections.push(vec![line]);
                continue;
            }
            sections.push(Vec::new());
        }
        if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }

    sections
        .into_iter()
        .filter(|lines| !lines.is_empty())
        .map(|lines| {
            let hunk_start = lines
                .iter()
                .position(|l| l.starts_with("@@"))
                .unwrap_or(lines.len());
            let (header, body) = lines.split_at(hunk_start);
            let mut hunks: Vec<Vec<&str>> = Vec::new();
            for &line in body {
                if line.starts_with("@@") || hunks.is_empty() {
                    hunks.push(Vec::new());
                }
                if let Some(hunk) = hunks.last_mut() {
                    hunk.push(line);
                }
            }
            FileSection {
                header: header.to_vec(),
                hunks,
            }
        })
        .collect()
}

fn section_to_text(section: &FileSection<'_>) -> String {
    let mut lines: Vec<&str> = section.header.clone();
    for hunk in &section.hunks {
        lines.extend_from_slice(hunk);
    }
    lines.join("\n")
}

/// Break one oversized line at whitespace into budget-sized pieces, marking
/// every non-final piece with the continuation marker. A whitespace-free run
/// longer than the budget is emitted as a single piece.
fn split_long_line(line: &str, budget: usize, counter: TokenCounter) -> Vec<String> {
    let marker_cost = counter.count(CONTINUATION_MARKER);
    let piece_budget = budget.saturating_sub(marker_cost).max(1);

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in line.split_inclusive(char::is_whitespace) {
        if !current.is_empty() && counter.count(&current) + counter.count(word) > piece_budget {
            pieces.push(current);
            current = String::new();
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    let last = pieces.len().saturating_sub(1);
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            if i == last {
                piece.clone()
            } else {
                format!("{piece}{CONTINUATION_MARKER}")
            }
        })
        .collect()
}

/// Accumulates lines into chunks under a token budget, repeating a context
/// prefix when a chunk is opened mid-file.
struct ChunkBuilder {
    counter: TokenCounter,
    budget: usize,
    chunks: Vec<String>,
    current: String,
    current_tokens: usize,
    current_context: Option<String>,
}

impl ChunkBuilder {
    fn new(counter: TokenCounter, budget: usize) -> Self {
        Self {
            counter,
            budget,
            chunks: Vec::new(),
            current: String::new(),
            current_tokens: 0,
            current_context: None,
        }
    }

    /// Append a standalone block (a whole file section), flushing first if
    /// it does not fit.
    fn push_block(&mut self, block: &str) {
        let cost = self.counter.count(block) + 1;
        if self.current_tokens > 0 && self.current_tokens + cost > self.budget {
            self.flush();
        }
        self.append(block, cost);
        self.current_context = None;
    }

    /// Append a block that needs `context` repeated at the top of any chunk
    /// it opens.
    fn push_block_with_context(&mut self, context: &str, block: &str) {
        let cost = self.counter.count(block) + 1;
        if self.current_tokens > 0 && self.current_tokens + cost > self.budget {
            self.flush();
        }
        if self.current.is_empty() && self.current_context.as_deref() != Some(context) {
            let context_cost = self.counter.count(context) + 1;
            self.append(&context.to_string(), context_cost);
        }
        self.current_context = Some(context.to_string());
        self.append(block, cost);
    }

    fn append(&mut self, text: &str, cost: usize) {
        if !self.current.is_empty() {
            self.current.push('\n');
        }
        self.current.push_str(text);
        self.current_tokens += cost;
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
            self.current_tokens = 0;
        }
        // A fresh chunk always repeats its context, even an unchanged one
        self.current_context = None;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_diff(files: usize, lines_per_hunk: usize) -> String {
        let mut out = String::new();
        for f in 0..files {
            out.push_str(&format!("diff --git a/file{f}.rs b/file{f}.rs\n"));
            out.push_str(&format!("--- a/file{f}.rs\n+++ b/file{f}.rs\n"));
            out.push_str("@@ -1,4 +1,4 @@\n");
            for l in 0..lines_per_hunk {
                out.push_str(&format!("+let value_{f}_{l} = compute({l});\n"));
            }
        }
        out
    }

    #[test]
    fn test_small_diff_is_one_chunk() {
        let diff = sample_diff(1, 3);
        let fitter = DiffFitter::new(10_000);
        let chunks = fitter.fit(&diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], diff);
    }

    #[test]
    fn test_splits_on_file_boundaries() {
        let diff = sample_diff(6, 10);
        let per_file = TokenCounter::new().count(&sample_diff(1, 10));
        // Budget fits two files per chunk
        let fitter = DiffFitter::new(per_file * 2 + per_file / 2);
        let chunks = fitter.fit(&diff);
        assert!(chunks.len() >= 3, "got {} chunks", chunks.len());
        for chunk in &chunks {
            assert!(chunk.starts_with("diff --git"));
        }
    }

    #[test]
    fn test_all_content_lines_preserved() {
        let diff = sample_diff(5, 20);
        let fitter = DiffFitter::new(120);
        let chunks = fitter.fit(&diff);
        let merged = chunks.join("\n");
        for line in diff.lines().filter(|l| !l.trim().is_empty()) {
            assert!(merged.contains(line), "lost line: {line}");
        }
    }

    #[test]
    fn test_file_header_repeated_across_chunks() {
        // One file far larger than the budget
        let diff = sample_diff(1, 200);
        let fitter = DiffFitter::new(150);
        let chunks = fitter.fit(&diff);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.starts_with("diff --git a/file0.rs"),
                "chunk missing file context: {}",
                &chunk[..chunk.len().min(60)]
            );
        }
    }

    #[test]
    fn test_chunks_respect_budget() {
        let diff = sample_diff(4, 50);
        let budget = 200;
        let fitter = DiffFitter::new(budget);
        let counter = TokenCounter::new();
        for chunk in fitter.fit(&diff) {
            assert!(
                counter.count(&chunk) <= budget,
                "chunk of {} tokens exceeds budget {budget}",
                counter.count(&chunk)
            );
        }
    }

    #[test]
    fn test_oversized_line_split_at_whitespace() {
        let long_line: String = std::iter::repeat("word")
            .take(200)
            .collect::<Vec<_>>()
            .join(" ");
        let diff = format!(
            "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -0,0 +1 @@\n+{long_line}\n"
        );
        let fitter = DiffFitter::new(60);
        let chunks = fitter.fit(&diff);
        assert!(chunks.len() > 1);
        let merged = chunks.join("\n");
        // Every word survives, continuation markers join the pieces
        assert!(merged.contains(CONTINUATION_MARKER.trim_start()));
        assert_eq!(merged.matches("word").count(), 200);
    }

    #[test]
    fn test_empty_diff() {
        let fitter = DiffFitter::new(100);
        assert_eq!(fitter.fit(""), vec![String::new()]);
    }
}
