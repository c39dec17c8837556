//! Command-line inputs resolved lazily into archive elements.
//!
//! Paths are stat'ed and directories listed only when the archive asks for
//! the next element, so a large tree starts streaming immediately.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use time::OffsetDateTime;

use crate::cli::Cli;
use crate::io::{FileSource, HttpSource};
use crate::zip::{ArchiveElement, ElementSource};

enum Input {
    Path { path: PathBuf, name: String },
    Url(String),
}

/// Queue of inputs expanded on demand
pub struct InputQueue {
    pending: VecDeque<Input>,
    exclude: Vec<String>,
    junk_paths: bool,
    chunk_size: usize,
    modified: Option<OffsetDateTime>,
    quiet: bool,
    /// Canonical paths of directories already expanded
    visited: HashSet<PathBuf>,
}

impl InputQueue {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pending = inputs
            .into_iter()
            .map(|input| {
                let input = input.as_ref();
                if Cli::is_http_url(input) {
                    Input::Url(input.to_string())
                } else {
                    Input::Path {
                        path: PathBuf::from(input),
                        name: archive_name(Path::new(input)),
                    }
                }
            })
            .collect();

        Self {
            pending,
            exclude: Vec::new(),
            junk_paths: false,
            chunk_size: crate::io::DEFAULT_CHUNK_SIZE,
            modified: None,
            quiet: true,
            visited: HashSet::new(),
        }
    }

    /// Queue configured from parsed command-line arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let modified = cli
            .mtime
            .map(OffsetDateTime::from_unix_timestamp)
            .transpose()
            .context("Invalid --mtime")?;

        let mut queue = Self::new(&cli.inputs);
        queue.exclude = cli.exclude.clone();
        queue.junk_paths = cli.junk_paths;
        queue.chunk_size = cli.chunk_size;
        queue.modified = modified;
        queue.quiet = cli.is_quiet();
        Ok(queue)
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn with_junk_paths(mut self, junk_paths: bool) -> Self {
        self.junk_paths = junk_paths;
        self
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude
            .iter()
            .any(|x| name.contains(x.as_str()) || glob_match(x, name))
    }

    fn element(&self, name: String, source: impl crate::io::ChunkSource + 'static) -> ArchiveElement {
        let name = if self.junk_paths {
            name.rsplit('/').next().unwrap_or(&name).to_string()
        } else {
            name
        };

        if !self.quiet {
            eprintln!("  adding: {}", name);
        }

        let element = ArchiveElement::new(name, source);
        match self.modified {
            Some(modified) => element.with_modified(modified),
            None => element,
        }
    }

    /// Queue the children of `dir`, sorted, ahead of the remaining inputs.
    ///
    /// Directories reached twice, through symlinks, are expanded only once.
    async fn expand_dir(&mut self, dir: &Path, name: &str) -> Result<()> {
        let canonical = tokio::fs::canonicalize(dir)
            .await
            .with_context(|| format!("Failed to resolve {}", dir.display()))?;
        if !self.visited.insert(canonical) {
            tracing::warn!(dir = %dir.display(), "Directory already archived, skipping");
            return Ok(());
        }

        let mut children = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let child_name = if name.is_empty() {
                file_name.clone()
            } else {
                format!("{}/{}", name, file_name)
            };
            children.push((file_name, entry.path(), child_name));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, path, name) in children.into_iter().rev() {
            self.pending.push_front(Input::Path { path, name });
        }
        Ok(())
    }
}

#[async_trait]
impl ElementSource for InputQueue {
    async fn next_element(&mut self) -> Result<Option<ArchiveElement>> {
        while let Some(input) = self.pending.pop_front() {
            match input {
                Input::Url(url) => {
                    let source = HttpSource::new(url.clone())?;
                    let name = source.file_name().unwrap_or("download").to_string();
                    if self.is_excluded(&name) {
                        continue;
                    }
                    return Ok(Some(self.element(name, source)));
                }
                Input::Path { path, name } => {
                    // unreadable metadata is reported by the file source itself
                    let is_dir = tokio::fs::metadata(&path)
                        .await
                        .map(|m| m.is_dir())
                        .unwrap_or(false);
                    if is_dir {
                        self.expand_dir(&path, &name).await?;
                        continue;
                    }
                    if self.is_excluded(&name) {
                        continue;
                    }
                    let source = FileSource::new(path).with_chunk_size(self.chunk_size);
                    return Ok(Some(self.element(name, source)));
                }
            }
        }

        Ok(None)
    }
}

/// In-archive name for a local path: relative, `/` separated
pub fn archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if p == t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn names(queue: &mut InputQueue) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(element) = queue.next_element().await.unwrap() {
            names.push(element.file_name);
        }
        names
    }

    #[test]
    fn archive_names_are_relative() {
        assert_eq!(archive_name(Path::new("./logs/app.log")), "logs/app.log");
        assert_eq!(archive_name(Path::new("/var/tmp/x")), "var/tmp/x");
        assert_eq!(archive_name(Path::new("../up/file")), "up/file");
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(!glob_match("*.txt", "readme.md"));
    }

    #[tokio::test]
    async fn directories_expand_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b.txt"), b"b").unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();
        std::fs::write(root.join("sub/c.tmp"), b"c").unwrap();
        std::fs::write(root.join("sub/d.txt"), b"d").unwrap();

        let mut queue = InputQueue::new([root.to_str().unwrap()]);
        let prefix = archive_name(&root);
        assert_eq!(
            names(&mut queue).await,
            [
                format!("{prefix}/a.txt"),
                format!("{prefix}/b.txt"),
                format!("{prefix}/sub/c.tmp"),
                format!("{prefix}/sub/d.txt"),
            ]
        );

        let mut queue = InputQueue::new([root.to_str().unwrap()])
            .with_exclude(vec!["*.tmp".to_string()])
            .with_junk_paths(true);
        assert_eq!(names(&mut queue).await, ["a.txt", "b.txt", "d.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directories_are_expanded_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let mut queue = InputQueue::new([root.to_str().unwrap()]);
        assert_eq!(names(&mut queue).await, [format!("{}/a.txt", archive_name(&root))]);
    }

    #[tokio::test]
    async fn missing_paths_still_become_elements() {
        let mut queue = InputQueue::new(["does/not/exist.bin"]);
        let element = queue.next_element().await.unwrap().unwrap();
        assert_eq!(element.file_name, "does/not/exist.bin");
        assert!(queue.next_element().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn urls_are_named_after_last_segment() {
        let mut queue = InputQueue::new(["https://example.com/dist/data.csv"]);
        assert_eq!(names(&mut queue).await, ["data.csv"]);
    }
}
