use crate::Result;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `{index}` with an optional zero-padded width, e.g. `{index:03}`.
static INDEX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{index(?::([^}]*))?\}").unwrap());

/// Which of the allocator's independent counters a path draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Screenshot = 0,
    Frame = 1,
    Video = 2,
}

/// Produces collision-free file paths from filename templates.
///
/// Each [`PathKind`] owns a monotonically increasing counter, incremented
/// before every use and never reset, so concurrent capture loops can share
/// one allocator without handing out the same frame path twice.
pub struct PathAllocator {
    base_dir: PathBuf,
    counters: [AtomicUsize; 3],
}

impl PathAllocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            counters: [AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)],
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves `template` against the base directory, substituting the next
    /// counter value into the `{index}` placeholder.
    ///
    /// Templates without a placeholder always resolve to the same path
    /// (overwrite semantics). Templates with a placeholder resolve to the
    /// first path at or after the counter's current value that does not yet
    /// exist on disk. Unbounded: a directory pre-populated with an endless
    /// run of matching names would keep this searching.
    pub fn next_path(&self, template: &str, kind: PathKind) -> PathBuf {
        let counter = &self.counters[kind as usize];
        loop {
            let index = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let rendered = render_index(template, index);
            let path = self.base_dir.join(&rendered);
            if rendered == template || !path.exists() {
                return path;
            }
        }
    }
}

fn render_index(template: &str, index: usize) -> String {
    INDEX_PATTERN
        .replace_all(template, |caps: &Captures| match caps.get(1) {
            Some(spec) => render_spec(spec.as_str(), index),
            None => index.to_string(),
        })
        .into_owned()
}

fn render_spec(spec: &str, index: usize) -> String {
    if let Some(width) = spec.strip_prefix('0').and_then(|w| w.parse::<usize>().ok()) {
        format!("{index:0width$}")
    } else if let Ok(width) = spec.parse::<usize>() {
        format!("{index:width$}")
    } else {
        index.to_string()
    }
}

/// Creates the directory a path is about to be written into, if any.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
