use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::contract::DocumentSource;

/// A file path and its text. `content` is `None` when the file could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub content: Option<String>,
}

/// Reads documents relative to a repository checkout.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for FsDocumentSource {
    fn read_file(&self, path: &str) -> Option<String> {
        let full_path = self.root.join(path);
        match std::fs::read_to_string(&full_path) {
            Ok(text) => {
                debug!(path = %full_path.display(), bytes = text.len(), "Read document");
                Some(text)
            }
            Err(e) => {
                warn!(path = %full_path.display(), error = ?e, "Could not read document");
                None
            }
        }
    }
}

/// Picks the paths to process for this run.
///
/// Changed paths outside `docs_prefix` are ignored. When no changed path remains
/// (for example on a manual trigger) every known path is processed.
pub fn select_paths(changed: Option<&str>, all: &str, docs_prefix: &str) -> Vec<String> {
    let changed: Vec<String> = changed
        .unwrap_or_default()
        .split_whitespace()
        .filter(|path| path.starts_with(docs_prefix))
        .map(str::to_string)
        .collect();

    if !changed.is_empty() {
        info!(count = changed.len(), "[SYNC] Processing changed documentation paths");
        return changed;
    }

    let all: Vec<String> = all.split_whitespace().map(str::to_string).collect();
    info!(count = all.len(), "[SYNC] No changed documentation paths, processing all known paths");
    all
}

/// Reads every path through the source. Unreadable files are kept with `content: None`.
pub fn read_documents<S>(source: &S, paths: &[String]) -> Vec<Document>
where
    S: DocumentSource + ?Sized,
{
    paths
        .iter()
        .map(|path| Document {
            path: path.clone(),
            content: source.read_file(path),
        })
        .collect()
}
