use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::foundation::error::{StageError, StageResult};

/// Fetches the encoded bytes behind a source URI.
///
/// Called from pool worker threads, once per source per pool session.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, uri: &str) -> StageResult<Vec<u8>>;
}

/// Resolves source URIs as relative paths under a root directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirSource {
    fn fetch(&self, uri: &str) -> StageResult<Vec<u8>> {
        let norm = normalize_rel_path(uri)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read asset bytes from '{}'", path.display()))
            .map_err(StageError::from)
    }
}

/// In-memory sources keyed by URI.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(uri.into(), bytes);
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, uri: &str) -> StageResult<Vec<u8>> {
        self.entries
            .get(uri)
            .cloned()
            .ok_or_else(|| StageError::asset(format!("no in-memory source for '{uri}'")))
    }
}

/// Normalize and validate root-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> StageResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(StageError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(StageError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(StageError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(StageError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
