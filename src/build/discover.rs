//! Source discovery.
//!
//! Walks a directory tree once per pattern and collects regular files whose
//! base name matches. Patterns are shell-style (`*`, `?`), matched against the
//! file name only.

use crate::error::{CmError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A compiled filename glob such as `*.cpp`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    glob: String,
    regex: Regex,
}

impl FilePattern {
    pub fn new(glob: &str) -> Result<Self> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        for c in glob.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr)
            .map_err(|e| CmError::Invocation(format!("bad file pattern '{}': {}", glob, e)))?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

/// Compile every glob in `globs`.
pub fn patterns(globs: &[&str]) -> Result<Vec<FilePattern>> {
    globs.iter().map(|g| FilePattern::new(g)).collect()
}

/// All regular files under `root` matching any of `patterns`.
///
/// Results are grouped by pattern (pattern order), and within a pattern
/// follow the walk order. Entries are sorted by name during the walk so the
/// result is stable for a given filesystem state.
pub fn find_sources(root: &Path, patterns: &[FilePattern]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(CmError::Discovery {
            root: root.to_path_buf(),
            reason: "directory does not exist".into(),
        });
    }

    let mut found = Vec::new();
    for pattern in patterns {
        found.extend(find(root, pattern)?);
    }
    Ok(found)
}

fn find(root: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>> {
    let mut res = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CmError::Discovery {
            root: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        // follows a symlinked file to its target; directory links are not walked
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if pattern.matches(&name) {
            res.push(entry.into_path());
        }
    }
    Ok(res)
}
