//! Shared-library resolution for the project's `lib/` directory.
//!
//! Two hosts, two ways of making a binary find its libraries at runtime:
//! Linux embeds a search path anchored at the binary's own directory
//! (`$ORIGIN`) at link time, macOS needs the recorded install names rewritten
//! after the link with `install_name_tool`.

use crate::error::{CmError, Result};
use crate::process::Executor;
use colored::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const INSTALL_NAME_TOOL: &str = "install_name_tool";

/// Shared objects found in a library directory, sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryManifest {
    dir: PathBuf,
    libraries: Vec<String>,
}

impl LibraryManifest {
    /// Inspect `dir`. A missing or empty directory yields an empty manifest.
    pub fn scan(dir: &Path, strategy: LinkStrategy) -> Result<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    dir: dir.to_path_buf(),
                    libraries: Vec::new(),
                });
            }
            Err(e) => {
                return Err(CmError::Invocation(format!(
                    "could not read library directory {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut libraries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CmError::Invocation(format!("error reading {}: {}", dir.display(), e))
            })?;
            if entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if strategy.is_shared_object(&name) {
                libraries.push(name);
            }
        }
        libraries.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            libraries,
        })
    }

    pub fn from_names(dir: impl Into<PathBuf>, names: impl IntoIterator<Item = String>) -> Self {
        let mut libraries: Vec<String> = names.into_iter().collect();
        libraries.sort();
        Self {
            dir: dir.into(),
            libraries,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Final component of the library directory (`lib` under the standard layout).
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lib".to_string())
    }
}

/// How the host makes a linked binary find `lib/` at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// `-Wl,-rpath,<dir>` baked into the main link (ELF hosts).
    EmbeddedRpath,
    /// Link normally, then rewrite install names per library (Mach-O hosts).
    PostLinkFixup,
}

impl LinkStrategy {
    pub fn for_host() -> Self {
        if cfg!(target_os = "macos") {
            LinkStrategy::PostLinkFixup
        } else {
            LinkStrategy::EmbeddedRpath
        }
    }

    pub fn is_shared_object(&self, file_name: &str) -> bool {
        let versioned_so = file_name
            .split_once(".so.")
            .is_some_and(|(stem, version)| !stem.is_empty() && !version.is_empty());
        match self {
            LinkStrategy::EmbeddedRpath => file_name.ends_with(".so") || versioned_so,
            LinkStrategy::PostLinkFixup => {
                file_name.ends_with(".so") || file_name.ends_with(".dylib")
            }
        }
    }

    /// Split the manifest into extra link flags and the steps to run after linking.
    ///
    /// The ELF rpath is anchored at the binary's output directory via `$ORIGIN`
    /// and points at the sibling library directory from there.
    pub fn resolve(&self, manifest: &LibraryManifest, binary: &Path) -> LinkPlan {
        if manifest.is_empty() {
            return LinkPlan::default();
        }

        let mut flags = vec![format!("-L{}", manifest.dir().display())];
        flags.extend(manifest.libraries().iter().map(|lib| link_flag(lib)));

        let mut post_link = Vec::new();
        match self {
            LinkStrategy::EmbeddedRpath => {
                flags.push(format!("-Wl,-rpath,$ORIGIN/../{}", manifest.dir_name()));
            }
            LinkStrategy::PostLinkFixup => {
                post_link.extend(manifest.libraries().iter().map(|lib| PostLinkStep {
                    library: lib.clone(),
                    lib_dir_name: manifest.dir_name(),
                    binary: binary.to_path_buf(),
                }));
            }
        }

        LinkPlan { flags, post_link }
    }
}

/// `-l` flag for a library file name.
///
/// `libfoo.so` / `libfoo.dylib` link by bare name (`-lfoo`); versioned or
/// unconventionally named objects link by raw file name (`-l:libfoo.so.1`).
pub fn link_flag(file_name: &str) -> String {
    let bare = file_name.strip_prefix("lib").and_then(|rest| {
        rest.strip_suffix(".so")
            .or_else(|| rest.strip_suffix(".dylib"))
    });
    match bare {
        Some(name) if !name.is_empty() => format!("-l{}", name),
        _ => format!("-l:{}", file_name),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    pub flags: Vec<String>,
    pub post_link: Vec<PostLinkStep>,
}

/// One install-name rewrite, pointing `binary` at `../lib/<library>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLinkStep {
    pub library: String,
    pub lib_dir_name: String,
    pub binary: PathBuf,
}

impl PostLinkStep {
    pub fn program(&self) -> &'static str {
        INSTALL_NAME_TOOL
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-change".to_string(),
            self.library.clone(),
            format!("@loader_path/../{}/{}", self.lib_dir_name, self.library),
            self.binary.to_string_lossy().into_owned(),
        ]
    }
}

/// Result of running every post-link step. Failures do not invalidate the binary.
#[derive(Debug, Default)]
pub struct FixupReport {
    pub applied: Vec<String>,
    pub failed: Vec<(String, CmError)>,
}

impl FixupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn run_post_link(steps: &[PostLinkStep], executor: &dyn Executor) -> FixupReport {
    let mut report = FixupReport::default();
    for step in steps {
        match executor.execute(step.program(), &step.args()) {
            Ok(_) => {
                println!(
                    "   {} dynamic linking fixed for {}",
                    "🔗".cyan(),
                    step.library
                );
                report.applied.push(step.library.clone());
            }
            Err(e) => {
                println!(
                    "{} {} failed for {}: {}",
                    "!".yellow(),
                    INSTALL_NAME_TOOL,
                    step.library,
                    e
                );
                if let Some(out) = e.output() {
                    println!("{}", String::from_utf8_lossy(out));
                }
                report.failed.push((step.library.clone(), e));
            }
        }
    }
    report
}
