use crate::error::{CmError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STD: &str = "c++2a";
pub const DEFAULT_COMPILER: &str = "clang++";
pub const CATCH_VERSION: &str = "v2.11.3";
pub const CONFIG_FILE: &str = "cm.toml";

/// Ceiling applied to every external process (compiler, test binary, fixups).
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub const SOURCE_PATTERNS: [&str; 3] = ["*.cpp", "*.cxx", "*.cc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Test,
}

impl Mode {
    /// Directory (relative to the project root) holding this mode's sources.
    pub fn source_dir_name(&self) -> &'static str {
        match self {
            Mode::Build => "src",
            Mode::Test => "tests",
        }
    }

    /// Directory (relative to the project root) receiving this mode's binary.
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Mode::Build => "bin",
            Mode::Test => "tests",
        }
    }
}

/// What to do with a freshly built binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    None,
    /// Run and print captured output.
    Captured,
    /// Run attached to the terminal.
    Interactive,
}

/// One build request. Built once at startup, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    root: PathBuf,
    mode: Mode,
    output_name: String,
    standard: String,
    compiler: String,
    optimize: bool,
    include_path: Option<String>,
    extra_args: Vec<String>,
}

impl BuildTarget {
    pub fn builder(root: impl Into<PathBuf>) -> BuildTargetBuilder {
        BuildTargetBuilder::new(root.into())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn standard(&self) -> &str {
        &self.standard
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn include_path(&self) -> Option<&str> {
        self.include_path.as_deref()
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// `<root>/src` or `<root>/tests`.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(self.mode.source_dir_name())
    }

    /// `<root>/lib`, sibling of the source directory.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(self.mode.output_dir_name())
    }

    /// `<root>/bin/<name>` or `<root>/tests/<name>`.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir().join(&self.output_name)
    }

    /// Same target, switched to the other mode.
    pub fn with_mode(&self, mode: Mode) -> BuildTarget {
        BuildTarget {
            mode,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildTargetBuilder {
    root: PathBuf,
    mode: Mode,
    output_name: Option<String>,
    standard: Option<String>,
    compiler: Option<String>,
    optimize: bool,
    include_path: Option<String>,
    extra_args: Vec<String>,
}

impl BuildTargetBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            mode: Mode::Build,
            output_name: None,
            standard: None,
            compiler: None,
            optimize: false,
            include_path: None,
            extra_args: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn standard(mut self, std: impl Into<String>) -> Self {
        self.standard = Some(std.into());
        self
    }

    pub fn compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// An empty string counts as "not configured".
    pub fn include_path(mut self, path: Option<String>) -> Self {
        self.include_path = path.filter(|p| !p.is_empty());
        self
    }

    pub fn extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    pub fn build(self) -> Result<BuildTarget> {
        let output_name = match self.output_name.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => crate::build::default_output_name(&self.root)?,
        };
        if output_name.contains('/') || output_name.contains('\\') {
            return Err(CmError::Invocation(format!(
                "output name '{}' must not contain path separators",
                output_name
            )));
        }

        let compiler = self.compiler.unwrap_or_else(|| DEFAULT_COMPILER.to_string());
        if compiler.trim().is_empty() {
            return Err(CmError::Invocation("compiler path is empty".into()));
        }

        Ok(BuildTarget {
            root: self.root,
            mode: self.mode,
            output_name,
            standard: self.standard.unwrap_or_else(|| DEFAULT_STD.to_string()),
            compiler,
            optimize: self.optimize,
            include_path: self.include_path,
            extra_args: self.extra_args,
        })
    }
}

/// Optional `cm.toml` at the project root. CLI flags override these values.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub name: Option<String>,
    pub std: Option<String>,
    pub compiler: Option<String>,
    pub include: Option<String>,
    pub optimize: Option<bool>,
    pub flags: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

impl ProjectConfig {
    pub fn timeout(&self) -> Duration {
        self.build
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(COMPILE_TIMEOUT)
    }
}

/// Load `<root>/cm.toml`; a missing file yields the defaults.
pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    let raw = fs::read_to_string(&path)
        .map_err(|e| CmError::Invocation(format!("could not read {}: {}", path.display(), e)))?;
    toml::from_str(&raw)
        .map_err(|e| CmError::Invocation(format!("could not parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths_follow_mode() {
        let target = BuildTarget::builder("/p").build().unwrap();
        assert_eq!(target.output_name(), "p");
        assert_eq!(target.output_path(), PathBuf::from("/p/bin/p"));
        assert_eq!(target.source_dir(), PathBuf::from("/p/src"));
        assert_eq!(target.lib_dir(), PathBuf::from("/p/lib"));

        let test = target.with_mode(Mode::Test);
        assert_eq!(test.output_path(), PathBuf::from("/p/tests/p"));
        assert_eq!(test.source_dir(), PathBuf::from("/p/tests"));
    }

    #[test]
    fn test_defaults() {
        let target = BuildTarget::builder("/p").build().unwrap();
        assert_eq!(target.standard(), DEFAULT_STD);
        assert_eq!(target.compiler(), DEFAULT_COMPILER);
        assert!(!target.optimize());
        assert_eq!(target.include_path(), None);
    }

    #[test]
    fn test_empty_include_is_unset() {
        let target = BuildTarget::builder("/p")
            .include_path(Some(String::new()))
            .build()
            .unwrap();
        assert_eq!(target.include_path(), None);
    }

    #[test]
    fn test_rejects_output_name_with_separator() {
        let err = BuildTarget::builder("/p")
            .output_name("a/b")
            .build()
            .unwrap_err();
        assert!(matches!(err, CmError::Invocation(_)));
    }

    #[test]
    fn test_parse_project_config() {
        let raw = r#"
[build]
name = "app"
std = "c++17"
optimize = true
flags = ["-pthread"]
timeout_secs = 30
"#;
        let config: ProjectConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.build.name.as_deref(), Some("app"));
        assert_eq!(config.build.flags, Some(vec!["-pthread".to_string()]));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_project_config(dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.timeout(), COMPILE_TIMEOUT);
    }

    #[test]
    fn test_unknown_key_is_invocation_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[build]\nbogus = 1\n").unwrap();
        let err = load_project_config(dir.path()).unwrap_err();
        assert!(matches!(err, CmError::Invocation(_)));
    }
}
