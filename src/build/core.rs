use super::discover::{find_sources, patterns};
use super::invocation::CompilerInvocation;
use super::link::{FixupReport, LibraryManifest, LinkStrategy, run_post_link};
use super::test::{TestHarness, TestReport};
use crate::config::{BuildTarget, Mode, RunMode, SOURCE_PATTERNS};
use crate::error::{CmError, Result};
use crate::process::{Executor, executable_path};
use crate::resources::ResourceProvider;
use crate::ui;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Everything a build needs besides the target itself.
pub struct BuildContext<'a> {
    pub executor: &'a dyn Executor,
    pub strategy: LinkStrategy,
    /// Print the wrapped compiler call even when it succeeds.
    pub verbose: bool,
}

impl<'a> BuildContext<'a> {
    pub fn new(executor: &'a dyn Executor, strategy: LinkStrategy) -> Self {
        Self {
            executor,
            strategy,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// A binary produced by one compiler run.
#[derive(Debug)]
pub struct CompileOutput {
    pub binary: PathBuf,
    pub invocation: CompilerInvocation,
    pub fixups: FixupReport,
}

// --- Helper: Compile sources into the target's output binary ---
pub fn compile(
    target: &BuildTarget,
    sources: &[PathBuf],
    ctx: &BuildContext<'_>,
) -> Result<CompileOutput> {
    // 1. Libraries
    let lib_dir = target.lib_dir();
    let manifest = LibraryManifest::scan(&lib_dir, ctx.strategy)?;
    if manifest.is_empty() {
        if ctx.verbose {
            println!("   {} no shared objects in {}", "·".dimmed(), lib_dir.display());
        }
    } else {
        for lib in manifest.libraries() {
            println!("   {} linking shared object: {}", "🔗".cyan(), lib);
        }
        if ctx.strategy == LinkStrategy::PostLinkFixup {
            println!(
                "   {} install names will be rewritten after compilation",
                "!".yellow()
            );
        }
    }

    // 2. Invocation
    let plan = ctx.strategy.resolve(&manifest, &target.output_path());
    let invocation = CompilerInvocation::new(target, sources, &plan);

    let out_dir = target.output_dir();
    fs::create_dir_all(&out_dir).map_err(|e| {
        CmError::Invocation(format!("could not create {}: {}", out_dir.display(), e))
    })?;

    // 3. Run the compiler
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("Compiling {} source file(s)...", sources.len()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = ctx
        .executor
        .execute(invocation.executable(), invocation.args());
    pb.finish_and_clear();

    if result.is_err() || ctx.verbose {
        ui::print_wrapped_call(&invocation.display());
    }
    let output = result?;

    if output.output.is_empty() {
        println!("{} compilation succeeded with no errors", "🎉".green());
    } else {
        println!("{}", output.text());
    }

    // 4. Post-link fixups (never fatal)
    let fixups = run_post_link(&plan.post_link, ctx.executor);

    Ok(CompileOutput {
        binary: invocation.output().clone(),
        invocation,
        fixups,
    })
}

// --- CORE: Build Project ---
pub fn build_project(target: &BuildTarget, ctx: &BuildContext<'_>) -> Result<CompileOutput> {
    let target = target.with_mode(Mode::Build);
    let start_time = Instant::now();

    println!("   binary name: \"{}\"", target.output_name().bold());
    println!(
        "   binary output path: \"{}\"",
        target.output_path().display()
    );
    println!("   maximum optimization? {}", target.optimize());

    let sources = find_sources(&target.source_dir(), &patterns(&SOURCE_PATTERNS)?)?;
    if sources.is_empty() {
        println!(
            "{} No source files found in {}.",
            "!".yellow(),
            target.source_dir().display()
        );
    }

    println!("{} compiling project...", "🔨".cyan());
    let output = compile(&target, &sources, ctx)?;

    println!(
        "{} Build finished in {:.2?}",
        "✓".green(),
        start_time.elapsed()
    );
    Ok(output)
}

// --- COMMAND: Build & Run ---
pub fn build_and_run(target: &BuildTarget, ctx: &BuildContext<'_>, run: RunMode) -> Result<()> {
    let output = build_project(target, ctx)?;
    run_binary(&output.binary, target.output_name(), ctx.executor, run)
}

/// Run a freshly built binary. Failures are `CmError::RunFailed`, distinct
/// from a compile failure.
pub fn run_binary(binary: &Path, name: &str, executor: &dyn Executor, run: RunMode) -> Result<()> {
    let program = executable_path(binary);
    match run {
        RunMode::None => Ok(()),
        RunMode::Interactive => {
            println!("{} running {} in interactive mode...\n", "▶".green(), name);
            executor
                .execute_interactive(&program, &[])
                .map_err(|e| CmError::RunFailed(Box::new(e)))
        }
        RunMode::Captured => {
            println!("{} running {}...\n", "▶".green(), name);
            let out = executor
                .execute(&program, &[])
                .map_err(|e| CmError::RunFailed(Box::new(e)))?;
            println!("{}", out.text());
            Ok(())
        }
    }
}

// --- COMMAND: Test ---
pub fn run_tests(
    target: &BuildTarget,
    ctx: &BuildContext<'_>,
    resources: &dyn ResourceProvider,
) -> TestReport {
    let mut harness = TestHarness::new(target, ctx, resources);
    let report = harness.run();

    if let Ok(outcome) = &report.run {
        println!("{}", outcome.text());
        if outcome.passed() {
            println!("{}", "ALL TESTS PASSED ✨".green().bold());
        } else {
            println!("{}", "SOME TESTS FAILED 💀".red().bold());
        }
    }

    for (path, e) in &report.cleanup.failed {
        println!(
            "{} could not remove {}: {}",
            "x".red(),
            path.display(),
            e
        );
    }
    if report.cleanup.is_clean() {
        println!("{} exited test mode", "✓".green());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessResult, TestRunOutcome};
    use std::cell::RefCell;

    struct Scripted {
        calls: RefCell<Vec<(String, Vec<String>)>>,
        fail_program: Option<&'static str>,
    }

    impl Scripted {
        fn new(fail_program: Option<&'static str>) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_program,
            }
        }

        fn programs(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    impl Executor for Scripted {
        fn execute(&self, program: &str, args: &[String]) -> Result<ProcessResult> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));
            if self.fail_program.is_some_and(|f| program.ends_with(f)) {
                return Err(CmError::Execution {
                    command: program.to_string(),
                    status: None,
                    output: b"boom".to_vec(),
                });
            }
            Ok(ProcessResult { output: Vec::new() })
        }

        fn execute_interactive(&self, program: &str, _: &[String]) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((format!("interactive:{}", program), Vec::new()));
            Ok(())
        }

        fn execute_tests(&self, _: &str, _: &[String]) -> Result<TestRunOutcome> {
            unreachable!()
        }
    }

    fn project(libs: &[&str]) -> (tempfile::TempDir, BuildTarget) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.cpp"), "").unwrap();
        fs::write(dir.path().join("src/b.cpp"), "").unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        for lib in libs {
            fs::write(dir.path().join("lib").join(lib), "").unwrap();
        }
        let target = BuildTarget::builder(dir.path())
            .output_name("p")
            .build()
            .unwrap();
        (dir, target)
    }

    #[test]
    fn test_build_with_empty_lib_dir() {
        let (dir, target) = project(&[]);
        let exec = Scripted::new(None);
        let ctx = BuildContext::new(&exec, LinkStrategy::EmbeddedRpath);
        let out = build_project(&target, &ctx).unwrap();

        assert_eq!(out.binary, dir.path().join("bin/p"));
        assert!(dir.path().join("bin").is_dir());
        let calls = exec.calls.borrow();
        assert_eq!(calls.len(), 1);
        let args = &calls[0].1;
        assert_eq!(args[4], dir.path().join("src/a.cpp").to_string_lossy());
        assert_eq!(args[5], dir.path().join("src/b.cpp").to_string_lossy());
        assert!(!args.iter().any(|a| a.starts_with("-l") || a.starts_with("-L")));
    }

    #[test]
    fn test_missing_src_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = BuildTarget::builder(dir.path()).build().unwrap();
        let exec = Scripted::new(None);
        let ctx = BuildContext::new(&exec, LinkStrategy::EmbeddedRpath);
        let err = build_project(&target, &ctx).unwrap_err();
        assert!(matches!(err, CmError::Discovery { .. }));
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn test_linux_links_by_name_without_fixups() {
        let (_dir, target) = project(&["libfoo.so"]);
        let exec = Scripted::new(None);
        let ctx = BuildContext::new(&exec, LinkStrategy::EmbeddedRpath);
        let out = build_project(&target, &ctx).unwrap();

        assert!(out.invocation.args().contains(&"-lfoo".to_string()));
        assert!(out.invocation.args().iter().any(|a| a.starts_with("-Wl,-rpath,")));
        assert_eq!(exec.programs().len(), 1);
    }

    #[test]
    fn test_macos_runs_one_fixup_per_library() {
        let (_dir, target) = project(&["libfoo.so", "libbar.dylib"]);
        let exec = Scripted::new(None);
        let ctx = BuildContext::new(&exec, LinkStrategy::PostLinkFixup);
        let out = build_project(&target, &ctx).unwrap();

        assert!(!out.invocation.args().iter().any(|a| a.contains("rpath")));
        let programs = exec.programs();
        assert_eq!(programs.len(), 3);
        assert_eq!(
            programs
                .iter()
                .filter(|p| p.as_str() == "install_name_tool")
                .count(),
            2
        );
        assert_eq!(out.fixups.applied.len(), 2);
    }

    #[test]
    fn test_fixup_failure_keeps_binary() {
        let (_dir, target) = project(&["libfoo.so"]);
        let exec = Scripted::new(Some("install_name_tool"));
        let ctx = BuildContext::new(&exec, LinkStrategy::PostLinkFixup);
        let out = build_project(&target, &ctx).unwrap();
        assert_eq!(out.fixups.failed.len(), 1);
    }

    #[test]
    fn test_compile_failure_skips_fixups() {
        let (_dir, target) = project(&["libfoo.so"]);
        let exec = Scripted::new(Some("clang++"));
        let ctx = BuildContext::new(&exec, LinkStrategy::PostLinkFixup);
        let err = build_project(&target, &ctx).unwrap_err();
        assert!(matches!(err, CmError::Execution { .. }));
        assert_eq!(exec.programs(), vec!["clang++"]);
    }

    #[test]
    fn test_run_failure_is_distinct_from_compile_failure() {
        let (_dir, target) = project(&[]);
        let exec = Scripted::new(Some("/p"));
        let ctx = BuildContext::new(&exec, LinkStrategy::EmbeddedRpath);
        let err = build_and_run(&target, &ctx, RunMode::Captured).unwrap_err();
        assert!(matches!(err, CmError::RunFailed(_)));
        assert_eq!(err.classification(), "compiled but crashed");
    }

    #[test]
    fn test_interactive_and_captured_are_exclusive() {
        let (_dir, target) = project(&[]);
        let exec = Scripted::new(None);
        let ctx = BuildContext::new(&exec, LinkStrategy::EmbeddedRpath);
        build_and_run(&target, &ctx, RunMode::Interactive).unwrap();

        let programs = exec.programs();
        assert_eq!(programs.len(), 2);
        assert!(programs[1].starts_with("interactive:"));
    }
}
