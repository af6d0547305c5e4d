//! # cm CLI Entry Point
//!
//! Parses flags with clap, folds them over the optional `cm.toml` into one
//! immutable `BuildTarget`, and routes to build, test or init.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use cm::CmError;
use cm::build::{self, BuildContext, FeedbackAnalyzer, LinkStrategy, TestReport};
use cm::commands;
use cm::config::{self, BuildTarget, Mode, RunMode};
use cm::process::ProcessRunner;
use cm::resources::EmbeddedResources;
use cm::ui;

#[derive(Parser, Debug)]
#[command(name = "cm")]
#[command(about = "A tiny compiler manager for modern C++ projects", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Project directory (defaults to the current directory)
    dir: Option<PathBuf>,

    /// Name of the output binary (defaults to the project directory name)
    #[arg(short = 'o', long = "output")]
    name: Option<String>,

    /// Path to header files
    #[arg(long)]
    include: Option<String>,

    /// Maximum optimization (-O3)
    #[arg(long)]
    max: bool,

    /// C++ standard to compile against [default: c++2a]
    #[arg(long)]
    std: Option<String>,

    /// C++ compiler to use [default: clang++]
    #[arg(long)]
    compiler: Option<String>,

    /// Print the wrapped compiler call for inspection
    #[arg(long)]
    debug: bool,

    /// Build and run the tests in tests/ using the bundled Catch header
    #[arg(long, conflicts_with_all = ["init", "run"])]
    test: bool,

    /// Scaffold src/, tests/, lib/ and bin/
    #[arg(long)]
    init: bool,

    /// Execute the successfully compiled binary
    #[arg(long)]
    run: bool,

    /// Attach the binary to this terminal's stdin/stdout/stderr
    #[arg(short = 'i', long, requires = "run")]
    interactive: bool,

    /// Deadline in seconds for every external command [default: 600]
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra arguments appended to the compiler call
    #[arg(last = true, allow_hyphen_values = true)]
    extra: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<CmError>() {
                Some(cm_err) => report(cm_err),
                None => eprintln!("{} {:#}", "x".red(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let root = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .context("could not determine current directory (are you in a symlink?)")?,
    };

    ui::print_banner(env!("CARGO_PKG_VERSION"));

    if cli.init {
        commands::init::init_project(&root)?;
        return Ok(ExitCode::SUCCESS);
    }

    let project = config::load_project_config(&root)?;
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| project.timeout());
    let target = resolve_target(&cli, &root, &project)?;

    let runner = ProcessRunner::new(timeout);
    let ctx = BuildContext::new(&runner, LinkStrategy::for_host()).verbose(cli.debug);

    if target.mode() == Mode::Test {
        finish_test_run(build::run_tests(&target, &ctx, &EmbeddedResources))?;
        return Ok(ExitCode::SUCCESS);
    }

    let run_mode = match (cli.run, cli.interactive) {
        (true, true) => RunMode::Interactive,
        (true, false) => RunMode::Captured,
        _ => RunMode::None,
    };
    build::build_and_run(&target, &ctx, run_mode)?;
    Ok(ExitCode::SUCCESS)
}

/// CLI flags win over `cm.toml`, which wins over built-in defaults.
fn resolve_target(
    cli: &Cli,
    root: &std::path::Path,
    project: &config::ProjectConfig,
) -> Result<BuildTarget> {
    let file = &project.build;
    let mut builder = BuildTarget::builder(root)
        .mode(if cli.test { Mode::Test } else { Mode::Build })
        .optimize(cli.max || file.optimize.unwrap_or(false))
        .include_path(cli.include.clone().or_else(|| file.include.clone()))
        .extra_args(file.flags.clone().unwrap_or_default())
        .extra_args(cli.extra.clone());

    if let Some(name) = cli.name.clone().or_else(|| file.name.clone()) {
        builder = builder.output_name(name);
    }
    if let Some(std) = cli.std.clone().or_else(|| file.std.clone()) {
        builder = builder.standard(std);
    }
    if let Some(compiler) = cli.compiler.clone().or_else(|| file.compiler.clone()) {
        builder = builder.compiler(compiler);
    }

    Ok(builder.build()?)
}

/// Failing tests still exit zero; a run error or leftover artifacts do not.
fn finish_test_run(report: TestReport) -> Result<()> {
    report.run?;
    report.cleanup.into_result()?;
    Ok(())
}

fn report(err: &CmError) {
    let hint = err
        .output()
        .and_then(|out| FeedbackAnalyzer::analyze(&String::from_utf8_lossy(out)));
    ui::print_failure(
        err.output(),
        err.classification(),
        &err.to_string(),
        hint.as_deref(),
    );
}
