mod clean;
mod core;
mod discover;
mod feedback;
mod invocation;
mod link;
mod utils;

pub use clean::{CleanupReport, Removal, remove_all, remove_file};
pub use self::core::{
    BuildContext, CompileOutput, build_and_run, build_project, compile, run_binary, run_tests,
};
pub use discover::{FilePattern, find_sources, patterns};
pub use feedback::FeedbackAnalyzer;
pub use invocation::CompilerInvocation;
pub use link::{
    FixupReport, LibraryManifest, LinkPlan, LinkStrategy, PostLinkStep, link_flag, run_post_link,
};
pub use test::{HarnessState, StagedArtifacts, TestHarness, TestReport};
pub use utils::{default_output_name, opt_flag, std_flag};
