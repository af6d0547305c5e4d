//! Compiler command-line synthesis.

use super::link::LinkPlan;
use super::utils::{opt_flag, std_flag};
use crate::config::BuildTarget;
use crate::process::display_command;
use std::path::PathBuf;

/// A fully decided compiler call. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    executable: String,
    args: Vec<String>,
    output: PathBuf,
}

impl CompilerInvocation {
    /// Argument order is fixed:
    /// standard, warnings, optimisation, output, sources (walk order),
    /// include path, link flags, caller extras.
    pub fn new(target: &BuildTarget, sources: &[PathBuf], link: &LinkPlan) -> Self {
        let output = target.output_path();

        let mut args = vec![
            std_flag(target.standard()),
            "-Wall".to_string(),
            opt_flag(target.optimize()).to_string(),
            format!("-o{}", output.display()),
        ];
        args.extend(sources.iter().map(|s| s.to_string_lossy().into_owned()));

        let include = match target.include_path() {
            Some(path) => path.to_string(),
            None => target.source_dir().to_string_lossy().into_owned(),
        };
        args.push(format!("-I{}", include));

        args.extend(link.flags.iter().cloned());
        args.extend(target.extra_args().iter().cloned());

        Self {
            executable: target.compiler().to_string(),
            args,
            output,
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Path of the binary this invocation produces.
    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    pub fn display(&self) -> String {
        display_command(&self.executable, &self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::link::{LibraryManifest, LinkStrategy};
    use crate::config::Mode;
    use std::path::Path;

    fn target() -> BuildTarget {
        BuildTarget::builder("/p").build().unwrap()
    }

    #[test]
    fn test_scenario_two_sources_no_libs() {
        let sources = vec![PathBuf::from("/p/src/a.cpp"), PathBuf::from("/p/src/b.cpp")];
        let inv = CompilerInvocation::new(&target(), &sources, &LinkPlan::default());
        assert_eq!(inv.executable(), "clang++");
        assert_eq!(
            inv.args(),
            &[
                "-std=c++2a",
                "-Wall",
                "-O0",
                "-o/p/bin/p",
                "/p/src/a.cpp",
                "/p/src/b.cpp",
                "-I/p/src",
            ]
        );
        assert!(!inv.args().iter().any(|a| a.starts_with("-l") || a.starts_with("-L")));
        assert_eq!(inv.output(), &PathBuf::from("/p/bin/p"));
    }

    #[test]
    fn test_release_only_changes_opt_level() {
        let sources = vec![PathBuf::from("/p/src/a.cpp")];
        let debug = CompilerInvocation::new(&target(), &sources, &LinkPlan::default());
        let release_target = BuildTarget::builder("/p").optimize(true).build().unwrap();
        let release = CompilerInvocation::new(&release_target, &sources, &LinkPlan::default());

        let diffs: Vec<_> = debug
            .args()
            .iter()
            .zip(release.args())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(diffs.len(), 1);
        assert_eq!(release.args()[2], "-O3");
    }

    #[test]
    fn test_test_mode_paths() {
        let t = BuildTarget::builder("/p")
            .mode(Mode::Test)
            .build()
            .unwrap();
        let inv = CompilerInvocation::new(&t, &[], &LinkPlan::default());
        assert_eq!(inv.args()[3], "-o/p/tests/p");
        assert!(inv.args().contains(&"-I/p/tests".to_string()));
    }

    #[test]
    fn test_configured_include_and_extras_come_last() {
        let t = BuildTarget::builder("/p")
            .include_path(Some("/p/include".into()))
            .extra_args(["-pthread".to_string()])
            .build()
            .unwrap();
        let manifest = LibraryManifest::from_names("/p/lib", ["libfoo.so".to_string()]);
        let plan = LinkStrategy::EmbeddedRpath.resolve(&manifest, &t.output_path());
        let inv = CompilerInvocation::new(&t, &[PathBuf::from("/p/src/a.cpp")], &plan);
        assert_eq!(
            &inv.args()[4..],
            &[
                "/p/src/a.cpp",
                "-I/p/include",
                "-L/p/lib",
                "-lfoo",
                "-Wl,-rpath,$ORIGIN/../lib",
                "-pthread",
            ]
        );
    }

    #[test]
    fn test_invocation_is_deterministic() {
        let sources = vec![PathBuf::from("/p/src/a.cpp"), PathBuf::from("/p/src/b.cpp")];
        let manifest = LibraryManifest::from_names("/p/lib", ["libfoo.so".to_string()]);
        let plan = LinkStrategy::EmbeddedRpath.resolve(&manifest, Path::new("/p/bin/p"));
        let a = CompilerInvocation::new(&target(), &sources, &plan);
        let b = CompilerInvocation::new(&target(), &sources, &plan);
        assert_eq!(a, b);
        assert_eq!(a.display(), b.display());
    }

    #[test]
    fn test_empty_sources_still_builds_invocation() {
        let inv = CompilerInvocation::new(&target(), &[], &LinkPlan::default());
        assert_eq!(inv.args().len(), 5);
    }
}
