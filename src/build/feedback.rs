use colored::*;

/// Turns raw compiler output into a one-paragraph hint.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Nothing to compile
        if output.contains("no input files") {
            return Some(format!(
                "The compiler received no sources.\nPut {} files under {} (or {} in test mode).",
                "*.cpp/*.cxx/*.cc".bold().yellow(),
                "src/".bold().green(),
                "tests/".bold().green()
            ));
        }

        // 2. Main function missing (Specific Linker Error)
        if output.contains("undefined reference to `main'")
            || output.contains("entry point must be defined")
            || output.contains("\"_main\", referenced from")
        {
            return Some(format!(
                "Your project is missing a {} function.\nEnsure one of the files under {} defines an entry point.",
                "main()".bold().yellow(),
                "src/".bold().green()
            ));
        }

        // 3. Shared object not found at link time
        if output.contains("cannot find -l") || output.contains("library not found for -l") {
            return Some(format!(
                "A {} error: a shared object could not be found.\nCheck the file names in {} (expected {}).",
                "Linker".bold().red(),
                "lib/".bold().yellow(),
                "lib<name>.so".bold().green()
            ));
        }

        // 4. Generic unresolved symbol (Linker Error)
        if output.contains("undefined reference to") || output.contains("Undefined symbols") {
            return Some(format!(
                "It looks like a {} error.\nYou might be missing a shared object in {}.",
                "Linker".bold().red(),
                "lib/".bold().yellow()
            ));
        }

        // 5. Missing Header (Compiler Error)
        if output.contains("fatal error: ")
            && (output.contains("No such file or directory") || output.contains("file not found"))
        {
            return Some(format!(
                "It looks like a {} error.\nYou might be missing an include path.\nPass {} or set {} in cm.toml.",
                "Missing Header".bold().red(),
                "--include <path>".bold().yellow(),
                "include".bold().yellow()
            ));
        }

        // 6. Standard not understood
        if output.contains("invalid value") && output.contains("-std=") {
            return Some(format!(
                "The compiler rejected the language standard.\nTry {} or {}.",
                "--std c++17".bold().green(),
                "--std c++20".bold().green()
            ));
        }

        None
    }
}
