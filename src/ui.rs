//! Terminal UI utilities.
//!
//! Box-drawn banner and the framed dump of a wrapped command, sized to the
//! terminal with `console`.

use colored::*;

const MAX_RULE: usize = 80;

fn rule_width() -> usize {
    let term = console::Term::stdout();
    let (_height, width) = term.size();
    (width as usize).clamp(20, MAX_RULE)
}

/// Version banner, e.g.
///
/// ```text
/// ╔═════════════════════════╗
/// ║ Compiler Manager v0.2.0 ║
/// ╚═════════════════════════╝
/// ```
pub fn banner(version: &str) -> String {
    let title = format!(" Compiler Manager v{} ", version);
    let width = console::measure_text_width(&title);
    format!(
        "╔{bar}╗\n║{title}║\n╚{bar}╝",
        bar = "═".repeat(width),
        title = title
    )
}

pub fn print_banner(version: &str) {
    println!("{}", banner(version).bold());
}

/// Frame a command line between two rules.
pub fn framed_call(command: &str, width: usize) -> String {
    let rule = "═".repeat(width);
    format!("{rule}\n\n{command}\n\n{rule}")
}

/// Print the full wrapped compiler call for inspection.
pub fn print_wrapped_call(command: &str) {
    println!("{}", "printing wrapped call for debugging:".dimmed());
    println!("{}", framed_call(command, rule_width()));
}

/// Print a failure: captured output, the one-line classification, then an optional hint.
pub fn print_failure(output: Option<&[u8]>, classification: &str, detail: &str, hint: Option<&str>) {
    if let Some(out) = output.filter(|o| !o.is_empty()) {
        eprintln!("{}", String::from_utf8_lossy(out).trim_end());
    }
    eprintln!("{} {}: {}", "x".red(), classification.bold(), detail);
    if let Some(hint) = hint {
        eprintln!("\n{} {}", "💡".yellow(), hint);
    }
}
