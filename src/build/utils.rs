use crate::error::{CmError, Result};
use std::path::Path;

/// Output name used when none is configured: the project directory's name.
pub fn default_output_name(root: &Path) -> Result<String> {
    let absolute = std::path::absolute(root).map_err(|e| {
        CmError::Invocation(format!("could not resolve {}: {}", root.display(), e))
    })?;

    let name = match absolute.file_name() {
        Some(name) => Some(name.to_os_string()),
        // e.g. "/p/.." has no final component until resolved
        None => std::fs::canonicalize(&absolute)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_os_string())),
    };

    name.map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            CmError::Invocation(format!(
                "cannot derive an output name from {}; pass -o <name>",
                root.display()
            ))
        })
}

/// Get the GCC/Clang-compatible standard flag for a configured standard.
/// The value is passed through as written; only a redundant `-std=` prefix is dropped.
pub fn std_flag(standard: &str) -> String {
    let trimmed = standard.trim();
    let clean = trimmed.strip_prefix("-std=").unwrap_or(trimmed);
    format!("-std={}", clean)
}

pub fn opt_flag(optimize: bool) -> &'static str {
    if optimize { "-O3" } else { "-O0" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_flag_passthrough() {
        assert_eq!(std_flag("c++2a"), "-std=c++2a");
        assert_eq!(std_flag("c++17"), "-std=c++17");
        assert_eq!(std_flag("gnu++20"), "-std=gnu++20");
    }

    #[test]
    fn test_std_flag_strip_prefix() {
        assert_eq!(std_flag("-std=c++20"), "-std=c++20");
        assert_eq!(std_flag("  c++14 "), "-std=c++14");
    }

    #[test]
    fn test_opt_flag() {
        assert_eq!(opt_flag(false), "-O0");
        assert_eq!(opt_flag(true), "-O3");
    }

    #[test]
    fn test_default_output_name_uses_last_component() {
        assert_eq!(default_output_name(Path::new("/p")).unwrap(), "p");
        assert_eq!(
            default_output_name(Path::new("/home/dev/greeter/")).unwrap(),
            "greeter"
        );
    }

    #[test]
    fn test_default_output_name_of_root_fails() {
        let err = default_output_name(Path::new("/")).unwrap_err();
        assert!(matches!(err, CmError::Invocation(_)));
    }
}
