//! `cm --init`: scaffold the directory layout the build engine expects.

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

pub const SCAFFOLD_DIRS: [&str; 4] = ["src", "tests", "lib", "bin"];

/// Create `src/`, `tests/`, `lib/` and `bin/` under `root`, each with a
/// `.gitkeep`. Existing directories and files are left untouched.
pub fn init_project(root: &Path) -> Result<()> {
    for dir in SCAFFOLD_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let keep = path.join(".gitkeep");
        if !keep.exists() {
            fs::write(&keep, "").with_context(|| format!("Failed to write {}", keep.display()))?;
        }
        println!("   {} {}/", "+".green(), dir);
    }

    println!(
        "{} init completed successfully for {}",
        "✓".green(),
        root.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path()).unwrap();
        for d in SCAFFOLD_DIRS {
            assert!(dir.path().join(d).join(".gitkeep").exists());
        }
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.cpp"), "int main() {}").unwrap();
        init_project(dir.path()).unwrap();
        init_project(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("src/main.cpp")).unwrap(),
            "int main() {}"
        );
    }
}
