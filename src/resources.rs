//! Bundled test framework files.
//!
//! The harness stages two files into a project's `tests/` directory: the
//! single-header framework and the runner entry point that defines `main`.

use std::borrow::Cow;

pub const CATCH_HEADER: &str = "catch.hpp";
pub const TEST_MAIN: &str = "test_main.cpp";

/// Names of every framework file the harness stages, in staging order.
pub const FRAMEWORK_FILES: [&str; 2] = [CATCH_HEADER, TEST_MAIN];

pub trait ResourceProvider {
    /// Contents of the named resource, or `None` if it is not bundled.
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>>;
}

/// Resources compiled into the `cm` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedResources;

const CATCH_HEADER_BYTES: &[u8] = include_bytes!("../resources/catch.hpp");
const TEST_MAIN_BYTES: &[u8] = include_bytes!("../resources/test_main.cpp");

impl ResourceProvider for EmbeddedResources {
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        match name {
            CATCH_HEADER => Some(Cow::Borrowed(CATCH_HEADER_BYTES)),
            TEST_MAIN => Some(Cow::Borrowed(TEST_MAIN_BYTES)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_resources_are_present() {
        let res = EmbeddedResources;
        for name in FRAMEWORK_FILES {
            let bytes = res.load(name).unwrap();
            assert!(!bytes.is_empty(), "{} is empty", name);
        }
        assert!(res.load("missing.hpp").is_none());
    }

    #[test]
    fn test_runner_includes_header() {
        let main = EmbeddedResources.load(TEST_MAIN).unwrap();
        let text = String::from_utf8_lossy(&main);
        assert!(text.contains("CATCH_CONFIG_MAIN"));
        assert!(text.contains(CATCH_HEADER));
    }
}
