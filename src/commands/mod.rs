//! CLI Command handlers
//!
//! Handlers for the flags that are not part of the build engine itself.

pub mod init;
