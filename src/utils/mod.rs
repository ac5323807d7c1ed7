//! Shared helpers: external commands, filesystem materialization, MIME types.

pub mod exec;
pub mod fs;
pub mod mime;
