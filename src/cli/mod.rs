//! Command-line interface module.

mod args;
pub mod dev;
pub mod sync;

pub use args::{Cli, Commands, DevArgs, InnerKind};
