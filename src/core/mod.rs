//! Core process state shared by the `dev` and `serve` commands.

mod state;

pub use state::{is_shutdown, register_server, register_supervisor, setup_shutdown_handler};
