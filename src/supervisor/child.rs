//! Child dev server launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};

use super::port::strip_port_args;
use crate::cli::InnerKind;
use crate::config::DEV_REVISION_KEY;
use crate::logger::is_verbose;

/// How to start the child dev server.
#[derive(Debug, Clone)]
pub enum Launch {
    /// This binary's built-in `serve` subcommand.
    Stub { exe: PathBuf, root: PathBuf },
    /// `npx next dev <args> --port <port>` in the working tree.
    Next {
        npx: PathBuf,
        root: PathBuf,
        args: Vec<String>,
    },
}

impl Launch {
    /// Resolve the executable for `kind`. Port flags in `forwarded` are
    /// replaced by the port chosen at start time.
    pub fn resolve(kind: InnerKind, root: &Path, forwarded: &[String]) -> Result<Self> {
        let root = root.to_path_buf();
        match kind {
            InnerKind::Stub => Ok(Self::Stub {
                exe: std::env::current_exe().context("failed to locate current executable")?,
                root,
            }),
            InnerKind::Next => Ok(Self::Next {
                npx: which::which("npx").context("`npx` not found in PATH")?,
                root,
                args: strip_port_args(forwarded),
            }),
        }
    }

    fn command(&self, port: u16) -> Command {
        let port = port.to_string();
        match self {
            Self::Stub { exe, root } => {
                let mut cmd = Command::new(exe);
                cmd.arg("--root").arg(root);
                if is_verbose() {
                    cmd.arg("--verbose");
                }
                cmd.args(["serve", "--port", port.as_str()]).current_dir(root);
                cmd
            }
            Self::Next { npx, root, args } => {
                let mut cmd = Command::new(npx);
                cmd.args(["next", "dev"])
                    .args(args)
                    .args(["--port", port.as_str()])
                    .current_dir(root);
                cmd
            }
        }
    }

    /// Spawn the child in its own process group with `revision` injected.
    pub fn spawn(&self, port: u16, revision: &str) -> std::io::Result<Child> {
        let mut cmd = self.command(port);
        cmd.env(DEV_REVISION_KEY, revision)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        cmd.spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_stub_command_line() {
        let launch = Launch::Stub {
            exe: PathBuf::from("/bin/course-docs-dev"),
            root: PathBuf::from("/site"),
        };
        let args = program_args(&launch.command(4123));
        assert_eq!(args.first().map(String::as_str), Some("--root"));
        assert!(args.ends_with(&["serve".into(), "--port".into(), "4123".into()]));
    }

    #[test]
    fn test_next_command_replaces_port() {
        let forwarded: Vec<String> = ["--turbo", "-p", "3005"].iter().map(|s| s.to_string()).collect();
        let launch = Launch::Next {
            npx: PathBuf::from("/usr/bin/npx"),
            root: PathBuf::from("/site"),
            args: strip_port_args(&forwarded),
        };
        let args = program_args(&launch.command(3007));
        assert_eq!(args, ["next", "dev", "--turbo", "--port", "3007"]);
    }
}
