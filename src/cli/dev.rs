//! `dev` command: run the dev server under the supervisor.

use std::path::Path;

use anyhow::{Context, Result};

use super::{DevArgs, InnerKind};
use crate::config::{DEV_INNER_KEY, ENV_FILES, EnvLayers, EnvSnapshot, Workspace};
use crate::core::register_supervisor;
use crate::supervisor::{DevOptions, Supervisor};
use crate::{log, warn};

/// Run the supervisor until shutdown. Returns the daemon exit code.
pub fn run_dev(root: &Path, args: &DevArgs) -> Result<i32> {
    let process_env = EnvSnapshot::capture();
    let inner = resolve_inner(args.inner, root, &process_env);
    let options = DevOptions::new(
        Workspace::new(root),
        process_env,
        inner,
        args.forwarded.clone(),
    );

    let supervisor = Supervisor::new(options)?;
    register_supervisor(supervisor.sender());

    log!("dev"; "{} mode, watching {}", inner.as_str(), ENV_FILES.join(", "));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    runtime.block_on(supervisor.run())
}

/// `--inner` wins, then `COURSE_DOCS_SITE_DEV_INNER`, then `next`.
fn resolve_inner(flag: Option<InnerKind>, root: &Path, process_env: &EnvSnapshot) -> InnerKind {
    if let Some(kind) = flag {
        return kind;
    }

    let layers = EnvLayers::load(root, process_env);
    match layers.get(DEV_INNER_KEY) {
        Some(raw) => InnerKind::from_env_value(raw).unwrap_or_else(|| {
            warn!("dev"; "unknown {}={:?}, using next", DEV_INNER_KEY, raw);
            InnerKind::Next
        }),
        None => InnerKind::Next,
    }
}
