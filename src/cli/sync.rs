//! `sync` command: materialize the configured course content once.

use std::path::Path;

use anyhow::Result;

use crate::config::{EnvLayers, EnvSnapshot, Workspace};
use crate::sync::{SyncError, sync_content};
use crate::{debug, log};

/// Sync from the current env configuration. Returns the process exit code.
pub fn run_sync(root: &Path) -> Result<i32> {
    let selection = EnvLayers::load(root, &EnvSnapshot::capture()).content_selection();
    debug!("sync"; "selection {:?}", selection);

    let result = selection
        .resolve()
        .map_err(SyncError::from)
        .and_then(|source| sync_content(&Workspace::new(root), &source));

    match result {
        Ok(outcome) => {
            if outcome.switched {
                log!("sync"; "content source switched, build cache cleared");
            }
            Ok(0)
        }
        Err(e) => {
            log!("error"; "{}", e);
            Ok(e.exit_code())
        }
    }
}
