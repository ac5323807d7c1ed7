//! Environment Watcher
//!
//! Polls the working tree's dotenv files and asks the supervisor for a
//! restart when the effective content source changes.
//!
//! Architecture:
//! ```text
//! PollWatcher (250ms, content compare) → Debouncer (250ms) → EnvLayers reload
//!     → ContentSelection changed? → SupervisorMsg::Restart
//! ```
//!
//! Polling is used instead of native events: editors that save atomically
//! (write temp + rename) make native watchers lose the file on some
//! platforms.

mod debouncer;


pub use debouncer::{DEBOUNCE_MS, Debouncer};

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::{ContentSelection, ENV_FILES, EnvLayers, EnvSnapshot};
use crate::supervisor::SupervisorMsg;
use crate::{debug, log};

/// Interval between two polls of the env files.
pub const POLL_INTERVAL_MS: u64 = 250;

/// Timing knobs of the watcher.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            debounce: Duration::from_millis(DEBOUNCE_MS),
        }
    }
}

/// Running env watcher. `close` (or drop) stops polling and pending timers.
pub struct EnvWatcher {
    poller: Option<PollWatcher>,
    task: Option<JoinHandle<()>>,
}

impl EnvWatcher {
    /// Start watching `root`. Must be called inside a tokio runtime.
    ///
    /// `last` is the selection the current content was synced from; only a
    /// different selection triggers a restart. The files are checked once
    /// right after spawning as well.
    pub fn spawn(
        root: PathBuf,
        process: EnvSnapshot,
        last: ContentSelection,
        supervisor: UnboundedSender<SupervisorMsg>,
        options: WatchOptions,
    ) -> notify::Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

        let config = notify::Config::default()
            .with_poll_interval(options.poll_interval)
            .with_compare_contents(true);

        let mut poller = PollWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for path in event.paths.into_iter().filter(|p| is_env_file(p)) {
                        let _ = event_tx.send(path);
                    }
                }
                Err(e) => debug!("watch"; "poll error: {}", e),
            },
            config,
        )?;
        poller.watch(&root, RecursiveMode::NonRecursive)?;

        debug!("watch"; "polling {} in {}", ENV_FILES.join(", "), root.display());

        let task = tokio::spawn(debounce_loop(
            root,
            process,
            last,
            event_rx,
            supervisor,
            options.debounce,
        ));

        Ok(Self {
            poller: Some(poller),
            task: Some(task),
        })
    }

    /// Stop polling and cancel any pending debounce timer. Idempotent.
    pub fn close(&mut self) {
        if let Some(poller) = self.poller.take() {
            drop(poller);
            debug!("watch"; "closed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for EnvWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Collapse change bursts and compare the derived selection.
async fn debounce_loop(
    root: PathBuf,
    process: EnvSnapshot,
    mut last: ContentSelection,
    mut events: UnboundedReceiver<PathBuf>,
    supervisor: UnboundedSender<SupervisorMsg>,
    delay: Duration,
) {
    let mut debouncer = Debouncer::new(delay);
    // Edits made before the poller took its baseline produce no event.
    debouncer.touch();

    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(path) => {
                    debug!("watch"; "changed: {}", path.display());
                    debouncer.touch();
                }
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration()), if debouncer.is_armed() => {
                if !debouncer.take_if_ready() {
                    continue;
                }

                let selection = EnvLayers::load(&root, &process).content_selection();
                if selection == last {
                    debug!("watch"; "env changed, content source unchanged");
                    continue;
                }

                log!("watch"; "content source changed: {}", describe(&selection));
                last = selection;
                if supervisor.send(SupervisorMsg::Restart).is_err() {
                    break;
                }
            }
        }
    }
}

fn describe(selection: &ContentSelection) -> String {
    match selection.resolve() {
        Ok(source) => source.to_string(),
        Err(e) => e.to_string(),
    }
}

fn is_env_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| ENV_FILES.contains(&name))
}
