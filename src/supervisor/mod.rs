//! Process Supervisor
//!
//! Owns the child dev server and runs every restart as one serialized cycle:
//!
//! ```text
//! Restart ─► Stopping ─► WaitingForPort ─► Syncing ─► Starting ─► Idle
//!                                              │
//!                                              └─ failure: daemon exits
//! ```
//!
//! A single coordinator task owns `SupervisorState`. The env watcher and the
//! signal handler talk to it through `SupervisorMsg`. Messages that arrive
//! while a cycle runs wait in the mailbox and are folded into the restart
//! `WorkSlot` once the cycle ends, so a burst costs at most one extra cycle.

mod child;
mod port;
mod state;
pub mod terminate;

pub use port::DEFAULT_PORT;

use child::Launch;
use port::{
    PORT_ATTEMPTS, PortWait, find_free_port, parse_port_arg, port_is_free, wait_for_release,
};
use state::{Phase, SupervisorState};

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::cli::InnerKind;
use crate::config::{ContentSelection, EnvLayers, EnvSnapshot, Workspace};
use crate::serve::revision::new_revision;
use crate::sync::{SyncError, SyncOutcome, sync_content};
use crate::utils::fs::remove_path;
use crate::watch::{EnvWatcher, WatchOptions};
use crate::{debug, log, warn};

/// Grace period between the stop request and the forced kill.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinator mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorMsg {
    /// Content selection changed: run a restart cycle.
    Restart,
    /// SIGINT / SIGTERM received.
    Shutdown,
}

/// Everything `dev` needs to run.
#[derive(Debug, Clone)]
pub struct DevOptions {
    pub workspace: Workspace,
    /// Process environment captured at startup; wins over env files.
    pub process_env: EnvSnapshot,
    pub inner: InnerKind,
    pub forwarded: Vec<String>,
    pub watch: WatchOptions,
    pub port_wait: PortWait,
    pub stop_timeout: Duration,
}

impl DevOptions {
    pub fn new(
        workspace: Workspace,
        process_env: EnvSnapshot,
        inner: InnerKind,
        forwarded: Vec<String>,
    ) -> Self {
        Self {
            workspace,
            process_env,
            inner,
            forwarded,
            watch: WatchOptions::default(),
            port_wait: PortWait::default(),
            stop_timeout: STOP_TIMEOUT,
        }
    }
}

pub struct Supervisor {
    options: DevOptions,
    launch: Launch,
    state: SupervisorState,
    tx: UnboundedSender<SupervisorMsg>,
    rx: UnboundedReceiver<SupervisorMsg>,
    watcher: Option<EnvWatcher>,
}

impl Supervisor {
    pub fn new(options: DevOptions) -> Result<Self> {
        let launch = Launch::resolve(options.inner, options.workspace.root(), &options.forwarded)?;
        let state = SupervisorState::new(parse_port_arg(&options.forwarded));
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            options,
            launch,
            state,
            tx,
            rx,
            watcher: None,
        })
    }

    /// Sender for requests from outside the coordinator.
    pub fn sender(&self) -> UnboundedSender<SupervisorMsg> {
        self.tx.clone()
    }

    /// Run until shutdown or a fatal error. Returns the daemon exit code.
    pub async fn run(mut self) -> Result<i32> {
        let selection = self.current_selection();
        let outcome = match self.sync(&selection).await {
            Ok(outcome) => outcome,
            Err(e) => return Ok(sync_failed(&e)),
        };

        let port = self.state.requested_port;
        self.state.active_port = find_free_port(port, PORT_ATTEMPTS)?;
        if self.state.active_port != port {
            warn!("dev"; "port {} in use, using {} instead", port, self.state.active_port);
        }
        self.start(outcome.switched)?;

        let watcher = EnvWatcher::spawn(
            self.options.workspace.root().to_path_buf(),
            self.options.process_env.clone(),
            selection,
            self.tx.clone(),
            self.options.watch,
        );
        match watcher {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => {
                self.stop_child().await;
                return Err(e).context("failed to watch env files");
            }
        }

        let code = self.event_loop().await;
        self.shutdown().await;
        code
    }

    async fn event_loop(&mut self) -> Result<i32> {
        loop {
            let msg = tokio::select! {
                msg = self.rx.recv() => msg.unwrap_or(SupervisorMsg::Shutdown),
                status = wait_child(&mut self.state.child) => {
                    self.state.child = None;
                    let code = exit_code(status);
                    log!("dev"; "dev server exited unexpectedly (code {})", code);
                    return Ok(code);
                }
            };

            match msg {
                SupervisorMsg::Shutdown => {
                    log!("dev"; "shutting down...");
                    return Ok(0);
                }
                SupervisorMsg::Restart => {
                    if let Some(code) = self.restart().await? {
                        return Ok(code);
                    }
                }
            }
        }
    }

    /// Run restart cycles until no request is queued.
    ///
    /// Returns an exit code when the daemon must stop.
    async fn restart(&mut self) -> Result<Option<i32>> {
        if !self.state.restart.request() {
            return Ok(None);
        }

        loop {
            let exit = self.cycle().await?;
            self.drain_mailbox();

            if exit.is_some() || self.state.shutting_down {
                self.state.restart.reset();
                return Ok(exit.or(Some(0)));
            }
            if !self.state.restart.finish() {
                return Ok(None);
            }
            debug!("dev"; "running queued restart");
        }
    }

    async fn cycle(&mut self) -> Result<Option<i32>> {
        log!("dev"; "content source changed, restarting dev server");

        self.enter(Phase::Stopping);
        self.stop_child().await;

        self.enter(Phase::WaitingForPort);
        self.state.active_port = self.reclaim_port().await?;

        self.enter(Phase::Syncing);
        let selection = self.current_selection();
        let outcome = match self.sync(&selection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.enter(Phase::Idle);
                return Ok(Some(sync_failed(&e)));
            }
        };

        self.enter(Phase::Starting);
        self.start(outcome.switched)?;

        self.enter(Phase::Idle);
        Ok(None)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("dev"; "{:?} -> {:?}", self.state.phase, phase);
        self.state.phase = phase;
    }

    /// Fold messages queued during a cycle into the state.
    fn drain_mailbox(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                SupervisorMsg::Restart => {
                    self.state.restart.request();
                }
                SupervisorMsg::Shutdown => self.state.shutting_down = true,
            }
        }
    }

    fn current_selection(&self) -> ContentSelection {
        EnvLayers::load(self.options.workspace.root(), &self.options.process_env)
            .content_selection()
    }

    async fn sync(&mut self, selection: &ContentSelection) -> Result<SyncOutcome, SyncError> {
        let source = selection.resolve()?;
        let workspace = self.options.workspace.clone();

        if !self.state.sync.request() {
            return Err(SyncError::InProgress);
        }

        let result = tokio::task::spawn_blocking(move || sync_content(&workspace, &source))
            .await
            .unwrap_or_else(|e| {
                Err(SyncError::Io(
                    self.options.workspace.root().to_path_buf(),
                    io::Error::other(e),
                ))
            });

        self.state.sync.finish();
        result
    }

    /// Wait for the stopped child's port, then prefer the requested one.
    async fn reclaim_port(&self) -> Result<u16> {
        if let Err(e) = wait_for_release(self.state.active_port, self.options.port_wait).await {
            warn!("dev"; "{}", e);
        }

        let requested = self.state.requested_port;
        if port_is_free(requested) {
            return Ok(requested);
        }
        let port = find_free_port(requested, PORT_ATTEMPTS)?;
        if port != self.state.active_port {
            log!("dev"; "port {} in use, using {} instead", requested, port);
        }
        Ok(port)
    }

    fn start(&mut self, switched: bool) -> Result<()> {
        if switched {
            let cache = self.options.workspace.build_cache();
            if let Err(e) = remove_path(&cache) {
                warn!("dev"; "failed to clear {}: {}", cache.display(), e);
            }
        }

        let revision = new_revision();
        let port = self.state.active_port;
        let child = self
            .launch
            .spawn(port, &revision)
            .with_context(|| format!("failed to start {} dev server", self.options.inner.as_str()))?;

        debug!("dev"; "pid {:?}", child.id());

        self.state.child = Some(child);
        self.state.revision = revision;
        log!(
            "dev";
            "{} dev server on http://localhost:{} (revision {})",
            self.options.inner.as_str(),
            port,
            self.state.revision
        );
        Ok(())
    }

    /// Stop the current child, escalating to a kill after the grace period.
    async fn stop_child(&mut self) {
        let Some(mut child) = self.state.child.take() else {
            return;
        };
        let Some(pid) = child.id() else {
            return;
        };

        terminate::request_stop(pid);
        match tokio::time::timeout(self.options.stop_timeout, child.wait()).await {
            Ok(status) => debug!("dev"; "dev server stopped ({})", exit_code(status)),
            Err(_) => {
                warn!("dev"; "dev server did not stop within {:?}, killing", self.options.stop_timeout);
                terminate::force_kill(pid);
                let _ = child.kill().await;
            }
        }
    }

    async fn shutdown(&mut self) {
        self.state.shutting_down = true;
        if let Some(mut watcher) = self.watcher.take() {
            watcher.close();
        }
        self.stop_child().await;
    }
}

/// Wait for the child to exit; pending forever when there is none.
async fn wait_child(child: &mut Option<Child>) -> io::Result<ExitStatus> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

/// Exit code of a finished child; signals and wait errors map to 1.
fn exit_code(status: io::Result<ExitStatus>) -> i32 {
    status.ok().and_then(|s| s.code()).unwrap_or(1)
}

fn sync_failed(e: &SyncError) -> i32 {
    log!("error"; "content sync failed: {}", e);
    e.exit_code()
}
