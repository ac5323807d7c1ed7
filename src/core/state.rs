//! Process-wide shutdown state.
//!
//! Both long-running commands (`dev` and `serve`) install the same Ctrl+C /
//! SIGTERM handler at startup and register what should be notified later:
//! - `dev`: the supervisor's message channel
//! - `serve`: the HTTP server, to unblock its accept loop
//!
//! The handler is single-shot: the first signal performs the notification,
//! later signals are ignored so teardown never runs twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tokio::sync::mpsc::UnboundedSender;

use crate::serve::ServerHandle;
use crate::supervisor::SupervisorMsg;

/// Shutdown has been requested (first signal received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<ServerHandle> = OnceLock::new();

/// Supervisor mailbox
static SUPERVISOR_TX: OnceLock<UnboundedSender<SupervisorMsg>> = OnceLock::new();

/// Setup the global signal handler. Call once at program start
///
/// Behavior depends on what has been registered when the signal arrives:
/// - supervisor registered: queue `SupervisorMsg::Shutdown`
/// - server registered: unblock the server (revision streams close with it)
/// - nothing registered: exit immediately, there is nothing to tear down
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            crate::debug!("signal"; "shutdown already in progress");
            return;
        }

        let mut notified = false;

        if let Some(tx) = SUPERVISOR_TX.get() {
            let _ = tx.send(SupervisorMsg::Shutdown);
            notified = true;
        }

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.stop();
            notified = true;
        }

        if !notified {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set signal handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: ServerHandle) {
    let _ = SERVER.set(server);
}

/// Register the supervisor mailbox for graceful shutdown
pub fn register_supervisor(tx: UnboundedSender<SupervisorMsg>) {
    let _ = SUPERVISOR_TX.set(tx);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag_is_single_shot() {
        SHUTDOWN.store(false, Ordering::SeqCst);
        assert!(!SHUTDOWN.swap(true, Ordering::SeqCst));
        assert!(SHUTDOWN.swap(true, Ordering::SeqCst));
        assert!(is_shutdown());
        SHUTDOWN.store(false, Ordering::SeqCst);
    }
}
