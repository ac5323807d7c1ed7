//! Built-in dev server.
//!
//! A minimal stand-in for the documentation framework, run by the supervisor
//! as its `stub` child:
//!
//! | Path                        | Response                                   |
//! |-----------------------------|--------------------------------------------|
//! | `/healthz`                  | `course-docs-site-stub`                    |
//! | `/docs/<slug>/`             | 200 if `content/docs/<slug>/index.md(x)`   |
//! | `/api/dev/revision`         | revision JSON                              |
//! | `/api/dev/revision/stream`  | revision event stream                      |
//! | `/__dev/reload.js`          | browser reload client                      |
//! | anything else               | file under `public/`, else 404             |

mod lifecycle;
mod response;
mod route;
pub mod revision;

#[cfg(test)]
mod tests;

pub use lifecycle::ServerHandle;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, Sender};
use tiny_http::{Request, Server};

use crate::config::{CONTENT_DIR, DEV_REVISION_KEY, PUBLIC_DIR};
use crate::core::{is_shutdown, register_server};
use crate::{debug, log};
use route::{Route, has_doc, resolve_static};

/// Worker threads for short requests. Revision streams get their own thread.
const REQUEST_THREADS: usize = 4;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Working tree holding `content/` and `public/`.
    pub root: PathBuf,
    pub interface: IpAddr,
    pub port: u16,
    /// Token published by the revision channel.
    pub revision: String,
    pub keep_alive: Duration,
}

impl ServeOptions {
    /// Options with the revision taken from `COURSE_DOCS_SITE_DEV_REVISION`.
    pub fn new(root: PathBuf, interface: IpAddr, port: u16) -> Self {
        Self {
            root,
            interface,
            port,
            revision: std::env::var(DEV_REVISION_KEY).unwrap_or_default(),
            keep_alive: revision::KEEP_ALIVE,
        }
    }
}

struct SiteState {
    docs_root: PathBuf,
    public_root: PathBuf,
    revision: String,
    keep_alive: Duration,
    /// Disconnects when the request loop ends.
    shutdown: Receiver<()>,
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    state: Arc<SiteState>,
    shutdown_tx: Sender<()>,
}

/// Bind the HTTP server without starting the request loop
pub fn bind(options: ServeOptions) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(options.interface, options.port)?;
    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();

    let state = SiteState {
        docs_root: options.root.join(CONTENT_DIR).join("docs"),
        public_root: options.root.join(PUBLIC_DIR),
        revision: options.revision,
        keep_alive: options.keep_alive,
        shutdown: shutdown_rx,
    };

    Ok(BoundServer {
        server: Arc::new(server),
        addr,
        state: Arc::new(state),
        shutdown_tx,
    })
}

/// Bind, register for Ctrl+C / SIGTERM, and serve until shutdown.
pub fn serve(options: ServeOptions) -> Result<()> {
    let bound = bind(options)?;
    register_server(bound.handle());

    log!("serve"; "http://{}", bound.addr());
    debug!("serve"; "revision {:?}", bound.state.revision);
    bound.run()
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for stopping the server from another thread.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle(Arc::clone(&self.server))
    }

    /// Start the request loop (blocking).
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("serve-{i}"))
            .build()
            .context("failed to create request thread pool")?;

        for request in self.server.incoming_requests() {
            let state = Arc::clone(&self.state);

            if Route::from_url(request.url()) == Route::RevisionStream && !is_shutdown() {
                thread::spawn(move || {
                    if let Err(e) =
                        revision::stream(request, &state.revision, &state.shutdown, state.keep_alive)
                    {
                        debug!("serve"; "revision stream closed: {}", e);
                    }
                });
                continue;
            }

            pool.spawn(move || {
                if let Err(e) = handle_request(request, &state) {
                    log!("serve"; "request error: {e}");
                }
            });
        }

        // Open revision streams end once every sender is gone
        drop(self.shutdown_tx);
        debug!("serve"; "stopped");
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &SiteState) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    match Route::from_url(&url) {
        Route::Health => response::respond_health(request),
        Route::Doc(slug) if has_doc(&state.docs_root, slug) => response::respond_doc(request, slug),
        Route::Doc(_) => response::respond_not_found(request),
        Route::Revision => response::respond_revision(request, &state.revision),
        Route::ReloadScript => response::respond_reload_js(request),
        // Only reached while shutting down
        Route::RevisionStream => response::respond_unavailable(request),
        Route::Static(path) => match resolve_static(path, &state.public_root) {
            Some(file) => response::respond_file(request, &file),
            None => response::respond_not_found(request),
        },
    }
}
