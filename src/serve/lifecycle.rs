//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tiny_http::Server;

use crate::debug;

/// Maximum number of binding attempts.
const MAX_BIND_ATTEMPTS: u32 = 10;

/// Pause between two binding attempts.
const BIND_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Bind to the specified interface and port, retrying while the port is
/// still being released.
///
/// The port never changes: the supervisor that launched this server has
/// already announced it.
pub fn bind_with_retry(interface: IpAddr, port: u16) -> Result<(Server, SocketAddr)> {
    let addr = SocketAddr::new(interface, port);

    for attempt in 1..=MAX_BIND_ATTEMPTS {
        match Server::http(addr) {
            Ok(server) => {
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, bound));
            }
            Err(e) if attempt < MAX_BIND_ATTEMPTS => {
                debug!("serve"; "bind {} failed (attempt {}): {}", addr, attempt, e);
                thread::sleep(BIND_RETRY_DELAY);
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to bind {} after {} attempts: {}",
                    addr,
                    MAX_BIND_ATTEMPTS,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Handle to stop a running server from another thread.
#[derive(Clone)]
pub struct ServerHandle(pub(super) Arc<Server>);

impl ServerHandle {
    /// Unblock the request loop; `BoundServer::run` returns afterwards.
    pub fn stop(&self) {
        self.0.unblock();
    }
}
