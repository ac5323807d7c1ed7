//! Port selection for the child dev server.
//!
//! The port comes from the forwarded arguments (`--port N`, `--port=N`,
//! `-p N`, `-p=N`). A port counts as free only when it binds on both the
//! loopback and the wildcard address.

use std::net::{Ipv4Addr, TcpListener};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::debug;

/// Port used when none (or an invalid one) is forwarded.
pub const DEFAULT_PORT: u16 = 3000;

/// Ports tried by `find_free_port`, starting at the requested one.
pub const PORT_ATTEMPTS: u16 = 20;

const PORT_FLAGS: [&str; 2] = ["--port", "-p"];

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port {port} is still in use after {waited:?}")]
    StillInUse { port: u16, waited: Duration },

    #[error("no free port in {start}..={end}")]
    Exhausted { start: u16, end: u16 },
}

/// How long to wait for a stopped child to release its port.
#[derive(Debug, Clone, Copy)]
pub struct PortWait {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PortWait {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Extract the requested port. The first port flag wins.
pub fn parse_port_arg(args: &[String]) -> u16 {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let value = if PORT_FLAGS.contains(&arg.as_str()) {
            iter.next().map(String::as_str)
        } else if let Some(value) = inline_value(arg) {
            Some(value)
        } else {
            continue;
        };

        return value
            .and_then(|v| v.trim().parse::<u16>().ok())
            .filter(|&port| port > 0)
            .unwrap_or(DEFAULT_PORT);
    }
    DEFAULT_PORT
}

/// Drop every port flag (and its separate value) from the forwarded args.
pub fn strip_port_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if PORT_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if inline_value(arg).is_none() {
            out.push(arg.clone());
        }
    }
    out
}

/// `--port=N` / `-p=N` → `N`
fn inline_value(arg: &str) -> Option<&str> {
    PORT_FLAGS
        .iter()
        .find_map(|flag| arg.strip_prefix(flag)?.strip_prefix('='))
}

/// Whether `port` binds on both 127.0.0.1 and 0.0.0.0 right now.
pub fn port_is_free(port: u16) -> bool {
    [Ipv4Addr::LOCALHOST, Ipv4Addr::UNSPECIFIED]
        .into_iter()
        .all(|ip| TcpListener::bind((ip, port)).is_ok())
}

/// Poll until `port` is free or the wait times out.
pub async fn wait_for_release(port: u16, wait: PortWait) -> Result<(), PortError> {
    let started = Instant::now();
    loop {
        if port_is_free(port) {
            debug!("dev"; "port {} free after {:?}", port, started.elapsed());
            return Ok(());
        }
        if started.elapsed() >= wait.timeout {
            return Err(PortError::StillInUse {
                port,
                waited: wait.timeout,
            });
        }
        tokio::time::sleep(wait.interval).await;
    }
}

/// First free port in `start..start + attempts`.
pub fn find_free_port(start: u16, attempts: u16) -> Result<u16, PortError> {
    let mut end = start;
    for offset in 0..attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        end = port;
        if port_is_free(port) {
            return Ok(port);
        }
    }
    Err(PortError::Exhausted { start, end })
}
