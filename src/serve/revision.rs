//! Dev Revision Channel
//!
//! Every start of the dev server gets a fresh revision token. Browsers learn
//! it through one of two transports and reload when it changes:
//!
//! - pull: `GET /api/dev/revision` → `{"revision": "<token>"}`
//! - push: `GET /api/dev/revision/stream` → server-sent events
//!
//! The push stream writes its response by hand: the stream never ends, and
//! every frame has to reach the client as soon as it is written.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tiny_http::Request;

use crate::utils::mime::types::EVENT_STREAM;

pub const REVISION_PATH: &str = "/api/dev/revision";
pub const STREAM_PATH: &str = "/api/dev/revision/stream";
pub const RELOAD_SCRIPT_PATH: &str = "/__dev/reload.js";

/// `cache-control` of both transports.
pub const NO_STORE: &str = "no-store, max-age=0";

/// Interval between keep-alive comment frames.
pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Reconnect delay hint, sent first on every stream.
pub const RETRY_FRAME: &str = "retry: 1000\n";
pub const KEEP_ALIVE_FRAME: &str = ":keep-alive\n\n";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<unix millis in base 36>-<sequence>`, unique within the process.
pub fn new_revision() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}", to_base36(millis), seq)
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// JSON body of the pull endpoint (and of each data frame).
pub fn payload(revision: &str) -> String {
    serde_json::json!({ "revision": revision }).to_string()
}

pub fn data_frame(revision: &str) -> String {
    format!("data: {}\n\n", payload(revision))
}

/// Serve the push transport until the client goes away or `shutdown`
/// disconnects.
pub fn stream(
    request: Request,
    revision: &str,
    shutdown: &Receiver<()>,
    keep_alive: Duration,
) -> io::Result<()> {
    let mut writer = request.into_writer();
    write!(
        writer,
        "HTTP/1.1 200 OK\r\n\
         Content-Type: {EVENT_STREAM}\r\n\
         Cache-Control: {NO_STORE}\r\n\
         Connection: keep-alive\r\n\
         \r\n"
    )?;
    writer.write_all(RETRY_FRAME.as_bytes())?;
    writer.write_all(data_frame(revision).as_bytes())?;
    writer.flush()?;

    loop {
        match shutdown.recv_timeout(keep_alive) {
            Err(RecvTimeoutError::Timeout) => {
                writer.write_all(KEEP_ALIVE_FRAME.as_bytes())?;
                writer.flush()?;
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}
