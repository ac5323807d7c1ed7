//! Process-tree termination.
//!
//! The child runs in its own process group (Unix) so a single signal reaches
//! the dev server and everything it spawned. On Windows `taskkill /T` walks
//! the tree instead. Failures (tree already gone) are ignored.

use crate::debug;

/// Ask the process tree rooted at `pid` to exit.
pub fn request_stop(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGTERM);

    #[cfg(windows)]
    taskkill(pid, false);
}

/// Kill the process tree rooted at `pid` without grace period.
pub fn force_kill(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGKILL);

    #[cfg(windows)]
    taskkill(pid, true);
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the group
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        debug!("dev"; "signal {} to group {}: {}", signal, pgid, std::io::Error::last_os_error());
    }
}

#[cfg(windows)]
fn taskkill(pid: u32, force: bool) {
    use crate::utils::exec::Cmd;

    let pid = pid.to_string();
    let cmd = Cmd::new("taskkill").args(["/PID", pid.as_str(), "/T"]);
    let cmd = if force { cmd.arg("/F") } else { cmd };
    if let Err(e) = cmd.run() {
        debug!("dev"; "taskkill {}: {}", pid, e);
    }
}
