//! End-to-end: `dev --inner stub` switches course content when env files change.

#![cfg(unix)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

const RESTART_LINE: &str = "restarting dev server";
const SELECTION_KEYS: [&str; 3] = [
    "COURSE_CONTENT_SOURCE",
    "COURSE_CONTENT_DIR",
    "COURSE_DOCS_SITE_DEV_INNER",
];

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_course(root: &Path, name: &str, extra_doc: &str) {
    let docs = root.join("content/docs");
    fs::create_dir_all(docs.join("intro")).unwrap();
    fs::create_dir_all(docs.join(extra_doc)).unwrap();
    fs::create_dir_all(root.join("public/img")).unwrap();

    fs::write(
        root.join("site.config.ts"),
        format!("export const siteConfig = {{ logoText: {name:?} }} as const;\n"),
    )
    .unwrap();
    fs::write(docs.join("intro/index.mdx"), format!("# {name}\n")).unwrap();
    fs::write(docs.join(extra_doc).join("index.mdx"), format!("# {name}\n")).unwrap();
    fs::write(root.join("public/img/favicon.ico"), "").unwrap();
}

/// Point the site at `course` the way an editor saves: temp file + rename.
fn select_course(site: &Path, course: &Path) {
    let tmp = site.join(".env.course.local.tmp");
    fs::write(&tmp, format!("COURSE_CONTENT_DIR={:?}\n", course.display().to_string())).unwrap();
    fs::rename(&tmp, site.join(".env.course.local")).unwrap();
}

fn get(port: u16, path: &str) -> Option<(u16, String)> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok()?;
    write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").ok()?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).ok()?;
    let (head, body) = raw.split_once("\r\n\r\n")?;
    let status = head.split(' ').nth(1)?.parse().ok()?;
    Some((status, body.to_string()))
}

fn status(port: u16, path: &str) -> Option<u16> {
    get(port, path).map(|(status, _)| status)
}

fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

fn serving(port: u16, present: &str, absent: &str) -> bool {
    status(port, &format!("/docs/{present}/")) == Some(200)
        && status(port, &format!("/docs/{absent}/")) == Some(404)
}

struct Daemon {
    child: Child,
    output: Arc<Mutex<String>>,
}

impl Daemon {
    fn spawn(site: &Path, port: u16) -> Self {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_course-docs-dev"));
        cmd.arg("--root")
            .arg(site)
            .args(["--color", "never", "dev", "--inner", "stub", "--", "--port"])
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        for key in SELECTION_KEYS {
            cmd.env_remove(key);
        }

        let mut child = cmd.spawn().unwrap();
        let stdout = child.stdout.take().unwrap();
        let output = Arc::new(Mutex::new(String::new()));

        let sink = Arc::clone(&output);
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                println!("{line}");
                let mut out = sink.lock().unwrap();
                out.push_str(&line);
                out.push('\n');
            }
        });

        Self { child, output }
    }

    fn restarts(&self) -> usize {
        self.output().matches(RESTART_LINE).count()
    }

    fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }

    /// Wait for the daemon to exit on its own.
    fn wait_exit(&mut self, limit: Duration) -> Option<i32> {
        let started = Instant::now();
        while started.elapsed() < limit {
            if let Ok(Some(status)) = self.child.try_wait() {
                return status.code();
            }
            thread::sleep(Duration::from_millis(100));
        }
        None
    }

    /// SIGTERM, then wait for a clean exit.
    fn terminate(&mut self) -> Option<i32> {
        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status();
        self.wait_exit(Duration::from_secs(20))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

struct Fixture {
    _temp: TempDir,
    site: PathBuf,
    course_a: PathBuf,
    course_b: PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let site = temp.path().join("site");
    let course_a = temp.path().join("course-a");
    let course_b = temp.path().join("course-b");
    fs::create_dir_all(&site).unwrap();
    write_course(&course_a, "Course A", "a-only");
    write_course(&course_b, "Course B", "b-only");

    Fixture {
        _temp: temp,
        site,
        course_a,
        course_b,
    }
}

#[test]
fn test_dev_switches_content_on_env_change() {
    let fx = fixture();
    let port = free_port();
    select_course(&fx.site, &fx.course_a);

    let mut daemon = Daemon::spawn(&fx.site, port);
    let limit = Duration::from_secs(60);

    assert!(
        wait_for(limit, || serving(port, "a-only", "b-only")),
        "course A never served"
    );
    let (_, first) = get(port, "/api/dev/revision").unwrap();

    select_course(&fx.site, &fx.course_b);
    assert!(
        wait_for(limit, || serving(port, "b-only", "a-only")),
        "course B never served"
    );
    let (_, second) = get(port, "/api/dev/revision").unwrap();
    assert_ne!(first, second, "revision must change across restarts");

    // A burst of saves costs a single restart
    let before = daemon.restarts();
    for course in [&fx.course_a, &fx.course_b, &fx.course_a, &fx.course_b, &fx.course_a] {
        select_course(&fx.site, course);
        thread::sleep(Duration::from_millis(10));
    }
    assert!(
        wait_for(limit, || serving(port, "a-only", "b-only")),
        "course A never served again"
    );
    thread::sleep(Duration::from_secs(2));
    assert_eq!(daemon.restarts() - before, 1);

    assert_eq!(daemon.terminate(), Some(0));
    assert!(port_released(port), "dev server outlived the daemon");
    assert!(!daemon.output().contains('\u{1b}'), "colored output with --color never");
}

fn port_released(port: u16) -> bool {
    wait_for(Duration::from_secs(10), || TcpListener::bind(("127.0.0.1", port)).is_ok())
}

#[test]
fn test_dev_exits_when_restart_sync_fails() {
    let fx = fixture();
    let port = free_port();
    select_course(&fx.site, &fx.course_a);

    let mut daemon = Daemon::spawn(&fx.site, port);
    assert!(
        wait_for(Duration::from_secs(60), || serving(port, "a-only", "b-only")),
        "course A never served"
    );

    select_course(&fx.site, &fx.site.join("no-such-course"));
    assert_eq!(daemon.wait_exit(Duration::from_secs(30)), Some(1));
    assert!(port_released(port), "dev server outlived the daemon");
}

#[test]
fn test_dev_propagates_unexpected_child_exit() {
    let fx = fixture();
    let port = free_port();
    select_course(&fx.site, &fx.course_a);

    let mut daemon = Daemon::spawn(&fx.site, port);
    assert!(
        wait_for(Duration::from_secs(60), || serving(port, "a-only", "b-only")),
        "course A never served"
    );

    let killed = Command::new("pkill")
        .args(["-KILL", "-P", &daemon.child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    // Killed by a signal: reported as 1
    assert_eq!(daemon.wait_exit(Duration::from_secs(30)), Some(1));
}

#[test]
fn test_dev_restarts_quickly_on_fallback_port() {
    let fx = fixture();
    let held = TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let requested = held.local_addr().unwrap().port();
    select_course(&fx.site, &fx.course_a);

    let mut daemon = Daemon::spawn(&fx.site, requested);
    let serving_any = |present: &str, absent: &str| {
        (requested + 1..requested + 20).find(|&p| serving(p, present, absent))
    };

    assert!(
        wait_for(Duration::from_secs(60), || serving_any("a-only", "b-only").is_some()),
        "course A never served on a fallback port"
    );

    let started = Instant::now();
    select_course(&fx.site, &fx.course_b);
    assert!(
        wait_for(Duration::from_secs(30), || serving_any("b-only", "a-only").is_some()),
        "course B never served"
    );
    assert!(started.elapsed() < Duration::from_secs(8), "restart waited on the held port");
    assert!(!daemon.output().contains("still in use"));

    assert_eq!(daemon.terminate(), Some(0));
    drop(held);
}

fn sync_command(site: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_course-docs-dev"));
    cmd.arg("--root").arg(site).args(["--color", "never", "sync"]);
    for key in SELECTION_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_sync_command_materializes_content() {
    let fx = fixture();
    select_course(&fx.site, &fx.course_b);

    let status = sync_command(&fx.site).status().unwrap();
    assert!(status.success());
    assert!(fx.site.join("content/docs/b-only/index.mdx").is_file());
    assert!(fx.site.join(".course-content/active-source.txt").is_file());
}

#[test]
fn test_sync_command_reports_missing_source() {
    let fx = fixture();
    select_course(&fx.site, &fx.site.join("no-such-course"));

    let status = sync_command(&fx.site).status().unwrap();
    assert_eq!(status.code(), Some(1));
}
