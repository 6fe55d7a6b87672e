// Common test utilities shared across acceptance tests
//
// ## Test Isolation Strategy
//
// Each test gets its own workspace: a temp directory holding a copy of the
// fixture scripts and a `scriptpro.toml`. Commands run with that directory as
// their working directory, with every SCRIPTPRO_* variable removed and
// XDG_CONFIG_HOME pointed inside the workspace, so no global config leaks in.
//
// Servers bind to a free port picked per test and are killed on drop.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use walkdir::WalkDir;

const ISOLATED_ENV: &[&str] = &[
    "SCRIPTPRO_CONFIG",
    "SCRIPTPRO_CONFIG_SCRIPTS_DIR",
    "SCRIPTPRO_CONFIG_RESPONSE_CONVENTION",
    "SCRIPTPRO_CONFIG_BIND",
    "SCRIPTPRO_CONFIG_WATCH",
    "SCRIPTPRO_LOG_FORMAT",
];

pub const DEFAULT_CONFIG: &str = r#"
[scripts]
dir = "scripts"
exclude = ["lib/*"]
"#;

/// Isolated project directory with the fixture scripts under `scripts/`
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CONFIG)
    }

    pub fn with_config(config: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/scripts");

        for entry in WalkDir::new(&fixtures) {
            let entry = entry.unwrap();
            let relative = entry.path().strip_prefix(&fixtures).unwrap();
            let dest = temp_dir.path().join("scripts").join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).unwrap();
            } else {
                fs::copy(entry.path(), &dest).unwrap();
            }
        }

        fs::write(temp_dir.path().join("scriptpro.toml"), config).unwrap();

        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_file(&self, path: &str, content: &str) {
        let file_path = self.temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file_path, content).unwrap();
    }

    pub fn remove_file(&self, path: &str) {
        fs::remove_file(self.temp_dir.path().join(path)).unwrap();
    }

    /// `scriptpro` command running inside the workspace
    pub fn scriptpro(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_scriptpro"));
        self.isolate(cmd.current_dir(self.path()));
        cmd
    }

    fn isolate(&self, cmd: &mut Command) {
        for var in ISOLATED_ENV {
            cmd.env_remove(var);
        }
        cmd.env("XDG_CONFIG_HOME", self.path().join(".xdg"));
        cmd.env("RUST_LOG", "info");
    }
}

/// A running `scriptpro serve` process
pub struct TestServer {
    child: Child,
    pub port: u16,
}

impl TestServer {
    pub fn start(workspace: &TestWorkspace, extra_args: &[&str]) -> Self {
        let port = free_port();

        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_scriptpro"));
        cmd.arg("serve")
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .args(extra_args)
            .current_dir(workspace.path())
            .env("XDG_CONFIG_HOME", workspace.path().join(".xdg"))
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for var in ISOLATED_ENV {
            cmd.env_remove(var);
        }
        let child = cmd.spawn().unwrap();

        let mut server = Self { child, port };
        server.wait_until_ready();
        server
    }

    fn wait_until_ready(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(15);
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                panic!("Server exited immediately with status: {}", status);
            }
            if let Some((200, _)) = self.try_request("GET", "/health", None) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        panic!("Server did not become ready on port {}", self.port);
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send a request and return (status, body)
    pub fn request(&self, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
        self.try_request(method, path, body)
            .unwrap_or_else(|| panic!("request {} {} failed", method, path))
    }

    fn try_request(&self, method: &str, path: &str, body: Option<&str>) -> Option<(u16, String)> {
        let mut stream = TcpStream::connect(("127.0.0.1", self.port)).ok()?;
        stream.set_read_timeout(Some(Duration::from_secs(10))).ok()?;

        let body = body.unwrap_or("");
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).ok()?;

        let mut raw = String::new();
        stream.read_to_string(&mut raw).ok()?;

        let status = raw.split_whitespace().nth(1)?.parse().ok()?;
        let body = raw.split_once("\r\n\r\n").map(|(_, b)| b.to_string())?;
        Some((status, body))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `condition` for up to ten seconds
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}
