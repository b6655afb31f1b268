// Shared fixtures for the supervisor integration tests.
#![allow(dead_code)]

use jetty_wrapper::LaunchParams;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Stand-in for the java binary: ignores its arguments and idles.
const FAKE_JAVA: &str = "#!/bin/sh\nexec sleep 30\n";

/// An application root with a `jetty/` home and a fake java binary.
pub struct Fixture {
    pub root: TempDir,
    pub home: PathBuf,
    pub java: PathBuf,
    pub port: u16,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("jetty");
        fs::create_dir_all(&home).unwrap();

        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let java = bin.join("fake-java");
        fs::write(&java, FAKE_JAVA).unwrap();
        fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            root,
            home,
            java,
            port: free_port(),
        }
    }

    pub fn params(&self) -> LaunchParams {
        LaunchParams {
            environment: Some("test".to_string()),
            app_root: Some(self.root.path().to_path_buf()),
            java: Some(self.java.clone()),
            jetty_port: Some(self.port),
            startup_wait: Some(0),
            ..LaunchParams::default()
        }
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root
            .path()
            .join("tmp/pids")
            .join(jetty_wrapper::server::to_filename(&self.home).unwrap())
    }

    /// Plants a PID file as if a previous supervisor had crashed.
    pub fn plant_pid(&self, pid: u32) {
        let path = self.pid_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("{}\n", pid)).unwrap();
    }
}

/// A port nothing is listening on, as far as the OS knows right now.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// PID of a process that has already exited and been reaped.
pub fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

/// Polls until `pid` is gone; background reaping of dropped handles is asynchronous.
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..50 {
        if !jetty_wrapper::server::is_process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
