use anyhow::{Context, Result};
use daemonize::Daemonize;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};

/// 监控进程的 PID 文件管理
pub struct PidManager {
    pid_file: PathBuf,
}

impl PidManager {
    pub fn new<P: Into<PathBuf>>(pid_file: P) -> Self {
        Self {
            pid_file: pid_file.into(),
        }
    }

    /// 前台运行时写入当前进程 PID；已有存活进程则拒绝启动
    pub fn write_pid(&self) -> Result<()> {
        if let Some(old_pid) = self.read_pid() {
            if process_running(old_pid) {
                anyhow::bail!("Monitor is already running (PID: {})", old_pid);
            }
        }

        let pid = std::process::id();
        fs::write(&self.pid_file, pid.to_string()).context("Failed to write PID file")?;
        info!("Written PID {} to {:?}", pid, self.pid_file);
        Ok(())
    }

    pub fn check_status(&self) -> Result<()> {
        match self.read_pid() {
            Some(pid) if process_running(pid) => println!("Running (PID: {})", pid),
            Some(_) => println!("Not running (stale PID file found)"),
            None => println!("Not running"),
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let Some(pid) = self.read_pid() else {
            info!("No PID file found. Monitor might not be running.");
            return Ok(());
        };

        if process_running(pid) {
            signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                .context("Failed to send SIGTERM")?;
            info!("Sent termination signal to process {}", pid);
        } else {
            warn!("Process {} not found", pid);
        }

        let _ = fs::remove_file(&self.pid_file);
        Ok(())
    }

    pub fn remove_pid_file(&self) {
        let _ = fs::remove_file(&self.pid_file);
    }

    fn read_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

fn process_running(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// 以守护进程方式运行，必须在启动 tokio runtime 之前调用
pub fn start_daemon(pid_file: &str, stdout_path: &str, stderr_path: &str) -> Result<()> {
    let stdout = File::create(stdout_path).context("Failed to create stdout file")?;
    let stderr = File::create(stderr_path).context("Failed to create stderr file")?;

    let daemonize = Daemonize::new()
        .pid_file(pid_file)
        .chown_pid_file(true)
        .working_directory(".")
        .stdout(stdout)
        .stderr(stderr);

    daemonize
        .start()
        .context("Failed to daemonize monitor process")?;
    Ok(())
}
