//! Process supervision for the automation executable.
//!
//! [`CommandSupervisor`] implements the application layer's
//! [`ProcessSupervisor`] seam with real child processes:
//!
//! - stdout and stderr are both piped and pumped line-by-line into one
//!   bounded channel by dedicated reader tasks, so the session loop only
//!   ever suspends on a cancellation-safe channel receive and a slow
//!   consumer backpressures all the way into the child's pipes;
//! - termination is graceful-then-forced: SIGTERM (on unix), a bounded
//!   grace wait, then kill — and always reaps the child.
//!
//! The scripted in-memory implementation for tests lives in [`mock`].

pub mod mock;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::session::{AutomationProcess, Liveness, ProcessSupervisor, SpawnError};

/// Output lines buffered between the pipe readers and the session loop.
/// Bounded so a slow peer stalls the child instead of growing a queue.
const LINE_BUFFER: usize = 64;

/// Spawns the configured automation executable with `--preset <path>`.
pub struct CommandSupervisor {
    executable: PathBuf,
    grace: Duration,
}

impl CommandSupervisor {
    /// Creates a supervisor for `executable` with the given termination
    /// grace period.
    pub fn new(executable: impl Into<PathBuf>, grace: Duration) -> Self {
        Self {
            executable: executable.into(),
            grace,
        }
    }
}

#[async_trait]
impl ProcessSupervisor for CommandSupervisor {
    async fn spawn(&self, preset: &Path) -> Result<Box<dyn AutomationProcess>, SpawnError> {
        let mut child = Command::new(&self.executable)
            .arg("--preset")
            .arg(preset)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpawnError::Io {
                path: self.executable.clone(),
                source,
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                // Must not leave a half-started process behind.
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(SpawnError::NoOutputPipe);
            }
        };

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(pump_lines(stdout, tx.clone()));
        tokio::spawn(pump_lines(stderr, tx));

        debug!(
            "spawned {} --preset {} (pid {:?})",
            self.executable.display(),
            preset.display(),
            child.id()
        );

        Ok(Box::new(SupervisedProcess {
            child,
            lines: rx,
            liveness: Liveness::Running,
            grace: self.grace,
        }))
    }
}

/// Copies text lines from one child pipe into the shared line channel.
async fn pump_lines<R>(pipe: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

/// A real child process with merged stdout/stderr line capture.
struct SupervisedProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
    liveness: Liveness,
    grace: Duration,
}

#[async_trait]
impl AutomationProcess for SupervisedProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn liveness(&self) -> Liveness {
        self.liveness
    }

    async fn next_line(&mut self) -> Option<String> {
        // `None` once both pipe pumps have finished (pipes closed).
        self.lines.recv().await
    }

    async fn terminate(&mut self) {
        if self.liveness != Liveness::Running {
            return;
        }

        if let Ok(Some(status)) = self.child.try_wait() {
            debug!("automation process already exited ({status})");
            self.liveness = Liveness::Exited;
            return;
        }

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            // Ask nicely first so the process can flush and exit.
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGTERM,
            );
            match tokio::time::timeout(self.grace, self.child.wait()).await {
                Ok(_) => {
                    self.liveness = Liveness::Exited;
                    return;
                }
                Err(_) => warn!(
                    "automation process {pid} still alive {:?} after SIGTERM; killing",
                    self.grace
                ),
            }
        }

        // Forced path: kill() also reaps the child.
        let _ = self.child.kill().await;
        self.liveness = Liveness::Killed;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable stand-in for the automation runner. The wrapper
    /// ignores the `--preset <path>` arguments spawn() passes to it.
    fn write_runner(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hidbridge-{name}-{}.sh",
            std::process::id()
        ));
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_executable_fails() {
        let supervisor =
            CommandSupervisor::new("/nonexistent/hidbridge-automation", Duration::from_secs(2));

        let result = supervisor.spawn(Path::new("/tmp/p1.ini")).await;

        assert!(matches!(result, Err(SpawnError::Io { .. })));
    }

    #[tokio::test]
    async fn test_captures_merged_stdout_and_stderr_lines() {
        let runner = write_runner("pump", "echo 1,2,0\necho oops >&2\necho 5,-3,1\n");
        let supervisor = CommandSupervisor::new(&runner, Duration::from_secs(2));

        let mut process = supervisor.spawn(Path::new("/tmp/p1.ini")).await.expect("spawn");
        let mut seen = Vec::new();
        while let Some(line) = process.next_line().await {
            seen.push(line);
        }
        process.terminate().await;
        std::fs::remove_file(&runner).ok();

        // stdout and stderr land in one merged stream.
        assert!(seen.contains(&"1,2,0".to_string()));
        assert!(seen.contains(&"oops".to_string()));
        assert!(seen.contains(&"5,-3,1".to_string()));
        assert_eq!(process.liveness(), Liveness::Exited);
    }

    #[tokio::test]
    async fn test_stdout_lines_arrive_in_order() {
        let runner = write_runner("order", "echo 1,0,0\necho 2,0,0\necho 3,0,0\n");
        let supervisor = CommandSupervisor::new(&runner, Duration::from_secs(2));

        let mut process = supervisor.spawn(Path::new("/tmp/p1.ini")).await.expect("spawn");
        let mut seen = Vec::new();
        while let Some(line) = process.next_line().await {
            seen.push(line);
        }
        process.terminate().await;
        std::fs::remove_file(&runner).ok();

        assert_eq!(seen, vec!["1,0,0", "2,0,0", "3,0,0"]);
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent_after_exit() {
        let runner = write_runner("exit", "exit 0\n");
        let supervisor = CommandSupervisor::new(&runner, Duration::from_secs(2));
        let mut process = supervisor.spawn(Path::new("/tmp/p1.ini")).await.expect("spawn");

        while process.next_line().await.is_some() {}
        process.terminate().await;
        let first = process.liveness();
        process.terminate().await;
        std::fs::remove_file(&runner).ok();

        assert_eq!(first, Liveness::Exited);
        assert_eq!(process.liveness(), Liveness::Exited);
    }

    #[tokio::test]
    async fn test_terminate_ends_long_running_child_within_grace() {
        let runner = write_runner("sleep", "sleep 30\n");
        let supervisor = CommandSupervisor::new(&runner, Duration::from_secs(2));
        let mut process = supervisor.spawn(Path::new("/tmp/p1.ini")).await.expect("spawn");

        let started = std::time::Instant::now();
        process.terminate().await;
        std::fs::remove_file(&runner).ok();

        // SIGTERM ends the shell well before the grace period expires; either
        // way the call is bounded by grace + kill.
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_ne!(process.liveness(), Liveness::Running);
    }
}
