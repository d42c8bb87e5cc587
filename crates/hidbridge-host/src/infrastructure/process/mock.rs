//! Scripted process supervisor for unit and integration testing.
//!
//! The real supervisor launches OS processes, which tests cannot script or
//! observe precisely. [`ScriptedSupervisor`] replaces it: each `spawn`
//! returns a [`ScriptedProcess`] that replays a fixed list of output lines,
//! and registers a [`ProcessProbe`] the test can inspect afterwards to
//! confirm the session really released the process.
//!
//! Set `fail_spawn` to exercise the `ProcessSpawnError` path, and
//! `hold_open` to keep the output stream pending after the script drains
//! (for peer-disconnect and shutdown scenarios that need a long-lived
//! process).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::application::session::{AutomationProcess, Liveness, ProcessSupervisor, SpawnError};

/// Observable endpoint of one scripted process, shared with the test.
#[derive(Debug, Default)]
pub struct ProcessProbe {
    /// Set once `terminate` has run on the process.
    pub terminated: AtomicBool,
}

impl ProcessProbe {
    /// Whether the process was terminated (through any session exit path).
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// A supervisor that hands out scripted in-memory processes.
pub struct ScriptedSupervisor {
    script: Vec<String>,
    hold_open: bool,
    fail_spawn: bool,
    /// Number of `spawn` calls, successful or not.
    pub spawn_count: AtomicUsize,
    /// Probe for every process handed out, in spawn order.
    pub probes: Mutex<Vec<Arc<ProcessProbe>>>,
    /// Preset path of every spawn call, in order.
    pub spawned_presets: Mutex<Vec<PathBuf>>,
}

impl ScriptedSupervisor {
    /// A supervisor whose processes print `lines` and then end.
    pub fn with_script(lines: &[&str]) -> Self {
        Self {
            script: lines.iter().map(|s| s.to_string()).collect(),
            hold_open: false,
            fail_spawn: false,
            spawn_count: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
            spawned_presets: Mutex::new(Vec::new()),
        }
    }

    /// Like [`with_script`](Self::with_script), but the output stream stays
    /// open (pending forever) after the script drains, as a long-running
    /// process would.
    pub fn with_open_script(lines: &[&str]) -> Self {
        Self {
            hold_open: true,
            ..Self::with_script(lines)
        }
    }

    /// A supervisor whose every `spawn` fails.
    pub fn failing() -> Self {
        Self {
            fail_spawn: true,
            ..Self::with_script(&[])
        }
    }

    /// Number of `spawn` calls made so far.
    pub fn spawns(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    /// Probe for the `n`-th spawned process.
    pub fn probe(&self, n: usize) -> Option<Arc<ProcessProbe>> {
        self.probes.lock().unwrap().get(n).cloned()
    }
}

#[async_trait]
impl ProcessSupervisor for ScriptedSupervisor {
    async fn spawn(&self, preset: &Path) -> Result<Box<dyn AutomationProcess>, SpawnError> {
        self.spawn_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_spawn {
            return Err(SpawnError::Io {
                path: PathBuf::from("scripted-runner"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }
        self.spawned_presets.lock().unwrap().push(preset.to_path_buf());
        let probe = Arc::new(ProcessProbe::default());
        self.probes.lock().unwrap().push(Arc::clone(&probe));
        Ok(Box::new(ScriptedProcess {
            lines: self.script.clone().into(),
            hold_open: self.hold_open,
            probe,
            liveness: Liveness::Running,
        }))
    }
}

/// In-memory stand-in for a supervised process.
pub struct ScriptedProcess {
    lines: VecDeque<String>,
    hold_open: bool,
    probe: Arc<ProcessProbe>,
    liveness: Liveness,
}

#[async_trait]
impl AutomationProcess for ScriptedProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn liveness(&self) -> Liveness {
        self.liveness
    }

    async fn next_line(&mut self) -> Option<String> {
        match self.lines.pop_front() {
            Some(line) => Some(line),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    async fn terminate(&mut self) {
        if self.liveness != Liveness::Running {
            return;
        }
        self.liveness = if self.lines.is_empty() && !self.hold_open {
            Liveness::Exited
        } else {
            Liveness::Killed
        };
        self.probe.terminated.store(true, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
