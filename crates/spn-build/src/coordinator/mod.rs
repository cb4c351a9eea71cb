//! Concurrent build coordinator.
//!
//! One worker thread per dependency context; the calling thread polls every
//! context's status cell, feeds a progress observer, and reacts to
//! cancellation by failing whatever has not finished yet. A lock file is
//! written only when every dependency reached `done`.

use camino::Utf8PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use spn_config::{LockFile, LockHeader};
use spn_core::types::LockEntry;

use crate::context::{snapshot_of, BuildState, DependencyBuildContext, StatusHandle, StatusSnapshot};
use crate::machine::BuildMachine;
use crate::vcs::SourceControl;
use crate::BuildResult;

/// Process-wide cancellation flag
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Receives per-dependency progress; rendering is up to the implementor
pub trait ProgressObserver {
    /// Called once per poll tick while work is outstanding
    fn on_tick(&mut self, statuses: &[StatusSnapshot]);

    /// Called once after every dependency settled (or the run was canceled)
    fn on_settle(&mut self, statuses: &[StatusSnapshot]);
}

/// Observer that ignores everything
impl ProgressObserver for () {
    fn on_tick(&mut self, _statuses: &[StatusSnapshot]) {}
    fn on_settle(&mut self, _statuses: &[StatusSnapshot]) {}
}

/// Where and what to persist after a fully successful run
#[derive(Debug, Clone)]
pub struct LockTarget {
    pub path: Utf8PathBuf,
    pub header: LockHeader,
    pub entries: Vec<LockEntry>,
}

/// One dependency that did not reach `done`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub name: String,
    pub state: BuildState,
    pub error: Option<String>,
    /// Full contents of the dependency's build log, if any
    pub log: String,
}

/// Aggregate outcome of a coordinator run
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub statuses: Vec<StatusSnapshot>,
    pub failures: Vec<Failure>,
    pub canceled: bool,
    pub lock_written: bool,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        !self.canceled && self.failures.is_empty()
    }
}

/// What the polling loop keeps per worker
struct Tracked {
    name: String,
    commit: String,
    log: Utf8PathBuf,
    status: StatusHandle,
    worker: Option<JoinHandle<()>>,
}

/// Drives many dependency state machines in parallel
pub struct Coordinator {
    machine: BuildMachine,
    cancel: CancellationToken,
    poll_interval: Duration,
    lock: Option<LockTarget>,
}

impl Coordinator {
    pub fn new(
        vcs: Arc<dyn SourceControl>,
        cancel: CancellationToken,
        force: bool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            machine: BuildMachine::new(vcs, cancel.clone(), force),
            cancel,
            poll_interval,
            lock: None,
        }
    }

    /// Persist `target` once every dependency is done
    pub fn with_lock(mut self, target: LockTarget) -> Self {
        self.lock = Some(target);
        self
    }

    /// Build every context to a terminal state and report the outcome
    pub fn run(
        &self,
        contexts: Vec<DependencyBuildContext>,
        observer: &mut dyn ProgressObserver,
    ) -> BuildResult<BuildReport> {
        info!("Building {} dependencies", contexts.len());
        let mut tracked: Vec<Tracked> = contexts.into_iter().map(|ctx| self.spawn(ctx)).collect();

        let canceled = loop {
            if self.cancel.is_cancelled() {
                for entry in &tracked {
                    if entry.status.fail("canceled") {
                        debug!("{} canceled before finishing", entry.name);
                    }
                }
                break true;
            }

            for entry in &tracked {
                let finished = entry.worker.as_ref().map_or(true, JoinHandle::is_finished);
                if finished && !entry.status.is_terminal() {
                    entry.status.fail("build worker exited unexpectedly");
                }
            }

            if tracked.iter().all(|entry| entry.status.is_terminal()) {
                break false;
            }

            observer.on_tick(&snapshots(&tracked));
            std::thread::sleep(self.poll_interval);
        };

        // Workers still inside an external command are left to finish on their
        // own; their later status writes are absorbed by the terminal state.
        if !canceled {
            for entry in &mut tracked {
                if let Some(worker) = entry.worker.take() {
                    if worker.join().is_err() {
                        warn!("Build worker for {} panicked", entry.name);
                    }
                }
            }
        }

        let statuses = snapshots(&tracked);
        observer.on_settle(&statuses);

        let failures: Vec<Failure> = tracked
            .iter()
            .zip(&statuses)
            .filter(|(_, status)| status.state != BuildState::Done)
            .map(|(entry, status)| Failure {
                name: entry.name.clone(),
                state: status.state,
                error: status.error.clone(),
                log: std::fs::read_to_string(&entry.log).unwrap_or_default(),
            })
            .collect();

        let mut report = BuildReport {
            statuses,
            failures,
            canceled,
            lock_written: false,
        };

        if report.is_success() {
            if let Some(target) = &self.lock {
                LockFile::new(target.header.clone(), target.entries.clone()).write(&target.path)?;
                report.lock_written = true;
                info!("Wrote {}", target.path);
            }
        } else {
            warn!(
                "{} of {} dependencies did not finish",
                report.failures.len(),
                report.statuses.len()
            );
        }

        Ok(report)
    }

    fn spawn(&self, ctx: DependencyBuildContext) -> Tracked {
        let name = ctx.name.clone();
        let commit = ctx.commit.clone();
        let log = ctx.paths.log.clone();
        let status = ctx.status.clone();
        let machine = self.machine.clone();

        let worker = std::thread::Builder::new()
            .name(format!("spn-build-{}", name))
            .spawn(move || machine.run(&ctx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                status.fail(format!("could not start build worker: {}", e));
                None
            },
        };

        Tracked {
            name,
            commit,
            log,
            status,
            worker,
        }
    }
}

fn snapshots(tracked: &[Tracked]) -> Vec<StatusSnapshot> {
    tracked
        .iter()
        .map(|entry| snapshot_of(&entry.name, &entry.commit, &entry.status))
        .collect()
}
