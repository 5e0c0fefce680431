// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Playback supervisor for a single job.
//
// A `Player` owns one background thread.  In external mode the thread
// drives a player process in slave mode (`pause` / `quit` commands on
// stdin) and polls it for exit; in dry-run mode it sleeps for a fixed
// duration instead.  Both honour pause, resume and stop the same way.
//
// Lock order: a Player's lock may be held while its completion callback
// runs, so callbacks must never block on a lock whose holder calls into a
// Player.

use std::fs::File;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use spielwerk_core::config::PrinterConfig;
use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_core::types::JobId;

use crate::spool::DocumentHandle;

/// How often the supervisor checks on an external player.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a stopped player process gets to exit before it is killed.
const QUIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Program plus leading arguments; the document path is appended.
    External { command: Vec<String> },
    DryRun { duration: Duration },
}

impl PlaybackMode {
    pub fn from_config(config: &PrinterConfig) -> Self {
        if config.dry_run {
            Self::DryRun {
                duration: Duration::from_millis(config.dry_run_millis),
            }
        } else {
            Self::External {
                command: config.player_command.clone(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Running,
    Paused,
    Done,
}

/// Why playback reached `done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Stopped,
    Failed(String),
}

type Callback = Box<dyn FnOnce(PlaybackOutcome) + Send>;

struct Inner {
    state: PlayerState,
    stop_requested: bool,
    callback: Option<Callback>,
    outcome: Option<PlaybackOutcome>,
    thread: Option<JoinHandle<()>>,
}

type Shared = Arc<(Mutex<Inner>, Condvar)>;

fn lock(shared: &Shared) -> MutexGuard<'_, Inner> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish `done`: run the callback under the lock, then wake waiters.
fn complete(shared: &Shared, inner: &mut Inner, outcome: PlaybackOutcome) {
    if inner.state == PlayerState::Done {
        return;
    }
    if let Some(callback) = inner.callback.take() {
        callback(outcome.clone());
    }
    inner.outcome = Some(outcome);
    inner.state = PlayerState::Done;
    shared.1.notify_all();
}

/// Marks the player failed if its thread unwinds without finishing.
struct CompletionGuard(Shared);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut inner = lock(&self.0);
        if inner.state != PlayerState::Done {
            complete(
                &self.0,
                &mut inner,
                PlaybackOutcome::Failed("player thread exited unexpectedly".into()),
            );
        }
    }
}

/// A launched player process.  Dropping it while the process still runs
/// kills and reaps it, so a supervisor that never got going cannot leave an
/// orphan behind.
struct PlayerProcess {
    job_id: JobId,
    child: Child,
}

impl Drop for PlayerProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            warn!(job_id = %self.job_id, pid = self.child.id(), "killing unsupervised player process");
            if let Err(e) = self.child.kill() {
                warn!(job_id = %self.job_id, error = %e, "kill failed");
            }
            let _ = self.child.wait();
        }
    }
}

pub struct Player {
    job_id: JobId,
    mode: PlaybackMode,
    shared: Shared,
}

impl Player {
    pub fn new(job_id: JobId, mode: PlaybackMode) -> Self {
        Self {
            job_id,
            mode,
            shared: Arc::new((
                Mutex::new(Inner {
                    state: PlayerState::Idle,
                    stop_requested: false,
                    callback: None,
                    outcome: None,
                    thread: None,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Register the completion callback.  It runs exactly once, on whichever
    /// thread brings the player to `done`, while the player lock is held.
    pub fn on_done(&self, callback: impl FnOnce(PlaybackOutcome) + Send + 'static) {
        let mut inner = lock(&self.shared);
        if inner.state == PlayerState::Idle {
            inner.callback = Some(Box::new(callback));
        } else {
            warn!(job_id = %self.job_id, "completion callback registered after start; ignored");
        }
    }

    /// Begin playing `document`.  An unreadable document or a player that
    /// cannot be launched ends playback as failed and returns the error.
    pub fn start(&self, document: &DocumentHandle) -> Result<()> {
        let mut inner = lock(&self.shared);
        if inner.state != PlayerState::Idle {
            return Err(SpielwerkError::Playback(format!(
                "player for job {} already started",
                self.job_id
            )));
        }

        let body = match self.prepare(document) {
            Ok(body) => body,
            Err(e) => {
                complete(
                    &self.shared,
                    &mut inner,
                    PlaybackOutcome::Failed(e.to_string()),
                );
                return Err(e);
            }
        };

        inner.state = PlayerState::Running;
        let spawned = std::thread::Builder::new()
            .name(format!("player-{}", self.job_id))
            .spawn(body);
        // on failure the body is dropped, and with it any launched process
        match spawned {
            Ok(handle) => {
                inner.thread = Some(handle);
                info!(job_id = %self.job_id, path = %document.path().display(), "playback started");
                Ok(())
            }
            Err(e) => {
                let err = SpielwerkError::Playback(format!("spawn supervisor: {e}"));
                complete(
                    &self.shared,
                    &mut inner,
                    PlaybackOutcome::Failed(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Check the document and launch the player process, returning the
    /// supervisor body to run on the player thread.
    fn prepare(&self, document: &DocumentHandle) -> Result<Box<dyn FnOnce() + Send>> {
        File::open(document.path())
            .map_err(|e| SpielwerkError::Playback(format!("{}: {e}", document.path().display())))?;

        let shared = Arc::clone(&self.shared);
        let job_id = self.job_id;
        match &self.mode {
            PlaybackMode::DryRun { duration } => {
                let duration = *duration;
                Ok(Box::new(move || supervise_dry_run(shared, job_id, duration)))
            }
            PlaybackMode::External { command } => {
                let (program, args) = command
                    .split_first()
                    .ok_or_else(|| SpielwerkError::Playback("empty player command".into()))?;
                let child = Command::new(program)
                    .args(args)
                    .arg(document.path())
                    .stdin(Stdio::piped())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| SpielwerkError::Playback(format!("launch {program}: {e}")))?;
                let process = PlayerProcess { job_id, child };
                Ok(Box::new(move || supervise_external(shared, process)))
            }
        }
    }

    pub fn pause(&self) {
        let mut inner = lock(&self.shared);
        if inner.state == PlayerState::Running {
            inner.state = PlayerState::Paused;
            self.shared.1.notify_all();
            debug!(job_id = %self.job_id, "playback paused");
        } else {
            warn!(job_id = %self.job_id, state = ?inner.state, "pause ignored: not playing");
        }
    }

    pub fn resume(&self) {
        let mut inner = lock(&self.shared);
        if inner.state == PlayerState::Paused {
            inner.state = PlayerState::Running;
            self.shared.1.notify_all();
            debug!(job_id = %self.job_id, "playback resumed");
        } else {
            warn!(job_id = %self.job_id, state = ?inner.state, "resume ignored: not paused");
        }
    }

    /// Stop playback and block until the player is `done`.  Stopping a
    /// player that never started completes it immediately.
    pub fn stop(&self) {
        let handle = {
            let mut inner = lock(&self.shared);
            match inner.state {
                PlayerState::Done => return,
                PlayerState::Idle => {
                    complete(&self.shared, &mut inner, PlaybackOutcome::Stopped);
                    return;
                }
                PlayerState::Running | PlayerState::Paused => {
                    inner.stop_requested = true;
                    self.shared.1.notify_all();
                    inner.thread.take()
                }
            }
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(job_id = %self.job_id, "player thread panicked");
            }
        }
        self.wait_done();
    }

    pub fn wait_done(&self) {
        let mut inner = lock(&self.shared);
        while inner.state != PlayerState::Done {
            inner = self
                .shared
                .1
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`Player::wait_done`] with a deadline; returns whether the
    /// player is done.
    pub fn wait_done_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = lock(&self.shared);
        while inner.state != PlayerState::Done {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            inner = self
                .shared
                .1
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    pub fn state(&self) -> PlayerState {
        lock(&self.shared).state
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlayerState::Paused
    }

    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        lock(&self.shared).outcome.clone()
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

// ---------------------------------------------------------------------------
// Supervisor threads
// ---------------------------------------------------------------------------

fn supervise_dry_run(shared: Shared, job_id: JobId, duration: Duration) {
    let _guard = CompletionGuard(Arc::clone(&shared));
    let mut remaining = duration;
    let mut inner = lock(&shared);

    let outcome = loop {
        while inner.state == PlayerState::Paused && !inner.stop_requested {
            inner = shared.1.wait(inner).unwrap_or_else(PoisonError::into_inner);
        }
        if inner.stop_requested {
            break PlaybackOutcome::Stopped;
        }
        if remaining.is_zero() {
            break PlaybackOutcome::Finished;
        }
        let started = Instant::now();
        inner = shared
            .1
            .wait_timeout(inner, remaining)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
        remaining = remaining.saturating_sub(started.elapsed());
    };

    debug!(job_id = %job_id, ?outcome, "dry-run playback done");
    complete(&shared, &mut inner, outcome);
}

/// What the supervisor owes the child process after inspecting state.
enum SupervisorAction {
    Nothing,
    TogglePause,
    Quit,
}

fn send(stdin: &mut Option<ChildStdin>, line: &[u8], job_id: JobId) {
    if let Some(pipe) = stdin.as_mut() {
        if let Err(e) = pipe.write_all(line).and_then(|()| pipe.flush()) {
            warn!(job_id = %job_id, error = %e, "player command not delivered");
        }
    }
}

fn supervise_external(shared: Shared, mut process: PlayerProcess) {
    let _guard = CompletionGuard(Arc::clone(&shared));
    let job_id = process.job_id;
    let child = &mut process.child;
    let mut stdin = child.stdin.take();
    let mut player_paused = false;

    let outcome = loop {
        let action = {
            let inner = lock(&shared);
            if inner.stop_requested {
                SupervisorAction::Quit
            } else if (inner.state == PlayerState::Paused) != player_paused {
                SupervisorAction::TogglePause
            } else {
                SupervisorAction::Nothing
            }
        };

        match action {
            SupervisorAction::Quit => {
                send(&mut stdin, b"quit\n", job_id);
                reap(child, job_id);
                break PlaybackOutcome::Stopped;
            }
            SupervisorAction::TogglePause => {
                send(&mut stdin, b"pause\n", job_id);
                player_paused = !player_paused;
            }
            SupervisorAction::Nothing => {}
        }

        match child.try_wait() {
            Ok(Some(status)) if status.success() => break PlaybackOutcome::Finished,
            Ok(Some(status)) => break PlaybackOutcome::Failed(format!("player exited with {status}")),
            Ok(None) => {}
            Err(e) => break PlaybackOutcome::Failed(format!("wait on player: {e}")),
        }

        let inner = lock(&shared);
        if !inner.stop_requested {
            // woken early by pause, resume or stop
            let _ = shared
                .1
                .wait_timeout(inner, POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
        }
    };

    info!(job_id = %job_id, ?outcome, "playback process done");
    let mut inner = lock(&shared);
    complete(&shared, &mut inner, outcome);
}

/// Wait for a quitting child, killing it after the grace period.
fn reap(child: &mut Child, job_id: JobId) {
    let deadline = Instant::now() + QUIT_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
            _ => break,
        }
    }
    warn!(job_id = %job_id, "player ignored quit; killing it");
    if let Err(e) = child.kill() {
        warn!(job_id = %job_id, error = %e, "kill failed");
    }
    let _ = child.wait();
}
