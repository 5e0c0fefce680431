// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The audio printer: job table, pending queue and the worker thread that
// plays jobs one at a time.
//
// Every public method takes the printer lock for the duration of its
// bookkeeping.  Players are started, paused and resumed under that lock so
// the printer's paused flag and the player's state always move together;
// `Player::stop` joins the player thread and is only called with the lock
// released.  The worker thread is the only one that pops the queue and moves
// ids from the active list to the finished list.  A player's completion
// callback only sends the job id back to the worker over a channel and never
// takes the printer lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use spielwerk_core::config::PrinterConfig;
use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_core::types::{JobId, JobState, PrinterState};

use crate::job::Job;
use crate::player::{PlaybackMode, PlaybackOutcome, Player, PlayerState};
use crate::queue::PausingQueue;
use crate::spool::DocumentHandle;

struct PrinterInner {
    /// Every job this printer has accepted, keyed by id.
    jobs: BTreeMap<JobId, Job>,
    /// Jobs handed to a player and not yet finalized.
    active: Vec<JobId>,
    /// Jobs that reached a terminal state, in the order they got there.
    finished: Vec<JobId>,
    /// Popped while still waiting for Send-Document.
    awaiting_document: Vec<JobId>,
    next_job_id: u32,
    running: bool,
    /// Set by Pause-Printer; the queue and every player follow it.
    paused: bool,
    players: HashMap<JobId, Arc<Player>>,
}

struct Shared {
    name: String,
    config: PrinterConfig,
    mode: PlaybackMode,
    created_at: DateTime<Utc>,
    inner: Mutex<PrinterInner>,
    /// Signalled whenever a job changes state or leaves the active list.
    changed: Condvar,
    queue: PausingQueue<JobId>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PrinterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_idle(&self, inner: &PrinterInner) -> bool {
        inner.active.is_empty() && self.queue.is_empty()
    }

    /// Record the end of playback for `id`.
    fn finalize(&self, id: JobId, outcome: PlaybackOutcome) {
        let mut inner = self.lock();
        inner.players.remove(&id);
        inner.active.retain(|a| *a != id);
        if let Some(job) = inner.jobs.get_mut(&id) {
            let result = if job.is_terminal() {
                // canceled or restarted while playing
                Ok(())
            } else {
                match &outcome {
                    PlaybackOutcome::Finished => job.finish(),
                    PlaybackOutcome::Stopped => {
                        warn!(printer = %self.name, job_id = %id, "playback stopped without cancel; aborting job");
                        job.abort()
                    }
                    PlaybackOutcome::Failed(reason) => {
                        error!(printer = %self.name, job_id = %id, reason = %reason, "playback failed");
                        job.abort()
                    }
                }
            };
            if let Err(e) = result {
                warn!(printer = %self.name, job_id = %id, error = %e, "job did not accept outcome");
            }
            info!(printer = %self.name, job_id = %id, state = %job.state(), "job finished");
        }
        if !inner.finished.contains(&id) {
            inner.finished.push(id);
        }
        self.changed.notify_all();
    }
}

/// A named audio printer.
pub struct Printer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Printer {
    /// Build a stopped printer from a validated configuration.
    pub fn new(config: PrinterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                mode: PlaybackMode::from_config(&config),
                config,
                created_at: Utc::now(),
                inner: Mutex::new(PrinterInner {
                    jobs: BTreeMap::new(),
                    active: Vec::new(),
                    finished: Vec::new(),
                    awaiting_document: Vec::new(),
                    next_job_id: 1,
                    running: false,
                    paused: false,
                    players: HashMap::new(),
                }),
                changed: Condvar::new(),
                queue: PausingQueue::new(),
            }),
            worker: Mutex::new(None),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PrinterInner> {
        self.shared.lock()
    }

    fn worker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the worker thread.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn start(&self) -> Result<()> {
        let mut slot = self.worker_slot();
        if slot.is_some() {
            return Err(SpielwerkError::InvalidPrinterState {
                name: self.shared.name.clone(),
                reason: "already running",
            });
        }
        self.lock().running = true;
        self.shared.queue.clear_interrupt();

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(format!("printer-{}", self.shared.name))
            .spawn(move || run_worker(shared));
        match handle {
            Ok(handle) => {
                *slot = Some(handle);
                info!("printer started");
                Ok(())
            }
            Err(e) => {
                self.lock().running = false;
                Err(e.into())
            }
        }
    }

    /// Stop the worker.  The active job, if any, is stopped and aborted;
    /// queued jobs stay pending for the next `start`.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn stop(&self) -> Result<()> {
        let Some(handle) = self.worker_slot().take() else {
            return Ok(());
        };
        let players: Vec<Arc<Player>> = {
            let mut inner = self.lock();
            inner.running = false;
            inner.players.values().cloned().collect()
        };
        self.shared.queue.interrupt();
        for player in players {
            player.stop();
        }
        handle
            .join()
            .map_err(|_| SpielwerkError::PrintServer(format!("printer {} worker panicked", self.shared.name)))?;
        self.shared.changed.notify_all();
        info!("printer stopped");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    fn allocate(&self, inner: &mut PrinterInner, creator: &str, name: &str, priority: Option<i32>) -> Result<Job> {
        let id = JobId::new(inner.next_job_id);
        let job = Job::new(id, creator, name);
        let job = match priority {
            Some(p) => job.with_priority(p)?,
            None => job,
        };
        inner.next_job_id += 1;
        Ok(job)
    }

    /// Create a job awaiting its document and queue it.
    pub fn create_job(&self, creator: &str, name: &str) -> Result<JobId> {
        self.create_job_with_priority(creator, name, None)
    }

    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn create_job_with_priority(&self, creator: &str, name: &str, priority: Option<i32>) -> Result<JobId> {
        let mut inner = self.lock();
        let mut job = self.allocate(&mut inner, creator, name, priority)?;
        job.enqueue()?;
        let id = job.id();
        inner.jobs.insert(id, job);
        self.shared.queue.push(id);
        info!(job_id = %id, "job created");
        Ok(id)
    }

    /// Attach a document to a created job.
    pub fn send_document(&self, id: JobId, document: DocumentHandle) -> Result<()> {
        let mut inner = self.lock();
        let job = inner.jobs.get_mut(&id).ok_or(SpielwerkError::InvalidJob(id))?;
        job.spool(document)?;
        if let Some(pos) = inner.awaiting_document.iter().position(|a| *a == id) {
            inner.awaiting_document.remove(pos);
            self.shared.queue.push(id);
        }
        debug!(printer = %self.shared.name, job_id = %id, "document attached");
        Ok(())
    }

    /// Create, spool and queue a job in one step.
    #[instrument(skip(self, document), fields(printer = %self.shared.name))]
    pub fn print_job(&self, creator: &str, name: &str, priority: Option<i32>, document: DocumentHandle) -> Result<JobId> {
        let mut inner = self.lock();
        let mut job = self.allocate(&mut inner, creator, name, priority)?;
        job.spool(document)?;
        job.enqueue()?;
        let id = job.id();
        inner.jobs.insert(id, job);
        self.shared.queue.push(id);
        info!(job_id = %id, "job queued");
        Ok(id)
    }

    /// Cancel a pending or playing job.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn cancel_job(&self, id: JobId) -> Result<()> {
        let player = {
            let mut inner = self.lock();
            let job = inner.jobs.get_mut(&id).ok_or(SpielwerkError::InvalidJob(id))?;
            job.cancel()?;
            if inner.active.contains(&id) {
                inner.players.get(&id).cloned()
            } else {
                self.shared.queue.remove(&id);
                inner.awaiting_document.retain(|a| *a != id);
                inner.finished.push(id);
                self.shared.changed.notify_all();
                None
            }
        };
        if let Some(player) = player {
            player.stop();
        }
        info!(job_id = %id, "job canceled");
        Ok(())
    }

    /// Queue a copy of a finished or playing job under a new id.  A playing
    /// job is canceled first.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn restart_job(&self, id: JobId) -> Result<JobId> {
        let (new_id, player) = {
            let mut inner = self.lock();
            let job = inner.jobs.get(&id).ok_or(SpielwerkError::InvalidJob(id))?;
            if job.document().is_none() {
                return Err(SpielwerkError::MissingDocument(id));
            }
            let active = inner.active.contains(&id);
            if !active && !job.is_terminal() {
                return Err(SpielwerkError::InvalidJobState {
                    id,
                    state: job.state(),
                    action: "restart",
                });
            }
            let new_id = JobId::new(inner.next_job_id);
            let mut copy = job.resubmit(new_id);
            copy.enqueue()?;
            inner.next_job_id += 1;

            let player = if active {
                if let Some(job) = inner.jobs.get_mut(&id) {
                    job.cancel()?;
                }
                inner.players.get(&id).cloned()
            } else {
                None
            };
            inner.jobs.insert(new_id, copy);
            self.shared.queue.push(new_id);
            (new_id, player)
        };
        if let Some(player) = player {
            player.stop();
        }
        info!(job_id = %id, new_job_id = %new_id, "job restarted");
        Ok(new_id)
    }

    /// Move a queued job to the head of the queue.
    pub fn promote_job(&self, id: JobId) -> Result<()> {
        let inner = self.lock();
        let job = inner.jobs.get(&id).ok_or(SpielwerkError::InvalidJob(id))?;
        if job.state() != JobState::Pending || !self.shared.queue.promote(&id) {
            return Err(SpielwerkError::InvalidJobState {
                id,
                state: job.state(),
                action: "promote",
            });
        }
        info!(printer = %self.shared.name, job_id = %id, "job promoted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    /// Hold the queue and pause whatever is playing.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn pause_printer(&self) {
        let mut inner = self.lock();
        if inner.paused {
            return;
        }
        inner.paused = true;
        self.shared.queue.pause();
        let active = inner.active.clone();
        for id in &active {
            if let Some(job) = inner.jobs.get_mut(id) {
                if let Err(e) = job.pause() {
                    debug!(job_id = %id, error = %e, "active job not pausable");
                }
            }
            if let Some(player) = inner.players.get(id) {
                if player.state() == PlayerState::Running {
                    player.pause();
                }
            }
        }
        self.shared.changed.notify_all();
        info!("printer paused");
    }

    /// Release the queue and resume whatever was paused.
    #[instrument(skip(self), fields(printer = %self.shared.name))]
    pub fn resume_printer(&self) {
        let mut inner = self.lock();
        if !inner.paused {
            return;
        }
        inner.paused = false;
        let active = inner.active.clone();
        for id in &active {
            if let Some(job) = inner.jobs.get_mut(id) {
                if let Err(e) = job.resume() {
                    debug!(job_id = %id, error = %e, "active job not resumable");
                }
            }
            if let Some(player) = inner.players.get(id) {
                if player.state() == PlayerState::Paused {
                    player.resume();
                }
            }
        }
        self.shared.queue.resume();
        self.shared.changed.notify_all();
        info!("printer resumed");
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.shared.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.shared.created_at
    }

    /// Seconds since the printer was created, at least 1.
    pub fn uptime_secs(&self) -> i32 {
        let secs = (Utc::now() - self.shared.created_at).num_seconds();
        i32::try_from(secs).unwrap_or(i32::MAX).max(1)
    }

    /// `stopped` when not running or paused, `processing` while anything is
    /// playing or queued, otherwise `idle`.
    pub fn state(&self) -> PrinterState {
        let inner = self.lock();
        if !inner.running || inner.paused {
            PrinterState::Stopped
        } else if !self.shared.is_idle(&inner) {
            PrinterState::Processing
        } else {
            PrinterState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.lock().jobs.get(&id).cloned()
    }

    /// Every job, oldest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.lock().jobs.values().cloned().collect()
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.lock().active.clone()
    }

    pub fn finished_jobs(&self) -> Vec<JobId> {
        self.lock().finished.clone()
    }

    /// Queued job ids, head first.
    pub fn pending_jobs(&self) -> Vec<JobId> {
        self.shared.queue.snapshot()
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.lock().active.first().copied()
    }

    /// Jobs not yet finished, playing included.
    pub fn queued_job_count(&self) -> usize {
        self.lock().jobs.values().filter(|j| !j.is_terminal()).count()
    }

    pub fn next_job_id(&self) -> JobId {
        JobId::new(self.lock().next_job_id)
    }

    pub fn player_state(&self, id: JobId) -> Option<PlayerState> {
        let player = self.lock().players.get(&id).cloned()?;
        Some(player.state())
    }

    /// Block until nothing is playing or queued.  Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |shared, inner| shared.is_idle(inner))
    }

    /// Block until job `id` reports `state`.  Returns false on timeout.
    pub fn wait_for_job_state(&self, id: JobId, state: JobState, timeout: Duration) -> bool {
        self.wait_until(timeout, |_, inner| {
            inner.jobs.get(&id).is_some_and(|j| j.state() == state)
        })
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&Shared, &PrinterInner) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if done(&self.shared, &inner) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // the queue is not covered by `changed`, so poll in short slices
            let slice = (deadline - now).min(Duration::from_millis(50));
            inner = self
                .shared
                .changed
                .wait_timeout(inner, slice)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(printer = %self.shared.name, error = %e, "printer did not stop cleanly");
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

fn run_worker(shared: Arc<Shared>) {
    let (done_tx, done_rx) = mpsc::channel::<(JobId, PlaybackOutcome)>();
    debug!(printer = %shared.name, "worker running");

    loop {
        let id = match shared.queue.pop() {
            Ok(id) => id,
            Err(_) => break,
        };

        {
            let mut inner = shared.lock();
            if !inner.running {
                // put it back for the next start
                shared.queue.insert(0, id);
                break;
            }
            let paused = inner.paused;
            let Some(job) = inner.jobs.get_mut(&id) else {
                warn!(printer = %shared.name, job_id = %id, "queued id has no job");
                continue;
            };
            if job.state() != JobState::Pending {
                debug!(printer = %shared.name, job_id = %id, state = %job.state(), "skipping job");
                continue;
            }
            let Some(document) = job.document().cloned() else {
                debug!(printer = %shared.name, job_id = %id, "job waits for its document");
                inner.awaiting_document.push(id);
                continue;
            };
            if let Err(e) = job.play() {
                warn!(printer = %shared.name, job_id = %id, error = %e, "job could not start");
                continue;
            }
            if paused {
                if let Err(e) = job.pause() {
                    warn!(printer = %shared.name, job_id = %id, error = %e, "job could not pause");
                }
            }

            let player = Arc::new(Player::new(id, shared.mode.clone()));
            let tx = done_tx.clone();
            player.on_done(move |outcome| {
                // the worker may already be gone during shutdown
                let _ = tx.send((id, outcome));
            });
            inner.active.push(id);
            inner.players.insert(id, Arc::clone(&player));

            // a failed start reports through the callback like any other end
            if let Err(e) = player.start(&document) {
                warn!(printer = %shared.name, job_id = %id, error = %e, "playback did not start");
            } else if paused {
                player.pause();
            }
            shared.changed.notify_all();
        }

        match done_rx.recv() {
            Ok((done_id, outcome)) => shared.finalize(done_id, outcome),
            Err(_) => break,
        }
    }

    debug!(printer = %shared.name, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::Spool;

    const WAIT: Duration = Duration::from_secs(10);

    struct Fixture {
        _dir: tempfile::TempDir,
        spool: Spool,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let spool = Spool::open(dir.path()).expect("spool");
            Self { _dir: dir, spool }
        }

        fn doc(&self, body: &[u8]) -> DocumentHandle {
            self.spool.store(body).expect("store")
        }
    }

    fn printer(millis: u64) -> Printer {
        Printer::new(PrinterConfig::dry_run("jukebox", millis)).expect("printer")
    }

    #[test]
    fn not_started_is_stopped() {
        let p = printer(10);
        assert_eq!(p.state(), PrinterState::Stopped);
        assert_eq!(p.next_job_id(), JobId::new(1));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = PrinterConfig::dry_run("jukebox", 10);
        config.ipp_versions.clear();
        assert!(Printer::new(config).is_err());
    }

    #[test]
    fn job_ids_start_at_one() {
        let f = Fixture::new();
        let p = printer(10);
        let a = p.print_job("alice", "x", None, f.doc(b"x")).expect("job");
        let b = p.create_job("bob", "y").expect("job");
        assert_eq!(a, JobId::new(1));
        assert_eq!(b, JobId::new(2));
        assert_eq!(p.job(a).expect("job").state(), JobState::Pending);
    }

    #[test]
    fn two_jobs_play_in_order_and_printer_returns_to_idle() {
        let f = Fixture::new();
        let p = printer(80);
        let x = p.print_job("alice", "x", None, f.doc(b"x")).expect("x");
        let y = p.print_job("alice", "y", None, f.doc(b"y")).expect("y");
        p.start().expect("start");
        assert_eq!(p.state(), PrinterState::Processing);

        let deadline = Instant::now() + WAIT;
        while p.finished_jobs().len() < 2 && Instant::now() < deadline {
            assert!(p.active_jobs().len() <= 1);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(p.wait_idle(WAIT));
        assert_eq!(p.finished_jobs(), vec![x, y]);
        assert_eq!(p.job(x).expect("x").state(), JobState::Completed);
        assert_eq!(p.job(y).expect("y").state(), JobState::Completed);
        assert_eq!(p.state(), PrinterState::Idle);
        p.stop().expect("stop");
    }

    #[test]
    fn pause_holds_active_job_and_queue() {
        let f = Fixture::new();
        let p = printer(300);
        let first = p.print_job("a", "first", None, f.doc(b"1")).expect("first");
        let second = p.print_job("a", "second", None, f.doc(b"2")).expect("second");
        p.start().expect("start");
        assert!(p.wait_for_job_state(first, JobState::Processing, WAIT));

        p.pause_printer();
        assert_eq!(p.state(), PrinterState::Stopped);
        assert_eq!(p.player_state(first), Some(PlayerState::Paused));
        assert_eq!(p.job(first).expect("first").state(), JobState::ProcessingStopped);

        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(p.active_jobs(), vec![first]);
        assert_eq!(p.job(second).expect("second").state(), JobState::Pending);

        p.resume_printer();
        assert!(p.wait_idle(WAIT));
        assert_eq!(p.job(first).expect("first").state(), JobState::Completed);
        assert_eq!(p.job(second).expect("second").state(), JobState::Completed);
        p.stop().expect("stop");
    }

    /// Every live player agrees with the printer's paused flag.
    fn players_follow_pause_flag(p: &Printer) -> bool {
        let inner = p.shared.lock();
        let expected = if inner.paused {
            PlayerState::Paused
        } else {
            PlayerState::Running
        };
        inner
            .active
            .iter()
            .filter_map(|id| inner.players.get(id))
            .map(|player| player.state())
            .all(|state| state == expected || state == PlayerState::Done)
    }

    #[test]
    fn interleaved_pause_and_resume_keep_player_in_step() {
        let f = Fixture::new();
        let p = Arc::new(printer(400));
        let id = p.print_job("a", "contested", None, f.doc(b"contested")).expect("job");
        p.start().expect("start");
        assert!(p.wait_for_job_state(id, JobState::Processing, WAIT));

        let togglers: Vec<_> = (0..2)
            .map(|n| {
                let p = Arc::clone(&p);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        if (i + n) % 2 == 0 {
                            p.pause_printer();
                        } else {
                            p.resume_printer();
                        }
                        assert!(players_follow_pause_flag(&p));
                    }
                })
            })
            .collect();
        for t in togglers {
            t.join().expect("toggler");
        }

        p.pause_printer();
        assert!(players_follow_pause_flag(&p));
        p.resume_printer();
        assert!(players_follow_pause_flag(&p));
        assert!(p.wait_for_job_state(id, JobState::Completed, WAIT));
        assert!(p.wait_idle(WAIT));
        p.stop().expect("stop");
    }

    #[test]
    fn pause_right_after_start_pauses_first_job() {
        let f = Fixture::new();
        let p = printer(300);
        let id = p.print_job("a", "early", None, f.doc(b"early")).expect("job");
        p.start().expect("start");
        p.pause_printer();
        assert!(players_follow_pause_flag(&p));
        if p.wait_for_job_state(id, JobState::ProcessingStopped, Duration::from_millis(500)) {
            assert_eq!(p.player_state(id), Some(PlayerState::Paused));
        } else {
            // paused before the worker popped it
            assert_eq!(p.job(id).expect("job").state(), JobState::Pending);
        }
        p.resume_printer();
        assert!(p.wait_for_job_state(id, JobState::Completed, WAIT));
        p.stop().expect("stop");
    }

    #[test]
    fn cancel_queued_job_skips_it() {
        let f = Fixture::new();
        let p = printer(20);
        let a = p.print_job("a", "a", None, f.doc(b"a")).expect("a");
        let b = p.print_job("a", "b", None, f.doc(b"b")).expect("b");
        p.cancel_job(a).expect("cancel");
        assert_eq!(p.pending_jobs(), vec![b]);
        p.start().expect("start");
        assert!(p.wait_idle(WAIT));
        assert_eq!(p.job(a).expect("a").state(), JobState::Canceled);
        assert_eq!(p.job(b).expect("b").state(), JobState::Completed);
        assert_eq!(p.finished_jobs(), vec![a, b]);
        p.stop().expect("stop");
    }

    #[test]
    fn cancel_active_job_stops_player() {
        let f = Fixture::new();
        let p = printer(60_000);
        let id = p.print_job("a", "long", None, f.doc(b"long")).expect("job");
        p.start().expect("start");
        assert!(p.wait_for_job_state(id, JobState::Processing, WAIT));
        p.cancel_job(id).expect("cancel");
        assert!(p.wait_idle(WAIT));
        assert_eq!(p.job(id).expect("job").state(), JobState::Canceled);
        assert_eq!(p.finished_jobs(), vec![id]);
        assert!(p.cancel_job(id).is_err());
        p.stop().expect("stop");
    }

    #[test]
    fn unknown_job_is_invalid() {
        let p = printer(10);
        assert!(matches!(
            p.cancel_job(JobId::new(42)),
            Err(SpielwerkError::InvalidJob(_))
        ));
        assert!(matches!(
            p.send_document(JobId::new(42), Fixture::new().doc(b"x")),
            Err(SpielwerkError::InvalidJob(_))
        ));
    }

    #[test]
    fn promote_reorders_queue() {
        let f = Fixture::new();
        let p = printer(20);
        let a = p.print_job("u", "a", None, f.doc(b"a")).expect("a");
        let b = p.print_job("u", "b", None, f.doc(b"b")).expect("b");
        let c = p.print_job("u", "c", None, f.doc(b"c")).expect("c");
        p.promote_job(c).expect("promote");
        assert_eq!(p.pending_jobs(), vec![c, a, b]);
        p.start().expect("start");
        assert!(p.wait_idle(WAIT));
        assert_eq!(p.finished_jobs(), vec![c, a, b]);
        assert!(p.promote_job(a).is_err());
        p.stop().expect("stop");
    }

    #[test]
    fn created_job_waits_for_document() {
        let f = Fixture::new();
        let p = printer(20);
        p.start().expect("start");
        let id = p.create_job("u", "later").expect("create");
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(p.job(id).expect("job").state(), JobState::Pending);
        assert_eq!(p.state(), PrinterState::Idle);

        p.send_document(id, f.doc(b"late")).expect("send");
        assert!(p.wait_for_job_state(id, JobState::Completed, WAIT));
        p.stop().expect("stop");
    }

    #[test]
    fn restart_finished_job_queues_copy() {
        let f = Fixture::new();
        let p = printer(20);
        let id = p.print_job("u", "again", None, f.doc(b"again")).expect("job");
        assert!(p.restart_job(id).is_err());
        p.start().expect("start");
        assert!(p.wait_for_job_state(id, JobState::Completed, WAIT));

        let copy = p.restart_job(id).expect("restart");
        assert_ne!(copy, id);
        assert!(p.wait_for_job_state(copy, JobState::Completed, WAIT));
        assert_eq!(p.job(copy).expect("copy").name(), "again");
        assert_eq!(p.job(id).expect("original").state(), JobState::Completed);
        p.stop().expect("stop");
    }

    #[test]
    fn restart_active_job_cancels_original() {
        let f = Fixture::new();
        let p = printer(60_000);
        let id = p.print_job("u", "long", None, f.doc(b"long")).expect("job");
        p.start().expect("start");
        assert!(p.wait_for_job_state(id, JobState::Processing, WAIT));
        let copy = p.restart_job(id).expect("restart");
        assert!(p.wait_for_job_state(copy, JobState::Processing, WAIT));
        assert_eq!(p.job(id).expect("original").state(), JobState::Canceled);
        p.stop().expect("stop");
        assert_eq!(p.job(copy).expect("copy").state(), JobState::Aborted);
    }

    #[test]
    fn unreadable_document_aborts_job() {
        let f = Fixture::new();
        let p = printer(20);
        let doc = f.doc(b"vanishing");
        std::fs::remove_file(doc.path()).expect("remove");
        let id = p.print_job("u", "gone", None, doc).expect("job");
        p.start().expect("start");
        assert!(p.wait_for_job_state(id, JobState::Aborted, WAIT));
        assert!(p.wait_idle(WAIT));
        p.stop().expect("stop");
    }

    #[test]
    fn stop_and_restart_keeps_queue() {
        let f = Fixture::new();
        let p = printer(20);
        p.start().expect("start");
        p.pause_printer();
        let id = p.print_job("u", "x", None, f.doc(b"x")).expect("job");
        p.stop().expect("stop");
        assert!(!p.is_running());
        p.resume_printer();
        p.start().expect("start again");
        assert!(p.wait_for_job_state(id, JobState::Completed, WAIT));
        assert!(p.start().is_err());
        p.stop().expect("stop");
    }

    #[test]
    fn invalid_priority_rejected() {
        let f = Fixture::new();
        let p = printer(10);
        assert!(p.print_job("u", "x", Some(0), f.doc(b"x")).is_err());
        assert_eq!(p.next_job_id(), JobId::new(1));
        let id = p.create_job_with_priority("u", "y", Some(90)).expect("job");
        assert_eq!(p.job(id).expect("job").priority(), 90);
    }
}
