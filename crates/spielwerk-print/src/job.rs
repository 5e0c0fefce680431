// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A print job and its state machine.
//
//   held --enqueue--> pending --play--> processing --finish--> completed
//                        |                  |
//                        +--cancel/abort----+--> canceled / aborted
//
// Pausing is a sub-flag of `processing`.  Terminal states are final.

use chrono::{DateTime, Utc};

use spielwerk_core::error::{Result, SpielwerkError};
use spielwerk_core::types::{JobId, JobState};

use crate::spool::DocumentHandle;

pub const DEFAULT_PRIORITY: u8 = 50;

#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    creator: String,
    name: String,
    priority: u8,
    document: Option<DocumentHandle>,
    state: JobState,
    paused: bool,
    created_at: DateTime<Utc>,
    processing_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A new job in `held`.
    pub fn new(id: JobId, creator: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            creator: creator.into(),
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            document: None,
            state: JobState::Held,
            paused: false,
            created_at: Utc::now(),
            processing_at: None,
            completed_at: None,
        }
    }

    /// Set `job-priority`; must lie in 1..=100.
    pub fn with_priority(mut self, priority: i32) -> Result<Self> {
        self.priority = u8::try_from(priority)
            .ok()
            .filter(|p| (1..=100).contains(p))
            .ok_or_else(|| {
                SpielwerkError::BadRequest(format!("job-priority {priority} outside 1..100"))
            })?;
        Ok(self)
    }

    /// A fresh `held` copy of this job under a new id, used by restart.
    pub fn resubmit(&self, id: JobId) -> Self {
        Self {
            id,
            creator: self.creator.clone(),
            name: self.name.clone(),
            priority: self.priority,
            document: self.document.clone(),
            ..Self::new(id, "", "")
        }
    }

    fn invalid(&self, action: &'static str) -> SpielwerkError {
        SpielwerkError::InvalidJobState {
            id: self.id,
            state: self.state(),
            action,
        }
    }

    // -- transitions --

    pub fn enqueue(&mut self) -> Result<()> {
        if self.state != JobState::Held {
            return Err(self.invalid("enqueue"));
        }
        self.state = JobState::Pending;
        Ok(())
    }

    /// Attach the document.  Allowed while held or pending.
    pub fn spool(&mut self, document: DocumentHandle) -> Result<()> {
        if !matches!(self.state, JobState::Held | JobState::Pending) {
            return Err(self.invalid("accept a document"));
        }
        self.document = Some(document);
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        if self.state != JobState::Pending {
            return Err(self.invalid("play"));
        }
        if self.document.is_none() {
            return Err(SpielwerkError::MissingDocument(self.id));
        }
        self.state = JobState::Processing;
        self.processing_at = Some(Utc::now());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != JobState::Processing {
            return Err(self.invalid("pause"));
        }
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != JobState::Processing {
            return Err(self.invalid("resume"));
        }
        self.paused = false;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.state != JobState::Processing {
            return Err(self.invalid("finish"));
        }
        self.terminate(JobState::Completed);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        if !matches!(self.state, JobState::Pending | JobState::Processing) {
            return Err(self.invalid("cancel"));
        }
        self.terminate(JobState::Canceled);
        Ok(())
    }

    pub fn abort(&mut self) -> Result<()> {
        if !matches!(self.state, JobState::Pending | JobState::Processing) {
            return Err(self.invalid("abort"));
        }
        self.terminate(JobState::Aborted);
        Ok(())
    }

    fn terminate(&mut self, state: JobState) {
        self.state = state;
        self.paused = false;
        self.completed_at = Some(Utc::now());
    }

    // -- accessors --

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    /// Reported state; a paused `processing` job reads as
    /// `processing-stopped`.
    pub fn state(&self) -> JobState {
        if self.state == JobState::Processing && self.paused {
            JobState::ProcessingStopped
        } else {
            self.state
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// `job-state-reasons`, derived from the state.
    pub fn state_reasons(&self) -> &'static str {
        match self.state() {
            JobState::Held => "job-incoming",
            JobState::Pending => "none",
            JobState::Processing => "job-printing",
            JobState::ProcessingStopped => "printer-stopped",
            JobState::Completed => "job-completed-successfully",
            JobState::Canceled => "job-canceled-by-user",
            JobState::Aborted => "aborted-by-system",
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processing_at(&self) -> Option<DateTime<Utc>> {
        self.processing_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::Spool;

    fn document() -> (tempfile::TempDir, DocumentHandle) {
        let dir = tempfile::tempdir().expect("tempdir");
        let spool = Spool::open(dir.path()).expect("spool");
        let handle = spool.store(b"track").expect("store");
        (dir, handle)
    }

    fn job() -> Job {
        Job::new(JobId::new(1), "alice", "side a")
    }

    #[test]
    fn accepted_lifecycle() {
        let (_dir, doc) = document();
        let mut job = job();
        assert_eq!(job.state(), JobState::Held);
        job.enqueue().expect("enqueue");
        job.spool(doc).expect("spool");
        assert_eq!(job.state(), JobState::Pending);
        job.play().expect("play");
        assert_eq!(job.state(), JobState::Processing);
        assert!(job.processing_at().is_some());
        job.finish().expect("finish");
        assert_eq!(job.state(), JobState::Completed);
        assert!(job.completed_at().is_some());
        assert_eq!(job.state_reasons(), "job-completed-successfully");
    }

    #[test]
    fn play_on_held_is_invalid() {
        let (_dir, doc) = document();
        let mut job = job();
        job.spool(doc).expect("spool while held");
        assert!(matches!(
            job.play(),
            Err(SpielwerkError::InvalidJobState {
                state: JobState::Held,
                ..
            })
        ));
    }

    #[test]
    fn play_needs_a_document() {
        let mut job = job();
        job.enqueue().expect("enqueue");
        assert!(matches!(job.play(), Err(SpielwerkError::MissingDocument(_))));
        assert_eq!(job.state(), JobState::Pending);
    }

    #[test]
    fn terminal_states_are_final() {
        let (_dir, doc) = document();
        let mut job = job();
        job.enqueue().expect("enqueue");
        job.cancel().expect("cancel pending");
        assert_eq!(job.state(), JobState::Canceled);
        assert!(job.enqueue().is_err());
        assert!(job.spool(doc).is_err());
        assert!(job.play().is_err());
        assert!(job.cancel().is_err());
        assert!(job.abort().is_err());
        assert!(job.finish().is_err());
        assert_eq!(job.state(), JobState::Canceled);
    }

    #[test]
    fn enqueue_only_from_held() {
        let mut job = job();
        job.enqueue().expect("enqueue");
        assert!(job.enqueue().is_err());
    }

    #[test]
    fn pause_is_a_processing_subflag() {
        let (_dir, doc) = document();
        let mut job = job();
        assert!(job.pause().is_err());
        job.enqueue().expect("enqueue");
        job.spool(doc).expect("spool");
        job.play().expect("play");
        job.pause().expect("pause");
        assert_eq!(job.state(), JobState::ProcessingStopped);
        assert_eq!(job.state_reasons(), "printer-stopped");
        job.resume().expect("resume");
        assert_eq!(job.state(), JobState::Processing);
        job.pause().expect("pause again");
        job.abort().expect("abort while paused");
        assert_eq!(job.state(), JobState::Aborted);
        assert!(!job.is_paused());
    }

    #[test]
    fn cancel_from_held_is_invalid() {
        assert!(job().cancel().is_err());
    }

    #[test]
    fn priority_bounds() {
        assert_eq!(job().priority(), DEFAULT_PRIORITY);
        assert_eq!(job().with_priority(1).expect("1").priority(), 1);
        assert_eq!(job().with_priority(100).expect("100").priority(), 100);
        assert!(job().with_priority(0).is_err());
        assert!(job().with_priority(101).is_err());
        assert!(job().with_priority(-5).is_err());
    }

    #[test]
    fn resubmit_copies_identity_but_not_state() {
        let (_dir, doc) = document();
        let mut job = job().with_priority(80).expect("priority");
        job.enqueue().expect("enqueue");
        job.spool(doc.clone()).expect("spool");
        job.cancel().expect("cancel");
        let copy = job.resubmit(JobId::new(9));
        assert_eq!(copy.id(), JobId::new(9));
        assert_eq!(copy.state(), JobState::Held);
        assert_eq!(copy.name(), "side a");
        assert_eq!(copy.creator(), "alice");
        assert_eq!(copy.priority(), 80);
        assert_eq!(copy.document(), Some(&doc));
        assert!(copy.completed_at().is_none());
    }
}
