//! The process state machine.
//!
//! One `Process` drives one target through one run:
//! pre-check -> necessity decision -> change (issue, validate, commit,
//! abort on failure) -> settle delay -> post-check -> classification.
//!
//! No retries anywhere: a single remote failure is terminal for its phase
//! and drives straight to abort/rollback or error reporting. The session
//! is opened, used and closed within `run`'s call tree.

use std::time::Duration;

use tracing::debug;

use nfctl_core::{
    Error, Mode, NetworkConfig, ProcessStatus, Reporter, Result, Severity, TargetStatus,
};
use nfctl_session::{CommandSession, Session};

use crate::adapter::NfAdapter;

/// Opens one session per call. The engine never opens transports itself,
/// so a run can be exercised end to end without a live target.
pub trait SessionFactory {
    /// Open a fresh session.
    fn open(&self) -> Result<Box<dyn CommandSession>>;
}

/// Production factory: PTY sessions for a configured target.
pub struct ConfigSessionFactory<'a> {
    config: &'a NetworkConfig,
    alias: String,
}

impl<'a> ConfigSessionFactory<'a> {
    /// Factory for one target alias.
    pub fn new(config: &'a NetworkConfig, alias: &str) -> Self {
        Self {
            config,
            alias: alias.to_string(),
        }
    }
}

impl SessionFactory for ConfigSessionFactory<'_> {
    fn open(&self) -> Result<Box<dyn CommandSession>> {
        let session = Session::connect(self.config, &self.alias)?;
        Ok(Box::new(session))
    }
}

/// Pure decision table: is a change needed for (mode, observed status)?
///
/// Read-only modes never need one. A mutating mode against an unknown
/// status is undecidable. Otherwise the request is either already in
/// effect (idempotent no-op, a success) or a real change.
pub fn necessity_check(mode: Mode, status: TargetStatus) -> ProcessStatus {
    match (mode, status) {
        (Mode::Show | Mode::Info | Mode::List, _) => ProcessStatus::SHOW_OR_UNKNOWN,
        (_, TargetStatus::Unknown) => ProcessStatus::EXCEPTION_NG,
        (Mode::Up, TargetStatus::Up) | (Mode::Down, TargetStatus::Down) => {
            ProcessStatus::ALREADY_CHANGED
        }
        (Mode::Up, TargetStatus::Down) | (Mode::Down, TargetStatus::Up) => {
            ProcessStatus::NEED_TO_CHANGE
        }
    }
}

/// Pure decision table: did the change take, for (mode, observed status)?
pub fn changed_check(mode: Mode, status: TargetStatus) -> ProcessStatus {
    match (mode, status) {
        (_, TargetStatus::Unknown) => ProcessStatus::EXCEPTION_NG,
        (Mode::Up, TargetStatus::Up) | (Mode::Down, TargetStatus::Down) => ProcessStatus::CHANGE_OK,
        (Mode::Up, TargetStatus::Down) | (Mode::Down, TargetStatus::Up) => ProcessStatus::CHANGE_NG,
        _ => ProcessStatus::EXCEPTION_NG,
    }
}

fn contains_marker(reply: &str, marker: &str) -> bool {
    reply.to_lowercase().contains(&marker.to_lowercase())
}

/// Aggregate root for one target run.
pub struct Process<'a, A: NfAdapter> {
    adapter: A,
    mode: Mode,
    alias: String,
    target: String,
    reporter: &'a dyn Reporter,
    settle_delay: Duration,
    session: Option<Box<dyn CommandSession>>,
    before: Option<TargetStatus>,
    after: Option<TargetStatus>,
    necessity: ProcessStatus,
    changed: ProcessStatus,
    status: ProcessStatus,
}

impl<'a, A: NfAdapter> Process<'a, A> {
    /// Create a process for one target run.
    pub fn new(
        adapter: A,
        mode: Mode,
        alias: &str,
        target: &str,
        settle_delay: Duration,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            adapter,
            mode,
            alias: alias.to_string(),
            target: target.to_string(),
            reporter,
            settle_delay,
            session: None,
            before: None,
            after: None,
            necessity: ProcessStatus::empty(),
            changed: ProcessStatus::empty(),
            status: ProcessStatus::empty(),
        }
    }

    fn report(&self, severity: Severity, message: &str) {
        self.reporter
            .report(severity, self.mode, &self.alias, &self.target, message);
    }

    /// Status observed before the change attempt.
    pub fn before(&self) -> Option<TargetStatus> {
        self.before
    }

    /// Status observed after the change attempt.
    pub fn after(&self) -> Option<TargetStatus> {
        self.after
    }

    /// The necessity decision from the pre-check.
    pub fn necessity(&self) -> ProcessStatus {
        self.necessity
    }

    /// The changed classification from the post-check.
    pub fn changed(&self) -> ProcessStatus {
        self.changed
    }

    /// Outcome flags accumulated so far.
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// [`necessity_check`] against this process's mode.
    pub fn necessity_check(&self, status: TargetStatus) -> ProcessStatus {
        necessity_check(self.mode, status)
    }

    /// [`changed_check`] against this process's mode.
    pub fn changed_check(&self, status: TargetStatus) -> ProcessStatus {
        changed_check(self.mode, status)
    }

    /// Read the status and decide necessity.
    ///
    /// Returns true iff the status was obtainable and the necessity
    /// decision is not an exception. The observation is stored as the
    /// "before" snapshot.
    pub fn pre_check(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match self.adapter.read_status(session.as_mut()) {
            Ok(Some(status)) => {
                self.before = Some(status);
                let word = self.adapter.status_word(status);
                self.report(Severity::Detail, &format!("pre-check status: {word}"));
                self.necessity = necessity_check(self.mode, status);
                self.necessity != ProcessStatus::EXCEPTION_NG
            }
            Ok(None) => {
                self.before = Some(TargetStatus::Unknown);
                self.necessity = ProcessStatus::EXCEPTION_NG;
                self.report(Severity::Error, "pre-check: status unobtainable");
                false
            }
            Err(e) => {
                self.report(Severity::Error, &format!("pre-check failed: {e}"));
                false
            }
        }
    }

    /// Read the status again and classify the change.
    ///
    /// Returns true iff the status was observable and matches the
    /// requested state. The observation is stored as the "after" snapshot.
    pub fn post_check(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match self.adapter.read_status(session.as_mut()) {
            Ok(Some(status)) => {
                self.after = Some(status);
                let word = self.adapter.status_word(status);
                self.report(Severity::Detail, &format!("post-check status: {word}"));
                self.changed = changed_check(self.mode, status);
                status != TargetStatus::Unknown && self.changed == ProcessStatus::CHANGE_OK
            }
            Ok(None) => {
                self.after = Some(TargetStatus::Unknown);
                self.changed = ProcessStatus::EXCEPTION_NG;
                self.report(Severity::Error, "post-check: status unobtainable");
                false
            }
            Err(e) => {
                self.report(Severity::Error, &format!("post-check failed: {e}"));
                false
            }
        }
    }

    /// Enter config mode and issue the up-command through the adapter.
    pub fn to_up(&mut self) -> Result<bool> {
        let Some(session) = self.session.as_mut() else {
            return Err(Error::SessionClosed);
        };
        session.enter_privileged()?;
        self.adapter.to_up(session.as_mut())
    }

    /// Enter config mode and issue the down-command through the adapter.
    pub fn to_down(&mut self) -> Result<bool> {
        let Some(session) = self.session.as_mut() else {
            return Err(Error::SessionClosed);
        };
        session.enter_privileged()?;
        self.adapter.to_down(session.as_mut())
    }

    /// Validate, then commit, matching each reply against the vendor's
    /// literal success marker. Marker matching is the trust boundary with
    /// the adapter; no structured parsing here.
    pub fn commit(&mut self) -> Result<bool> {
        let comment = self.adapter.commit_comment();
        let (validate_command, validate_marker) = self.adapter.validate_step();
        let (commit_command, commit_marker) = self.adapter.commit_step(&comment);

        let Some(session) = self.session.as_mut() else {
            return Err(Error::SessionClosed);
        };
        let timeout = session.command_timeout();

        let reply = session.send(&validate_command, timeout)?;
        if !contains_marker(&reply, &validate_marker) {
            self.report(Severity::Error, "validate: success marker absent");
            return Ok(false);
        }

        let Some(session) = self.session.as_mut() else {
            return Err(Error::SessionClosed);
        };
        let reply = session.send(&commit_command, timeout)?;
        if !contains_marker(&reply, &commit_marker) {
            self.report(Severity::Error, "commit: success marker absent");
            return Ok(false);
        }

        session.exit_privileged(false)?;
        Ok(true)
    }

    /// Discard the in-flight uncommitted edit with an abort-style exit.
    pub fn do_abort(&mut self) -> bool {
        self.report(Severity::Error, "aborting uncommitted change");
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.exit_privileged(true) {
            Ok(()) => true,
            Err(e) => {
                self.report(Severity::Error, &format!("abort failed: {e}"));
                false
            }
        }
    }

    /// The transactional core: issue the change, validate, commit; on any
    /// failure abort the uncommitted edit and classify.
    pub fn change_status(&mut self) -> ProcessStatus {
        let issued = match self.mode {
            Mode::Up => self.to_up(),
            Mode::Down => self.to_down(),
            _ => Ok(false),
        };

        match issued {
            Ok(true) => {
                self.report(Severity::Info, "change command accepted");
                self.status |= ProcessStatus::CHANGE_OK;
            }
            Ok(false) => {
                self.report(Severity::Error, "change command rejected");
                self.do_abort();
                return ProcessStatus::CHANGE_NG;
            }
            Err(e) => {
                self.report(Severity::Error, &format!("change issuance failed: {e}"));
                self.do_abort();
                return ProcessStatus::CHANGE_NG;
            }
        }

        match self.commit() {
            Ok(true) => {
                self.report(Severity::Success, "commit complete");
                ProcessStatus::COMMIT_OK
            }
            Ok(false) => {
                self.do_abort();
                ProcessStatus::COMMIT_NG
            }
            Err(e) => {
                self.report(Severity::Error, &format!("commit failed: {e}"));
                self.do_abort();
                ProcessStatus::COMMIT_NG
            }
        }
    }

    /// Run the whole machine against one freshly opened session.
    ///
    /// Open failure returns `SSH_NG` with nothing else attempted and no
    /// close. Every successfully opened session is closed on every other
    /// path before this returns.
    pub fn run(&mut self, factory: &dyn SessionFactory) -> ProcessStatus {
        match factory.open() {
            Ok(session) => {
                self.session = Some(session);
                self.report(Severity::Info, "session opened");
            }
            Err(e) => {
                self.report(Severity::Error, &format!("session open failed: {e}"));
                self.status |= ProcessStatus::SSH_NG;
                return self.status;
            }
        }

        self.run_phases();

        if let Some(session) = self.session.as_mut() {
            session.close();
        }
        self.report(Severity::Result, &format!("outcome: {}", self.status.label()));
        self.status
    }

    fn run_phases(&mut self) {
        if !self.pre_check() {
            self.status |= ProcessStatus::PRE_CHECK_NG;
            if self.necessity == ProcessStatus::EXCEPTION_NG {
                self.status |= ProcessStatus::EXCEPTION_NG;
            }
            return;
        }

        if self.necessity.intersects(ProcessStatus::NEED_NOT_CHANGE) {
            self.status |= self.necessity | ProcessStatus::NON_HAZARDOUS;
            self.report(Severity::Result, "no change needed");
            return;
        }

        self.status |= ProcessStatus::NEED_TO_CHANGE | ProcessStatus::HAZARDOUS;
        let change = self.change_status();
        self.status |= change;

        debug!(
            "Settling for {}ms before post-check",
            self.settle_delay.as_millis()
        );
        std::thread::sleep(self.settle_delay);

        if self.post_check() {
            self.status |= ProcessStatus::POST_CHECK_OK;
            self.report(Severity::Success, "post-check ok");
        } else {
            self.status |= ProcessStatus::POST_CHECK_NG;
        }
        self.status |= self.changed;
    }
}
