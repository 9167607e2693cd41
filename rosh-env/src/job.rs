// This file is part of rosh, a POSIX-compatible shell core.
// Copyright (C) 2024 rosh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Job control
//!
//! A [`Job`] owns the processes of one pipeline. The [`JobList`] stores
//! jobs in numbered slots, reusing the lowest free number, with slot 0
//! reserved for the *active* job, the one whose processes are still
//! being started. Committing the active job with [`JobList::add_job`]
//! moves it to a numbered slot.
//!
//! The list maintains the current/previous job discipline:
//!
//! - While any job is stopped, the current job is a stopped job.
//! - While two or more jobs are stopped, the previous job is a stopped
//!   job different from the current job.
//! - The current job becomes the previous job when another job takes
//!   its place.
//!
//! A normalisation pass runs after every mutation so the invariants hold
//! at every observation point.

pub mod fmt;
pub mod id;

use crate::semantics::ExitStatus;
use crate::system::Errno;
use crate::system::Signal;
use crate::Env;
use itertools::Itertools;
use std::collections::HashMap;

#[doc(no_inline)]
pub use nix::unistd::Pid;

/// Slot index of the active job
pub const ACTIVE_JOB: usize = 0;

/// State of a single child process
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessState {
    Running,
    Stopped(Signal),
    Exited(ExitStatus),
    Signaled { signal: Signal, core_dump: bool },
}

impl ProcessState {
    /// Whether the process has neither exited nor been killed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(self, ProcessState::Running | ProcessState::Stopped(_))
    }

    /// Exit status implied by the state.
    ///
    /// A process stopped or terminated by a signal reports 128 plus the
    /// signal number. A running process has no exit status yet and
    /// reports success.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ProcessState::Running => ExitStatus::SUCCESS,
            ProcessState::Exited(exit_status) => *exit_status,
            ProcessState::Stopped(signal) => ExitStatus::from_signal(*signal),
            ProcessState::Signaled { signal, .. } => ExitStatus::from_signal(*signal),
        }
    }
}

/// Aggregate state of a job, folded from its member states
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

/// Member of a job's pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Process {
    pub pid: Pid,
    pub state: ProcessState,
    /// Textual rendering used in job reports
    pub name: String,
}

/// Set of processes executing one pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    /// Process group ID
    ///
    /// A raw value of 0 means the job is not job-controlled. A negative
    /// value marks a job the shell has stopped managing (see
    /// [`JobList::neglect_all_jobs`]): it is never polled and never
    /// given the terminal.
    pub pgid: Pid,
    pub status: JobStatus,
    /// Set when `status` changes, cleared by the status reporter
    pub status_changed: bool,
    /// Suppresses reporting while the shell waits on the job itself
    pub nonotify: bool,
    pub members: Vec<Process>,
}

impl Job {
    /// Creates a running job with no members yet.
    #[must_use]
    pub fn new(pgid: Pid) -> Self {
        Job {
            pgid,
            status: JobStatus::Running,
            status_changed: false,
            nonotify: false,
            members: Vec::new(),
        }
    }

    /// Adds a running member process.
    pub fn push_process<S: Into<String>>(&mut self, pid: Pid, name: S) {
        self.members.push(Process {
            pid,
            state: ProcessState::Running,
            name: name.into(),
        });
    }

    /// Whether the job runs in its own process group under job control.
    #[must_use]
    pub fn is_job_controlled(&self) -> bool {
        self.pgid.as_raw() > 0
    }

    /// Whether the shell has stopped managing the job.
    #[must_use]
    pub fn is_neglected(&self) -> bool {
        self.pgid.as_raw() < 0
    }

    /// Recomputes the job status from the member states.
    ///
    /// The fold is: running while any member runs; else stopped while
    /// any member is stopped; else done. `status_changed` is set when
    /// the fold moves the status.
    pub fn fold_status(&mut self) {
        let mut any_stopped = false;
        let mut any_running = false;
        for process in &self.members {
            match process.state {
                ProcessState::Running => {
                    any_running = true;
                    break;
                }
                ProcessState::Stopped(_) => any_stopped = true,
                _ => {}
            }
        }
        let status = if any_running {
            JobStatus::Running
        } else if any_stopped {
            JobStatus::Stopped
        } else {
            JobStatus::Done
        };
        if status != self.status {
            self.status = status;
            self.status_changed = true;
        }
    }

    /// Name of the job: the member names joined with `" | "`.
    #[must_use]
    pub fn name(&self) -> String {
        self.members.iter().map(|process| &process.name).join(" | ")
    }

    /// Exit status of the job.
    ///
    /// A done job reports the last member's status; a stopped job
    /// reports 128 plus the stopping signal of its last stopped member.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        match self.status {
            JobStatus::Stopped => self
                .members
                .iter()
                .rev()
                .find(|process| matches!(process.state, ProcessState::Stopped(_)))
                .map(|process| process.state.exit_status())
                .unwrap_or_default(),
            _ => self
                .members
                .last()
                .map(|process| process.state.exit_status())
                .unwrap_or_default(),
        }
    }

    /// Process state shown in status reports for the whole job.
    #[must_use]
    pub fn display_state(&self) -> ProcessState {
        match self.status {
            JobStatus::Running => ProcessState::Running,
            JobStatus::Stopped => self
                .members
                .iter()
                .rev()
                .map(|process| process.state)
                .find(|state| matches!(state, ProcessState::Stopped(_)))
                .unwrap_or(ProcessState::Running),
            JobStatus::Done => self
                .members
                .last()
                .map(|process| process.state)
                .unwrap_or(ProcessState::Exited(ExitStatus::SUCCESS)),
        }
    }
}

/// Collection of jobs
///
/// See the [module documentation](self).
#[derive(Clone, Debug)]
pub struct JobList {
    /// Slots; index 0 is the active slot, the rest are numbered jobs.
    jobs: Vec<Option<Job>>,
    /// Number of the current job, 0 when there is none
    current: usize,
    /// Number of the previous job, 0 when there is none
    previous: usize,
    /// Secondary index from process IDs to `(job number, member index)`
    pids: HashMap<Pid, (usize, usize)>,
}

impl Default for JobList {
    fn default() -> Self {
        JobList {
            jobs: vec![None],
            current: 0,
            previous: 0,
            pids: HashMap::new(),
        }
    }
}

impl JobList {
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    fn slot(&self, number: usize) -> Option<&Job> {
        self.jobs.get(number)?.as_ref()
    }

    fn slot_mut(&mut self, number: usize) -> Option<&mut Job> {
        self.jobs.get_mut(number)?.as_mut()
    }

    /// Returns the job in the given slot, the active slot included.
    #[must_use]
    pub fn get(&self, number: usize) -> Option<&Job> {
        self.slot(number)
    }

    /// Mutable access to the job in the given slot.
    pub fn get_mut(&mut self, number: usize) -> Option<&mut Job> {
        self.slot_mut(number)
    }

    /// Returns the job in a numbered slot (never the active job).
    #[must_use]
    pub fn get_numbered(&self, number: usize) -> Option<&Job> {
        if number == ACTIVE_JOB {
            None
        } else {
            self.slot(number)
        }
    }

    /// Iterates over the numbered jobs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(number, slot)| Some((number, slot.as_ref()?)))
    }

    /// Numbers of all numbered jobs, in order.
    #[must_use]
    pub fn numbers(&self) -> Vec<usize> {
        self.iter().map(|(number, _)| number).collect()
    }

    /// Number of numbered jobs
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of stopped numbered jobs
    #[must_use]
    pub fn stopped_job_count(&self) -> usize {
        self.iter()
            .filter(|(_, job)| job.status == JobStatus::Stopped)
            .count()
    }

    /// Number of the current job, if any
    #[must_use]
    pub fn current_job(&self) -> Option<usize> {
        (self.current != 0).then_some(self.current)
    }

    /// Number of the previous job, if any
    #[must_use]
    pub fn previous_job(&self) -> Option<usize> {
        (self.previous != 0).then_some(self.previous)
    }

    fn index_members(&mut self, number: usize) {
        if let Some(job) = self.slot(number) {
            let pids: Vec<Pid> = job.members.iter().map(|process| process.pid).collect();
            for (member_index, pid) in pids.into_iter().enumerate() {
                self.pids.insert(pid, (number, member_index));
            }
        }
    }

    fn unindex_members(&mut self, job: &Job) {
        for process in &job.members {
            self.pids.remove(&process.pid);
        }
    }

    /// Installs the job under construction into the active slot.
    ///
    /// Any previous occupant is discarded.
    pub fn set_active_job(&mut self, job: Job) {
        debug_assert!(self.jobs[ACTIVE_JOB].is_none(), "active job already set");
        if let Some(old) = self.jobs[ACTIVE_JOB].take() {
            self.unindex_members(&old);
        }
        self.jobs[ACTIVE_JOB] = Some(job);
        self.index_members(ACTIVE_JOB);
    }

    /// Removes and returns the active job.
    pub fn take_active_job(&mut self) -> Option<Job> {
        let job = self.jobs[ACTIVE_JOB].take()?;
        self.unindex_members(&job);
        Some(job)
    }

    /// Reference to the active job
    #[must_use]
    pub fn active_job(&self) -> Option<&Job> {
        self.slot(ACTIVE_JOB)
    }

    /// Commits the active job to the lowest free numbered slot.
    ///
    /// A stopped job always becomes the current job on commit; so does
    /// any job committed with `as_current`. Otherwise the current job is
    /// left alone unless there was none.
    ///
    /// Returns the assigned job number, or `None` without an active job.
    pub fn add_job(&mut self, as_current: bool) -> Option<usize> {
        let job = self.take_active_job()?;
        let stopped = job.status == JobStatus::Stopped;

        let number = match self.jobs[1..].iter().position(Option::is_none) {
            Some(index) => {
                let number = index + 1;
                self.jobs[number] = Some(job);
                number
            }
            None => {
                self.jobs.push(Some(job));
                self.jobs.len() - 1
            }
        };
        self.index_members(number);

        if stopped || as_current {
            self.set_current_job_number(number);
        } else {
            self.set_current_job_number(self.current);
        }
        Some(number)
    }

    /// Removes a numbered job from the list.
    pub fn remove_job(&mut self, number: usize) -> Option<Job> {
        if number == ACTIVE_JOB {
            return self.take_active_job();
        }
        let job = self.jobs.get_mut(number)?.take()?;
        self.unindex_members(&job);
        self.trim();
        self.set_current_job_number(self.current);
        Some(job)
    }

    /// Removes every job, the active one included.
    pub fn remove_all_jobs(&mut self) {
        self.jobs.clear();
        self.jobs.push(None);
        self.pids.clear();
        self.current = 0;
        self.previous = 0;
    }

    /// Stops managing all jobs: their process group IDs are negated
    /// (`0` becomes `-1`) so polling and terminal management skip them.
    pub fn neglect_all_jobs(&mut self) {
        for slot in &mut self.jobs {
            if let Some(job) = slot {
                let raw = job.pgid.as_raw();
                if raw >= 0 {
                    job.pgid = Pid::from_raw(if raw > 0 { -raw } else { -1 });
                }
            }
        }
        self.current = 0;
        self.previous = 0;
    }

    fn trim(&mut self) {
        while self.jobs.len() > 1 && self.jobs.last().is_some_and(Option::is_none) {
            self.jobs.pop();
        }
    }

    /// Finds the job owning the process.
    #[must_use]
    pub fn find_by_pid(&self, pid: Pid) -> Option<(usize, usize)> {
        self.pids.get(&pid).copied()
    }

    /// Records a state transition of a child process.
    ///
    /// The owning job's status is folded again before this function
    /// returns. Unknown process IDs are silently dropped; they may
    /// belong to a disowned job.
    pub fn update_status(&mut self, pid: Pid, state: ProcessState) -> Option<usize> {
        let (number, member_index) = self.find_by_pid(pid)?;
        let job = self.slot_mut(number)?;
        job.members[member_index].state = state;
        job.fold_status();
        Some(number)
    }

    fn eligible_current(&self, number: usize, stop_count: usize) -> bool {
        match self.get_numbered(number) {
            Some(job) => stop_count == 0 || job.status == JobStatus::Stopped,
            None => false,
        }
    }

    fn eligible_previous(&self, number: usize, stop_count: usize) -> bool {
        if number == self.current {
            return false;
        }
        match self.get_numbered(number) {
            Some(job) => stop_count <= 1 || job.status == JobStatus::Stopped,
            None => false,
        }
    }

    /// Makes the given job the current job and renormalises the
    /// current/previous selection.
    ///
    /// If the given number is unusable (no such job, or it is not
    /// stopped while stopped jobs exist), another job is chosen. This
    /// runs after every mutation of the list.
    pub fn set_current_job_number(&mut self, number: usize) {
        let stop_count = self.stopped_job_count();

        let mut number = number;
        if !self.eligible_current(number, stop_count) {
            number = self.current;
            if !self.eligible_current(number, stop_count) {
                number = self.previous;
                if !self.eligible_current(number, stop_count) {
                    number = self.find_next_job(0);
                }
            }
        }

        let previous_candidate = if number != self.current {
            let old = self.current;
            self.current = number;
            old
        } else {
            self.previous
        };

        let mut previous = previous_candidate;
        if !self.eligible_previous(previous, stop_count) {
            previous = self.previous;
            if !self.eligible_previous(previous, stop_count) {
                previous = self.find_next_job(self.current);
            }
        }
        self.previous = previous;
    }

    /// Picks an arbitrary job other than `excl`, preferring the previous
    /// job, then any stopped job scanned from the highest number down,
    /// then any job at all. Returns 0 if there is none.
    fn find_next_job(&self, excl: usize) -> usize {
        if self.previous != excl {
            if let Some(job) = self.get_numbered(self.previous) {
                if job.status == JobStatus::Stopped {
                    return self.previous;
                }
            }
        }
        for number in (1..self.jobs.len()).rev() {
            if number != excl {
                if let Some(job) = self.get_numbered(number) {
                    if job.status == JobStatus::Stopped {
                        return number;
                    }
                }
            }
        }
        for number in (1..self.jobs.len()).rev() {
            if number != excl && self.get_numbered(number).is_some() {
                return number;
            }
        }
        0
    }

    /// Makes newly stopped jobs current, as the `curstop` option
    /// prescribes, and renormalises.
    pub fn apply_curstop(&mut self, curstop: bool) {
        if curstop {
            for number in self.numbers() {
                let Some(job) = self.get_numbered(number) else {
                    continue;
                };
                if job.status == JobStatus::Stopped && job.status_changed {
                    self.set_current_job_number(number);
                }
            }
        }
        self.set_current_job_number(self.current);
    }
}

impl Env {
    /// Drains pending child status transitions without blocking.
    ///
    /// Each collected transition is written into the owning job and the
    /// job's status fold recomputed before this function returns.
    pub fn reap(&mut self) -> Result<(), Errno> {
        loop {
            match self.system.wait_any() {
                Ok(Some((pid, state))) => {
                    self.jobs.update_status(pid, state);
                }
                Ok(None) | Err(Errno::ECHILD) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno),
            }
        }
    }

    /// Suspends the caller until the given job finishes, or stops if
    /// `return_on_stop`.
    ///
    /// Reporting for the job is silenced for the duration of the wait.
    /// Returns the interrupting signal, or `None` on clean completion.
    /// Neglected jobs are not waited for.
    pub fn wait_for_job(
        &mut self,
        number: usize,
        return_on_stop: bool,
        interruptible: bool,
        return_on_trap: bool,
    ) -> Result<Option<Signal>, Errno> {
        let saved_nonotify = match self.jobs.get_mut(number) {
            Some(job) if !job.is_neglected() => std::mem::replace(&mut job.nonotify, true),
            _ => return Ok(None),
        };

        let mut result = Ok(None);
        loop {
            match self.jobs.get(number) {
                None => break,
                Some(job) if job.status == JobStatus::Done => break,
                Some(job) if return_on_stop && job.status == JobStatus::Stopped => break,
                Some(_) => {}
            }
            match self.wait_for_sigchld(interruptible, return_on_trap) {
                Ok(None) => {}
                Ok(Some(signal)) => {
                    result = Ok(Some(signal));
                    break;
                }
                Err(errno) => {
                    result = Err(errno);
                    break;
                }
            }
        }

        if let Some(job) = self.jobs.get_mut(number) {
            job.nonotify = saved_nonotify;
        }
        result
    }

    /// Waits for a single child that is not yet in the job list.
    ///
    /// The child is installed as the active job for the duration of the
    /// wait. When it stops (and `return_on_stop` is set), the job is
    /// committed as the current job and its number returned; when it
    /// finishes, the job is discarded. The exit status of the child is
    /// returned either way.
    pub fn wait_for_child(
        &mut self,
        pid: Pid,
        pgid: Pid,
        return_on_stop: bool,
    ) -> Result<(ExitStatus, Option<usize>), Errno> {
        let mut job = Job::new(pgid);
        job.push_process(pid, String::new());
        self.jobs.set_active_job(job);

        self.wait_for_job(ACTIVE_JOB, return_on_stop, false, false)?;
        if self.controls_jobs() {
            self.ensure_foreground()?;
        }

        let Some(job) = self.jobs.get(ACTIVE_JOB) else {
            return Ok((ExitStatus::FAILURE, None));
        };
        let exit_status = job.exit_status();
        if job.status == JobStatus::Done {
            self.notify_signaled_job(ACTIVE_JOB);
            self.jobs.take_active_job();
            Ok((exit_status, None))
        } else {
            let number = self.jobs.add_job(true);
            Ok((exit_status, number))
        }
    }

    /// Resolves a job ID string to the job's process group ID.
    ///
    /// The leading `%` is optional. Failures (unknown or ambiguous IDs,
    /// jobs without their own process group) are reported to standard
    /// error and answered with `None`.
    pub fn get_job_pgid(&mut self, job_id: &str) -> Option<Pid> {
        let tail = job_id.strip_prefix('%').unwrap_or(job_id);
        let number = match id::parse_tail(tail).find(&self.jobs) {
            Ok(number) => number,
            Err(id::FindError::Ambiguous) => {
                self.print_error(&format!("{job_id}: ambiguous job specification"));
                return None;
            }
            Err(id::FindError::NotFound) => {
                self.print_error(&format!("{job_id}: no such job"));
                return None;
            }
        };
        match self.jobs.get_numbered(number) {
            None => {
                self.print_error(&format!("{job_id}: no such job"));
                None
            }
            Some(job) if job.is_neglected() => {
                self.print_error(&format!("{job_id}: no such job"));
                None
            }
            Some(job) if !job.is_job_controlled() => {
                self.print_error(&format!("{job_id}: not a job-controlled job"));
                None
            }
            Some(job) => Some(job.pgid),
        }
    }

    /// Gives the terminal to the process group, guarding the transfer
    /// with `SIGTTOU` blocking.
    pub fn put_foreground(&mut self, pgid: Pid) -> Result<(), Errno> {
        let Some(tty) = self.tty else { return Ok(()) };
        self.system.tcsetpgrp_with_block(tty, pgid)
    }

    /// Reclaims the terminal for the shell itself.
    ///
    /// The transfer runs with the default `SIGTTOU` disposition, so a
    /// backgrounded shell is stopped here instead of corrupting a
    /// foreground shell's terminal.
    pub fn ensure_foreground(&mut self) -> Result<(), Errno> {
        let Some(tty) = self.tty else { return Ok(()) };
        let pgid = self.system.shell_pgid();
        self.system.tcsetpgrp_without_block(tty, pgid)
    }

    /// Reports a job of an interactive shell that was killed by a
    /// signal.
    ///
    /// `SIGINT` prints a bare newline; `SIGPIPE` is not reported.
    pub fn notify_signaled_job(&mut self, number: usize) {
        if !self.is_interactive() {
            return;
        }
        let Some(job) = self.jobs.get(number) else {
            return;
        };
        if job.status != JobStatus::Done {
            return;
        }
        let Some(process) = job.members.last() else {
            return;
        };
        let ProcessState::Signaled { signal, .. } = process.state else {
            return;
        };
        match signal {
            Signal::SIGINT => self.system.write_stderr(b"\n"),
            Signal::SIGPIPE => {}
            signal => {
                let message = format!("Process killed by {signal}\n");
                self.system.write_stderr(message.as_bytes());
            }
        }
    }

    /// Prints the status of one job.
    ///
    /// With `changed_only`, the job is skipped unless its status changed
    /// since the last report. Jobs whose reporting is silenced are
    /// always skipped. A done job is removed from the list after being
    /// printed. The report goes to standard output when `to_stdout`,
    /// to standard error otherwise.
    pub fn print_job_status(
        &mut self,
        number: usize,
        changed_only: bool,
        verbose: bool,
        to_stdout: bool,
    ) -> Result<(), Errno> {
        let marker = fmt::Marker::of(&self.jobs, number);
        let Some(job) = self.jobs.get_numbered(number) else {
            return Ok(());
        };
        if (changed_only && !job.status_changed) || job.nonotify {
            return Ok(());
        }

        let report = fmt::Report {
            number,
            marker,
            job,
        };
        let text = if verbose {
            format!("{report:#}\n")
        } else {
            format!("{report}\n")
        };

        if to_stdout {
            self.system.write_stdout(text.as_bytes())?;
        } else {
            self.system.write_stderr(text.as_bytes());
        }

        if let Some(job) = self.jobs.get_mut(number) {
            job.status_changed = false;
            if job.status == JobStatus::Done {
                self.jobs.remove_job(number);
            }
        }
        Ok(())
    }

    /// Walks the jobs whose status changed and reports them to standard
    /// error, applying the `curstop` discipline first.
    pub fn print_job_status_all(&mut self) {
        let curstop = self
            .options
            .is_on(crate::option::ShellOption::CurStop);
        self.jobs.apply_curstop(curstop);
        for number in self.jobs.numbers() {
            let _ = self.print_job_status(number, true, false, false);
        }
    }
}
