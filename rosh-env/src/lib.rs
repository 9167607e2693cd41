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

//! Execution environment of the rosh shell core.
//!
//! The [`Env`] aggregates everything that makes up the shell's
//! process-wide state: the [variables](variable), the [jobs](job), the
//! [options](option), the watched [signals](trap), and the handle to the
//! [operating system](system). All of it is mutated only on the main
//! control path; signal handlers do nothing but set flags.
//!
//! The environment is also the signal arbiter. [`Env::protect`] runs a
//! region with `SIGCHLD` blocked so job-table mutations are atomic with
//! respect to child-status delivery, and [`Env::wait_for_sigchld`] is
//! the rendezvous that all blocking waits are built from.

pub mod job;
pub mod option;
pub mod semantics;
pub mod system;
pub mod trap;
pub mod variable;

use crate::option::OptionSet;
use crate::option::ShellOption;
use crate::semantics::ExitStatus;
use crate::system::Errno;
use crate::system::Signal;
use crate::system::System;
use crate::trap::TrapSet;
use crate::variable::Scope;
use crate::variable::Value;
use crate::variable::VariableSet;
use std::os::fd::RawFd;

/// Whole state of the shell
#[derive(Debug)]
pub struct Env {
    /// Interface to the operating system
    pub system: Box<dyn System>,
    pub variables: VariableSet,
    pub jobs: job::JobList,
    pub options: OptionSet,
    pub traps: TrapSet,
    /// Terminal file descriptor used for foreground transfers, if the
    /// shell has one
    pub tty: Option<RawFd>,
    /// Exit status of the last command
    pub exit_status: ExitStatus,
    error_count: u64,
}

impl Env {
    /// Creates an environment on the given system.
    #[must_use]
    pub fn with_system(system: Box<dyn System>) -> Self {
        Env {
            system,
            variables: VariableSet::new(),
            jobs: job::JobList::new(),
            options: OptionSet::new(),
            traps: TrapSet::default(),
            tty: None,
            exit_status: ExitStatus::SUCCESS,
            error_count: 0,
        }
    }

    /// Creates an environment on a simulated system, for tests.
    #[must_use]
    pub fn new_virtual() -> Self {
        Self::with_system(Box::new(system::virtual_system::VirtualSystem::new()))
    }

    /// Whether the shell is interactive
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.options.is_on(ShellOption::Interactive)
    }

    /// Whether job control is in effect
    #[must_use]
    pub fn controls_jobs(&self) -> bool {
        self.options.is_on(ShellOption::Monitor)
    }

    /// Whether the shell is in POSIX mode
    #[must_use]
    pub fn posixly_correct(&self) -> bool {
        self.options.is_on(ShellOption::PosixlyCorrect)
    }

    /// Prints a diagnostic message to standard error and counts it.
    ///
    /// The per-shell error counter decides the exit status of built-ins
    /// whose individual operand failures do not abort the rest of the
    /// invocation.
    pub fn print_error(&mut self, message: &str) {
        self.error_count += 1;
        let line = format!("rosh: {message}\n");
        self.system.write_stderr(line.as_bytes());
    }

    /// Number of diagnostics printed so far
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Runs a region with `SIGCHLD` (and any additional signals)
    /// blocked.
    ///
    /// Mutations of the job table happen inside such regions so a job is
    /// either absent or fully indexed whenever child statuses can be
    /// collected.
    pub fn protect<T, F>(&mut self, extra: &[Signal], region: F) -> Result<T, Errno>
    where
        F: FnOnce(&mut Env) -> T,
    {
        let mut signals = vec![Signal::SIGCHLD];
        signals.extend_from_slice(extra);
        let saved = self.system.sigblock(&signals)?;
        let result = region(self);
        self.system.sigunblock(saved);
        Ok(result)
    }

    /// Waits until a `SIGCHLD` arrives and has been reaped.
    ///
    /// Returns `None` when a `SIGCHLD` was consumed. Returns the signal
    /// instead when interrupted by `SIGINT` (with `interruptible`) or by
    /// a trapped signal (with `return_on_trap`); a `SIGCHLD` that
    /// arrived together with the interrupting signal is still reaped
    /// first.
    pub fn wait_for_sigchld(
        &mut self,
        interruptible: bool,
        return_on_trap: bool,
    ) -> Result<Option<Signal>, Errno> {
        // Install the handlers before checking any state so a SIGCHLD
        // arriving between a status poll and the suspension is not lost.
        self.traps.enable_internal_handlers(&mut *self.system)?;

        loop {
            let signals = self.system.wait_for_signals()?;

            let mut caught_sigchld = false;
            let mut interrupt = None;
            for signal in signals {
                match signal {
                    Signal::SIGCHLD => caught_sigchld = true,
                    Signal::SIGINT if interruptible => interrupt = interrupt.or(Some(signal)),
                    signal if return_on_trap && self.traps.is_trapped(signal) => {
                        interrupt = interrupt.or(Some(signal))
                    }
                    _ => {}
                }
            }

            if caught_sigchld {
                self.reap()?;
            }
            if interrupt.is_some() {
                return Ok(interrupt);
            }
            if caught_sigchld {
                return Ok(None);
            }
        }
    }

    /// Raises the shell nesting level reported in `$SHLVL`.
    pub fn enter_shell_level(&mut self) {
        self.adjust_shlvl(1);
    }

    /// Lowers the shell nesting level reported in `$SHLVL`.
    pub fn leave_shell_level(&mut self) {
        self.adjust_shlvl(-1);
    }

    fn adjust_shlvl(&mut self, delta: i64) {
        let level = self
            .variables
            .scalar(variable::SHLVL)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let level = (level + delta).max(0);
        if self
            .variables
            .assign(
                Scope::Global,
                variable::SHLVL,
                Value::scalar(level.to_string()),
            )
            .is_ok()
        {
            let _ = self.variables.export(variable::SHLVL, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, JobStatus, Pid, ProcessState};
    use crate::system::virtual_system::VirtualSystem;
    use std::rc::Rc;

    fn env_with_state() -> (Env, Rc<std::cell::RefCell<system::virtual_system::SystemState>>) {
        let system = VirtualSystem::new();
        let state = Rc::clone(&system.state);
        (Env::with_system(Box::new(system)), state)
    }

    #[test]
    fn error_counting() {
        let (mut env, state) = env_with_state();
        assert_eq!(env.error_count(), 0);
        env.print_error("something failed");
        assert_eq!(env.error_count(), 1);
        assert_eq!(state.borrow().stderr, b"rosh: something failed\n");
    }

    #[test]
    fn shlvl_adjustment() {
        let (mut env, _state) = env_with_state();
        env.enter_shell_level();
        assert_eq!(env.variables.scalar(variable::SHLVL), Some("1"));
        env.enter_shell_level();
        assert_eq!(env.variables.scalar(variable::SHLVL), Some("2"));
        env.leave_shell_level();
        assert_eq!(env.variables.scalar(variable::SHLVL), Some("1"));
        assert!(env.variables.get(variable::SHLVL).unwrap().exported);
    }

    #[test]
    fn shlvl_never_goes_negative() {
        let (mut env, _state) = env_with_state();
        env.leave_shell_level();
        assert_eq!(env.variables.scalar(variable::SHLVL), Some("0"));
    }

    #[test]
    fn protect_blocks_and_restores_sigchld() {
        let (mut env, state) = env_with_state();
        let observed = env
            .protect(&[Signal::SIGINT], |env| env.system.shell_pid())
            .unwrap();
        assert_eq!(observed, state.borrow().shell_pid);
        // The mask was restored after the region.
        let state = state.borrow();
        assert!(!state.blocked_signals.contains(&Signal::SIGCHLD));
        assert!(!state.blocked_signals.contains(&Signal::SIGINT));
    }

    #[test]
    fn wait_for_sigchld_reaps_and_returns() {
        let (mut env, state) = env_with_state();
        let mut job = Job::new(Pid::from_raw(10));
        job.push_process(Pid::from_raw(10), "sleep 1");
        env.jobs.set_active_job(job);
        let number = env.jobs.add_job(false).unwrap();

        state.borrow_mut().pretend_has_children = true;
        state
            .borrow_mut()
            .raise_child_event(Pid::from_raw(10), ProcessState::Exited(ExitStatus(0)));

        let result = env.wait_for_sigchld(false, false).unwrap();
        assert_eq!(result, None);
        assert_eq!(env.jobs.get(number).unwrap().status, JobStatus::Done);
    }

    #[test]
    fn wait_for_sigchld_reports_interrupt() {
        let (mut env, state) = env_with_state();
        state.borrow_mut().pending_signals.push_back(Signal::SIGINT);
        let result = env.wait_for_sigchld(true, false).unwrap();
        assert_eq!(result, Some(Signal::SIGINT));
    }

    #[test]
    fn wait_for_sigchld_ignores_unwatched_interrupt() {
        let (mut env, state) = env_with_state();
        {
            let mut state = state.borrow_mut();
            state.pending_signals.push_back(Signal::SIGINT);
            state.pending_signals.push_back(Signal::SIGCHLD);
            state.pretend_has_children = true;
        }
        // Not interruptible: the SIGINT is ignored, the SIGCHLD wins.
        let result = env.wait_for_sigchld(false, false).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn wait_for_job_returns_on_completion() {
        let (mut env, state) = env_with_state();
        let mut job = Job::new(Pid::from_raw(10));
        job.push_process(Pid::from_raw(10), "sleep 1");
        env.jobs.set_active_job(job);
        let number = env.jobs.add_job(false).unwrap();

        state.borrow_mut().pretend_has_children = true;
        state
            .borrow_mut()
            .raise_child_event(Pid::from_raw(10), ProcessState::Exited(ExitStatus(3)));

        let result = env.wait_for_job(number, false, false, false).unwrap();
        assert_eq!(result, None);
        let job = env.jobs.get(number).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.exit_status(), ExitStatus(3));
        assert!(!job.nonotify);
    }

    #[test]
    fn wait_for_job_returns_on_stop_when_asked() {
        let (mut env, state) = env_with_state();
        let mut job = Job::new(Pid::from_raw(10));
        job.push_process(Pid::from_raw(10), "cat");
        env.jobs.set_active_job(job);
        let number = env.jobs.add_job(false).unwrap();

        state.borrow_mut().pretend_has_children = true;
        state
            .borrow_mut()
            .raise_child_event(Pid::from_raw(10), ProcessState::Stopped(Signal::SIGTSTP));

        let result = env.wait_for_job(number, true, false, false).unwrap();
        assert_eq!(result, None);
        assert_eq!(env.jobs.get(number).unwrap().status, JobStatus::Stopped);
    }

    #[test]
    fn wait_for_child_commits_stopped_job_as_current() {
        let (mut env, state) = env_with_state();
        state.borrow_mut().pretend_has_children = true;
        state
            .borrow_mut()
            .raise_child_event(Pid::from_raw(77), ProcessState::Stopped(Signal::SIGTSTP));

        let (exit_status, number) = env
            .wait_for_child(Pid::from_raw(77), Pid::from_raw(77), true)
            .unwrap();
        assert_eq!(exit_status, ExitStatus::from_signal(Signal::SIGTSTP));
        let number = number.unwrap();
        assert_eq!(env.jobs.current_job(), Some(number));
        assert_eq!(env.jobs.get(number).unwrap().status, JobStatus::Stopped);
    }

    #[test]
    fn wait_for_child_discards_done_job() {
        let (mut env, state) = env_with_state();
        state.borrow_mut().pretend_has_children = true;
        state
            .borrow_mut()
            .raise_child_event(Pid::from_raw(78), ProcessState::Exited(ExitStatus(9)));

        let (exit_status, number) = env
            .wait_for_child(Pid::from_raw(78), Pid::from_raw(0), false)
            .unwrap();
        assert_eq!(exit_status, ExitStatus(9));
        assert_eq!(number, None);
        assert_eq!(env.jobs.job_count(), 0);
        assert_eq!(env.jobs.active_job(), None);
    }

    #[test]
    fn foreground_transfer_records_blocking() {
        let (mut env, state) = env_with_state();
        env.tty = Some(0);
        env.put_foreground(Pid::from_raw(42)).unwrap();
        env.ensure_foreground().unwrap();
        let state = state.borrow();
        let history = &state.foreground_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].pgid, Pid::from_raw(42));
        assert!(history[0].blocked);
        assert_eq!(history[1].pgid, state.shell_pgid);
        assert!(!history[1].blocked);
    }

    #[test]
    fn neglected_job_is_not_waited_for() {
        let (mut env, _state) = env_with_state();
        let mut job = Job::new(Pid::from_raw(-10));
        job.push_process(Pid::from_raw(10), "stale");
        env.jobs.set_active_job(job);
        let number = env.jobs.add_job(false).unwrap();

        // No events are scripted; waiting would deadlock if attempted.
        let result = env.wait_for_job(number, false, false, false).unwrap();
        assert_eq!(result, None);
    }
}
