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

//! System implementation that simulates the operating system
//!
//! [`VirtualSystem`] performs no real system calls. Tests script child
//! status transitions and signal arrivals into the shared
//! [`SystemState`] and inspect the recorded effects afterwards. The
//! state handle is reference-counted so a test can keep one clone while
//! the environment owns the system.

use super::Errno;
use super::PgidRequest;
use super::Signal;
use super::SignalMask;
use super::SpawnRequest;
use super::System;
use crate::job::ProcessState;
use nix::unistd::Pid;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Record of a [`System::spawn`] call
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpawnRecord {
    pub pid: Pid,
    pub argv: Vec<String>,
    pub pgid: Pid,
    pub stdin: Option<RawFd>,
    pub stdout: Option<RawFd>,
}

/// Record of a terminal ownership transfer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TcsetpgrpRecord {
    pub fd: RawFd,
    pub pgid: Pid,
    /// Whether `SIGTTOU` was blocked for the call
    pub blocked: bool,
}

/// Shared mutable state of a [`VirtualSystem`]
#[derive(Clone, Debug)]
pub struct SystemState {
    pub shell_pid: Pid,
    pub shell_pgid: Pid,
    /// Bytes written to standard output
    pub stdout: Vec<u8>,
    /// Bytes written to standard error
    pub stderr: Vec<u8>,
    /// Forced error for the next standard output writes, if any
    pub stdout_error: Option<Errno>,
    /// Children started via `spawn`
    pub spawned: Vec<SpawnRecord>,
    /// Scripted results for `wait_any`, drained front to back
    pub child_events: VecDeque<(Pid, ProcessState)>,
    /// Scripted caught signals, drained by `wait_for_signals` and
    /// `caught_signals`
    pub pending_signals: VecDeque<Signal>,
    /// Makes `wait_any` report "nothing pending" instead of `ECHILD`
    /// even when no child was spawned
    pub pretend_has_children: bool,
    pub watched_signals: BTreeSet<Signal>,
    pub blocked_signals: BTreeSet<Signal>,
    /// Signals sent via `kill`
    pub kills: Vec<(Pid, Option<Signal>)>,
    /// Terminal ownership transfers, in order
    pub foreground_history: Vec<TcsetpgrpRecord>,
    /// Scripted glob results keyed by pattern
    pub glob_results: HashMap<String, Vec<String>>,
    /// Scripted home directories keyed by user name
    pub home_directories: HashMap<String, String>,
    /// Descriptors closed via `close`
    pub closed_fds: Vec<RawFd>,
    next_pid: i32,
    next_fd: RawFd,
}

impl Default for SystemState {
    fn default() -> Self {
        SystemState {
            shell_pid: Pid::from_raw(100),
            shell_pgid: Pid::from_raw(100),
            stdout: Vec::new(),
            stderr: Vec::new(),
            stdout_error: None,
            spawned: Vec::new(),
            child_events: VecDeque::new(),
            pending_signals: VecDeque::new(),
            pretend_has_children: false,
            watched_signals: BTreeSet::new(),
            blocked_signals: BTreeSet::new(),
            kills: Vec::new(),
            foreground_history: Vec::new(),
            glob_results: HashMap::new(),
            home_directories: HashMap::new(),
            closed_fds: Vec::new(),
            next_pid: 101,
            next_fd: 1000,
        }
    }
}

impl SystemState {
    /// Current foreground process group, if any transfer happened
    #[must_use]
    pub fn foreground(&self) -> Option<Pid> {
        self.foreground_history.last().map(|record| record.pgid)
    }

    /// Schedules a child status transition together with the `SIGCHLD`
    /// that announces it.
    pub fn raise_child_event(&mut self, pid: Pid, state: ProcessState) {
        self.child_events.push_back((pid, state));
        self.pending_signals.push_back(Signal::SIGCHLD);
    }
}

/// Implementor of [`System`] backed by a [`SystemState`]
#[derive(Clone, Debug, Default)]
pub struct VirtualSystem {
    pub state: Rc<RefCell<SystemState>>,
}

impl VirtualSystem {
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }
}

impl System for VirtualSystem {
    fn shell_pid(&self) -> Pid {
        self.state.borrow().shell_pid
    }

    fn shell_pgid(&self) -> Pid {
        self.state.borrow().shell_pgid
    }

    fn new_pipe(&mut self) -> Result<(RawFd, RawFd), Errno> {
        let mut state = self.state.borrow_mut();
        let read = state.next_fd;
        state.next_fd += 2;
        Ok((read, read + 1))
    }

    fn close(&mut self, fd: RawFd) -> Result<(), Errno> {
        self.state.borrow_mut().closed_fds.push(fd);
        Ok(())
    }

    fn spawn(&mut self, request: &SpawnRequest) -> Result<Pid, Errno> {
        let mut state = self.state.borrow_mut();
        let pid = Pid::from_raw(state.next_pid);
        state.next_pid += 1;
        let pgid = match request.pgid {
            PgidRequest::Inherit => state.shell_pgid,
            PgidRequest::Lead => pid,
            PgidRequest::Join(pgid) => pgid,
        };
        state.spawned.push(SpawnRecord {
            pid,
            argv: request
                .argv
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            pgid,
            stdin: request.stdin,
            stdout: request.stdout,
        });
        Ok(pid)
    }

    fn wait_any(&mut self) -> Result<Option<(Pid, ProcessState)>, Errno> {
        let mut state = self.state.borrow_mut();
        match state.child_events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if state.pretend_has_children || !state.spawned.is_empty() => Ok(None),
            None => Err(Errno::ECHILD),
        }
    }

    fn kill(&mut self, target: Pid, signal: Option<Signal>) -> Result<(), Errno> {
        self.state.borrow_mut().kills.push((target, signal));
        Ok(())
    }

    fn watch_signal(&mut self, signal: Signal) -> Result<(), Errno> {
        let mut state = self.state.borrow_mut();
        state.watched_signals.insert(signal);
        if signal == Signal::SIGCHLD {
            state.blocked_signals.insert(signal);
        }
        Ok(())
    }

    fn caught_signals(&mut self) -> Vec<Signal> {
        self.state.borrow_mut().pending_signals.drain(..).collect()
    }

    fn wait_for_signals(&mut self) -> Result<Vec<Signal>, Errno> {
        let signals = self.caught_signals();
        if signals.is_empty() {
            // Nothing is scripted, so a real system would sleep forever.
            Err(Errno::EDEADLK)
        } else {
            Ok(signals)
        }
    }

    fn sigblock(&mut self, signals: &[Signal]) -> Result<SignalMask, Errno> {
        let mut state = self.state.borrow_mut();
        let newly = signals
            .iter()
            .copied()
            .filter(|&signal| state.blocked_signals.insert(signal))
            .collect();
        Ok(SignalMask(newly))
    }

    fn sigunblock(&mut self, mask: SignalMask) {
        let mut state = self.state.borrow_mut();
        for signal in mask.0 {
            state.blocked_signals.remove(&signal);
        }
    }

    fn tcsetpgrp_with_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno> {
        self.state.borrow_mut().foreground_history.push(TcsetpgrpRecord {
            fd,
            pgid,
            blocked: true,
        });
        Ok(())
    }

    fn tcsetpgrp_without_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno> {
        self.state.borrow_mut().foreground_history.push(TcsetpgrpRecord {
            fd,
            pgid,
            blocked: false,
        });
        Ok(())
    }

    fn write_stdout(&mut self, bytes: &[u8]) -> Result<(), Errno> {
        let mut state = self.state.borrow_mut();
        if let Some(errno) = state.stdout_error {
            return Err(errno);
        }
        state.stdout.extend_from_slice(bytes);
        Ok(())
    }

    fn write_stderr(&mut self, bytes: &[u8]) {
        self.state.borrow_mut().stderr.extend_from_slice(bytes);
    }

    fn glob(&mut self, pattern: &str) -> Result<Vec<String>, Errno> {
        if pattern.contains('\0') {
            return Err(Errno::EILSEQ);
        }
        let state = self.state.borrow();
        Ok(state.glob_results.get(pattern).cloned().unwrap_or_default())
    }

    fn home_directory(&mut self, user: &str) -> Option<String> {
        self.state.borrow().home_directories.get(user).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::ExitStatus;

    #[test]
    fn scripted_child_events_drain_in_order() {
        let mut system = VirtualSystem::new();
        let pid = Pid::from_raw(123);
        system.state.borrow_mut().pretend_has_children = true;
        system
            .state
            .borrow_mut()
            .raise_child_event(pid, ProcessState::Exited(ExitStatus(0)));

        assert_eq!(
            system.wait_any(),
            Ok(Some((pid, ProcessState::Exited(ExitStatus(0)))))
        );
        assert_eq!(system.wait_any(), Ok(None));
        assert_eq!(system.wait_for_signals(), Ok(vec![Signal::SIGCHLD]));
        assert_eq!(system.wait_for_signals(), Err(Errno::EDEADLK));
    }

    #[test]
    fn captured_output() {
        let mut system = VirtualSystem::new();
        system.write_stdout(b"out").unwrap();
        system.write_stderr(b"err");
        let state = system.state.borrow();
        assert_eq!(state.stdout, b"out");
        assert_eq!(state.stderr, b"err");
    }

    #[test]
    fn sigblock_reports_newly_blocked_only() {
        let mut system = VirtualSystem::new();
        let first = system.sigblock(&[Signal::SIGCHLD]).unwrap();
        assert_eq!(first.0, [Signal::SIGCHLD]);
        let second = system.sigblock(&[Signal::SIGCHLD, Signal::SIGINT]).unwrap();
        assert_eq!(second.0, [Signal::SIGINT]);
        system.sigunblock(second);
        let state = system.state.borrow();
        assert_eq!(
            state.blocked_signals.iter().copied().collect::<Vec<_>>(),
            [Signal::SIGCHLD]
        );
    }
}
