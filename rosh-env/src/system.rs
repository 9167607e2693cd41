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

//! Abstraction of the underlying operating system
//!
//! The [`System`] trait names every operating system service the core
//! uses. [`RealSystem`](real::RealSystem) performs the actual system
//! calls; [`VirtualSystem`](virtual_system::VirtualSystem) is a
//! deterministic in-memory double for tests, with scripted child-state
//! transitions and captured output.
//!
//! Signal handlers installed by the real system do nothing but set a
//! per-signal flag. The flags are polled with
//! [`System::caught_signals`] and awaited with
//! [`System::wait_for_signals`]; all state transitions driven by signals
//! happen on the main control path.

pub mod real;
pub mod virtual_system;

pub use nix::errno::Errno;
pub use nix::sys::signal::Signal;
pub use nix::unistd::Pid;

use crate::job::ProcessState;
use std::ffi::CString;
use std::fmt::Debug;
use std::os::fd::RawFd;

/// Record of signals that a [`System::sigblock`] call newly blocked,
/// consumed by [`System::sigunblock`] to restore the previous mask
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[must_use = "the saved mask should be passed back to sigunblock"]
pub struct SignalMask(pub(crate) Vec<Signal>);

/// Process group assignment for a spawned child
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PgidRequest {
    /// Leave the child in the shell's process group.
    Inherit,
    /// Make the child the leader of a new process group.
    Lead,
    /// Put the child into the given process group.
    Join(Pid),
}

/// Description of a child process to start
#[derive(Clone, Debug)]
pub struct SpawnRequest<'a> {
    pub argv: &'a [CString],
    /// `name=value` environment entries
    pub envs: &'a [CString],
    pub pgid: PgidRequest,
    /// File descriptor to dup onto standard input, if any
    pub stdin: Option<RawFd>,
    /// File descriptor to dup onto standard output, if any
    pub stdout: Option<RawFd>,
    /// Descriptors to close in the child after redirection
    pub close_fds: &'a [RawFd],
}

/// Interface to the operating system
pub trait System: Debug {
    /// Process ID of the shell itself
    fn shell_pid(&self) -> Pid;

    /// Process group ID of the shell itself
    fn shell_pgid(&self) -> Pid;

    /// Creates a pipe, returning the read and write descriptors.
    fn new_pipe(&mut self) -> Result<(RawFd, RawFd), Errno>;

    /// Closes a file descriptor.
    fn close(&mut self, fd: RawFd) -> Result<(), Errno>;

    /// Forks and execs a child process.
    fn spawn(&mut self, request: &SpawnRequest) -> Result<Pid, Errno>;

    /// Collects one pending child status transition without blocking.
    ///
    /// Returns `Ok(None)` when children exist but none has news.
    /// `Err(Errno::ECHILD)` means there is no child at all.
    fn wait_any(&mut self) -> Result<Option<(Pid, ProcessState)>, Errno>;

    /// Sends a signal, or checks delivery when `signal` is `None`.
    ///
    /// A negative `target` addresses a process group.
    fn kill(&mut self, target: Pid, signal: Option<Signal>) -> Result<(), Errno>;

    /// Installs the flag-setting handler for the signal.
    ///
    /// `SIGCHLD` is additionally blocked so that it is delivered only
    /// inside [`wait_for_signals`](Self::wait_for_signals).
    fn watch_signal(&mut self, signal: Signal) -> Result<(), Errno>;

    /// Drains the caught-signal flags without blocking.
    fn caught_signals(&mut self) -> Vec<Signal>;

    /// Suspends the caller until at least one watched signal has been
    /// caught, then drains and returns the flags.
    fn wait_for_signals(&mut self) -> Result<Vec<Signal>, Errno>;

    /// Blocks the given signals, returning the ones newly blocked.
    fn sigblock(&mut self, signals: &[Signal]) -> Result<SignalMask, Errno>;

    /// Unblocks the signals recorded in the mask.
    fn sigunblock(&mut self, mask: SignalMask);

    /// Gives the terminal to the process group, with `SIGTTOU` blocked
    /// so a backgrounded shell is not stopped by the operation.
    fn tcsetpgrp_with_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno>;

    /// Gives the terminal to the process group with the default
    /// `SIGTTOU` disposition in effect, so a backgrounded shell is
    /// stopped until it is itself put in the foreground.
    fn tcsetpgrp_without_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno>;

    /// Writes the whole buffer to standard output.
    fn write_stdout(&mut self, bytes: &[u8]) -> Result<(), Errno>;

    /// Writes the whole buffer to standard error, ignoring failures.
    fn write_stderr(&mut self, bytes: &[u8]);

    /// Performs pathname expansion with the platform glob library.
    ///
    /// Returns the matching pathnames, or an empty vector when nothing
    /// matches. `Errno::EILSEQ` reports a pattern that cannot be encoded
    /// for the platform.
    fn glob(&mut self, pattern: &str) -> Result<Vec<String>, Errno>;

    /// Looks up a user's home directory.
    fn home_directory(&mut self, user: &str) -> Option<String>;
}
