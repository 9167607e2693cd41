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

//! System implementation performing real system calls

use super::Errno;
use super::PgidRequest;
use super::Signal;
use super::SignalMask;
use super::SpawnRequest;
use super::System;
use crate::job::ProcessState;
use crate::semantics::ExitStatus;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use std::collections::BTreeSet;
use std::ffi::CString;
use std::os::fd::{BorrowedFd, IntoRawFd, RawFd};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

const SIGNAL_FLAG_COUNT: usize = 64;

/// Flags set by the signal handler, one per signal number.
///
/// The handler does nothing else; all signal-driven work happens on the
/// main control path after the flags are polled.
static CAUGHT: [AtomicBool; SIGNAL_FLAG_COUNT] =
    [const { AtomicBool::new(false) }; SIGNAL_FLAG_COUNT];

extern "C" fn catch_signal(signo: c_int) {
    if let Ok(index) = usize::try_from(signo) {
        if let Some(flag) = CAUGHT.get(index) {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

fn take_flag(signal: Signal) -> bool {
    let index = signal as i32 as usize;
    CAUGHT[index].swap(false, Ordering::Relaxed)
}

fn wait_flags() -> WaitPidFlag {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED;
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "macos"
    ))]
    let flags = flags | WaitPidFlag::WCONTINUED;
    flags
}

/// Implementor of [`System`] that wraps the running process's
/// environment
#[derive(Debug)]
pub struct RealSystem {
    shell_pid: Pid,
    shell_pgid: Pid,
    watched: BTreeSet<Signal>,
}

impl RealSystem {
    /// Creates a system handle for the current process.
    #[must_use]
    pub fn new() -> Self {
        RealSystem {
            shell_pid: unistd::getpid(),
            shell_pgid: unistd::getpgrp(),
            watched: BTreeSet::new(),
        }
    }

    fn blocked_mask(&self) -> Result<SigSet, Errno> {
        let mut old = SigSet::empty();
        nix::sys::signal::sigprocmask(SigmaskHow::SIG_SETMASK, None, Some(&mut old))?;
        Ok(old)
    }
}

impl Default for RealSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a raw wait status into a process state.
///
/// `nix` decodes termination before continuation, which resolves the
/// platform anomaly where a continued process may also report a
/// termination signal: the termination wins.
fn to_process_state(status: WaitStatus) -> Option<(Pid, ProcessState)> {
    match status {
        WaitStatus::Exited(pid, code) => Some((pid, ProcessState::Exited(ExitStatus(code)))),
        WaitStatus::Signaled(pid, signal, core_dump) => {
            Some((pid, ProcessState::Signaled { signal, core_dump }))
        }
        WaitStatus::Stopped(pid, signal) => Some((pid, ProcessState::Stopped(signal))),
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "macos"
        ))]
        WaitStatus::Continued(pid) => Some((pid, ProcessState::Running)),
        _ => None,
    }
}

impl System for RealSystem {
    fn shell_pid(&self) -> Pid {
        self.shell_pid
    }

    fn shell_pgid(&self) -> Pid {
        self.shell_pgid
    }

    fn new_pipe(&mut self) -> Result<(RawFd, RawFd), Errno> {
        let (read, write) = unistd::pipe()?;
        Ok((read.into_raw_fd(), write.into_raw_fd()))
    }

    fn close(&mut self, fd: RawFd) -> Result<(), Errno> {
        // SAFETY: the caller owns the descriptor it asks to close.
        Errno::result(unsafe { libc::close(fd) }).map(drop)
    }

    fn spawn(&mut self, request: &SpawnRequest) -> Result<Pid, Errno> {
        let mut argv: Vec<*const libc::c_char> =
            request.argv.iter().map(|arg| arg.as_ptr()).collect();
        argv.push(std::ptr::null());
        let mut envp: Vec<*const libc::c_char> =
            request.envs.iter().map(|entry| entry.as_ptr()).collect();
        envp.push(std::ptr::null());

        // SAFETY: the child calls only async-signal-safe functions
        // before exec.
        match unsafe { unistd::fork() }? {
            ForkResult::Parent { child } => {
                // Also assigned in the child; doing it in both ends the
                // race either way it is scheduled.
                match request.pgid {
                    PgidRequest::Inherit => {}
                    PgidRequest::Lead => drop(unistd::setpgid(child, child)),
                    PgidRequest::Join(pgid) => drop(unistd::setpgid(child, pgid)),
                }
                Ok(child)
            }
            ForkResult::Child => unsafe {
                match request.pgid {
                    PgidRequest::Inherit => {}
                    PgidRequest::Lead => drop(libc::setpgid(0, 0)),
                    PgidRequest::Join(pgid) => drop(libc::setpgid(0, pgid.as_raw())),
                }
                for signal in [
                    libc::SIGCHLD,
                    libc::SIGINT,
                    libc::SIGQUIT,
                    libc::SIGTSTP,
                    libc::SIGTTIN,
                    libc::SIGTTOU,
                ] {
                    libc::signal(signal, libc::SIG_DFL);
                }
                let mut empty: libc::sigset_t = std::mem::zeroed();
                libc::sigemptyset(&mut empty);
                libc::sigprocmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut());

                if let Some(fd) = request.stdin {
                    libc::dup2(fd, libc::STDIN_FILENO);
                }
                if let Some(fd) = request.stdout {
                    libc::dup2(fd, libc::STDOUT_FILENO);
                }
                for &fd in request.close_fds {
                    libc::close(fd);
                }

                libc::execvpe(argv[0], argv.as_ptr(), envp.as_ptr());
                let code = if Errno::last() == Errno::ENOENT { 127 } else { 126 };
                libc::_exit(code)
            },
        }
    }

    fn wait_any(&mut self) -> Result<Option<(Pid, ProcessState)>, Errno> {
        loop {
            match waitpid(Pid::from_raw(-1), Some(wait_flags())) {
                Ok(WaitStatus::StillAlive) => return Ok(None),
                Ok(status) => match to_process_state(status) {
                    Some(result) => return Ok(Some(result)),
                    None => continue,
                },
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno),
            }
        }
    }

    fn kill(&mut self, target: Pid, signal: Option<Signal>) -> Result<(), Errno> {
        nix::sys::signal::kill(target, signal)
    }

    fn watch_signal(&mut self, signal: Signal) -> Result<(), Errno> {
        if self.watched.insert(signal) {
            let action = SigAction::new(
                SigHandler::Handler(catch_signal),
                SaFlags::empty(),
                SigSet::empty(),
            );
            // SAFETY: the handler only stores to an atomic flag.
            unsafe { sigaction(signal, &action) }?;
            if signal == Signal::SIGCHLD {
                let mut set = SigSet::empty();
                set.add(Signal::SIGCHLD);
                nix::sys::signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)?;
            }
        }
        Ok(())
    }

    fn caught_signals(&mut self) -> Vec<Signal> {
        self.watched
            .iter()
            .copied()
            .filter(|&signal| take_flag(signal))
            .collect()
    }

    fn wait_for_signals(&mut self) -> Result<Vec<Signal>, Errno> {
        loop {
            let caught = self.caught_signals();
            if !caught.is_empty() {
                return Ok(caught);
            }

            let mut mask = self.blocked_mask()?;
            for &signal in &self.watched {
                mask.remove(signal);
            }
            // SAFETY: suspending on a valid signal set.
            unsafe { libc::sigsuspend(mask.as_ref()) };
        }
    }

    fn sigblock(&mut self, signals: &[Signal]) -> Result<SignalMask, Errno> {
        let old = self.blocked_mask()?;
        let mut set = SigSet::empty();
        for &signal in signals {
            set.add(signal);
        }
        nix::sys::signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)?;
        let newly = signals
            .iter()
            .copied()
            .filter(|&signal| !old.contains(signal))
            .collect();
        Ok(SignalMask(newly))
    }

    fn sigunblock(&mut self, mask: SignalMask) {
        let mut set = SigSet::empty();
        for signal in mask.0 {
            set.add(signal);
        }
        let _ = nix::sys::signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&set), None);
    }

    fn tcsetpgrp_with_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno> {
        let saved = self.sigblock(&[Signal::SIGTTOU])?;
        // SAFETY: the caller guarantees fd is open for the call.
        let result = unistd::tcsetpgrp(unsafe { BorrowedFd::borrow_raw(fd) }, pgid);
        self.sigunblock(saved);
        result
    }

    fn tcsetpgrp_without_block(&mut self, fd: RawFd, pgid: Pid) -> Result<(), Errno> {
        let default_action =
            SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        // SAFETY: restoring the default disposition is always sound.
        let saved_action = unsafe { sigaction(Signal::SIGTTOU, &default_action) }?;

        let mut set = SigSet::empty();
        set.add(Signal::SIGTTOU);
        let mut old = SigSet::empty();
        nix::sys::signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&set), Some(&mut old))?;

        // A backgrounded shell receives SIGTTOU here and stops until it
        // is foregrounded.
        // SAFETY: the caller guarantees fd is open for the call.
        let result = unistd::tcsetpgrp(unsafe { BorrowedFd::borrow_raw(fd) }, pgid);

        let _ = nix::sys::signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&old), None);
        // SAFETY: restoring the previously saved disposition.
        let _ = unsafe { sigaction(Signal::SIGTTOU, &saved_action) };
        result
    }

    fn write_stdout(&mut self, bytes: &[u8]) -> Result<(), Errno> {
        write_all(libc::STDOUT_FILENO, bytes)
    }

    fn write_stderr(&mut self, bytes: &[u8]) {
        let _ = write_all(libc::STDERR_FILENO, bytes);
    }

    fn glob(&mut self, pattern: &str) -> Result<Vec<String>, Errno> {
        let pattern = CString::new(pattern).map_err(|_| Errno::EILSEQ)?;
        let mut results = Vec::new();
        // SAFETY: glob_t is initialized by glob(3) on success and freed
        // exactly once below.
        unsafe {
            let mut buffer: libc::glob_t = std::mem::zeroed();
            let status = libc::glob(pattern.as_ptr(), 0, None, &mut buffer);
            if status == 0 {
                for i in 0..buffer.gl_pathc {
                    let path = *buffer.gl_pathv.add(i);
                    if !path.is_null() {
                        let path = std::ffi::CStr::from_ptr(path);
                        results.push(path.to_string_lossy().into_owned());
                    }
                }
            }
            libc::globfree(&mut buffer);
        }
        Ok(results)
    }

    fn home_directory(&mut self, user: &str) -> Option<String> {
        let user = unistd::User::from_name(user).ok()??;
        Some(user.dir.to_string_lossy().into_owned())
    }
}

fn write_all(fd: RawFd, mut bytes: &[u8]) -> Result<(), Errno> {
    // SAFETY: fd stays open for the duration of the call.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    while !bytes.is_empty() {
        match unistd::write(fd, bytes) {
            Ok(count) => bytes = &bytes[count..],
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
    Ok(())
}
