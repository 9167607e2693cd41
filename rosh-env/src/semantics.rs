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

//! Result types of command execution

use nix::sys::signal::Signal;
use std::fmt;

/// Exit status of a command or built-in
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    /// Exit status of a successful command
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    /// Exit status of a generic failure
    pub const FAILURE: ExitStatus = ExitStatus(1);
    /// Exit status of a usage or syntax error
    pub const ERROR: ExitStatus = ExitStatus(2);
    /// Exit status of a non-interactive shell aborted by an expansion
    /// failure
    pub const EXP_ERROR: ExitStatus = ExitStatus(2);
    /// Exit status of a command that was found but could not be executed
    pub const NOEXEC: ExitStatus = ExitStatus(126);
    /// Exit status for a command or job that was not found
    pub const NOT_FOUND: ExitStatus = ExitStatus(127);

    /// Whether the status denotes success.
    #[inline]
    #[must_use]
    pub const fn is_successful(self) -> bool {
        self.0 == 0
    }

    /// Exit status of a process terminated or stopped by the signal
    /// (128 + the signal number).
    #[must_use]
    pub fn from_signal(signal: Signal) -> ExitStatus {
        ExitStatus(128 + signal as i32)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i32> for ExitStatus {
    fn from(value: i32) -> Self {
        ExitStatus(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_offset() {
        assert_eq!(ExitStatus::from_signal(Signal::SIGINT), ExitStatus(130));
        assert_eq!(ExitStatus::from_signal(Signal::SIGKILL), ExitStatus(137));
    }

    #[test]
    fn successfulness() {
        assert!(ExitStatus::SUCCESS.is_successful());
        assert!(!ExitStatus::FAILURE.is_successful());
        assert!(!ExitStatus::NOT_FOUND.is_successful());
    }
}
