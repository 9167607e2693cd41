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

//! Job report formatting
//!
//! The report format is the POSIX `jobs` layout: job number, a marker
//! for the current (`+`) or previous (`-`) job, the status, and the job
//! name:
//!
//! ```text
//! [2] + Running              cat foo | grep bar
//! ```
//!
//! The status column is exactly 20 columns wide; POSIX allows only the
//! spacing of this layout to vary. The alternate (`{:#}`) form is the
//! verbose rendering of `jobs -l`, one line per member process with its
//! process ID:
//!
//! ```text
//! [2] +  1234 Running              cat foo
//!        1235 Running              | grep bar
//! ```

use super::Job;
use super::JobList;
use super::JobStatus;
use super::ProcessState;
use crate::semantics::ExitStatus;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

/// Formats a process state as a status token.
///
/// - `Running`
/// - `Stopped(SIG…)`
/// - `Done` for exit status 0, `Done(…)` otherwise
/// - `Killed (SIG…)`, with `: core dumped` appended when the host
///   reported a core dump
impl Display for ProcessState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ProcessState::Running => "Running".fmt(f),
            ProcessState::Stopped(signal) => write!(f, "Stopped({signal})"),
            ProcessState::Exited(ExitStatus::SUCCESS) => "Done".fmt(f),
            ProcessState::Exited(exit_status) => write!(f, "Done({exit_status})"),
            ProcessState::Signaled {
                signal,
                core_dump: false,
            } => write!(f, "Killed ({signal})"),
            ProcessState::Signaled {
                signal,
                core_dump: true,
            } => write!(f, "Killed ({signal}: core dumped)"),
        }
    }
}

/// Marker identifying the current and previous job
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Marker {
    None,
    CurrentJob,
    PreviousJob,
}

impl Marker {
    /// Marker appropriate for the job number in the list
    #[must_use]
    pub fn of(jobs: &JobList, number: usize) -> Marker {
        if jobs.current_job() == Some(number) {
            Marker::CurrentJob
        } else if jobs.previous_job() == Some(number) {
            Marker::PreviousJob
        } else {
            Marker::None
        }
    }

    /// `' '`, `'+'`, or `'-'`
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Marker::None => ' ',
            Marker::CurrentJob => '+',
            Marker::PreviousJob => '-',
        }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.as_char().fmt(f)
    }
}

/// Wrapper implementing job report formatting
///
/// See the [module documentation](self).
#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    /// Job number as shown in the report
    pub number: usize,
    pub marker: Marker,
    pub job: &'a Job,
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let number = self.number;
        let marker = self.marker;
        if f.alternate() {
            let mut members = self.job.members.iter();
            let Some(first) = members.next() else {
                return write!(f, "[{number}] {marker}");
            };
            let status = first.state.to_string();
            write!(
                f,
                "[{number}] {marker} {pid:5} {status:20} {name}",
                pid = first.pid.as_raw(),
                name = first.name,
            )?;
            for member in members {
                let status = member.state.to_string();
                write!(
                    f,
                    "\n      {pid:5} {status:20} | {name}",
                    pid = member.pid.as_raw(),
                    name = member.name,
                )?;
            }
            Ok(())
        } else {
            // Only the spacing of this layout may vary; the status
            // column stays 20 columns wide for POSIX compliance.
            let status = self.job.display_state().to_string();
            let name = self.job.name();
            write!(f, "[{number}] {marker} {status:20} {name}")
        }
    }
}
