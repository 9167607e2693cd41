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

//! Fg built-in
//!
//! The **`fg`** built-in resumes jobs in the foreground.
//!
//! # Synopsis
//!
//! ```sh
//! fg [job...]
//! ```
//!
//! # Description
//!
//! Each named job (the current job when none is named) is given the
//! terminal, sent `SIGCONT`, and waited for. The shell reclaims the
//! terminal when the job finishes or stops; a job that stopped again
//! becomes the current job.
//!
//! # Operands
//!
//! Job IDs as described in [`rosh_env::job::id`]. The leading `%` may
//! be omitted outside POSIX mode. POSIX mode accepts at most one
//! operand.
//!
//! # Errors
//!
//! The built-in fails when job control is disabled, or when a job is
//! not found or not job-controlled.
//!
//! # Exit status
//!
//! The exit status of the (last) resumed job.

use crate::common;
use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Entry point of the `fg` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    common::continue_jobs(env, args, true)
}
