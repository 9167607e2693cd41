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

//! Bg built-in
//!
//! The **`bg`** built-in resumes jobs in the background.
//!
//! # Synopsis
//!
//! ```sh
//! bg [job...]
//! ```
//!
//! # Description
//!
//! Each named job (the current job when none is named) is sent
//! `SIGCONT` and left running in the background. The `curbg` option
//! makes the resumed job the current job.
//!
//! # Errors
//!
//! The built-in fails when job control is disabled, when a job is not
//! found or not job-controlled, or when the job has already terminated.
//!
//! # Exit status
//!
//! Zero when the (last) job was resumed.

use crate::common;
use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Entry point of the `bg` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    common::continue_jobs(env, args, false)
}
