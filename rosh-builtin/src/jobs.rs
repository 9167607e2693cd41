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

//! Jobs built-in
//!
//! The **`jobs`** built-in prints the status of jobs.
//!
//! # Synopsis
//!
//! ```sh
//! jobs [-lnprs] [job...]
//! ```
//!
//! # Description
//!
//! With operands, the named jobs are printed; otherwise all jobs are.
//! Each line shows the job number, the `+`/`-` marker for the current
//! and previous job, the status, and the job name. A finished job is
//! removed from the job list once reported.
//!
//! # Options
//!
//! - `-l`: one line per member process, with process IDs
//! - `-n`: only jobs whose status changed since the last report
//! - `-p`: print process group IDs only
//! - `-r` / `-s`: only running / only stopped jobs
//!
//! In POSIX mode only `-l` and `-p` are accepted and operands must
//! start with `%`.
//!
//! # Exit status
//!
//! Zero unless an operand did not resolve or writing failed.

use crate::common;
use rosh_env::job::JobStatus;
use rosh_env::option::ShellOption;
use rosh_env::semantics::ExitStatus;
use rosh_env::system::Errno;
use rosh_env::Env;

#[derive(Clone, Copy, Debug)]
struct Filters {
    verbose: bool,
    changed_only: bool,
    pgid_only: bool,
    running_only: bool,
    stopped_only: bool,
}

fn print_one(env: &mut Env, number: usize, filters: Filters) -> Result<(), Errno> {
    let Some(job) = env.jobs.get_numbered(number) else {
        return Ok(());
    };
    if filters.running_only && job.status != JobStatus::Running {
        return Ok(());
    }
    if filters.stopped_only && job.status != JobStatus::Stopped {
        return Ok(());
    }

    if filters.pgid_only {
        if filters.changed_only && !job.status_changed {
            return Ok(());
        }
        let line = format!("{}\n", job.pgid.as_raw().unsigned_abs());
        env.system.write_stdout(line.as_bytes())
    } else {
        env.print_job_status(number, filters.changed_only, filters.verbose, true)
    }
}

/// Entry point of the `jobs` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    let allowed = if env.posixly_correct() { "lp" } else { "lnprs" };
    let (flags, operand_start) = match common::parse_flags(&args, allowed) {
        Ok(parsed) => parsed,
        Err(flag) => {
            env.print_error(&format!("jobs: -{flag}: invalid option"));
            return ExitStatus::ERROR;
        }
    };
    let filters = Filters {
        verbose: flags.contains(&'l'),
        changed_only: flags.contains(&'n'),
        pgid_only: flags.contains(&'p'),
        running_only: flags.contains(&'r'),
        stopped_only: flags.contains(&'s'),
    };

    let initial_errors = env.error_count();
    env.jobs.apply_curstop(env.options.is_on(ShellOption::CurStop));

    let operands = &args[operand_start..];
    let result = if operands.is_empty() {
        env.jobs
            .numbers()
            .into_iter()
            .try_for_each(|number| print_one(env, number, filters))
    } else {
        operands.iter().try_for_each(|spec| {
            match common::resolve_jobspec(env, "jobs", spec) {
                Some(number) => print_one(env, number, filters),
                None => Ok(()),
            }
        })
    };

    if let Err(errno) = result {
        env.print_error(&format!("jobs: cannot print to the standard output: {errno}"));
        return ExitStatus::FAILURE;
    }
    if env.error_count() == initial_errors {
        ExitStatus::SUCCESS
    } else {
        ExitStatus::FAILURE
    }
}
