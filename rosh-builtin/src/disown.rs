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

//! Disown built-in
//!
//! The **`disown`** built-in removes jobs from the job list without
//! signalling them.
//!
//! # Synopsis
//!
//! ```sh
//! disown [job...]
//! disown -a
//! ```
//!
//! # Description
//!
//! A disowned job is no longer reported, no longer addressable by a job
//! ID, and its later status changes are silently dropped by the reaper.
//! With `-a`, every job is disowned; with no operand, the current job
//! is.
//!
//! # Exit status
//!
//! Zero unless an operand did not resolve.

use crate::common;
use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Entry point of the `disown` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    let (flags, operand_start) = match common::parse_flags(&args, "a") {
        Ok(parsed) => parsed,
        Err(flag) => {
            env.print_error(&format!("disown: -{flag}: invalid option"));
            return ExitStatus::ERROR;
        }
    };

    let initial_errors = env.error_count();
    let operands = &args[operand_start..];

    if flags.contains(&'a') {
        env.jobs.remove_all_jobs();
    } else if operands.is_empty() {
        match env.jobs.current_job() {
            Some(number) => {
                env.jobs.remove_job(number);
            }
            None => env.print_error("disown: no current job"),
        }
    } else {
        for spec in operands {
            if let Some(number) = common::resolve_jobspec(env, "disown", spec) {
                env.jobs.remove_job(number);
            }
        }
    }

    if env.error_count() == initial_errors {
        ExitStatus::SUCCESS
    } else {
        ExitStatus::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosh_env::job::{Job, Pid, ProcessState};
    use rosh_env::semantics::ExitStatus as Status;

    fn add_job(env: &mut Env, pid: i32, name: &str) -> usize {
        let mut job = Job::new(Pid::from_raw(pid));
        job.push_process(Pid::from_raw(pid), name);
        env.jobs.set_active_job(job);
        env.jobs.add_job(false).unwrap()
    }

    fn run(env: &mut Env, args: &[&str]) -> ExitStatus {
        main(env, args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn disowns_named_job() {
        let mut env = Env::new_virtual();
        let one = add_job(&mut env, 10, "a");
        let two = add_job(&mut env, 20, "b");
        let status = run(&mut env, &["%1"]);
        assert_eq!(status, Status::SUCCESS);
        assert!(env.jobs.get(one).is_none());
        assert!(env.jobs.get(two).is_some());
    }

    #[test]
    fn disowns_current_job_by_default() {
        let mut env = Env::new_virtual();
        let one = add_job(&mut env, 10, "a");
        let status = run(&mut env, &[]);
        assert_eq!(status, Status::SUCCESS);
        assert!(env.jobs.get(one).is_none());
    }

    #[test]
    fn disown_all() {
        let mut env = Env::new_virtual();
        add_job(&mut env, 10, "a");
        add_job(&mut env, 20, "b");
        let status = run(&mut env, &["-a"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(env.jobs.job_count(), 0);
    }

    #[test]
    fn no_current_job_is_failure() {
        let mut env = Env::new_virtual();
        let status = run(&mut env, &[]);
        assert_eq!(status, Status::FAILURE);
    }

    #[test]
    fn reap_ignores_disowned_pid() {
        let mut env = Env::new_virtual();
        add_job(&mut env, 10, "a");
        run(&mut env, &["%1"]);
        // The pid is gone from the index; a late status change for it
        // is silently dropped.
        assert_eq!(
            env.jobs.update_status(
                Pid::from_raw(10),
                ProcessState::Exited(rosh_env::semantics::ExitStatus(0))
            ),
            None,
        );
    }
}
