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

//! Wait built-in
//!
//! The **`wait`** built-in waits for jobs to finish.
//!
//! # Synopsis
//!
//! ```sh
//! wait [job or pid...]
//! ```
//!
//! # Description
//!
//! Operands are job IDs (with the leading `%`) or process IDs of member
//! processes. Without operands the built-in waits for all remaining
//! children.
//!
//! # Exit status
//!
//! The exit status of the last job waited for; 127 when an operand
//! names no known job; 128 plus the signal number when a trap cut the
//! wait short.

use either::Either;
use rosh_env::job::id;
use rosh_env::job::id::FindError;
use rosh_env::job::JobStatus;
use rosh_env::job::Pid;
use rosh_env::job::ACTIVE_JOB;
use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Classifies an operand as a job ID tail or a process ID.
fn classify(operand: &str) -> Option<Either<&str, Pid>> {
    if let Some(tail) = operand.strip_prefix('%') {
        return Some(Either::Left(tail));
    }
    match operand.parse::<i32>() {
        Ok(pid) if pid >= 0 => Some(Either::Right(Pid::from_raw(pid))),
        _ => None,
    }
}

/// Prints finished jobs (or quietly discards them) and tells whether
/// any job remains worth waiting for.
fn has_job_to_wait_for(env: &mut Env, job_control: bool) -> bool {
    if job_control && env.is_interactive() && !env.posixly_correct() {
        for number in env.jobs.numbers() {
            let _ = env.print_job_status(number, true, false, true);
        }
    } else {
        for number in env.jobs.numbers() {
            let Some(job) = env.jobs.get(number) else { continue };
            if job.is_neglected() || job.status == JobStatus::Done {
                env.jobs.remove_job(number);
            }
        }
    }

    env.jobs
        .iter()
        .any(|(_, job)| !job_control || job.status == JobStatus::Running)
}

/// Entry point of the `wait` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    let job_control = env.controls_jobs();
    let initial_errors = env.error_count();
    let mut status = ExitStatus::SUCCESS;

    if args.is_empty() {
        // Wait for all children.
        while has_job_to_wait_for(env, job_control) {
            match env.wait_for_sigchld(job_control, true) {
                Ok(None) => {}
                Ok(Some(signal)) => {
                    status = ExitStatus::from_signal(signal);
                    break;
                }
                Err(_) => break,
            }
        }
    } else {
        'operands: for operand in &args {
            let number = match classify(operand) {
                None => {
                    env.print_error(&format!("wait: {operand}: invalid job specification"));
                    continue;
                }
                Some(Either::Left(tail)) => match id::parse_tail(tail).find(&env.jobs) {
                    Ok(number) => Some(number),
                    Err(FindError::Ambiguous) => {
                        env.print_error(&format!(
                            "wait: {operand}: ambiguous job specification"
                        ));
                        continue;
                    }
                    Err(FindError::NotFound) => None,
                },
                Some(Either::Right(pid)) => env
                    .jobs
                    .find_by_pid(pid)
                    .map(|(number, _)| number)
                    .filter(|&number| number != ACTIVE_JOB),
            };

            let number = match number {
                Some(number)
                    if env
                        .jobs
                        .get_numbered(number)
                        .is_some_and(|job| !job.is_neglected()) =>
                {
                    number
                }
                _ => {
                    status = ExitStatus::NOT_FOUND;
                    continue;
                }
            };

            match env.wait_for_job(number, job_control, job_control, true) {
                Ok(None) => {
                    let Some(job) = env.jobs.get(number) else { continue };
                    status = job.exit_status();
                    if job.status != JobStatus::Running {
                        if job_control && env.is_interactive() && !env.posixly_correct() {
                            let _ = env.print_job_status(number, false, false, true);
                        } else if job.status == JobStatus::Done {
                            env.jobs.remove_job(number);
                        }
                    }
                }
                Ok(Some(signal)) => {
                    status = ExitStatus::from_signal(signal);
                    break 'operands;
                }
                Err(_) => {
                    status = ExitStatus::FAILURE;
                    break 'operands;
                }
            }
        }
    }

    if !status.is_successful() {
        status
    } else if env.error_count() != initial_errors {
        ExitStatus::FAILURE
    } else {
        ExitStatus::SUCCESS
    }
}
