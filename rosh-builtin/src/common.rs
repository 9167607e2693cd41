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

//! Common helpers for implementing built-ins

use rosh_env::job::id;
use rosh_env::job::id::FindError;
use rosh_env::job::JobStatus;
use rosh_env::job::Pid;
use rosh_env::job::ProcessState;
use rosh_env::semantics::ExitStatus;
use rosh_env::system::Signal;
use rosh_env::Env;
use std::collections::BTreeSet;

/// Parses leading single-character flag clusters.
///
/// Flags may be clustered (`-lns`); `--` ends flag parsing; the first
/// argument that is not a flag cluster ends it too. Returns the
/// accepted flags and the index of the first operand, or the offending
/// character for a flag not in `allowed`.
pub(crate) fn parse_flags(
    args: &[String],
    allowed: &str,
) -> Result<(BTreeSet<char>, usize), char> {
    let mut flags = BTreeSet::new();
    let mut index = 0;
    while let Some(arg) = args.get(index) {
        if arg == "--" {
            index += 1;
            break;
        }
        let Some(cluster) = arg.strip_prefix('-') else { break };
        if cluster.is_empty() {
            break;
        }
        for c in cluster.chars() {
            if allowed.contains(c) {
                flags.insert(c);
            } else {
                return Err(c);
            }
        }
        index += 1;
    }
    Ok((flags, index))
}

/// Resolves a job specification operand to a job number.
///
/// The leading `%` is optional outside POSIX mode and mandatory in it.
/// Failures are reported to standard error and answered with `None`.
pub(crate) fn resolve_jobspec(env: &mut Env, builtin: &str, spec: &str) -> Option<usize> {
    let tail = match spec.strip_prefix('%') {
        Some(tail) => tail,
        None if env.posixly_correct() => {
            env.print_error(&format!("{builtin}: {spec}: invalid job specification"));
            return None;
        }
        None => spec,
    };
    match id::parse_tail(tail).find(&env.jobs) {
        Ok(number) => Some(number),
        Err(FindError::Ambiguous) => {
            env.print_error(&format!("{builtin}: {spec}: ambiguous job specification"));
            None
        }
        Err(FindError::NotFound) => {
            env.print_error(&format!("{builtin}: {spec}: no such job"));
            None
        }
    }
}

/// Resumes a job with `SIGCONT`, in the foreground or the background.
///
/// The job name is announced on standard output first. In the
/// foreground case the call waits for the job to finish or stop again,
/// reclaims the terminal, and reports the job's exit status; a job that
/// stopped again becomes the current job. In the background case the
/// job is left running and the `curbg` option decides whether it
/// becomes the current job.
pub(crate) fn continue_job(env: &mut Env, number: usize, foreground: bool) -> ExitStatus {
    let Some(job) = env.jobs.get(number) else {
        return ExitStatus::FAILURE;
    };
    let pgid = job.pgid;
    let name = job.name();
    let done = job.status == JobStatus::Done;
    debug_assert!(pgid.as_raw() > 0);

    let line = if foreground && env.posixly_correct() {
        format!("{name}\n")
    } else {
        format!("[{number}] {name}\n")
    };
    let _ = env.system.write_stdout(line.as_bytes());

    if !done {
        if foreground {
            let _ = env.put_foreground(pgid);
        }
        let target = Pid::from_raw(-pgid.as_raw());
        if env.system.kill(target, Some(Signal::SIGCONT)).is_ok() {
            if let Some(job) = env.jobs.get_mut(number) {
                for process in &mut job.members {
                    if let ProcessState::Stopped(_) = process.state {
                        process.state = ProcessState::Running;
                    }
                }
                job.fold_status();
            }
        }
    } else if !foreground {
        env.print_error(&format!("bg: job %{number} has already terminated"));
    }

    if foreground {
        let _ = env.wait_for_job(number, true, false, false);
        let shell_pgid = env.system.shell_pgid();
        let _ = env.put_foreground(shell_pgid);

        match env.jobs.get(number).map(|job| (job.status, job.exit_status())) {
            Some((JobStatus::Stopped, exit_status)) => {
                env.jobs.set_current_job_number(number);
                exit_status
            }
            Some((_, exit_status)) => {
                env.notify_signaled_job(number);
                env.jobs.remove_job(number);
                exit_status
            }
            None => ExitStatus::FAILURE,
        }
    } else {
        let curbg = env
            .options
            .is_on(rosh_env::option::ShellOption::CurBg);
        let next_current = if curbg {
            number
        } else {
            env.jobs.current_job().unwrap_or(0)
        };
        env.jobs.set_current_job_number(next_current);
        match env.jobs.get(number) {
            Some(job) if job.status == JobStatus::Running => ExitStatus::SUCCESS,
            _ => ExitStatus::FAILURE,
        }
    }
}

/// Shared implementation of the `fg` and `bg` built-ins
pub(crate) fn continue_jobs(env: &mut Env, args: Vec<String>, foreground: bool) -> ExitStatus {
    let builtin = if foreground { "fg" } else { "bg" };

    if !env.controls_jobs() {
        env.print_error(&format!("{builtin}: job control disabled"));
        return ExitStatus::FAILURE;
    }

    if foreground && env.posixly_correct() && args.len() > 1 {
        env.print_error("fg: too many operands");
        return ExitStatus::ERROR;
    }

    let initial_errors = env.error_count();
    let mut status = ExitStatus::SUCCESS;

    if args.is_empty() {
        match env.jobs.current_job() {
            Some(number)
                if env
                    .jobs
                    .get(number)
                    .is_some_and(|job| job.is_job_controlled()) =>
            {
                status = continue_job(env, number, foreground);
            }
            _ => env.print_error(&format!("{builtin}: no current job")),
        }
    } else {
        for spec in &args {
            let Some(number) = resolve_jobspec(env, builtin, spec) else {
                continue;
            };
            match env.jobs.get(number) {
                Some(job) if job.is_job_controlled() => {
                    status = continue_job(env, number, foreground);
                }
                Some(job) if job.pgid.as_raw() == 0 => {
                    env.print_error(&format!("{builtin}: {spec}: not a job-controlled job"));
                }
                _ => env.print_error(&format!("{builtin}: {spec}: no such job")),
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
