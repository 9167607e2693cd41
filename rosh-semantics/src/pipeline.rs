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

//! Pipeline launching
//!
//! A pipeline's members are started one by one, each with its standard
//! output piped to the next member's standard input. Under job control
//! the first member leads a new process group and the others join it.
//! The members are collected into the active job while they start; the
//! job is then either waited for in the foreground (reclaiming the
//! terminal afterwards) or committed to the job list as a background
//! job. Both the job construction and the commit run with `SIGCHLD`
//! blocked, so the reaper only ever sees the job fully indexed.

use rosh_env::job::{Job, JobStatus, ACTIVE_JOB};
use rosh_env::semantics::ExitStatus;
use rosh_env::system::{Errno, PgidRequest, SpawnRequest};
use rosh_env::Env;
use rosh_syntax::syntax::ExternalCommand;
use std::ffi::CString;
use thiserror::Error;

/// Error in starting a pipeline
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StartError {
    /// A word of the command contains a byte sequence the platform
    /// cannot accept (an embedded NUL)
    #[error("`{0}': cannot encode word for execution")]
    Encoding(String),

    /// A system call failed
    #[error("cannot start command: {0}")]
    System(#[from] Errno),
}

/// Outcome of running a pipeline
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Started {
    /// The foreground pipeline finished or stopped with this status.
    Foreground(ExitStatus),
    /// The pipeline runs in the background under this job number.
    Background(usize),
}

fn encode(word: &str) -> Result<CString, StartError> {
    CString::new(word).map_err(|_| StartError::Encoding(word.to_string()))
}

/// Starts the commands of one pipeline and registers the job.
///
/// In the foreground case the call blocks until the job finishes (or
/// stops, under job control), reclaims the terminal for the shell, and
/// reports the job's exit status. A stopped foreground job is committed
/// as the current job. In the background case the job is committed
/// without waiting and the job number is returned.
pub fn start_pipeline(
    env: &mut Env,
    commands: &[ExternalCommand],
    foreground: bool,
) -> Result<Started, StartError> {
    debug_assert!(!commands.is_empty());

    let job_controlled = env.controls_jobs();
    let envs = env.variables.environment();

    let mut job_pgid = rosh_env::job::Pid::from_raw(0);
    let mut job = Job::new(job_pgid);
    let mut read_end = None;

    for (index, command) in commands.iter().enumerate() {
        let argv: Vec<CString> = command
            .argv
            .iter()
            .map(|word| encode(word))
            .collect::<Result<_, _>>()?;

        let is_last = index + 1 == commands.len();
        let (next_read, write_end) = if is_last {
            (None, None)
        } else {
            let (read, write) = env.system.new_pipe()?;
            (Some(read), Some(write))
        };

        let pgid = if !job_controlled {
            PgidRequest::Inherit
        } else if index == 0 {
            PgidRequest::Lead
        } else {
            PgidRequest::Join(job_pgid)
        };

        let mut close_fds = Vec::new();
        if let Some(read) = next_read {
            close_fds.push(read);
        }

        let request = SpawnRequest {
            argv: &argv,
            envs: &envs,
            pgid,
            stdin: read_end,
            stdout: write_end,
            close_fds: &close_fds,
        };
        let pid = env.system.spawn(&request)?;

        if job_controlled && index == 0 {
            job_pgid = pid;
            job.pgid = pid;
        }
        job.push_process(pid, command.name.clone());

        // The parent's copies of the pipe ends are closed as soon as
        // they have been handed to the children.
        if let Some(fd) = read_end {
            let _ = env.system.close(fd);
        }
        if let Some(fd) = write_end {
            let _ = env.system.close(fd);
        }
        read_end = next_read;
    }

    env.protect(&[], |env| env.jobs.set_active_job(job))?;

    if foreground {
        if job_controlled && job_pgid.as_raw() > 0 {
            env.put_foreground(job_pgid)?;
        }
        env.wait_for_job(ACTIVE_JOB, job_controlled, job_controlled, false)?;
        if job_controlled {
            env.ensure_foreground()?;
        }

        let Some(active) = env.jobs.get(ACTIVE_JOB) else {
            return Ok(Started::Foreground(ExitStatus::FAILURE));
        };
        let exit_status = active.exit_status();
        if active.status == JobStatus::Done {
            env.notify_signaled_job(ACTIVE_JOB);
            env.protect(&[], |env| {
                env.jobs.take_active_job();
            })?;
        } else {
            env.protect(&[], |env| {
                env.jobs.add_job(true);
            })?;
        }
        env.exit_status = exit_status;
        Ok(Started::Foreground(exit_status))
    } else {
        let as_current = env
            .options
            .is_on(rosh_env::option::ShellOption::CurAsync);
        let number = env
            .protect(&[], |env| env.jobs.add_job(as_current))?
            .unwrap_or(ACTIVE_JOB);
        env.exit_status = ExitStatus::SUCCESS;
        Ok(Started::Background(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosh_env::job::ProcessState;
    use rosh_env::option::ShellOption;
    use rosh_env::system::virtual_system::{SystemState, VirtualSystem};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn env_with_state() -> (Env, Rc<RefCell<SystemState>>) {
        let system = VirtualSystem::new();
        let state = Rc::clone(&system.state);
        (Env::with_system(Box::new(system)), state)
    }

    fn commands(names: &[&[&str]]) -> Vec<ExternalCommand> {
        names
            .iter()
            .map(|argv| ExternalCommand::new(argv.iter().copied()))
            .collect()
    }

    #[test]
    fn background_pipeline_is_committed() {
        let (mut env, state) = env_with_state();
        let commands = commands(&[&["sleep", "10"], &["cat"]]);
        let started = start_pipeline(&mut env, &commands, false).unwrap();
        assert_eq!(started, Started::Background(1));

        let job = env.jobs.get(1).unwrap();
        assert_eq!(job.members.len(), 2);
        assert_eq!(job.name(), "sleep 10 | cat");
        assert_eq!(job.status, JobStatus::Running);

        let state = state.borrow();
        assert_eq!(state.spawned.len(), 2);
        assert_eq!(state.spawned[0].argv, ["sleep", "10"]);
        assert_eq!(state.spawned[1].argv, ["cat"]);
        // The pipe connects member 0's stdout to member 1's stdin.
        assert_eq!(state.spawned[0].stdout, state.spawned[1].stdin.map(|fd| fd + 1));
    }

    #[test]
    fn job_control_assigns_process_group() {
        let (mut env, state) = env_with_state();
        env.options.set(ShellOption::Monitor, true);
        let commands = commands(&[&["a"], &["b"]]);
        start_pipeline(&mut env, &commands, false).unwrap();

        let state = state.borrow();
        let leader = state.spawned[0].pid;
        assert_eq!(state.spawned[0].pgid, leader);
        assert_eq!(state.spawned[1].pgid, leader);
        drop(state);
        assert_eq!(env.jobs.get(1).unwrap().pgid, leader);
    }

    #[test]
    fn foreground_pipeline_reports_last_member_status() {
        let (mut env, state) = env_with_state();
        let commands = commands(&[&["true"], &["false"]]);

        // Schedule both members' exits before the wait begins. The
        // virtual system hands out pids 101 and 102 to the two spawns.
        {
            let mut state = state.borrow_mut();
            state.pretend_has_children = true;
            state.raise_child_event(
                rosh_env::job::Pid::from_raw(101),
                ProcessState::Exited(ExitStatus(0)),
            );
            state.raise_child_event(
                rosh_env::job::Pid::from_raw(102),
                ProcessState::Exited(ExitStatus(4)),
            );
        }

        let started = start_pipeline(&mut env, &commands, true).unwrap();
        assert_eq!(started, Started::Foreground(ExitStatus(4)));
        assert_eq!(env.exit_status, ExitStatus(4));
        // The finished job is discarded.
        assert_eq!(env.jobs.job_count(), 0);
    }

    #[test]
    fn stopped_foreground_job_becomes_current() {
        let (mut env, state) = env_with_state();
        env.options.set(ShellOption::Monitor, true);
        env.tty = Some(0);
        let commands = commands(&[&["vi"]]);
        {
            let mut state = state.borrow_mut();
            state.pretend_has_children = true;
            state.raise_child_event(
                rosh_env::job::Pid::from_raw(101),
                ProcessState::Stopped(rosh_env::system::Signal::SIGTSTP),
            );
        }

        let started = start_pipeline(&mut env, &commands, true).unwrap();
        assert_eq!(
            started,
            Started::Foreground(ExitStatus::from_signal(
                rosh_env::system::Signal::SIGTSTP
            ))
        );
        assert_eq!(env.jobs.current_job(), Some(1));
        assert_eq!(env.jobs.get(1).unwrap().status, JobStatus::Stopped);

        // The shell reclaimed the terminal after the job stopped.
        let state = state.borrow();
        let last = state.foreground_history.last().unwrap();
        assert_eq!(last.pgid, state.shell_pgid);
    }

    #[test]
    fn nul_byte_in_word_is_an_encoding_error() {
        let (mut env, _state) = env_with_state();
        let commands = vec![ExternalCommand::new(["bad\0arg"])];
        let result = start_pipeline(&mut env, &commands, false);
        assert_eq!(result, Err(StartError::Encoding("bad\0arg".to_string())));
    }
}
