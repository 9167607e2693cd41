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

//! Job ID parsing and resolution
//!
//! A job ID names a job in a [`JobList`]:
//!
//! - `%`, `%%`, and `%+` (and the empty tail) denote the current job.
//! - `%-` denotes the previous job.
//! - `%n` with a positive integer `n` denotes job number `n`.
//! - `%name` denotes the unique job whose name starts with `name`.
//! - `%?name` denotes the unique job whose name contains `name`.
//!
//! An ID whose name part matches more than one job is ambiguous.
//! Whether an ID without the leading `%` is accepted depends on the
//! built-in; the caller strips the `%` before calling [`parse_tail`].

use super::JobList;
use std::fmt::Display;
use std::fmt::Formatter;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Parsed form of a job ID
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobId<'a> {
    /// `%`, `%%`, `%+`
    CurrentJob,
    /// `%-`
    PreviousJob,
    /// `%n`
    JobNumber(NonZeroUsize),
    /// `%name`
    NamePrefix(&'a str),
    /// `%?name`
    NameSubstring(&'a str),
}

impl Default for JobId<'_> {
    fn default() -> Self {
        JobId::CurrentJob
    }
}

impl Display for JobId<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            JobId::CurrentJob => "%+".fmt(f),
            JobId::PreviousJob => "%-".fmt(f),
            JobId::JobNumber(number) => write!(f, "%{number}"),
            JobId::NamePrefix(prefix) => write!(f, "%{prefix}"),
            JobId::NameSubstring(substring) => write!(f, "%?{substring}"),
        }
    }
}

/// Parses a job ID with the leading `%` already removed.
pub fn parse_tail(tail: &str) -> JobId<'_> {
    match tail {
        "" | "%" | "+" => JobId::CurrentJob,
        "-" => JobId::PreviousJob,
        _ => match tail.strip_prefix('?') {
            Some(substring) => JobId::NameSubstring(substring),
            None => match tail.parse::<NonZeroUsize>() {
                Ok(number) => JobId::JobNumber(number),
                Err(_) => JobId::NamePrefix(tail),
            },
        },
    }
}

/// Error in parsing a job ID
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
#[error("a job ID must start with a '%'")]
pub struct ParseError;

/// Parses a job ID, requiring the leading `%`.
pub fn parse(job_id: &str) -> Result<JobId<'_>, ParseError> {
    match job_id.strip_prefix('%') {
        Some(tail) => Ok(parse_tail(tail)),
        None => Err(ParseError),
    }
}

impl<'a> TryFrom<&'a str> for JobId<'a> {
    type Error = ParseError;
    #[inline]
    fn try_from(s: &'a str) -> Result<JobId<'a>, ParseError> {
        parse(s)
    }
}

/// Error in resolving a job ID against a job list
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum FindError {
    #[error("no such job")]
    NotFound,
    #[error("ambiguous job specification")]
    Ambiguous,
}

impl JobId<'_> {
    /// Returns the number of the job this ID names.
    pub fn find(&self, jobs: &JobList) -> Result<usize, FindError> {
        fn find_one<F>(jobs: &JobList, mut matches: F) -> Result<usize, FindError>
        where
            F: FnMut(&str) -> bool,
        {
            let mut found = None;
            for (number, job) in jobs.iter() {
                if matches(&job.name()) {
                    if found.is_some() {
                        return Err(FindError::Ambiguous);
                    }
                    found = Some(number);
                }
            }
            found.ok_or(FindError::NotFound)
        }

        match *self {
            JobId::CurrentJob => jobs.current_job().ok_or(FindError::NotFound),
            JobId::PreviousJob => jobs.previous_job().ok_or(FindError::NotFound),
            JobId::JobNumber(number) => match jobs.get_numbered(number.get()) {
                Some(_) => Ok(number.get()),
                None => Err(FindError::NotFound),
            },
            JobId::NamePrefix(prefix) => find_one(jobs, |name| name.starts_with(prefix)),
            JobId::NameSubstring(substring) => find_one(jobs, |name| name.contains(substring)),
        }
    }
}
