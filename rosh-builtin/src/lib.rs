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

//! Built-in utilities of the rosh shell core.
//!
//! Every built-in is a module with an entry function of type [`Main`]:
//! it takes the environment and the arguments after the command name,
//! and returns the exit status. The dispatcher looks entry points up by
//! name with [`builtin`].
//!
//! A built-in that diagnoses individual operands without aborting
//! compares the environment's error counter before and after, and
//! fails if any diagnostic was printed.

pub mod bg;
pub mod common;
pub mod disown;
pub mod echo;
pub mod fg;
pub mod jobs;
pub mod printf;
pub mod wait;

use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Type of a built-in entry point
pub type Main = fn(&mut Env, Vec<String>) -> ExitStatus;

/// Returns the entry point of the named built-in.
#[must_use]
pub fn builtin(name: &str) -> Option<Main> {
    match name {
        "bg" => Some(bg::main),
        "disown" => Some(disown::main),
        "echo" => Some(echo::main),
        "fg" => Some(fg::main),
        "jobs" => Some(jobs::main),
        "printf" => Some(printf::main),
        "wait" => Some(wait::main),
        _ => None,
    }
}
