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

//! Shell option settings

use enumset::EnumSet;
use enumset::EnumSetType;

/// Behaviour toggle of the shell
#[derive(Debug, EnumSetType, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ShellOption {
    /// Enables brace expansion in words.
    BraceExpand,
    /// Makes a newly started asynchronous job the current job.
    CurAsync,
    /// Makes a job resumed by `bg` the current job.
    CurBg,
    /// Makes a newly stopped job the current job.
    CurStop,
    /// Enables pathname expansion. When off, patterns are left intact.
    Glob,
    /// Marks the shell as interactive.
    Interactive,
    /// Enables job control.
    Monitor,
    /// Restricts behaviour to what POSIX specifies.
    PosixlyCorrect,
}

/// Collection of option states
///
/// An option is on iff it is a member of the set.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct OptionSet(EnumSet<ShellOption>);

impl OptionSet {
    /// Returns the default option set of a newly started shell.
    #[must_use]
    pub fn new() -> Self {
        use ShellOption::*;
        OptionSet(BraceExpand | CurStop | Glob)
    }

    /// Whether the given option is on.
    #[inline]
    #[must_use]
    pub fn is_on(&self, option: ShellOption) -> bool {
        self.0.contains(option)
    }

    /// Turns the option on or off.
    pub fn set(&mut self, option: ShellOption, on: bool) {
        if on {
            self.0.insert(option);
        } else {
            self.0.remove(option);
        }
    }
}
