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

//! Signal dispositions the core keeps track of
//!
//! The trap actions themselves (command strings run by the dispatcher)
//! are outside the core; the core only needs to know which signals have
//! user traps so a wait can hand them back to the main loop, and to
//! install its own `SIGCHLD`/`SIGINT` flag handlers.

use crate::system::Errno;
use crate::system::Signal;
use crate::system::System;
use std::collections::BTreeSet;

/// Set of signals the shell watches
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrapSet {
    user_traps: BTreeSet<Signal>,
    internal_handlers_enabled: bool,
}

impl TrapSet {
    /// Installs the flag-setting handlers for `SIGCHLD` and `SIGINT`.
    ///
    /// Must be called before a wait so a `SIGCHLD` arriving between the
    /// status poll and the suspension is not lost. Idempotent.
    pub fn enable_internal_handlers(&mut self, system: &mut dyn System) -> Result<(), Errno> {
        if !self.internal_handlers_enabled {
            system.watch_signal(Signal::SIGCHLD)?;
            system.watch_signal(Signal::SIGINT)?;
            self.internal_handlers_enabled = true;
        }
        Ok(())
    }

    /// Registers a user trap on the signal.
    pub fn set_trap(&mut self, system: &mut dyn System, signal: Signal) -> Result<(), Errno> {
        system.watch_signal(signal)?;
        self.user_traps.insert(signal);
        Ok(())
    }

    /// Removes a user trap.
    pub fn remove_trap(&mut self, signal: Signal) {
        self.user_traps.remove(&signal);
    }

    /// Whether the signal has a user trap.
    #[must_use]
    pub fn is_trapped(&self, signal: Signal) -> bool {
        self.user_traps.contains(&signal)
    }
}
