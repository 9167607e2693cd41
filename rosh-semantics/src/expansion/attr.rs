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

//! Attributed characters, the intermediate currency of expansion
//!
//! Every character produced by the initial expansion carries its origin
//! and quoting state. The attributes are the splittability map: field
//! splitting may act only on an unquoted character of soft-expansion
//! origin, and pathname expansion treats quoted and hard-expansion
//! characters as literal. The attributes and the character value always
//! travel together.

/// Origin of an expanded character
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// The character appeared literally in the word.
    Literal,
    /// The character came from a tilde expansion or a brace sequence
    /// expansion; it is literal in pathname expansion and never split.
    HardExpansion,
    /// The character came from a parameter expansion or a command
    /// substitution; it is subject to field splitting where unquoted.
    SoftExpansion,
}

/// Character with expansion attributes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttrChar {
    pub value: char,
    pub origin: Origin,
    /// Whether the character is quoted by another character
    pub is_quoted: bool,
    /// Whether this character quotes other characters
    ///
    /// A character can be quoting and quoted at once, like the backslash
    /// in `"\$"`.
    pub is_quoting: bool,
}

impl AttrChar {
    /// Plain unquoted literal character
    #[must_use]
    pub fn literal(value: char) -> Self {
        AttrChar {
            value,
            origin: Origin::Literal,
            is_quoted: false,
            is_quoting: false,
        }
    }

    /// Whether field splitting may break the field at this character.
    #[must_use]
    pub fn is_splittable(&self) -> bool {
        self.origin == Origin::SoftExpansion && !self.is_quoted && !self.is_quoting
    }

    /// Whether the character may act as pattern syntax.
    ///
    /// Quoted characters, quoting characters, and hard-expansion output
    /// match only themselves, both in parameter expansion modifiers and
    /// in pathname expansion.
    #[must_use]
    pub fn is_pattern_active(&self) -> bool {
        !self.is_quoted && !self.is_quoting && self.origin != Origin::HardExpansion
    }
}

/// Converts a string to a field of identically-attributed characters.
#[must_use]
pub fn to_field(value: &str, origin: Origin, is_quoted: bool) -> Vec<AttrChar> {
    value
        .chars()
        .map(|value| AttrChar {
            value,
            origin,
            is_quoted,
            is_quoting: false,
        })
        .collect()
}
