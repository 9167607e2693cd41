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

//! Quote removal and attribute stripping, the final step of expansion
//!
//! Once brace expansion, field splitting and pathname expansion have
//! consumed the attributes, a field of [`AttrChar`]s collapses back to
//! plain text: the quotation characters (`"`, `'`, `\`) that were
//! carried this far as `is_quoting` characters disappear, and every
//! other character contributes its bare value.

use super::attr::AttrChar;

/// Collapses a field of attributed characters into a string.
#[must_use]
pub fn strip_field<I>(chars: I) -> String
where
    I: IntoIterator<Item = AttrChar>,
{
    let mut text = String::new();
    for c in chars {
        if !c.is_quoting {
            text.push(c.value);
        }
    }
    text
}
