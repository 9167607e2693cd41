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

//! Pathname expansion
//!
//! The matching itself is the platform glob library's, reached through
//! [`System::glob`](rosh_env::system::System::glob); this module only
//! prepares its input and interprets its output. A field without any
//! active pattern character skips the library call, and a pattern that
//! matches nothing is kept as it is. A field that cannot be encoded for
//! the platform is replaced by the empty string with a diagnostic.

use super::attr::AttrChar;
use super::attr_strip::strip_field;
use rosh_env::option::ShellOption;
use rosh_env::Env;

/// Characters that direct the glob library
const GLOB_SPECIAL: &str = "*?[";
/// Characters escaped when rendering protected characters
const GLOB_ESCAPED: &str = "*?[]\\";

/// Whether the field contains an unescaped pattern character.
pub(crate) fn has_pattern_chars(field: &[AttrChar]) -> bool {
    field
        .iter()
        .any(|c| c.is_pattern_active() && GLOB_SPECIAL.contains(c.value))
}

/// Renders the field as a pattern string for the glob library, with
/// every protected character backslash-escaped.
pub(crate) fn to_glob_pattern(field: &[AttrChar]) -> String {
    let mut pattern = String::with_capacity(field.len());
    for c in field {
        if c.is_quoting {
            continue;
        }
        if !c.is_pattern_active() && GLOB_ESCAPED.contains(c.value) {
            pattern.push('\\');
        }
        pattern.push(c.value);
    }
    pattern
}

/// Expands one field into pathnames, or passes it through.
pub(crate) fn expand_field(env: &mut Env, field: Vec<AttrChar>) -> Vec<String> {
    if !env.options.is_on(ShellOption::Glob) || !has_pattern_chars(&field) {
        return vec![strip_field(field)];
    }

    let pattern = to_glob_pattern(&field);
    match env.system.glob(&pattern) {
        Ok(matches) if matches.is_empty() => vec![strip_field(field)],
        Ok(matches) => matches,
        Err(_) => {
            env.print_error(
                "expanded word contains characters that cannot be encoded \
                 and is replaced with the empty string",
            );
            vec![String::new()]
        }
    }
}
