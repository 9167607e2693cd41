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

//! Tilde expansion
//!
//! The leading segment of a word starting with `~`, up to the first `/`
//! (or, in assignment contexts, the first `/` or `:`), names a home
//! directory: `~` alone is `$HOME`, `~+` is `$PWD`, `~-` is `$OLDPWD`,
//! and `~user` is `user`'s home directory. A segment containing any
//! quotation character is left alone, as is a name that cannot be
//! resolved. In POSIX mode only `~` and `~user` are recognised.
//!
//! The expanded directory is made of hard-expansion characters so later
//! phases neither split it nor treat it as a pattern.

use super::attr::to_field;
use super::attr::AttrChar;
use super::attr::Origin;
use super::TildeMode;
use rosh_env::variable;
use rosh_env::Env;

/// Result of a successful tilde expansion
pub(crate) struct TildePrefix {
    /// Bytes of the literal text consumed, including the `~`
    pub consumed: usize,
    /// Replacement characters
    pub chars: Vec<AttrChar>,
}

/// Expands a tilde prefix at the start of `text`.
///
/// `has_next_unit` tells whether another word unit follows the literal
/// being scanned; a segment not terminated by a delimiter expands only
/// when the literal is the last unit, because the following unit could
/// still extend the name.
pub(crate) fn expand(
    env: &mut Env,
    text: &str,
    has_next_unit: bool,
    mode: TildeMode,
) -> Option<TildePrefix> {
    debug_assert!(mode != TildeMode::None);
    let rest = text.strip_prefix('~')?;

    let delimiters: &[char] = match mode {
        TildeMode::Single => &['/'],
        _ => &['/', ':'],
    };
    let name = match rest.find(delimiters) {
        Some(end) => &rest[..end],
        None if has_next_unit => return None,
        None => rest,
    };

    if name.contains(['"', '\'', '\\']) {
        return None;
    }

    let posix = env.posixly_correct();
    let home = match name {
        "" => env.variables.scalar(variable::HOME).map(str::to_owned),
        "+" if !posix => env.variables.scalar(variable::PWD).map(str::to_owned),
        "-" if !posix => env.variables.scalar(variable::OLDPWD).map(str::to_owned),
        "+" | "-" => None,
        user => env.system.home_directory(user),
    }?;

    Some(TildePrefix {
        consumed: 1 + name.len(),
        chars: to_field(&home, Origin::HardExpansion, false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosh_env::option::ShellOption;
    use rosh_env::system::virtual_system::VirtualSystem;
    use rosh_env::variable::{Scope, Value};

    fn env() -> Env {
        let system = VirtualSystem::new();
        system
            .state
            .borrow_mut()
            .home_directories
            .insert("alice".to_string(), "/home/alice".to_string());
        let mut env = Env::with_system(Box::new(system));
        for (name, value) in [
            (variable::HOME, "/home/me"),
            (variable::PWD, "/tmp/work"),
            (variable::OLDPWD, "/tmp/old"),
        ] {
            env.variables
                .assign(Scope::Global, name, Value::scalar(value))
                .unwrap();
        }
        env
    }

    fn text_of(prefix: &TildePrefix) -> String {
        prefix.chars.iter().map(|c| c.value).collect()
    }

    #[test]
    fn bare_tilde_expands_to_home() {
        let mut env = env();
        let prefix = expand(&mut env, "~", false, TildeMode::Single).unwrap();
        assert_eq!(prefix.consumed, 1);
        assert_eq!(text_of(&prefix), "/home/me");
        assert!(prefix.chars.iter().all(|c| c.origin == Origin::HardExpansion));
    }

    #[test]
    fn tilde_with_slash() {
        let mut env = env();
        let prefix = expand(&mut env, "~/doc", true, TildeMode::Single).unwrap();
        assert_eq!(prefix.consumed, 1);
        assert_eq!(text_of(&prefix), "/home/me");
    }

    #[test]
    fn named_user() {
        let mut env = env();
        let prefix = expand(&mut env, "~alice/x", false, TildeMode::Single).unwrap();
        assert_eq!(prefix.consumed, 6);
        assert_eq!(text_of(&prefix), "/home/alice");

        assert!(expand(&mut env, "~nobody", false, TildeMode::Single).is_none());
    }

    #[test]
    fn plus_and_minus() {
        let mut env = env();
        let prefix = expand(&mut env, "~+", false, TildeMode::Single).unwrap();
        assert_eq!(text_of(&prefix), "/tmp/work");
        let prefix = expand(&mut env, "~-", false, TildeMode::Single).unwrap();
        assert_eq!(text_of(&prefix), "/tmp/old");
    }

    #[test]
    fn plus_and_minus_rejected_in_posix_mode() {
        let mut env = env();
        env.options.set(ShellOption::PosixlyCorrect, true);
        assert!(expand(&mut env, "~+", false, TildeMode::Single).is_none());
        assert!(expand(&mut env, "~-", false, TildeMode::Single).is_none());
        // ~ and ~user still work.
        assert!(expand(&mut env, "~", false, TildeMode::Single).is_some());
        assert!(expand(&mut env, "~alice", false, TildeMode::Single).is_some());
    }

    #[test]
    fn quoted_name_abandons_expansion() {
        let mut env = env();
        assert!(expand(&mut env, "~al\\ice", false, TildeMode::Single).is_none());
        assert!(expand(&mut env, "~'a'", false, TildeMode::Single).is_none());
    }

    #[test]
    fn colon_delimits_in_multi_mode() {
        let mut env = env();
        let prefix = expand(&mut env, "~:x", false, TildeMode::Multi).unwrap();
        assert_eq!(prefix.consumed, 1);
        assert_eq!(text_of(&prefix), "/home/me");
        // In single mode the colon is part of the name.
        assert!(expand(&mut env, "~:x", false, TildeMode::Single).is_none());
    }

    #[test]
    fn unterminated_name_with_more_units() {
        let mut env = env();
        assert!(expand(&mut env, "~ali", true, TildeMode::Single).is_none());
    }
}
