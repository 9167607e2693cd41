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

//! Trim modifier semantics (`${x#p}`, `${x##p}`, `${x%p}`, `${x%%p}`)

use super::super::Ctx;
use super::super::Error;
use rosh_fnmatch::Config;
use rosh_syntax::syntax::Trim;
use rosh_syntax::syntax::TrimLength;
use rosh_syntax::syntax::TrimSide;

/// Applies a trim modifier to each value element.
pub(super) fn apply(ctx: &mut Ctx<'_>, trim: &Trim, values: &mut [String]) -> Result<(), Error> {
    let mut config = Config::default();
    match trim.side {
        TrimSide::Prefix => config.anchor_begin = true,
        TrimSide::Suffix => config.anchor_end = true,
    }
    match trim.length {
        TrimLength::Shortest => config.shortest_match = true,
        TrimLength::Longest => {}
    }
    let Some(pattern) = super::compile_pattern(ctx, &trim.pattern, config)? else {
        // A broken pattern matches nothing.
        return Ok(());
    };

    for value in values {
        if let Some(range) = pattern.find(value) {
            value.drain(range);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::super::tests::ctx_env;
    use super::super::super::tests::expand_param_str;
    use rosh_env::variable::{Scope, Value};
    use rosh_syntax::syntax::{Modifier, Param, ParamTarget, Trim, TrimLength, TrimSide, Word};

    fn trim_param(name: &str, side: TrimSide, length: TrimLength, pattern: &str) -> Param {
        Param {
            target: ParamTarget::Name(name.to_string()),
            modifier: Modifier::Trim(Trim {
                side,
                length,
                pattern: Word::from(pattern),
            }),
        }
    }

    fn env_with(name: &str, value: &str) -> rosh_env::Env {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, name, Value::scalar(value))
            .unwrap();
        env
    }

    #[test]
    fn shortest_prefix() {
        let mut env = env_with("x", "123123123");
        let param = trim_param("x", TrimSide::Prefix, TrimLength::Shortest, "*2");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["3123123".to_string()])
        );
    }

    #[test]
    fn longest_prefix() {
        let mut env = env_with("x", "123123123");
        let param = trim_param("x", TrimSide::Prefix, TrimLength::Longest, "*2");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["3".to_string()]));
    }

    #[test]
    fn shortest_suffix() {
        let mut env = env_with("x", "123123123");
        let param = trim_param("x", TrimSide::Suffix, TrimLength::Shortest, "2*");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["1231231".to_string()])
        );
    }

    #[test]
    fn longest_suffix() {
        let mut env = env_with("x", "123123123");
        let param = trim_param("x", TrimSide::Suffix, TrimLength::Longest, "2*");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["1".to_string()]));
    }

    #[test]
    fn trim_applies_to_each_array_element() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a/b", "c/d"]);
        let param = trim_param("@", TrimSide::Suffix, TrimLength::Longest, "/*");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn unmatched_pattern_leaves_value() {
        let mut env = env_with("x", "hello");
        let param = trim_param("x", TrimSide::Prefix, TrimLength::Shortest, "z*");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["hello".to_string()]));
    }

    #[test]
    fn quoted_pattern_chars_are_literal() {
        let mut env = env_with("x", "*x");
        let param = trim_param("x", TrimSide::Prefix, TrimLength::Shortest, "\\*");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["x".to_string()]));
    }
}
