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

//! Substitute modifier semantics (`${x/p/r}` and friends)

use super::super::attr_strip::strip_field;
use super::super::initial;
use super::super::Ctx;
use super::super::Error;
use super::super::TildeMode;
use rosh_fnmatch::Config;
use rosh_fnmatch::Pattern;
use rosh_syntax::syntax::Subst;
use rosh_syntax::syntax::SubstKind;

/// Applies a substitute modifier to each value element.
pub(super) fn apply(ctx: &mut Ctx<'_>, subst: &Subst, values: &mut [String]) -> Result<(), Error> {
    let mut config = Config::default();
    match subst.kind {
        SubstKind::First | SubstKind::All => {}
        SubstKind::Prefix => config.anchor_begin = true,
        SubstKind::Suffix => config.anchor_end = true,
        SubstKind::Whole => {
            config.anchor_begin = true;
            config.anchor_end = true;
        }
    }
    let Some(pattern) = super::compile_pattern(ctx, &subst.pattern, config)? else {
        // A broken pattern matches nothing.
        return Ok(());
    };

    let replacement_phrase = initial::expand_word_attr(ctx, &subst.replacement, TildeMode::Single)?;
    let joiner = ctx.env.variables.ifs_joiner();
    let replacement = strip_field(replacement_phrase.ifs_join(&joiner));

    for value in values {
        match subst.kind {
            SubstKind::Whole => {
                if pattern.is_match(value) {
                    *value = replacement.clone();
                }
            }
            SubstKind::Prefix | SubstKind::Suffix => {
                if let Some(range) = pattern.find(value) {
                    value.replace_range(range, &replacement);
                }
            }
            SubstKind::First => *value = scan_replace(value, &pattern, &replacement, false),
            SubstKind::All => *value = scan_replace(value, &pattern, &replacement, true),
        }
    }
    Ok(())
}

/// Replaces the leftmost match, or every non-empty match, scanning left
/// to right and advancing past each replacement.
fn scan_replace(subject: &str, pattern: &Pattern, replacement: &str, all: bool) -> String {
    let mut result = String::with_capacity(subject.len());
    let mut rest = subject;
    loop {
        match pattern.find(rest) {
            None => {
                result.push_str(rest);
                return result;
            }
            Some(range) if range.is_empty() => {
                // Empty matches are skipped, character by character.
                let Some(c) = rest[range.start..].chars().next() else {
                    result.push_str(rest);
                    return result;
                };
                let keep = range.start + c.len_utf8();
                result.push_str(&rest[..keep]);
                rest = &rest[keep..];
            }
            Some(range) => {
                result.push_str(&rest[..range.start]);
                result.push_str(replacement);
                rest = &rest[range.end..];
                if !all {
                    result.push_str(rest);
                    return result;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::tests::ctx_env;
    use super::super::super::tests::expand_param_str;
    use rosh_env::variable::{Scope, Value};
    use rosh_syntax::syntax::{Modifier, Param, ParamTarget, Subst, SubstKind, Word};

    fn subst_param(name: &str, kind: SubstKind, pattern: &str, replacement: &str) -> Param {
        Param {
            target: ParamTarget::Name(name.to_string()),
            modifier: Modifier::Subst(Subst {
                kind,
                pattern: Word::from(pattern),
                replacement: Word::from(replacement),
            }),
        }
    }

    fn env_with(value: &str) -> rosh_env::Env {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, "x", Value::scalar(value))
            .unwrap();
        env
    }

    #[test]
    fn replace_first() {
        let mut env = env_with("aXbXc");
        let param = subst_param("x", SubstKind::First, "X", "-");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["a-bXc".to_string()]));
    }

    #[test]
    fn replace_all() {
        let mut env = env_with("aXbXc");
        let param = subst_param("x", SubstKind::All, "X", "-");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["a-b-c".to_string()]));
    }

    #[test]
    fn replace_all_with_wildcard() {
        let mut env = env_with("foo.bar.baz");
        let param = subst_param("x", SubstKind::All, "b*.", "");
        // The longest match wins at the first matching position.
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["foo.baz".to_string()]));
    }

    #[test]
    fn replace_prefix() {
        let mut env = env_with("abcabc");
        let param = subst_param("x", SubstKind::Prefix, "a*c", "X");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["X".to_string()]));

        let param = subst_param("x", SubstKind::Prefix, "b*", "X");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["abcabc".to_string()])
        );
    }

    #[test]
    fn replace_suffix() {
        let mut env = env_with("abcabc");
        let param = subst_param("x", SubstKind::Suffix, "c", "Z");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["abcabZ".to_string()]));
    }

    #[test]
    fn replace_whole() {
        let mut env = env_with("anything");
        let param = subst_param("x", SubstKind::Whole, "a*g", "gone");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["gone".to_string()]));

        let param = subst_param("x", SubstKind::Whole, "a*z", "gone");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["anything".to_string()])
        );
    }

    #[test]
    fn empty_matches_do_not_loop() {
        let mut env = env_with("abc");
        let param = subst_param("x", SubstKind::All, "z*", "!");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["abc".to_string()]));
    }
}
