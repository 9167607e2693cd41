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

//! Initial expansion: the word-to-phrase pass
//!
//! This pass walks the word units left to right, performing tilde
//! expansion, quote tracking, parameter expansion, and command
//! substitution, and produces a phrase of attributed characters.
//! Quotation characters stay in the output as `is_quoting` characters;
//! their presence is what keeps a quoted empty word alive through field
//! splitting.
//!
//! A word that produced only quoting characters still yields its one
//! field — unless the word contained `$@`-like expansion with no
//! positional parameters, whose zero fields must not degrade into a
//! quoted empty argument. That is the suppression rule.

use super::attr::to_field;
use super::attr::AttrChar;
use super::attr::Origin;
use super::param;
use super::phrase::Phrase;
use super::tilde;
use super::Ctx;
use super::Error;
use super::TildeMode;
use rosh_syntax::syntax::Word;
use rosh_syntax::syntax::WordUnit;

/// Characters a backslash can escape inside double quotes
const ESCAPABLE_IN_QUOTES: [char; 4] = ['$', '`', '"', '\\'];

/// Expands a word into a phrase of attributed characters.
pub(crate) fn expand_word_attr(
    ctx: &mut Ctx<'_>,
    word: &Word,
    tilde_mode: TildeMode,
) -> Result<Phrase, Error> {
    let mut fields: Vec<Vec<AttrChar>> = Vec::new();
    let mut buf: Vec<AttrChar> = Vec::new();
    let mut in_double_quotes = false;
    let mut suppress = false;

    for (index, unit) in word.units.iter().enumerate() {
        let first = index == 0;
        let has_next = index + 1 < word.units.len();
        match unit {
            WordUnit::Literal(text) => scan_literal(
                ctx,
                text,
                first,
                has_next,
                tilde_mode,
                &mut in_double_quotes,
                &mut buf,
            ),
            WordUnit::Param(param) => {
                let phrase = param::expand_param(ctx, param, in_double_quotes, tilde_mode)?;
                if phrase.is_zero_fields() {
                    suppress = true;
                } else {
                    append_phrase(&mut fields, &mut buf, phrase);
                }
            }
            WordUnit::CommandSubst { content } => {
                let output = ctx
                    .runner
                    .capture_output(ctx.env, content)
                    .map_err(Error::CommandSubst)?;
                let output = output.trim_end_matches('\n');
                buf.extend(to_field(output, Origin::SoftExpansion, in_double_quotes));
            }
            WordUnit::ArithSubst { .. } => return Err(Error::ArithUnimplemented),
        }
    }

    // Emit the final field. A buffer of quoting characters alone stands
    // for a quoted empty word and is kept, subject to suppression.
    let has_content = buf.iter().any(|c| !c.is_quoting);
    if has_content || (!buf.is_empty() && !suppress) {
        fields.push(buf);
    }
    Ok(Phrase::Full(fields))
}

/// Merges a multi-field expansion into the accumulated fields.
///
/// The first field continues the current buffer; the last field starts
/// the next one; any fields between pass through unchanged.
fn append_phrase(fields: &mut Vec<Vec<AttrChar>>, buf: &mut Vec<AttrChar>, phrase: Phrase) {
    let mut new_fields = phrase.into_fields();
    let last = new_fields.pop();
    let mut iter = new_fields.into_iter();
    if let Some(head) = iter.next() {
        buf.extend(head);
        fields.push(std::mem::take(buf));
    }
    fields.extend(iter);
    if let Some(last) = last {
        if buf.is_empty() {
            *buf = last;
        } else {
            buf.extend(last);
        }
    }
}

/// Scans the raw text of a literal unit, resolving quotation marks and
/// tilde prefixes.
fn scan_literal(
    ctx: &mut Ctx<'_>,
    text: &str,
    first_unit: bool,
    has_next: bool,
    tilde_mode: TildeMode,
    in_double_quotes: &mut bool,
    buf: &mut Vec<AttrChar>,
) {
    let mut rest = text;
    if first_unit && tilde_mode != TildeMode::None {
        if let Some(prefix) = tilde::expand(ctx.env, rest, has_next, tilde_mode) {
            buf.extend(prefix.chars);
            rest = &rest[prefix.consumed..];
        }
    }

    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' => {
                *in_double_quotes = !*in_double_quotes;
                buf.push(quoting_char('"'));
                i += 1;
            }
            '\'' if !*in_double_quotes => {
                buf.push(quoting_char('\''));
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    buf.push(AttrChar {
                        value: chars[i],
                        origin: Origin::Literal,
                        is_quoted: true,
                        is_quoting: false,
                    });
                    i += 1;
                }
                if i < chars.len() {
                    buf.push(quoting_char('\''));
                    i += 1;
                }
            }
            '\\' if !*in_double_quotes
                || matches!(chars.get(i + 1), Some(c) if ESCAPABLE_IN_QUOTES.contains(c)) =>
            {
                buf.push(AttrChar {
                    value: '\\',
                    origin: Origin::Literal,
                    is_quoted: *in_double_quotes,
                    is_quoting: true,
                });
                i += 1;
                if i < chars.len() {
                    buf.push(AttrChar {
                        value: chars[i],
                        origin: Origin::Literal,
                        is_quoted: true,
                        is_quoting: false,
                    });
                    i += 1;
                }
            }
            ':' if !*in_double_quotes && tilde_mode == TildeMode::Multi => {
                buf.push(AttrChar::literal(':'));
                i += 1;
                let remainder: String = chars[i..].iter().collect();
                if let Some(prefix) = tilde::expand(ctx.env, &remainder, has_next, tilde_mode) {
                    i += remainder[..prefix.consumed].chars().count();
                    buf.extend(prefix.chars);
                }
            }
            value => {
                buf.push(AttrChar {
                    value,
                    origin: Origin::Literal,
                    is_quoted: *in_double_quotes,
                    is_quoting: false,
                });
                i += 1;
            }
        }
    }
}

fn quoting_char(value: char) -> AttrChar {
    AttrChar {
        value,
        origin: Origin::Literal,
        is_quoted: false,
        is_quoting: true,
    }
}

#[cfg(test)]
mod tests {
    use super::super::attr_strip::strip_field;
    use super::super::tests::ctx_env;
    use super::super::NoCommandSubst;
    use super::*;
    use rosh_env::variable::{Scope, Value};
    use rosh_syntax::syntax::Param;

    fn expand(env: &mut rosh_env::Env, word: &Word) -> Phrase {
        let mut ctx = Ctx {
            env,
            runner: &mut NoCommandSubst,
        };
        expand_word_attr(&mut ctx, word, TildeMode::Single).unwrap()
    }

    fn strings(phrase: Phrase) -> Vec<String> {
        phrase.into_fields().into_iter().map(strip_field).collect()
    }

    #[test]
    fn plain_literal() {
        let mut env = ctx_env();
        let phrase = expand(&mut env, &Word::from("hello"));
        assert_eq!(strings(phrase), ["hello"]);
    }

    #[test]
    fn quoted_empty_word_survives() {
        let mut env = ctx_env();
        let phrase = expand(&mut env, &Word::from("\"\""));
        assert_eq!(strings(phrase), [""]);

        let phrase = expand(&mut env, &Word::from("''"));
        assert_eq!(strings(phrase), [""]);
    }

    #[test]
    fn unquoted_empty_expansion_vanishes() {
        let mut env = ctx_env();
        let mut word = Word::default();
        word.units.push(WordUnit::Param(Param::new("unset")));
        let phrase = expand(&mut env, &word);
        assert_eq!(phrase.field_count(), 0);
    }

    #[test]
    fn quoted_empty_expansion_survives() {
        let mut env = ctx_env();
        let mut word = Word::default();
        word.units.push(WordUnit::Literal("\"".to_string()));
        word.units.push(WordUnit::Param(Param::new("unset")));
        word.units.push(WordUnit::Literal("\"".to_string()));
        let phrase = expand(&mut env, &word);
        assert_eq!(strings(phrase), [""]);
    }

    #[test]
    fn quoted_at_with_no_params_suppresses_the_word() {
        let mut env = ctx_env();
        let mut word = Word::default();
        word.units.push(WordUnit::Literal("\"".to_string()));
        word.units.push(WordUnit::Param(Param::new("@")));
        word.units.push(WordUnit::Literal("\"".to_string()));
        let phrase = expand(&mut env, &word);
        assert_eq!(phrase.field_count(), 0);
    }

    #[test]
    fn quoted_at_produces_one_field_per_param() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a", "", "c"]);
        let mut word = Word::default();
        word.units.push(WordUnit::Literal("\"".to_string()));
        word.units.push(WordUnit::Param(Param::new("@")));
        word.units.push(WordUnit::Literal("\"".to_string()));
        let phrase = expand(&mut env, &word);
        assert_eq!(
            strings(phrase),
            ["a".to_string(), String::new(), "c".to_string()]
        );
    }

    #[test]
    fn at_fields_join_with_neighbours() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a", "b"]);
        let mut word = Word::default();
        word.units.push(WordUnit::Literal("x\"".to_string()));
        word.units.push(WordUnit::Param(Param::new("@")));
        word.units.push(WordUnit::Literal("\"y".to_string()));
        let phrase = expand(&mut env, &word);
        assert_eq!(strings(phrase), ["xa".to_string(), "by".to_string()]);
    }

    #[test]
    fn double_quotes_span_units() {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, "x", Value::scalar("a b"))
            .unwrap();
        let mut word = Word::default();
        word.units.push(WordUnit::Literal("\"".to_string()));
        word.units.push(WordUnit::Param(Param::new("x")));
        word.units.push(WordUnit::Literal("\"".to_string()));
        let phrase = expand(&mut env, &word);
        let fields = phrase.into_fields();
        assert_eq!(fields.len(), 1);
        // Every value character is quoted, so nothing is splittable.
        assert!(fields[0].iter().all(|c| !c.is_splittable()));
    }

    #[test]
    fn single_quotes_protect_contents() {
        let mut env = ctx_env();
        let phrase = expand(&mut env, &Word::from("'a b'"));
        let fields = phrase.into_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(strip_field(fields[0].clone()), "a b");
        assert!(fields[0][1].is_quoted);
    }

    #[test]
    fn backslash_quotes_next_char() {
        let mut env = ctx_env();
        let phrase = expand(&mut env, &Word::from("a\\ b"));
        let fields = phrase.into_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(strip_field(fields[0].clone()), "a b");
        assert!(fields[0][2].is_quoted);
    }

    #[test]
    fn backslash_in_quotes_is_literal_unless_escapable() {
        let mut env = ctx_env();
        let phrase = expand(&mut env, &Word::from("\"a\\b\""));
        let fields = phrase.into_fields();
        assert_eq!(strip_field(fields[0].clone()), "a\\b");

        let phrase = expand(&mut env, &Word::from("\"a\\$b\""));
        let fields = phrase.into_fields();
        assert_eq!(strip_field(fields[0].clone()), "a$b");
    }

    #[test]
    fn arith_subst_is_a_defined_error() {
        let mut env = ctx_env();
        let mut word = Word::default();
        word.units.push(WordUnit::ArithSubst {
            content: "1+1".to_string(),
        });
        let mut ctx = Ctx {
            env: &mut env,
            runner: &mut NoCommandSubst,
        };
        let result = expand_word_attr(&mut ctx, &word, TildeMode::Single);
        assert_eq!(result.unwrap_err(), Error::ArithUnimplemented);
    }
}
