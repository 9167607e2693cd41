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

//! Word expansion
//!
//! Expansion turns words into fields in a fixed sequence of phases:
//! tilde expansion, parameter/command/arithmetic substitution, and
//! quote resolution (the [initial] pass); then [brace] expansion,
//! [field splitting](split), and [pathname expansion](glob) with quote
//! removal and attribute stripping at the end.
//!
//! Four entry points select how much of the pipeline runs:
//!
//! - [`expand_line`] runs everything and yields an argument vector.
//! - [`expand_single`] yields exactly one string: multiple fields are
//!   joined with the first `$IFS` character, and brace expansion, field
//!   splitting and pathname expansion are skipped.
//! - [`expand_single_with_glob`] is the variant for arguments that name
//!   one file: pathname expansion runs, and more than one match is an
//!   error outside POSIX mode.
//! - [`expand_string`] is for here-document bodies: quotation marks are
//!   ordinary characters and only `\$`, `` \` `` and `\\` are escapes.
//!
//! Command substitution is delegated to the dispatcher through the
//! [`CommandRunner`] hook. Arithmetic substitution is a defined
//! [`Error::ArithUnimplemented`] failure.

pub mod attr;
pub mod attr_strip;
pub mod brace;
mod initial;
pub mod param;
pub mod phrase;
pub mod split;
mod glob;
mod tilde;

use self::attr_strip::strip_field;
use self::split::Ifs;
use rosh_env::system::Errno;
use rosh_env::variable::AssignError;
use rosh_env::Env;
use rosh_syntax::syntax::Word;
use thiserror::Error as ThisError;

/// Tilde expansion flavour of an expansion context
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TildeMode {
    /// No tilde expansion
    None,
    /// `~` at the start of the word only
    Single,
    /// `~` after every unquoted `:` as well, for assignment values
    Multi,
}

/// Hook for running command substitutions
///
/// The command dispatcher implements this trait; the expansion core
/// only hands over the command source and consumes the output.
pub trait CommandRunner {
    /// Executes the command and returns its captured standard output.
    fn capture_output(&mut self, env: &mut Env, command: &str) -> Result<String, Errno>;
}

/// Runner that fails every command substitution
///
/// Useful in contexts that must not run commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCommandSubst;

impl CommandRunner for NoCommandSubst {
    fn capture_output(&mut self, _env: &mut Env, _command: &str) -> Result<String, Errno> {
        Err(Errno::ENOSYS)
    }
}

/// Error in word expansion
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("arithmetic expansion is not implemented")]
    ArithUnimplemented,

    /// `${name?message}` applied to an unset or empty parameter
    #[error("{name}: {message}")]
    VacantExpansion { name: String, message: String },

    /// `${...=word}` applied to a nested expansion
    #[error("invalid assignment in parameter expansion")]
    NestedAssignment,

    /// Assignment to a read-only variable or an invalid name
    #[error(transparent)]
    Assignment(#[from] AssignError),

    /// The dispatcher failed to run a command substitution
    #[error("command substitution failed: {0}")]
    CommandSubst(Errno),

    /// Pathname expansion of a single-file operand found several files
    #[error("`{0}': not a single file")]
    NotSingleFile(String),
}

/// Expansion context: the environment plus the substitution hook
pub(crate) struct Ctx<'a> {
    pub env: &'a mut Env,
    pub runner: &'a mut dyn CommandRunner,
}

/// Expands words into an argument vector (phases 1 through 7).
///
/// Hard failures (a `${name?}` error, a failed command substitution, an
/// arithmetic substitution) abort the whole line; the caller of a
/// non-interactive shell is expected to exit with
/// [`ExitStatus::EXP_ERROR`](rosh_env::semantics::ExitStatus::EXP_ERROR).
/// A word that cannot be encoded for the platform degrades to an empty
/// string with a diagnostic instead.
pub fn expand_line(
    env: &mut Env,
    runner: &mut dyn CommandRunner,
    words: &[Word],
) -> Result<Vec<String>, Error> {
    let mut argv = Vec::new();
    for word in words {
        let phrase = {
            let mut ctx = Ctx {
                env: &mut *env,
                runner: &mut *runner,
            };
            initial::expand_word_attr(&mut ctx, word, TildeMode::Single)?
        };

        let fields = if env
            .options
            .is_on(rosh_env::option::ShellOption::BraceExpand)
        {
            phrase
                .into_fields()
                .into_iter()
                .flat_map(brace::expand_braces)
                .collect()
        } else {
            phrase.into_fields()
        };

        let ifs = env.variables.ifs().to_owned();
        let ifs = Ifs::new(&ifs);
        let split_fields: Vec<_> = fields
            .into_iter()
            .flat_map(|field| split::split_fields(field, &ifs))
            .collect();

        for field in split_fields {
            argv.extend(glob::expand_field(env, field));
        }
    }
    Ok(argv)
}

/// Expands a word to exactly one string.
///
/// Multiple expansion fields are joined with the first `$IFS`
/// character. Brace expansion, field splitting and pathname expansion
/// do not run.
pub fn expand_single(
    env: &mut Env,
    runner: &mut dyn CommandRunner,
    word: &Word,
    tilde_mode: TildeMode,
) -> Result<String, Error> {
    let field = expand_single_attrs(env, runner, word, tilde_mode)?;
    Ok(strip_field(field))
}

/// Single-string expansion keeping the character attributes.
pub(crate) fn expand_single_attrs(
    env: &mut Env,
    runner: &mut dyn CommandRunner,
    word: &Word,
    tilde_mode: TildeMode,
) -> Result<Vec<attr::AttrChar>, Error> {
    let phrase = {
        let mut ctx = Ctx {
            env: &mut *env,
            runner: &mut *runner,
        };
        initial::expand_word_attr(&mut ctx, word, tilde_mode)?
    };
    let joiner = env.variables.ifs_joiner();
    Ok(phrase.ifs_join(&joiner))
}

/// Expands a word that should name a single file.
///
/// Pathname expansion runs on the single-string expansion. With no
/// match the pattern is kept. With several matches, POSIX mode keeps
/// the pattern while otherwise the expansion fails.
pub fn expand_single_with_glob(
    env: &mut Env,
    runner: &mut dyn CommandRunner,
    word: &Word,
    tilde_mode: TildeMode,
) -> Result<String, Error> {
    let field = expand_single_attrs(env, runner, word, tilde_mode)?;
    if !env.options.is_on(rosh_env::option::ShellOption::Glob)
        || !glob::has_pattern_chars(&field)
    {
        return Ok(strip_field(field));
    }

    let pattern = glob::to_glob_pattern(&field);
    match env.system.glob(&pattern) {
        Ok(matches) if matches.len() == 1 => Ok(matches.into_iter().next().unwrap()),
        _ if env.posixly_correct() => Ok(strip_field(field)),
        _ => Err(Error::NotSingleFile(strip_field(field))),
    }
}

/// Expands a word treating quotation marks as ordinary characters.
///
/// Used for here-document bodies. With `honor_escapes`, a backslash
/// before `$`, `` ` `` or `\` hides the escaped character's special
/// meaning and is removed; every other backslash stays. Substitutions
/// expand but nothing is split or matched against pathnames.
pub fn expand_string(
    env: &mut Env,
    runner: &mut dyn CommandRunner,
    word: &Word,
    honor_escapes: bool,
) -> Result<String, Error> {
    use rosh_syntax::syntax::WordUnit;

    let mut result = String::new();
    for unit in &word.units {
        match unit {
            WordUnit::Literal(text) => {
                let mut chars = text.chars().peekable();
                while let Some(c) = chars.next() {
                    if honor_escapes && c == '\\' {
                        match chars.peek() {
                            Some(&next @ ('$' | '`' | '\\')) => {
                                result.push(next);
                                chars.next();
                            }
                            _ => result.push('\\'),
                        }
                    } else {
                        result.push(c);
                    }
                }
            }
            WordUnit::Param(p) => {
                let phrase = {
                    let mut ctx = Ctx {
                        env: &mut *env,
                        runner: &mut *runner,
                    };
                    param::expand_param(&mut ctx, p, false, TildeMode::None)?
                };
                let joiner = env.variables.ifs_joiner();
                result.push_str(&strip_field(phrase.ifs_join(&joiner)));
            }
            WordUnit::CommandSubst { content } => {
                let output = runner
                    .capture_output(env, content)
                    .map_err(Error::CommandSubst)?;
                result.push_str(output.trim_end_matches('\n'));
            }
            WordUnit::ArithSubst { .. } => return Err(Error::ArithUnimplemented),
        }
    }
    Ok(result)
}
