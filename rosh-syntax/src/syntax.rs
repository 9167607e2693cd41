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

//! Word tree definitions
//!
//! A [`Word`] is the unit of expansion. Its [`WordUnit`]s carry literal
//! text verbatim, including any `"`, `'` and `\` quotation characters;
//! quoting is resolved during expansion, not during parsing. Parameter
//! expansions are fully structured: the modifier enums below are closed,
//! and consumers match on them exhaustively.

use itertools::Itertools;
use std::fmt;

/// Element of a [`Word`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WordUnit {
    /// Literal text with quotation characters still in place
    Literal(String),
    /// Parameter expansion (`$name`, `${name...}`)
    Param(Param),
    /// Command substitution (`$(...)`); the content is the unparsed
    /// command source handed back to the dispatcher
    CommandSubst { content: String },
    /// Arithmetic substitution (`$((...))`)
    ArithSubst { content: String },
}

/// Sequence of word units that expands to zero or more fields
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Word {
    pub units: Vec<WordUnit>,
}

impl Word {
    /// Returns true if the word contains no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// A literal string becomes a single-unit word.
impl From<&str> for Word {
    fn from(s: &str) -> Self {
        Word {
            units: vec![WordUnit::Literal(s.to_string())],
        }
    }
}

/// Subject of a parameter expansion
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParamTarget {
    /// Variable, positional parameter, or special parameter name
    Name(String),
    /// Nested expansion (`${${...}...}`)
    Nested(Box<Word>),
}

/// Condition under which a [`Switch`] modifier applies
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwitchCondition {
    /// The parameter is not set (`${name-word}`).
    Unset,
    /// The parameter is not set or has an empty value (`${name:-word}`).
    UnsetOrEmpty,
}

/// Action of a [`Switch`] modifier
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwitchKind {
    /// `${name-word}`: use `word` if the condition holds
    Default,
    /// `${name=word}`: assign `word` to the parameter, then use it
    Assign,
    /// `${name?word}`: fail the expansion with `word` as the message
    Error,
    /// `${name+word}`: use `word` unless the condition holds
    Alter,
}

/// Modifier that substitutes an alternative word depending on the state
/// of the parameter value
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Switch {
    pub kind: SwitchKind,
    pub condition: SwitchCondition,
    pub word: Word,
}

/// End of the value a [`Trim`] modifier removes from
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrimSide {
    /// `${name#pattern}` / `${name##pattern}`
    Prefix,
    /// `${name%pattern}` / `${name%%pattern}`
    Suffix,
}

/// Match length preference of a [`Trim`] modifier
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrimLength {
    Shortest,
    Longest,
}

/// Modifier that removes a matching prefix or suffix from the value
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trim {
    pub side: TrimSide,
    pub length: TrimLength,
    pub pattern: Word,
}

/// Placement of the match a [`Subst`] modifier replaces
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SubstKind {
    /// `${name/pattern/word}`: replace the leftmost match
    First,
    /// `${name//pattern/word}`: replace every non-empty match
    All,
    /// `${name/#pattern/word}`: replace a match anchored at the head
    Prefix,
    /// `${name/%pattern/word}`: replace a match anchored at the tail
    Suffix,
    /// a match must span the whole value
    Whole,
}

/// Modifier that replaces matching substrings of the value
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subst {
    pub kind: SubstKind,
    pub pattern: Word,
    pub replacement: Word,
}

/// Modifier applied to a parameter expansion
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Modifier {
    /// Bare expansion (`$name`, `${name}`)
    None,
    /// `${#name}`: each value element becomes its character count
    Length,
    Switch(Switch),
    Trim(Trim),
    Subst(Subst),
}

/// Parameter expansion unit
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub target: ParamTarget,
    pub modifier: Modifier,
}

impl Param {
    /// Creates a plain expansion of the named parameter.
    #[must_use]
    pub fn new<N: Into<String>>(name: N) -> Self {
        Param {
            target: ParamTarget::Name(name.into()),
            modifier: Modifier::None,
        }
    }

    /// Name of the parameter, or `None` for a nested expansion.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.target {
            ParamTarget::Name(name) => Some(name),
            ParamTarget::Nested(_) => None,
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.units.iter().try_for_each(|unit| unit.fmt(f))
    }
}

/// Reconstructs an approximation of the source text of the unit.
impl fmt::Display for WordUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordUnit::Literal(text) => text.fmt(f),
            WordUnit::Param(param) => param.fmt(f),
            WordUnit::CommandSubst { content } => write!(f, "$({content})"),
            WordUnit::ArithSubst { content } => write!(f, "$(({content}))"),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            ParamTarget::Name(name) => name.clone(),
            ParamTarget::Nested(word) => format!("${word}"),
        };
        match &self.modifier {
            Modifier::None => write!(f, "${{{target}}}"),
            Modifier::Length => write!(f, "${{#{target}}}"),
            Modifier::Switch(switch) => {
                let colon = match switch.condition {
                    SwitchCondition::Unset => "",
                    SwitchCondition::UnsetOrEmpty => ":",
                };
                let op = match switch.kind {
                    SwitchKind::Default => '-',
                    SwitchKind::Assign => '=',
                    SwitchKind::Error => '?',
                    SwitchKind::Alter => '+',
                };
                write!(f, "${{{target}{colon}{op}{}}}", switch.word)
            }
            Modifier::Trim(trim) => {
                let op = match (trim.side, trim.length) {
                    (TrimSide::Prefix, TrimLength::Shortest) => "#",
                    (TrimSide::Prefix, TrimLength::Longest) => "##",
                    (TrimSide::Suffix, TrimLength::Shortest) => "%",
                    (TrimSide::Suffix, TrimLength::Longest) => "%%",
                };
                write!(f, "${{{target}{op}{}}}", trim.pattern)
            }
            Modifier::Subst(subst) => {
                let op = match subst.kind {
                    SubstKind::First => "/",
                    SubstKind::All => "//",
                    SubstKind::Prefix => "/#",
                    SubstKind::Suffix => "/%",
                    SubstKind::Whole => "/:",
                };
                write!(f, "${{{target}{op}{}/{}}}", subst.pattern, subst.replacement)
            }
        }
    }
}

/// Command handed to the pipeline launcher
///
/// The dispatcher resolves command words into an argument vector before
/// the core forks; the core never searches `$PATH` itself. `name` is the
/// textual rendering used in job reports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternalCommand {
    pub argv: Vec<String>,
    pub name: String,
}

impl ExternalCommand {
    /// Creates a command whose name is the space-joined argument vector.
    #[must_use]
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let name = argv.iter().join(" ");
        ExternalCommand { argv, name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_from_str() {
        let word = Word::from("foo");
        assert_eq!(word.units, [WordUnit::Literal("foo".to_string())]);
        assert!(!word.is_empty());
        assert!(Word::default().is_empty());
    }

    #[test]
    fn param_display() {
        let param = Param::new("foo");
        assert_eq!(param.to_string(), "${foo}");

        let param = Param {
            target: ParamTarget::Name("x".to_string()),
            modifier: Modifier::Switch(Switch {
                kind: SwitchKind::Default,
                condition: SwitchCondition::UnsetOrEmpty,
                word: Word::from("def"),
            }),
        };
        assert_eq!(param.to_string(), "${x:-def}");

        let param = Param {
            target: ParamTarget::Name("x".to_string()),
            modifier: Modifier::Trim(Trim {
                side: TrimSide::Suffix,
                length: TrimLength::Longest,
                pattern: Word::from("*/"),
            }),
        };
        assert_eq!(param.to_string(), "${x%%*/}");
    }

    #[test]
    fn external_command_name() {
        let command = ExternalCommand::new(["grep", "-q", "foo"]);
        assert_eq!(command.name, "grep -q foo");
        assert_eq!(command.argv.len(), 3);
    }
}
