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

//! Abstract syntax tree for shell patterns
//!
//! The parser turns a sequence of [`PatternChar`]s into an [`Ast`], which
//! is then rendered as a regular expression for the `regex` crate. A `[`
//! that does not open a well-formed bracket expression is an ordinary
//! character, so parsing never fails on unmatched brackets; only bracket
//! contents can be in error.

use crate::Config;
use crate::Error;
use crate::PatternChar;
use regex_syntax::ast::ClassAsciiKind;
use std::fmt::Write;

/// Member of a bracket expression
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BracketItem {
    /// Single character
    Char(char),
    /// Character range (`a-z`)
    Range(char, char),
    /// Named character class (`[:digit:]`)
    CharClass(String),
}

/// Bracket expression (`[...]`)
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bracket {
    /// Whether the expression starts with `!` (or `^`), inverting the set
    pub complement: bool,
    pub items: Vec<BracketItem>,
}

/// Pattern component
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Atom {
    /// Character that matches itself
    Char(char),
    /// `?`
    AnyChar,
    /// `*`
    AnyString,
    Bracket(Bracket),
}

/// Parsed pattern
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ast {
    pub atoms: Vec<Atom>,
}

/// Tries to parse a bracket expression starting just after a `[`.
///
/// Returns the bracket and the index of the character after the closing
/// `]`, or `None` if no closing `]` exists (the `[` is then an ordinary
/// character). Bracket contents that are structurally closed but invalid
/// produce an error.
fn parse_bracket(chars: &[PatternChar], start: usize) -> Result<Option<(Bracket, usize)>, Error> {
    let mut i = start;
    let complement = matches!(chars.get(i), Some(PatternChar::Normal('!' | '^')));
    if complement {
        i += 1;
    }

    let mut items = Vec::new();
    let mut first = true;
    loop {
        let Some(&pc) = chars.get(i) else {
            return Ok(None);
        };
        match pc {
            PatternChar::Normal(']') if !first => break,
            PatternChar::Normal('[')
                if matches!(chars.get(i + 1), Some(PatternChar::Normal(':'))) =>
            {
                let name_start = i + 2;
                let mut j = name_start;
                while let Some(PatternChar::Normal(c) | PatternChar::Literal(c)) = chars.get(j) {
                    if !c.is_ascii_alphanumeric() {
                        break;
                    }
                    j += 1;
                }
                if matches!(chars.get(j), Some(PatternChar::Normal(':')))
                    && matches!(chars.get(j + 1), Some(PatternChar::Normal(']')))
                {
                    let name: String = chars[name_start..j]
                        .iter()
                        .map(|pc| pc.char_value())
                        .collect();
                    if ClassAsciiKind::from_name(&name).is_none() {
                        return Err(Error::UndefinedCharClass(name));
                    }
                    items.push(BracketItem::CharClass(name));
                    i = j + 2;
                } else {
                    items.push(BracketItem::Char('['));
                    i += 1;
                }
            }
            PatternChar::Normal(c) | PatternChar::Literal(c) => {
                // A `-` between two characters forms a range unless it is
                // the first or last item.
                if matches!(chars.get(i + 1), Some(PatternChar::Normal('-')))
                    && !matches!(chars.get(i + 2), Some(PatternChar::Normal(']')) | None)
                {
                    if let Some(PatternChar::Normal(end) | PatternChar::Literal(end)) =
                        chars.get(i + 2)
                    {
                        items.push(BracketItem::Range(c, *end));
                        i += 3;
                        first = false;
                        continue;
                    }
                }
                items.push(BracketItem::Char(c));
                i += 1;
            }
        }
        first = false;
    }

    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some((Bracket { complement, items }, i + 1)))
}

impl Ast {
    /// Parses a pattern.
    pub fn new<I>(pattern: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PatternChar>,
    {
        let chars: Vec<PatternChar> = pattern.into_iter().collect();
        let mut atoms = Vec::new();
        let mut i = 0;
        while let Some(&pc) = chars.get(i) {
            match pc {
                PatternChar::Normal('?') => {
                    atoms.push(Atom::AnyChar);
                    i += 1;
                }
                PatternChar::Normal('*') => {
                    // Adjacent asterisks are equivalent to one.
                    if atoms.last() != Some(&Atom::AnyString) {
                        atoms.push(Atom::AnyString);
                    }
                    i += 1;
                }
                PatternChar::Normal('[') => match parse_bracket(&chars, i + 1)? {
                    Some((bracket, next)) => {
                        atoms.push(Atom::Bracket(bracket));
                        i = next;
                    }
                    None => {
                        atoms.push(Atom::Char('['));
                        i += 1;
                    }
                },
                PatternChar::Normal(c) | PatternChar::Literal(c) => {
                    atoms.push(Atom::Char(c));
                    i += 1;
                }
            }
        }
        Ok(Ast { atoms })
    }

    /// Returns the length in characters of the shortest string the
    /// pattern can match.
    #[must_use]
    pub fn min_length(&self) -> usize {
        self.atoms
            .iter()
            .filter(|atom| !matches!(atom, Atom::AnyString))
            .count()
    }

    /// Returns the literal string the pattern matches, if the pattern
    /// contains no wildcard at all.
    #[must_use]
    pub fn as_literal(&self) -> Option<String> {
        self.atoms
            .iter()
            .map(|atom| match atom {
                Atom::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Whether the first atom is a wildcard that could otherwise match a
    /// leading period.
    #[must_use]
    pub fn starts_with_wildcard(&self) -> bool {
        matches!(
            self.atoms.first(),
            Some(Atom::AnyChar | Atom::AnyString | Atom::Bracket(_))
        )
    }

    /// Renders the AST as a regular expression.
    pub fn to_regex(&self, config: &Config) -> Result<String, Error> {
        let mut regex = String::new();
        if config.anchor_begin {
            regex.push_str(r"\A");
        }
        for atom in &self.atoms {
            match atom {
                Atom::Char(c) => push_escaped(&mut regex, *c),
                Atom::AnyChar => regex.push('.'),
                Atom::AnyString => {
                    regex.push_str(if config.shortest_match { ".*?" } else { ".*" })
                }
                Atom::Bracket(bracket) => write_bracket(&mut regex, bracket),
            }
        }
        if config.anchor_end {
            regex.push_str(r"\z");
        }
        Ok(regex)
    }
}

const REGEX_SPECIAL: &str = r"\.+*?()|[]{}^$-&~#";

fn push_escaped(regex: &mut String, c: char) {
    if REGEX_SPECIAL.contains(c) {
        regex.push('\\');
    }
    regex.push(c);
}

fn write_bracket(regex: &mut String, bracket: &Bracket) {
    regex.push('[');
    if bracket.complement {
        regex.push('^');
    }
    for item in &bracket.items {
        match item {
            BracketItem::Char(c) => push_escaped(regex, *c),
            BracketItem::Range(start, end) => {
                push_escaped(regex, *start);
                regex.push('-');
                push_escaped(regex, *end);
            }
            BracketItem::CharClass(name) => {
                // Validated during parsing
                write!(regex, "[:{name}:]").unwrap();
            }
        }
    }
    regex.push(']');
}
