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

//! Shell pattern matching for the rosh core.
//!
//! This crate matches strings against POSIX globbing patterns:
//!
//! - `?` matches any single character
//! - `*` matches any character sequence, including an empty one
//! - `[...]` matches a bracketed character set, with ranges (`a-z`),
//!   complement (`[!...]`), and ASCII character classes (`[:alpha:]`)
//!
//! Patterns are compiled to regular expressions and evaluated by the
//! `regex` crate. A [`Config`] chooses where a match may be anchored,
//! whether matching folds case, and whether the shortest or the longest
//! acceptable match is preferred — the combinations needed by parameter
//! expansion's trim and substitute modifiers.
//!
//! The parser consumes [`PatternChar`]s rather than a string: the
//! caller has already decided, from quoting and expansion context,
//! which characters may act as pattern syntax.
//!
//! ```
//! use rosh_fnmatch::{Pattern, PatternChar};
//! let p = Pattern::parse("a*c".chars().map(PatternChar::Normal)).unwrap();
//! assert!(p.is_match("abstract"));
//! assert_eq!(p.find("xxabcxx"), Some(2..5));
//! ```

pub mod ast;

use ast::Ast;
use regex::Regex;
use regex::RegexBuilder;
use std::ops::Range;
use thiserror::Error;

/// Input character of the pattern parser
///
/// A `Normal` `?`, `*`, `[` or `]` keeps its special meaning, while a
/// `Literal` character — typically one that was quoted in the shell
/// source — only ever matches itself.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PatternChar {
    Normal(char),
    Literal(char),
}

impl PatternChar {
    /// The character value, of either kind
    #[inline]
    #[must_use]
    pub const fn char_value(self) -> char {
        match self {
            PatternChar::Normal(c) | PatternChar::Literal(c) => c,
        }
    }
}

/// Error in pattern parsing or compilation
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// A bracket expression names a character class this implementation
    /// does not define.
    #[error("undefined character class `[:{0}:]`")]
    UndefinedCharClass(String),

    /// The generated regular expression was rejected by the regex
    /// engine.
    #[error("cannot compile pattern: {0}")]
    Compile(String),
}

impl From<regex::Error> for Error {
    fn from(error: regex::Error) -> Self {
        Error::Compile(error.to_string())
    }
}

/// Options deciding how a pattern matches
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct Config {
    /// Requires a match to start at the beginning of the subject.
    pub anchor_begin: bool,
    /// Requires a match to end at the end of the subject.
    pub anchor_end: bool,
    /// Prevents an initial wildcard from matching a leading period.
    pub literal_period: bool,
    /// Makes matching case-insensitive.
    pub case_insensitive: bool,
    /// Prefers the shortest acceptable match over the longest.
    pub shortest_match: bool,
}

#[derive(Clone, Debug)]
enum Body {
    /// Fast path for patterns without any wildcard
    Literal(String),
    Regex {
        regex: Regex,
        /// Variant anchored at both ends, used to probe match positions
        /// directly when the main regex cannot express the preference.
        whole: Regex,
    },
}

/// Compiled pattern
#[derive(Clone, Debug)]
pub struct Pattern {
    body: Body,
    config: Config,
    min_length: usize,
    starts_with_wildcard: bool,
}

impl Pattern {
    /// Compiles a pattern with the default configuration.
    #[inline]
    pub fn parse<I>(pattern: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PatternChar>,
    {
        Self::parse_with_config(pattern, Config::default())
    }

    /// Compiles a pattern with the given configuration.
    pub fn parse_with_config<I>(pattern: I, config: Config) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PatternChar>,
    {
        let ast = Ast::new(pattern)?;
        let min_length = ast.min_length();
        let starts_with_wildcard = ast.starts_with_wildcard();

        let body = match ast.as_literal() {
            Some(literal) if !config.case_insensitive => Body::Literal(literal),
            _ => {
                let regex = build_regex(&ast, &config)?;
                let whole_config = Config {
                    anchor_begin: true,
                    anchor_end: true,
                    ..config
                };
                let whole = build_regex(&ast, &whole_config)?;
                Body::Regex { regex, whole }
            }
        };

        Ok(Pattern {
            body,
            config,
            min_length,
            starts_with_wildcard,
        })
    }

    /// Returns the length in characters of the shortest string this
    /// pattern can match.
    ///
    /// Positions of the subject with fewer remaining characters cannot
    /// start a match, which lets repeated scans short-circuit.
    #[inline]
    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Returns the literal string this pattern is equivalent to, if it
    /// contains no wildcard.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match &self.body {
            Body::Literal(literal) => Some(literal),
            Body::Regex { .. } => None,
        }
    }

    /// Consumes the pattern, returning the equivalent literal string or
    /// the pattern itself.
    pub fn into_literal(self) -> Result<String, Self> {
        match self.body {
            Body::Literal(literal) => Ok(literal),
            Body::Regex { .. } => Err(self),
        }
    }

    /// Tests whether the pattern matches the subject.
    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        self.find(subject).is_some()
    }

    /// Returns the byte range of the match in the subject, or `None`.
    ///
    /// Without anchors the leftmost match wins. With `shortest_match`,
    /// the match at the winning position is the shortest acceptable one;
    /// in particular a tail-anchored shortest match is the one starting
    /// closest to the end of the subject.
    #[must_use]
    pub fn find(&self, subject: &str) -> Option<Range<usize>> {
        if self.rejects_leading_period(subject) {
            return None;
        }
        match &self.body {
            Body::Literal(literal) => find_literal(literal, subject, &self.config),
            Body::Regex { regex, whole } => {
                if self.config.anchor_end && !self.config.anchor_begin && self.config.shortest_match
                {
                    return self.rfind_anchored(whole, subject);
                }
                regex.find(subject).map(|m| m.range())
            }
        }
    }

    /// Finds the rightmost position whose suffix matches the whole
    /// pattern, giving the shortest tail-anchored match.
    fn rfind_anchored(&self, whole: &Regex, subject: &str) -> Option<Range<usize>> {
        let positions: Vec<usize> = subject
            .char_indices()
            .map(|(i, _)| i)
            .chain([subject.len()])
            .collect();
        let usable = positions.len().saturating_sub(self.min_length);
        positions[..usable]
            .iter()
            .rev()
            .find(|&&i| whole.is_match(&subject[i..]))
            .map(|&i| i..subject.len())
    }

    fn rejects_leading_period(&self, subject: &str) -> bool {
        self.config.literal_period
            && self.config.anchor_begin
            && self.starts_with_wildcard
            && subject.starts_with('.')
    }
}

fn build_regex(ast: &Ast, config: &Config) -> Result<Regex, Error> {
    let source = ast.to_regex(config)?;
    let regex = RegexBuilder::new(&source)
        .dot_matches_new_line(true)
        .case_insensitive(config.case_insensitive)
        .build()?;
    Ok(regex)
}

fn find_literal(literal: &str, subject: &str, config: &Config) -> Option<Range<usize>> {
    match (config.anchor_begin, config.anchor_end) {
        (true, true) => (subject == literal).then(|| 0..subject.len()),
        (true, false) => subject
            .starts_with(literal)
            .then(|| 0..literal.len()),
        (false, true) => subject
            .ends_with(literal)
            .then(|| subject.len() - literal.len()..subject.len()),
        (false, false) => subject
            .find(literal)
            .map(|start| start..start + literal.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    fn normal(pattern: &str) -> impl Iterator<Item = PatternChar> + '_ {
        pattern.chars().map(PatternChar::Normal)
    }

    #[test]
    fn char_value_of_either_kind() {
        assert_eq!(PatternChar::Normal('*').char_value(), '*');
        assert_eq!(PatternChar::Literal('*').char_value(), '*');
    }

    #[test]
    fn literal_match() {
        let p = Pattern::parse(normal("abc")).unwrap();
        assert_eq!(p.as_literal(), Some("abc"));
        assert!(p.is_match("xxabcxx"));
        assert_eq!(p.find("xxabcxx"), Some(2..5));
        assert_eq!(p.find("xyz"), None);
    }

    #[test]
    fn literal_anchored() {
        let mut config = config();
        config.anchor_begin = true;
        config.anchor_end = true;
        let p = Pattern::parse_with_config(normal("abc"), config).unwrap();
        assert!(p.is_match("abc"));
        assert!(!p.is_match("abcd"));
        assert!(!p.is_match("xabc"));
    }

    #[test]
    fn any_char_and_any_string() {
        let p = Pattern::parse(normal("a?c")).unwrap();
        assert!(p.is_match("abc"));
        assert!(p.is_match("a\nc"));
        assert!(!p.is_match("ac"));

        let p = Pattern::parse(normal("a*c")).unwrap();
        assert!(p.is_match("ac"));
        assert!(p.is_match("abbbc"));
    }

    #[test]
    fn bracket_expression() {
        let p = Pattern::parse(normal("[a-c]x")).unwrap();
        assert!(p.is_match("bx"));
        assert!(!p.is_match("dx"));

        let p = Pattern::parse(normal("[!a-c]x")).unwrap();
        assert!(p.is_match("dx"));
        assert!(!p.is_match("bx"));

        let p = Pattern::parse(normal("[[:digit:]]")).unwrap();
        assert!(p.is_match("7"));
        assert!(!p.is_match("x"));
    }

    #[test]
    fn case_insensitive() {
        let mut config = config();
        config.case_insensitive = true;
        let p = Pattern::parse_with_config(normal("a*z"), config).unwrap();
        assert!(p.is_match("AbcZ"));
    }

    #[test]
    fn longest_prefix_match() {
        let mut config = config();
        config.anchor_begin = true;
        let p = Pattern::parse_with_config(normal("*2"), config).unwrap();
        assert_eq!(p.find("123123123"), Some(0..8));
    }

    #[test]
    fn shortest_prefix_match() {
        let mut config = config();
        config.anchor_begin = true;
        config.shortest_match = true;
        let p = Pattern::parse_with_config(normal("*2"), config).unwrap();
        assert_eq!(p.find("123123123"), Some(0..2));
    }

    #[test]
    fn longest_suffix_match() {
        let mut config = config();
        config.anchor_end = true;
        let p = Pattern::parse_with_config(normal("2*"), config).unwrap();
        assert_eq!(p.find("123123123"), Some(1..9));
    }

    #[test]
    fn shortest_suffix_match() {
        let mut config = config();
        config.anchor_end = true;
        config.shortest_match = true;
        let p = Pattern::parse_with_config(normal("2*"), config).unwrap();
        assert_eq!(p.find("123123123"), Some(7..9));
    }

    #[test]
    fn min_length_short_circuits_suffix_scan() {
        let mut config = config();
        config.anchor_end = true;
        config.shortest_match = true;
        let p = Pattern::parse_with_config(normal("?2"), config).unwrap();
        assert_eq!(p.min_length(), 2);
        assert_eq!(p.find("1212"), Some(2..4));
        assert_eq!(p.find("2"), None);
    }

    #[test]
    fn literal_period() {
        let mut config = config();
        config.anchor_begin = true;
        config.anchor_end = true;
        config.literal_period = true;
        let p = Pattern::parse_with_config(normal("*file"), config).unwrap();
        assert!(p.is_match("profile"));
        assert!(!p.is_match(".profile"));

        let p = Pattern::parse_with_config(normal(".*file"), config).unwrap();
        assert!(p.is_match(".profile"));
    }

    #[test]
    fn into_literal() {
        let p = Pattern::parse(normal("plain")).unwrap();
        assert_matches::assert_matches!(p.into_literal(), Ok(s) if s == "plain");

        let p = Pattern::parse(normal("not*plain")).unwrap();
        assert!(p.into_literal().is_err());
    }
}
