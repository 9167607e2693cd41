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

//! Field splitting
//!
//! A field is split at every [splittable](AttrChar::is_splittable)
//! character that is a separator in the [`Ifs`]. Runs of whitespace
//! separators act as a single separator and are trimmed at both ends of
//! the field. A non-whitespace separator always delimits a field,
//! absorbing the whitespace separators around it; two adjacent
//! non-whitespace separators delimit an empty field.
//!
//! A field in which no separator occurs is passed through unchanged,
//! even when empty: arbitration of empty words happened upstream, in
//! the initial expansion.

use super::attr::AttrChar;

/// Classification of a character for field splitting
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Class {
    NonIfs,
    IfsWhitespace,
    IfsNonWhitespace,
}

/// Set of field separator characters
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ifs<'a> {
    chars: &'a str,
}

impl<'a> Ifs<'a> {
    /// Separators assumed when `$IFS` is unset
    pub const DEFAULT: &'static str = " \t\n";

    /// Creates a separator set from the characters of the string.
    #[must_use]
    pub fn new(chars: &'a str) -> Self {
        Ifs { chars }
    }

    /// Separator set that never splits
    #[must_use]
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Classifies a character.
    #[must_use]
    pub fn classify(&self, c: char) -> Class {
        if !self.chars.contains(c) {
            Class::NonIfs
        } else if c.is_whitespace() {
            Class::IfsWhitespace
        } else {
            Class::IfsNonWhitespace
        }
    }

    /// Classifies an attributed character, treating unsplittable
    /// characters as non-separators.
    #[must_use]
    pub fn classify_attr(&self, c: &AttrChar) -> Class {
        if c.is_splittable() {
            self.classify(c.value)
        } else {
            Class::NonIfs
        }
    }
}

impl Default for Ifs<'_> {
    fn default() -> Self {
        Self::new(Ifs::DEFAULT)
    }
}

/// Splits one field into zero or more fields.
pub fn split_fields(field: Vec<AttrChar>, ifs: &Ifs) -> Vec<Vec<AttrChar>> {
    let mut results = Vec::new();
    let mut index = 0;
    let mut start = 0;

    while index < field.len() {
        if ifs.classify_attr(&field[index]) == Class::NonIfs {
            index += 1;
            continue;
        }

        // A separator. Emit the field before it, then swallow the whole
        // separator run, emitting an empty field for every
        // non-whitespace separator after the first delimiter.
        let mut split_on_non_whitespace = start >= index;
        if start < index {
            results.push(field[start..index].to_vec());
        }
        loop {
            if ifs.classify_attr(&field[index]) == Class::IfsNonWhitespace {
                if split_on_non_whitespace {
                    results.push(Vec::new());
                }
                split_on_non_whitespace = true;
            }
            index += 1;
            if index >= field.len() {
                break;
            }
            if ifs.classify_attr(&field[index]) == Class::NonIfs {
                break;
            }
        }
        start = index;
    }

    if results.is_empty() && start == 0 {
        // No separator occurred; the input is the only field.
        return vec![field];
    }
    if start < index {
        results.push(field[start..index].to_vec());
    }
    results
}

#[cfg(test)]
mod tests {
    use super::super::attr::to_field;
    use super::super::attr::Origin;
    use super::*;

    fn soft(s: &str) -> Vec<AttrChar> {
        to_field(s, Origin::SoftExpansion, false)
    }

    fn split_strings(s: &str, ifs: &Ifs) -> Vec<String> {
        split_fields(soft(s), ifs)
            .into_iter()
            .map(|field| field.into_iter().map(|c| c.value).collect())
            .collect()
    }

    #[test]
    fn classification() {
        let ifs = Ifs::new(" -");
        assert_eq!(ifs.classify(' '), Class::IfsWhitespace);
        assert_eq!(ifs.classify('-'), Class::IfsNonWhitespace);
        assert_eq!(ifs.classify('x'), Class::NonIfs);
        assert_eq!(Ifs::empty().classify(' '), Class::NonIfs);
    }

    #[test]
    fn no_separator_passes_through() {
        let ifs = Ifs::default();
        assert_eq!(split_strings("abc", &ifs), ["abc"]);
    }

    #[test]
    fn empty_field_passes_through() {
        let ifs = Ifs::default();
        assert_eq!(split_strings("", &ifs), [""]);
    }

    #[test]
    fn whitespace_separators() {
        let ifs = Ifs::default();
        assert_eq!(split_strings("a b", &ifs), ["a", "b"]);
        assert_eq!(split_strings("  a  bb  ", &ifs), ["a", "bb"]);
        assert_eq!(split_strings("   ", &ifs), [] as [&str; 0]);
    }

    #[test]
    fn non_whitespace_separators() {
        let ifs = Ifs::new("-");
        assert_eq!(split_strings("a-b", &ifs), ["a", "b"]);
        assert_eq!(split_strings("a--b", &ifs), ["a", "", "b"]);
        assert_eq!(split_strings("-a", &ifs), ["", "a"]);
        assert_eq!(split_strings("a-", &ifs), ["a"]);
        assert_eq!(split_strings("a--", &ifs), ["a", ""]);
        assert_eq!(split_strings("-", &ifs), [""]);
    }

    #[test]
    fn mixed_separators() {
        let ifs = Ifs::new(" -");
        assert_eq!(split_strings("a - b", &ifs), ["a", "b"]);
        assert_eq!(split_strings("a -  - b", &ifs), ["a", "", "b"]);
        assert_eq!(split_strings("  - a", &ifs), ["", "a"]);
    }

    #[test]
    fn quoted_chars_never_split() {
        let ifs = Ifs::default();
        let mut field = soft("a b");
        field[1].is_quoted = true;
        let fields = split_fields(field, &ifs);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn literal_chars_never_split() {
        let ifs = Ifs::default();
        let field = to_field("a b", Origin::Literal, false);
        let fields = split_fields(field, &ifs);
        assert_eq!(fields.len(), 1);
    }
}
