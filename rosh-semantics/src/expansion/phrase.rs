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

//! Multi-field intermediate expansion results
//!
//! A [`Phrase`] is an array of fields of [`AttrChar`]s. Most expansions
//! produce a single field, which the `Field` variant holds without the
//! outer vector; `"$@"` and friends produce any number of fields.
//!
//! Joining two phrases is not vector concatenation: the last field of
//! the left phrase and the first field of the right one merge into one
//! field, the way adjacent word units merge their expansions.

use super::attr::AttrChar;
use super::attr::Origin;

/// Array of fields
#[derive(Clone, Debug, Eq)]
pub enum Phrase {
    /// Phrase of exactly one field
    Field(Vec<AttrChar>),
    /// Phrase of any number of fields
    Full(Vec<Vec<AttrChar>>),
}

use Phrase::*;

impl PartialEq for Phrase {
    fn eq(&self, other: &Phrase) -> bool {
        match (self, other) {
            (Field(left), Field(right)) => left == right,
            (Full(left), Full(right)) => left == right,
            (Field(field), Full(full)) | (Full(full), Field(field)) => {
                matches!(&full[..], [only] if only == field)
            }
        }
    }
}

impl Phrase {
    /// Phrase containing no fields at all
    #[inline]
    #[must_use]
    pub fn zero_fields() -> Self {
        Full(Vec::new())
    }

    /// Phrase containing one field with no characters
    #[inline]
    #[must_use]
    pub fn one_empty_field() -> Self {
        Field(Vec::new())
    }

    /// Whether the phrase has no fields.
    #[must_use]
    pub fn is_zero_fields(&self) -> bool {
        matches!(self, Full(fields) if fields.is_empty())
    }

    /// Number of fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        match self {
            Field(_) => 1,
            Full(fields) => fields.len(),
        }
    }

    /// Moves all fields of `other` into `self`.
    ///
    /// The last field of `self` and the first field of `other` merge.
    /// Appending a zero-field phrase is a no-op; appending to a
    /// zero-field phrase replaces it.
    pub fn append(&mut self, other: Phrase) {
        if other.is_zero_fields() {
            return;
        }
        if self.is_zero_fields() {
            *self = other;
            return;
        }

        let mut right = other.into_fields();
        match self {
            Field(left) => {
                left.extend(right.remove(0));
                if !right.is_empty() {
                    let mut fields = vec![std::mem::take(left)];
                    fields.extend(right);
                    *self = Full(fields);
                }
            }
            Full(fields) => match fields.last_mut() {
                Some(last) => {
                    last.extend(right.remove(0));
                    fields.extend(right);
                }
                None => unreachable!("zero-field case handled above"),
            },
        }
    }

    /// Converts the phrase into its fields.
    #[must_use]
    pub fn into_fields(self) -> Vec<Vec<AttrChar>> {
        match self {
            Field(field) => vec![field],
            Full(fields) => fields,
        }
    }

    /// Joins all fields into one, separated by the given string.
    ///
    /// The separator characters are unquoted soft-expansion characters.
    #[must_use]
    pub fn ifs_join(self, joiner: &str) -> Vec<AttrChar> {
        let mut fields = self.into_fields().into_iter();
        let mut result = fields.next().unwrap_or_default();
        for field in fields {
            result.extend(joiner.chars().map(|value| AttrChar {
                value,
                origin: Origin::SoftExpansion,
                is_quoted: false,
                is_quoting: false,
            }));
            result.extend(field);
        }
        result
    }

    /// Applies a function to every character of every field.
    pub fn for_each_char_mut<F: FnMut(&mut AttrChar)>(&mut self, mut f: F) {
        match self {
            Field(field) => field.iter_mut().for_each(&mut f),
            Full(fields) => fields
                .iter_mut()
                .for_each(|field| field.iter_mut().for_each(&mut f)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(value: char) -> AttrChar {
        AttrChar::literal(value)
    }

    #[test]
    fn variant_equality() {
        assert_eq!(Phrase::one_empty_field(), Phrase::Full(vec![vec![]]));
        assert_ne!(Phrase::one_empty_field(), Phrase::zero_fields());
        assert_eq!(
            Phrase::Field(vec![ch('a')]),
            Phrase::Full(vec![vec![ch('a')]])
        );
    }

    #[test]
    fn append_merges_adjacent_fields() {
        let mut left = Phrase::Full(vec![vec![ch('a')], vec![ch('b')]]);
        let right = Phrase::Full(vec![vec![ch('c')], vec![ch('d')]]);
        left.append(right);
        assert_eq!(
            left,
            Phrase::Full(vec![vec![ch('a')], vec![ch('b'), ch('c')], vec![ch('d')]])
        );
    }

    #[test]
    fn append_single_fields() {
        let mut left = Phrase::Field(vec![ch('a')]);
        left.append(Phrase::Field(vec![ch('b')]));
        assert_eq!(left, Phrase::Field(vec![ch('a'), ch('b')]));
    }

    #[test]
    fn append_zero_fields() {
        let mut left = Phrase::Field(vec![ch('a')]);
        left.append(Phrase::zero_fields());
        assert_eq!(left, Phrase::Field(vec![ch('a')]));

        let mut left = Phrase::zero_fields();
        left.append(Phrase::Field(vec![ch('b')]));
        assert_eq!(left, Phrase::Field(vec![ch('b')]));
    }

    #[test]
    fn ifs_join_inserts_separator() {
        let phrase = Phrase::Full(vec![vec![ch('a')], vec![ch('b')]]);
        let joined = phrase.ifs_join(":");
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[1].value, ':');
        assert_eq!(joined[1].origin, Origin::SoftExpansion);

        let phrase = Phrase::Full(vec![vec![ch('a')], vec![ch('b')]]);
        let joined = phrase.ifs_join("");
        assert_eq!(joined.len(), 2);
    }

    #[test]
    fn ifs_join_of_zero_fields_is_empty() {
        assert_eq!(Phrase::zero_fields().ifs_join(" "), []);
    }
}
