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

//! Brace expansion
//!
//! Two forms are recognised, list (`PRE{a,b}POST`) and numeric sequence
//! (`{start..end}`). Only unquoted literal braces and commas take part;
//! braces that came out of a substitution or are quoted are plain
//! characters. Commas count only at the outermost nesting level, and a
//! brace pair without any comma at that level is not a list — scanning
//! resumes right after its opening brace, so `{{a,b}}` expands to `{a}`
//! and `{b}`.
//!
//! Sequence endpoints are decimal integers. When either endpoint has a
//! leading zero, the results are zero-padded to the wider endpoint's
//! width; a leading `+` forces an explicit sign on positive results.
//! Generated digits are hard-expansion characters: they are never field
//! split and never act as patterns.

use super::attr::AttrChar;
use super::attr::Origin;

/// Whether the character can open, close, or punctuate a brace list.
fn is_active(c: &AttrChar) -> bool {
    c.origin == Origin::Literal && !c.is_quoted && !c.is_quoting
}

/// Expands braces in one field, producing one or more fields.
pub fn expand_braces(field: Vec<AttrChar>) -> Vec<Vec<AttrChar>> {
    let mut results = Vec::new();
    expand_into(field, &mut results);
    results
}

fn expand_into(field: Vec<AttrChar>, results: &mut Vec<Vec<AttrChar>>) {
    let mut search_from = 0;
    loop {
        // Find the next expandable opening brace.
        let open = match (search_from..field.len())
            .find(|&i| field[i].value == '{' && is_active(&field[i]))
        {
            Some(open) if open + 1 < field.len() => open,
            _ => {
                results.push(field);
                return;
            }
        };

        if try_expand_sequence(&field, open, results) {
            return;
        }

        // Collect the element boundaries of a brace list: the indices
        // just after `{` and after every outermost-level comma.
        let mut starts = vec![open + 1];
        let mut nest = 0u32;
        let mut close = None;
        for i in open + 1..field.len() {
            if !is_active(&field[i]) {
                continue;
            }
            match field[i].value {
                '{' => nest += 1,
                ',' if nest == 0 => starts.push(i + 1),
                '}' if nest > 0 => nest -= 1,
                '}' => {
                    if starts.len() == 1 {
                        // No comma at the outermost level: not a list.
                        break;
                    }
                    close = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            // Rescan from just after the opening brace.
            search_from = open + 1;
            continue;
        };

        let head = &field[..open];
        let tail = &field[close + 1..];
        let mut ends = starts[1..].iter().map(|&start| start - 1);
        for &start in &starts {
            let end = ends.next().unwrap_or(close);
            let mut generated = Vec::with_capacity(head.len() + (end - start) + tail.len());
            generated.extend_from_slice(head);
            generated.extend_from_slice(&field[start..end]);
            generated.extend_from_slice(tail);
            expand_into(generated, results);
        }
        return;
    }
}

/// Parses a possibly signed decimal integer out of character values.
///
/// Returns the value, whether a `+` sign was present, and whether the
/// digits have a leading zero.
fn parse_endpoint(chars: &[AttrChar]) -> Option<(i64, bool, bool)> {
    let text: String = chars.iter().map(|c| c.value).collect();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(&text);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = text.parse().ok()?;
    let plus = text.starts_with('+');
    let leading_zero = unsigned.starts_with('0');
    Some((value, plus, leading_zero))
}

/// Tries to expand `{start..end}` at the given opening brace.
///
/// On success the fully expanded results are appended and true is
/// returned; otherwise the field is left for list expansion.
fn try_expand_sequence(
    field: &[AttrChar],
    open: usize,
    results: &mut Vec<Vec<AttrChar>>,
) -> bool {
    let body_start = open + 1;
    let Some(dots) = (body_start..field.len())
        .find(|&i| field[i].value == '.' && field.get(i + 1).is_some_and(|c| c.value == '.'))
    else {
        return false;
    };
    let Some(close) = (dots + 2..field.len()).find(|&i| field[i].value == '}') else {
        return false;
    };
    if dots == body_start || dots + 2 == close {
        return false;
    }

    let Some((start, start_plus, start_zero)) = parse_endpoint(&field[body_start..dots]) else {
        return false;
    };
    let Some((end, end_plus, end_zero)) = parse_endpoint(&field[dots + 2..close]) else {
        return false;
    };

    let start_len = if start_zero { dots - body_start } else { 0 };
    let end_len = if end_zero { close - (dots + 2) } else { 0 };
    let width = start_len.max(end_len);
    let sign = start_plus || end_plus;

    let head = &field[..open];
    let tail = &field[close + 1..];
    let mut value = start;
    loop {
        let digits = if sign {
            format!("{value:+0width$}")
        } else {
            format!("{value:0width$}")
        };
        let mut generated =
            Vec::with_capacity(head.len() + digits.len() + tail.len());
        generated.extend_from_slice(head);
        generated.extend(digits.chars().map(|value| AttrChar {
            value,
            origin: Origin::HardExpansion,
            is_quoted: false,
            is_quoting: false,
        }));
        generated.extend_from_slice(tail);
        expand_into(generated, results);

        if value == end {
            return true;
        }
        value += if start < end { 1 } else { -1 };
    }
}

#[cfg(test)]
mod tests {
    use super::super::attr::to_field;
    use super::*;

    fn literal(s: &str) -> Vec<AttrChar> {
        to_field(s, Origin::Literal, false)
    }

    fn expand_strings(s: &str) -> Vec<String> {
        expand_braces(literal(s))
            .into_iter()
            .map(|field| field.into_iter().map(|c| c.value).collect())
            .collect()
    }

    #[test]
    fn no_braces() {
        assert_eq!(expand_strings("plain"), ["plain"]);
        assert_eq!(expand_strings(""), [""]);
    }

    #[test]
    fn simple_list() {
        assert_eq!(expand_strings("a{b,c}d"), ["abd", "acd"]);
        assert_eq!(expand_strings("{x,y,z}"), ["x", "y", "z"]);
    }

    #[test]
    fn empty_elements() {
        assert_eq!(expand_strings("{,a}"), ["", "a"]);
        assert_eq!(expand_strings("x{,}"), ["x", "x"]);
    }

    #[test]
    fn nested_list() {
        assert_eq!(expand_strings("{a,{b,c}}"), ["a", "b", "c"]);
        assert_eq!(expand_strings("x{a,b{c,d}}y"), ["xay", "xbcy", "xbdy"]);
    }

    #[test]
    fn pair_without_comma_rescans_after_open() {
        assert_eq!(expand_strings("{{a,b}}"), ["{a}", "{b}"]);
        assert_eq!(expand_strings("{abc}"), ["{abc}"]);
    }

    #[test]
    fn unmatched_brace_is_plain() {
        assert_eq!(expand_strings("a{b,c"), ["a{b,c"]);
        assert_eq!(expand_strings("a}b"), ["a}b"]);
    }

    #[test]
    fn quoted_braces_do_not_expand() {
        let mut field = literal("a{b,c}d");
        for c in &mut field[1..6] {
            c.is_quoted = true;
        }
        let results = expand_braces(field);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn substituted_braces_do_not_expand() {
        let field = to_field("{a,b}", Origin::SoftExpansion, false);
        let results = expand_braces(field);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn ascending_sequence() {
        assert_eq!(expand_strings("{1..3}"), ["1", "2", "3"]);
        assert_eq!(expand_strings("a{1..3}b"), ["a1b", "a2b", "a3b"]);
    }

    #[test]
    fn descending_sequence() {
        assert_eq!(expand_strings("{3..1}"), ["3", "2", "1"]);
    }

    #[test]
    fn sequence_across_zero() {
        assert_eq!(expand_strings("{-1..1}"), ["-1", "0", "1"]);
    }

    #[test]
    fn zero_padded_sequence() {
        assert_eq!(expand_strings("{01..03}"), ["01", "02", "03"]);
        assert_eq!(expand_strings("{8..011}"), ["008", "009", "010", "011"]);
    }

    #[test]
    fn explicit_plus_sign() {
        assert_eq!(expand_strings("{+1..3}"), ["+1", "+2", "+3"]);
    }

    #[test]
    fn malformed_sequences_fall_back() {
        assert_eq!(expand_strings("{1..}"), ["{1..}"]);
        assert_eq!(expand_strings("{..3}"), ["{..3}"]);
        assert_eq!(expand_strings("{a..c}"), ["{a..c}"]);
    }

    #[test]
    fn sequence_generates_hard_expansion_chars() {
        let results = expand_braces(literal("{1..2}"));
        assert_eq!(results.len(), 2);
        assert!(results[0]
            .iter()
            .all(|c| c.origin == Origin::HardExpansion));
    }

    #[test]
    fn single_digit_sequence() {
        assert_eq!(expand_strings("{5..5}"), ["5"]);
    }

    #[test]
    fn list_after_sequence_fallback() {
        assert_eq!(expand_strings("{a..c}{1,2}"), ["{a..c}1", "{a..c}2"]);
    }
}
