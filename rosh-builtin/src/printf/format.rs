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

//! The format program
//!
//! A `printf` format string is compiled once into a list of
//! [`Directive`]s and then applied repeatedly against the argument
//! stream. Compilation resolves all escape sequences and validates each
//! conversion specification; execution only consumes arguments and
//! renders values.
//!
//! The same escape machinery serves the `echo` built-in and the `%b`
//! directive, which interpret their input with `echo`'s rules: the same
//! single-character escapes, octal as `\0NNN`, and `\c` cutting the
//! whole output short.

use std::fmt::Write;
use thiserror::Error;

/// Error in compiling a format string
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FormatError {
    #[error("the conversion specifier is missing")]
    MissingSpecifier,
    #[error("`{0}' is not a valid conversion specifier")]
    InvalidSpecifier(char),
    #[error("invalid flag for conversion specifier `{0}'")]
    InvalidFlag(char),
}

/// Compiled conversion specification
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConvSpec {
    /// `#`: alternate form
    pub alt: bool,
    /// `0`: pad with zeros
    pub zero: bool,
    /// `-`: left-justify
    pub left: bool,
    /// `+`: always print a sign
    pub plus: bool,
    /// ` `: print a space where the sign would go
    pub space: bool,
    pub width: usize,
    pub precision: Option<usize>,
    /// The conversion specifier character
    pub specifier: char,
}

/// One element of a format program
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Directive {
    /// Literal bytes, escape sequences already resolved
    Raw(Vec<u8>),
    /// `%%`
    Percent,
    /// `s`
    String(ConvSpec),
    /// `c`
    Char(ConvSpec),
    /// `d`, `i`
    SignedInt(ConvSpec),
    /// `o`, `u`, `x`, `X`
    UnsignedInt(ConvSpec),
    /// `f`, `F`, `e`, `E`, `g`, `G`
    Float(ConvSpec),
    /// `b`: the argument is rewritten with echo's escape rules
    EscapedString {
        left: bool,
        width: usize,
        max: Option<usize>,
    },
}

impl Directive {
    /// Whether applying the directive consumes an argument.
    #[must_use]
    pub fn consumes_argument(&self) -> bool {
        !matches!(self, Directive::Raw(_) | Directive::Percent)
    }
}

/// Compiles a format string into a program.
pub fn parse_format(format: &str) -> Result<Vec<Directive>, FormatError> {
    let chars: Vec<char> = format.chars().collect();
    let mut program = Vec::new();
    let mut raw = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => {
                if !raw.is_empty() {
                    program.push(Directive::Raw(std::mem::take(&mut raw)));
                }
                i = parse_conversion(&chars, i + 1, &mut program)?;
            }
            '\\' => match chars.get(i + 1) {
                Some(&c @ ('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\' | '"' | '\'')) => {
                    raw.push(control_escape(c));
                    i += 2;
                }
                Some('0'..='7') => {
                    let mut value = 0u32;
                    let mut count = 0;
                    i += 1;
                    while count < 3 && matches!(chars.get(i), Some('0'..='7')) {
                        value = value * 8 + chars[i].to_digit(8).unwrap();
                        count += 1;
                        i += 1;
                    }
                    raw.push(value as u8);
                }
                _ => {
                    push_char(&mut raw, '\\');
                    i += 1;
                }
            },
            c => {
                push_char(&mut raw, c);
                i += 1;
            }
        }
    }
    if !raw.is_empty() {
        program.push(Directive::Raw(raw));
    }
    Ok(program)
}

fn push_char(raw: &mut Vec<u8>, c: char) {
    let mut buffer = [0u8; 4];
    raw.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
}

fn control_escape(c: char) -> u8 {
    match c {
        'a' => 0x07,
        'b' => 0x08,
        'f' => 0x0C,
        'n' => b'\n',
        'r' => b'\r',
        't' => b'\t',
        'v' => 0x0B,
        _ => c as u8,
    }
}

/// Parses one conversion specification after the `%`.
///
/// Appends the directive and returns the index after the specifier.
fn parse_conversion(
    chars: &[char],
    mut i: usize,
    program: &mut Vec<Directive>,
) -> Result<usize, FormatError> {
    let mut spec = ConvSpec::default();
    let mut any_flags = false;

    loop {
        match chars.get(i) {
            Some('#') => spec.alt = true,
            Some('0') => spec.zero = true,
            Some('-') => spec.left = true,
            Some('+') => spec.plus = true,
            Some(' ') => spec.space = true,
            _ => break,
        }
        any_flags = true;
        i += 1;
    }

    let mut width = 0usize;
    let mut any_width = false;
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        width = width.saturating_mul(10).saturating_add(d as usize);
        any_width = true;
        i += 1;
    }
    spec.width = width;

    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut precision = 0usize;
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            precision = precision.saturating_mul(10).saturating_add(d as usize);
            i += 1;
        }
        spec.precision = Some(precision);
        any_width = true;
    }

    let Some(&specifier) = chars.get(i) else {
        return Err(FormatError::MissingSpecifier);
    };
    spec.specifier = specifier;

    let directive = match specifier {
        'd' | 'i' | 'u' if spec.alt => return Err(FormatError::InvalidFlag(specifier)),
        'c' | 's' | 'b' if spec.alt || spec.zero => {
            return Err(FormatError::InvalidFlag(specifier))
        }
        'd' | 'i' => Directive::SignedInt(spec),
        'o' | 'u' | 'x' | 'X' => Directive::UnsignedInt(spec),
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => Directive::Float(spec),
        'c' => Directive::Char(spec),
        's' => Directive::String(spec),
        'b' => Directive::EscapedString {
            left: spec.left,
            width: spec.width,
            max: spec.precision,
        },
        '%' => {
            if any_flags || any_width {
                return Err(FormatError::InvalidFlag('%'));
            }
            Directive::Percent
        }
        other => return Err(FormatError::InvalidSpecifier(other)),
    };
    program.push(directive);
    Ok(i + 1)
}

/// Outcome of rewriting a string with echo's escape rules
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EscapeOutcome {
    /// The whole input was consumed.
    Complete,
    /// A `\c` was found: nothing further must be printed at all.
    CutShort,
}

/// Appends `input` to `out`, resolving echo-style escape sequences.
///
/// Recognised escapes are `\a \b \c \f \n \r \t \v \\` and `\0NNN`
/// (octal, at most three digits after the zero). An unrecognised escape
/// keeps its backslash.
pub fn append_with_escapes(input: &str, out: &mut Vec<u8>) -> EscapeOutcome {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            push_char(out, chars[i]);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some('c') => return EscapeOutcome::CutShort,
            Some(&c @ ('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\')) => {
                out.push(control_escape(c));
                i += 2;
            }
            Some('0') => {
                let mut value = 0u32;
                let mut count = 0;
                i += 2;
                while count < 3 && matches!(chars.get(i), Some('0'..='7')) {
                    value = value * 8 + chars[i].to_digit(8).unwrap();
                    count += 1;
                    i += 1;
                }
                out.push(value as u8);
            }
            _ => {
                push_char(out, '\\');
                i += 1;
            }
        }
    }
    EscapeOutcome::Complete
}

/// Renders a signed integer conversion.
#[must_use]
pub fn format_signed(spec: &ConvSpec, value: i64) -> String {
    let sign = if value < 0 {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let digits = value.unsigned_abs().to_string();
    assemble_numeric(spec, sign, "", &digits)
}

/// Renders an unsigned integer conversion (`o`, `u`, `x`, `X`).
#[must_use]
pub fn format_unsigned(spec: &ConvSpec, value: u64) -> String {
    let (digits, prefix) = match spec.specifier {
        'o' => {
            let digits = format!("{value:o}");
            // The alternate form guarantees a leading zero.
            let prefix = if spec.alt && !digits.starts_with('0') {
                "0"
            } else {
                ""
            };
            (digits, prefix)
        }
        'x' => (
            format!("{value:x}"),
            if spec.alt && value != 0 { "0x" } else { "" },
        ),
        'X' => (
            format!("{value:X}"),
            if spec.alt && value != 0 { "0X" } else { "" },
        ),
        _ => (value.to_string(), ""),
    };
    assemble_numeric(spec, "", prefix, &digits)
}

/// Renders a floating-point conversion (`f F e E g G`).
#[must_use]
pub fn format_float(spec: &ConvSpec, value: f64) -> String {
    let upper = spec.specifier.is_ascii_uppercase();
    let precision = spec.precision.unwrap_or(6);

    let sign = if value.is_sign_negative() {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let magnitude = value.abs();

    let body = if !magnitude.is_finite() {
        let body = if magnitude.is_nan() { "nan" } else { "inf" };
        let body = if upper {
            body.to_uppercase()
        } else {
            body.to_string()
        };
        // Zero padding does not apply to infinities and NaNs.
        let mut spec = spec.clone();
        spec.zero = false;
        return assemble_numeric(&spec, sign, "", &body);
    } else {
        match spec.specifier {
            'f' | 'F' => fixed_form(magnitude, precision, spec.alt),
            'e' | 'E' => exponent_form(magnitude, precision, upper, spec.alt),
            _ => general_form(magnitude, precision, upper, spec.alt),
        }
    };
    assemble_numeric(spec, sign, "", &body)
}

fn fixed_form(magnitude: f64, precision: usize, alt: bool) -> String {
    let mut body = format!("{magnitude:.precision$}");
    if alt && precision == 0 {
        body.push('.');
    }
    body
}

fn exponent_form(magnitude: f64, precision: usize, upper: bool, alt: bool) -> String {
    let rendered = format!("{magnitude:.precision$e}");
    let (mantissa, exponent) = rendered
        .split_once('e')
        .unwrap_or((rendered.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mut body = mantissa.to_string();
    if alt && precision == 0 {
        body.push('.');
    }
    let e = if upper { 'E' } else { 'e' };
    write!(body, "{e}{exponent:+03}").unwrap();
    body
}

fn general_form(magnitude: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);

    // Decimal exponent of the value, as the e-conversion would show it.
    let probe = format!("{:.*e}", p - 1, magnitude);
    let exponent: i32 = probe
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    let mut body = if exponent >= -4 && exponent < p as i32 {
        fixed_form(magnitude, (p as i32 - 1 - exponent).max(0) as usize, false)
    } else {
        exponent_form(magnitude, p - 1, upper, false)
    };

    if !alt {
        body = strip_trailing_zeros(body);
    }
    body
}

fn strip_trailing_zeros(body: String) -> String {
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            let e = if body.contains('E') { "E" } else { "e" };
            (mantissa.to_string(), format!("{e}{exponent}"))
        }
        None => (body, String::new()),
    };
    let mantissa = if mantissa.contains('.') {
        let trimmed = mantissa.trim_end_matches('0');
        trimmed.trim_end_matches('.').to_string()
    } else {
        mantissa
    };
    mantissa + &exponent
}

/// Renders a string conversion.
#[must_use]
pub fn format_string(spec: &ConvSpec, value: &str) -> String {
    let truncated: String = match spec.precision {
        Some(max) => value.chars().take(max).collect(),
        None => value.to_string(),
    };
    pad_text(&truncated, spec.width, spec.left)
}

/// Pads text to the field width with spaces.
#[must_use]
pub fn pad_text(text: &str, width: usize, left: bool) -> String {
    let count = text.chars().count();
    if count >= width {
        return text.to_string();
    }
    let padding = " ".repeat(width - count);
    if left {
        format!("{text}{padding}")
    } else {
        format!("{padding}{text}")
    }
}

/// Assembles sign, prefix and digits, applying precision-independent
/// zero padding and the field width.
fn assemble_numeric(spec: &ConvSpec, sign: &str, prefix: &str, digits: &str) -> String {
    let digits = match spec.precision {
        // For integer conversions the precision is the minimum number
        // of digits.
        Some(min)
            if matches!(spec.specifier, 'd' | 'i' | 'o' | 'u' | 'x' | 'X')
                && digits.len() < min =>
        {
            format!("{}{}", "0".repeat(min - digits.len()), digits)
        }
        _ => digits.to_string(),
    };

    let content_len = sign.len() + prefix.len() + digits.chars().count();
    let zero_pad = spec.zero
        && !spec.left
        && !(spec.precision.is_some() && matches!(spec.specifier, 'd' | 'i' | 'o' | 'u' | 'x' | 'X'));
    if zero_pad && content_len < spec.width {
        let zeros = "0".repeat(spec.width - content_len);
        format!("{sign}{prefix}{zeros}{digits}")
    } else {
        pad_text(&format!("{sign}{prefix}{digits}"), spec.width, spec.left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn spec(specifier: char) -> ConvSpec {
        ConvSpec {
            specifier,
            ..Default::default()
        }
    }

    #[test]
    fn raw_text_and_escapes() {
        let program = parse_format("a\\tb\\n").unwrap();
        assert_eq!(program, [Directive::Raw(b"a\tb\n".to_vec())]);

        let program = parse_format("\\101\\0").unwrap();
        assert_eq!(program, [Directive::Raw(vec![b'A', 0])]);

        let program = parse_format("\\q").unwrap();
        assert_eq!(program, [Directive::Raw(b"\\q".to_vec())]);
    }

    #[test]
    fn percent_directives() {
        let program = parse_format("%s%%").unwrap();
        assert_matches!(&program[..], [Directive::String(s), Directive::Percent] => {
            assert_eq!(s.specifier, 's');
        });
    }

    #[test]
    fn flags_width_precision() {
        let program = parse_format("%-08.3f").unwrap();
        assert_matches!(&program[..], [Directive::Float(s)] => {
            assert!(s.left);
            assert!(s.zero);
            assert_eq!(s.width, 8);
            assert_eq!(s.precision, Some(3));
        });
    }

    #[test]
    fn escaped_string_directive() {
        let program = parse_format("%-10.5b").unwrap();
        assert_eq!(
            program,
            [Directive::EscapedString {
                left: true,
                width: 10,
                max: Some(5),
            }]
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse_format("%"), Err(FormatError::MissingSpecifier));
        assert_eq!(parse_format("%y"), Err(FormatError::InvalidSpecifier('y')));
        assert_eq!(parse_format("%#d"), Err(FormatError::InvalidFlag('d')));
        assert_eq!(parse_format("%#u"), Err(FormatError::InvalidFlag('u')));
        assert_eq!(parse_format("%0c"), Err(FormatError::InvalidFlag('c')));
        assert_eq!(parse_format("%0s"), Err(FormatError::InvalidFlag('s')));
        assert_eq!(parse_format("%0b"), Err(FormatError::InvalidFlag('b')));
        assert_eq!(parse_format("%5%"), Err(FormatError::InvalidFlag('%')));
        // `#` and `0` are fine where C's printf accepts them.
        assert!(parse_format("%#o%#x%08d").is_ok());
    }

    #[test]
    fn echo_escapes() {
        let mut out = Vec::new();
        let outcome = append_with_escapes("a\\tb\\0101\\q", &mut out);
        assert_eq!(outcome, EscapeOutcome::Complete);
        assert_eq!(out, b"a\tbA\\q");

        let mut out = Vec::new();
        let outcome = append_with_escapes("x\\cy", &mut out);
        assert_eq!(outcome, EscapeOutcome::CutShort);
        assert_eq!(out, b"x");
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(format_signed(&spec('d'), 42), "42");
        assert_eq!(format_signed(&spec('d'), -42), "-42");

        let mut s = spec('d');
        s.width = 5;
        assert_eq!(format_signed(&s, 42), "   42");
        s.zero = true;
        assert_eq!(format_signed(&s, -42), "-0042");
        s.zero = false;
        s.left = true;
        assert_eq!(format_signed(&s, 42), "42   ");

        let mut s = spec('d');
        s.plus = true;
        assert_eq!(format_signed(&s, 42), "+42");
        let mut s = spec('d');
        s.space = true;
        assert_eq!(format_signed(&s, 42), " 42");

        let mut s = spec('d');
        s.precision = Some(4);
        assert_eq!(format_signed(&s, -7), "-0007");
    }

    #[test]
    fn unsigned_formatting() {
        assert_eq!(format_unsigned(&spec('u'), 42), "42");
        assert_eq!(format_unsigned(&spec('o'), 8), "10");
        assert_eq!(format_unsigned(&spec('x'), 255), "ff");
        assert_eq!(format_unsigned(&spec('X'), 255), "FF");

        let mut s = spec('o');
        s.alt = true;
        assert_eq!(format_unsigned(&s, 8), "010");
        let mut s = spec('x');
        s.alt = true;
        assert_eq!(format_unsigned(&s, 255), "0xff");
        assert_eq!(format_unsigned(&s, 0), "0");
    }

    #[test]
    fn float_fixed_formatting() {
        assert_eq!(format_float(&spec('f'), 1.5), "1.500000");
        let mut s = spec('f');
        s.precision = Some(2);
        assert_eq!(format_float(&s, 3.14159), "3.14");
        s.precision = Some(0);
        assert_eq!(format_float(&s, 2.5), "2");
        s.width = 8;
        s.zero = true;
        s.precision = Some(2);
        assert_eq!(format_float(&s, -1.5), "-0001.50");
    }

    #[test]
    fn float_exponent_formatting() {
        assert_eq!(format_float(&spec('e'), 150.0), "1.500000e+02");
        let mut s = spec('e');
        s.precision = Some(2);
        assert_eq!(format_float(&s, 0.00015), "1.50e-04");
        let mut s = spec('E');
        s.precision = Some(1);
        assert_eq!(format_float(&s, 150.0), "1.5E+02");
        let mut s = spec('e');
        s.precision = Some(0);
        assert_eq!(format_float(&s, 5.0), "5e+00");
    }

    #[test]
    fn float_general_formatting() {
        assert_eq!(format_float(&spec('g'), 0.0001), "0.0001");
        assert_eq!(format_float(&spec('g'), 0.00001), "1e-05");
        assert_eq!(format_float(&spec('g'), 123456.0), "123456");
        assert_eq!(format_float(&spec('g'), 1234567.0), "1.23457e+06");
        assert_eq!(format_float(&spec('g'), 1.5), "1.5");
        assert_eq!(format_float(&spec('G'), 1e10), "1E+10");
    }

    #[test]
    fn float_specials() {
        assert_eq!(format_float(&spec('f'), f64::INFINITY), "inf");
        assert_eq!(format_float(&spec('F'), f64::NEG_INFINITY), "-INF");
        assert_eq!(format_float(&spec('f'), f64::NAN), "nan");
    }

    #[test]
    fn string_formatting() {
        let mut s = spec('s');
        s.width = 5;
        assert_eq!(format_string(&s, "ab"), "   ab");
        s.left = true;
        assert_eq!(format_string(&s, "ab"), "ab   ");
        let mut s = spec('s');
        s.precision = Some(2);
        assert_eq!(format_string(&s, "abcdef"), "ab");
    }
}
