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

//! Printf built-in
//!
//! The **`printf`** built-in prints its operands formatted by a format
//! string.
//!
//! # Synopsis
//!
//! ```sh
//! printf format [value...]
//! ```
//!
//! # Description
//!
//! The format string is compiled once and applied repeatedly until all
//! operands are consumed; an application that consumes no operand stops
//! the repetition. A missing operand stands for an empty string or
//! zero. A malformed numeric operand produces a diagnostic but still
//! formats as the value parsed so far. Within a `%b` conversion the
//! `\c` escape ends the whole invocation immediately.
//!
//! All output is accumulated and written to the standard output in one
//! piece at the end.
//!
//! # Exit status
//!
//! Zero on success; non-zero if writing failed or any operand produced
//! a diagnostic; 2 (usage error) when the format operand is missing.

pub mod format;

use self::format::Directive;
use self::format::EscapeOutcome;
use rosh_env::semantics::ExitStatus;
use rosh_env::Env;

/// Signed integer value of an operand, with C `strtol` base-0 rules.
///
/// Returns the value of the longest parsable prefix and whether the
/// whole operand was consumed. An operand starting with a quote
/// evaluates to the character code of the following character.
fn parse_integer(operand: &str) -> (i64, bool) {
    let mut rest = operand.trim_start();
    if let Some(tail) = rest.strip_prefix(['"', '\'']) {
        let value = tail.chars().next().map_or(0, |c| c as i64);
        return (value, true);
    }

    let negative = match rest.strip_prefix(['+', '-']) {
        Some(tail) => {
            let negative = rest.starts_with('-');
            rest = tail;
            negative
        }
        None => false,
    };

    let (digits, radix) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (hex, 16)
    } else if rest.starts_with('0') {
        (rest, 8)
    } else {
        (rest, 10)
    };

    let mut value = 0i128;
    let mut consumed = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else { break };
        value = value
            .saturating_mul(radix as i128)
            .saturating_add(digit as i128);
        consumed += 1;
    }

    let complete = consumed > 0 && consumed == digits.chars().count();
    if negative {
        value = -value;
    }
    let value = value.clamp(i64::MIN as i128, u64::MAX as i128) as i64;
    (value, complete)
}

/// Floating-point value of the longest parsable prefix of an operand.
fn parse_float(operand: &str) -> (f64, bool) {
    let trimmed = operand.trim_start();
    if let Ok(value) = trimmed.parse() {
        return (value, true);
    }
    for end in (0..trimmed.len()).rev() {
        if !trimmed.is_char_boundary(end) {
            continue;
        }
        if let Ok(value) = trimmed[..end].parse() {
            return (value, false);
        }
    }
    (0.0, false)
}

/// Takes the next operand, if any.
fn next_operand<'a>(operands: &'a [String], index: &mut usize) -> Option<&'a str> {
    let operand = operands.get(*index)?;
    *index += 1;
    Some(operand)
}

fn bad_integer(env: &mut Env, operand: &str) {
    env.print_error(&format!("printf: `{operand}' is not a valid integer"));
}

fn bad_number(env: &mut Env, operand: &str) {
    env.print_error(&format!("printf: `{operand}' is not a valid number"));
}

/// Applies one directive, appending its output.
///
/// Returns false when a `\c` asked for immediate termination.
fn apply(
    env: &mut Env,
    directive: &Directive,
    operands: &[String],
    index: &mut usize,
    out: &mut Vec<u8>,
) -> bool {
    match directive {
        Directive::Raw(bytes) => out.extend_from_slice(bytes),
        Directive::Percent => out.push(b'%'),

        Directive::String(spec) => {
            let value = next_operand(operands, index).unwrap_or("");
            out.extend_from_slice(format::format_string(spec, value).as_bytes());
        }

        Directive::Char(spec) => {
            if let Some(operand) = next_operand(operands, index) {
                let value: String = operand.chars().take(1).collect();
                out.extend_from_slice(
                    format::pad_text(&value, spec.width, spec.left).as_bytes(),
                );
            }
        }

        Directive::SignedInt(spec) => {
            let operand = next_operand(operands, index);
            let (value, complete) = parse_integer(operand.unwrap_or("0"));
            if !complete {
                bad_integer(env, operand.unwrap_or(""));
            }
            out.extend_from_slice(format::format_signed(spec, value).as_bytes());
        }

        Directive::UnsignedInt(spec) => {
            let operand = next_operand(operands, index);
            let (value, complete) = parse_integer(operand.unwrap_or("0"));
            if !complete {
                bad_integer(env, operand.unwrap_or(""));
            }
            out.extend_from_slice(format::format_unsigned(spec, value as u64).as_bytes());
        }

        Directive::Float(spec) => {
            let operand = next_operand(operands, index);
            let (value, complete) = parse_float(operand.unwrap_or("0"));
            if !complete {
                bad_number(env, operand.unwrap_or(""));
            }
            out.extend_from_slice(format::format_float(spec, value).as_bytes());
        }

        Directive::EscapedString { left, width, max } => {
            let value = next_operand(operands, index).unwrap_or("");
            let mut sub = Vec::new();
            let outcome = format::append_with_escapes(value, &mut sub);
            if let Some(max) = *max {
                sub.truncate(max);
            }
            if sub.len() >= *width {
                out.extend_from_slice(&sub);
            } else {
                let padding = vec![b' '; width - sub.len()];
                if *left {
                    out.extend_from_slice(&sub);
                    out.extend_from_slice(&padding);
                } else {
                    out.extend_from_slice(&padding);
                    out.extend_from_slice(&sub);
                }
            }
            if outcome == EscapeOutcome::CutShort {
                return false;
            }
        }
    }
    true
}

/// Entry point of the `printf` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    let Some((format_string, operands)) = args.split_first() else {
        env.system
            .write_stderr(b"Usage:  printf format [value...]\n");
        return ExitStatus::ERROR;
    };

    let initial_errors = env.error_count();
    let program = match format::parse_format(format_string) {
        Ok(program) => program,
        Err(error) => {
            env.print_error(&format!("printf: {error}"));
            return ExitStatus::FAILURE;
        }
    };

    let mut out = Vec::new();
    let mut index = 0;
    'repeat: loop {
        let old_index = index;
        for directive in &program {
            if !apply(env, directive, operands, &mut index, &mut out) {
                break 'repeat;
            }
        }
        // Stop when the operands are exhausted, or when a pass consumed
        // none of them.
        if index >= operands.len() || index == old_index {
            break;
        }
    }

    if let Err(errno) = env.system.write_stdout(&out) {
        env.print_error(&format!(
            "printf: cannot print to the standard output: {errno}"
        ));
        return ExitStatus::FAILURE;
    }
    if env.error_count() == initial_errors {
        ExitStatus::SUCCESS
    } else {
        ExitStatus::FAILURE
    }
}
