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

//! Echo built-in
//!
//! The **`echo`** built-in prints its operands joined by single spaces,
//! followed by a newline.
//!
//! # Synopsis
//!
//! ```sh
//! echo [string...]
//! ```
//!
//! # Description
//!
//! The behaviour depends on `$ECHO_STYLE`, of which only the first
//! character matters:
//!
//! | Style | Escapes | `-n` | `-e`/`-E` |
//! |---|---|---|---|
//! | `SYSV`, `XSI` (default) | always | no | no |
//! | `BSD` | never | yes | no |
//! | `GNU` | off by default | yes | yes |
//! | `ZSH` | on by default | yes | yes |
//! | `DASH` | always | yes | no |
//! | `RAW` | never | no | no |
//!
//! Escape sequences are those of [the shared escape
//! machinery](crate::printf::format::append_with_escapes); `\c` stops
//! the output and suppresses the newline. Unrecognised flags are
//! printed as ordinary operands. The trailing newline is omitted under
//! `-n`.
//!
//! # Exit status
//!
//! Zero unless writing to the standard output failed.

use crate::printf::format::append_with_escapes;
use crate::printf::format::EscapeOutcome;
use rosh_env::semantics::ExitStatus;
use rosh_env::variable;
use rosh_env::Env;

/// Flag repertoire selected by `$ECHO_STYLE`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Style {
    /// Interpret escape sequences (before any `-e`/`-E`)
    escapes: bool,
    /// Recognise `-n`
    n_option: bool,
    /// Recognise `-e` and `-E`
    e_option: bool,
}

impl Style {
    /// Only the first character of the variable value decides.
    fn from_env(env: &Env) -> Style {
        let first = env
            .variables
            .scalar(variable::ECHO_STYLE)
            .and_then(|value| value.chars().next())
            .unwrap_or('S');
        match first.to_ascii_uppercase() {
            'B' => Style {
                escapes: false,
                n_option: true,
                e_option: false,
            },
            'G' => Style {
                escapes: false,
                n_option: true,
                e_option: true,
            },
            'Z' => Style {
                escapes: true,
                n_option: true,
                e_option: true,
            },
            'D' => Style {
                escapes: true,
                n_option: true,
                e_option: false,
            },
            'R' => Style {
                escapes: false,
                n_option: false,
                e_option: false,
            },
            // SYSV and XSI, and anything unrecognised
            _ => Style {
                escapes: true,
                n_option: false,
                e_option: false,
            },
        }
    }
}

/// Entry point of the `echo` built-in
pub fn main(env: &mut Env, args: Vec<String>) -> ExitStatus {
    let style = Style::from_env(env);
    let mut escapes = style.escapes;
    let mut newline = true;

    let mut operands = &args[..];
    if style.e_option {
        // Any run of leading arguments consisting only of -n, -e, -E
        // clusters is consumed as flags.
        while let Some(first) = operands.first() {
            let flags = first.strip_prefix('-').filter(|flags| {
                !flags.is_empty() && flags.chars().all(|c| matches!(c, 'n' | 'e' | 'E'))
            });
            let Some(flags) = flags else { break };
            for flag in flags.chars() {
                match flag {
                    'n' => newline = false,
                    'e' => escapes = true,
                    _ => escapes = false,
                }
            }
            operands = &operands[1..];
        }
    } else if style.n_option {
        if operands.first().is_some_and(|first| first == "-n") {
            newline = false;
            operands = &operands[1..];
        }
    }

    let mut out = Vec::new();
    'print: for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        if escapes {
            if append_with_escapes(operand, &mut out) == EscapeOutcome::CutShort {
                newline = false;
                break 'print;
            }
        } else {
            out.extend_from_slice(operand.as_bytes());
        }
    }
    if newline {
        out.push(b'\n');
    }

    match env.system.write_stdout(&out) {
        Ok(()) => ExitStatus::SUCCESS,
        Err(errno) => {
            env.print_error(&format!("echo: cannot print to the standard output: {errno}"));
            ExitStatus::FAILURE
        }
    }
}
