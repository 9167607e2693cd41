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

//! Syntax tree handed to the rosh shell core.
//!
//! This crate defines the word tree the expansion engine consumes. The
//! parser that produces the tree is a separate component; nothing here
//! reads source text. A [`Word`](syntax::Word) is an ordered sequence of
//! [`WordUnit`](syntax::WordUnit)s, each of which is literal text (with
//! its quotation characters still in place), a parameter expansion, a
//! command substitution, or an arithmetic substitution.

pub mod syntax;
