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

//! Switch modifier semantics (`${x-w}`, `${x=w}`, `${x?w}`, `${x+w}`)

use super::super::attr_strip::strip_field;
use super::super::initial;
use super::super::phrase::Phrase;
use super::super::Ctx;
use super::super::Error;
use super::super::TildeMode;
use super::Resolution;
use rosh_env::variable::is_name;
use rosh_env::variable::Scope;
use rosh_env::variable::Value;
use rosh_syntax::syntax::Param;
use rosh_syntax::syntax::ParamTarget;
use rosh_syntax::syntax::Switch;
use rosh_syntax::syntax::SwitchCondition;
use rosh_syntax::syntax::SwitchKind;

/// Whether the resolved value triggers the switch.
///
/// The `:` form treats an empty value like an unset parameter.
fn is_vacant(resolution: &Resolution, condition: SwitchCondition) -> bool {
    if resolution.unset {
        return true;
    }
    match condition {
        SwitchCondition::Unset => false,
        SwitchCondition::UnsetOrEmpty => {
            resolution.values.is_empty()
                || (resolution.values.len() == 1 && resolution.values[0].is_empty())
        }
    }
}

/// Expands the switch word as the result of the whole expansion.
fn substitute(
    ctx: &mut Ctx<'_>,
    word: &rosh_syntax::syntax::Word,
    in_double_quotes: bool,
) -> Result<Phrase, Error> {
    let mut phrase = super::attribute(initial::expand_word_attr(ctx, word, TildeMode::Single)?);
    if in_double_quotes {
        phrase.for_each_char_mut(|c| c.is_quoted = true);
        super::quote_fields(&mut phrase);
    }
    Ok(phrase)
}

/// Expands the switch word into a plain string.
fn substitute_string(ctx: &mut Ctx<'_>, word: &rosh_syntax::syntax::Word) -> Result<String, Error> {
    let phrase = initial::expand_word_attr(ctx, word, TildeMode::Single)?;
    let joiner = ctx.env.variables.ifs_joiner();
    Ok(strip_field(phrase.ifs_join(&joiner)))
}

/// Applies a switch modifier.
///
/// Returns `Some(phrase)` when the switch decides the result of the
/// whole parameter expansion; `None` lets the expansion continue with
/// the resolved value.
pub(super) fn apply(
    ctx: &mut Ctx<'_>,
    switch: &Switch,
    param: &Param,
    resolution: &mut Resolution,
    in_double_quotes: bool,
) -> Result<Option<Phrase>, Error> {
    let vacant = is_vacant(resolution, switch.condition);
    match (switch.kind, vacant) {
        (SwitchKind::Alter, true)
        | (SwitchKind::Default, false)
        | (SwitchKind::Assign, false)
        | (SwitchKind::Error, false) => Ok(None),

        (SwitchKind::Alter, false) | (SwitchKind::Default, true) => {
            substitute(ctx, &switch.word, in_double_quotes).map(Some)
        }

        (SwitchKind::Assign, true) => {
            let name = match &param.target {
                ParamTarget::Nested(_) => return Err(Error::NestedAssignment),
                ParamTarget::Name(name) => name.clone(),
            };
            if !is_name(&name) {
                return Err(Error::Assignment(
                    rosh_env::variable::AssignError::InvalidName(name),
                ));
            }
            let value = substitute_string(ctx, &switch.word)?;
            ctx.env
                .variables
                .assign(Scope::Global, &name, Value::scalar(value.clone()))?;
            Ok(Some(super::into_phrase(vec![value], in_double_quotes)))
        }

        (SwitchKind::Error, true) => {
            let message = if switch.word.is_empty() {
                match switch.condition {
                    SwitchCondition::Unset => "parameter not set".to_string(),
                    SwitchCondition::UnsetOrEmpty => "parameter null or not set".to_string(),
                }
            } else {
                substitute_string(ctx, &switch.word)?
            };
            let name = match &param.target {
                ParamTarget::Name(name) => name.clone(),
                ParamTarget::Nested(_) => "parameter".to_string(),
            };
            Err(Error::VacantExpansion { name, message })
        }
    }
}
