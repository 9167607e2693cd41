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

//! Parameter expansion
//!
//! Resolution first: the parameter name (or the recursively expanded
//! nested word) yields a list of value elements together with two
//! marks — whether the elements are joined with the first `$IFS`
//! character (`*`, scalars, nested expansions) or kept as separate
//! fields (`@`, arrays), and whether the parameter was unset. The
//! modifier then rewrites the list, and the result becomes a phrase of
//! soft-expansion characters.
//!
//! Inside double quotes every produced character is marked quoted and
//! each field is wrapped in dummy quotes, so a field that ends up empty
//! still survives field splitting. `"$@"` with no positional parameters
//! produces no field at all, which the caller turns into the word-level
//! suppression rule.

mod subst;
mod switch;
mod trim;

use super::attr::to_field;
use super::attr::AttrChar;
use super::attr::Origin;
use super::initial;
use super::phrase::Phrase;
use super::Ctx;
use super::Error;
use super::TildeMode;
use rosh_fnmatch::Config;
use rosh_fnmatch::Pattern;
use rosh_fnmatch::PatternChar;
use rosh_syntax::syntax::Modifier;
use rosh_syntax::syntax::Param;
use rosh_syntax::syntax::ParamTarget;
use rosh_syntax::syntax::Word;

/// Resolved parameter value before modifiers apply
pub(crate) struct Resolution {
    pub values: Vec<String>,
    /// Whether the elements are joined into one before use
    pub concat: bool,
    /// Whether the parameter was not set
    pub unset: bool,
}

/// Looks up a parameter by name.
fn resolve(env: &rosh_env::Env, name: &str) -> Resolution {
    use rosh_env::variable::Value;

    let unset = || Resolution {
        values: vec![String::new()],
        concat: true,
        unset: true,
    };

    match name {
        "@" => Resolution {
            values: env.variables.positional_params().to_vec(),
            concat: false,
            unset: false,
        },
        "*" => Resolution {
            values: env.variables.positional_params().to_vec(),
            concat: true,
            unset: false,
        },
        _ if name.chars().all(|c| c.is_ascii_digit()) => {
            match name.parse().ok().and_then(|i| env.variables.positional_param(i)) {
                Some(value) => Resolution {
                    values: vec![value.to_string()],
                    concat: true,
                    unset: false,
                },
                None => unset(),
            }
        }
        _ => match env.variables.value_of(name) {
            Some(Value::Scalar(value)) => Resolution {
                values: vec![value.clone()],
                concat: true,
                unset: false,
            },
            Some(Value::Array(values)) => Resolution {
                values: values.clone(),
                concat: false,
                unset: false,
            },
            None => unset(),
        },
    }
}

/// Performs a parameter expansion.
pub(crate) fn expand_param(
    ctx: &mut Ctx<'_>,
    param: &Param,
    in_double_quotes: bool,
    tilde: TildeMode,
) -> Result<Phrase, Error> {
    let mut resolution = match &param.target {
        ParamTarget::Nested(word) => {
            let phrase = initial::expand_word_attr(ctx, word, tilde)?;
            let values = phrase
                .into_fields()
                .into_iter()
                .map(super::attr_strip::strip_field)
                .collect();
            Resolution {
                values,
                concat: true,
                unset: false,
            }
        }
        ParamTarget::Name(name) => resolve(ctx.env, name),
    };

    match &param.modifier {
        Modifier::None | Modifier::Length => {}
        Modifier::Switch(switch) => {
            if let Some(phrase) =
                switch::apply(ctx, switch, param, &mut resolution, in_double_quotes)?
            {
                return Ok(phrase);
            }
        }
        Modifier::Trim(trim) => trim::apply(ctx, trim, &mut resolution.values)?,
        Modifier::Subst(subst) => subst::apply(ctx, subst, &mut resolution.values)?,
    }

    if resolution.concat && resolution.values.len() != 1 {
        let joiner = ctx.env.variables.ifs_joiner();
        resolution.values = vec![resolution.values.join(&joiner)];
    }

    if param.modifier == Modifier::Length {
        for value in &mut resolution.values {
            *value = value.chars().count().to_string();
        }
    }

    Ok(into_phrase(resolution.values, in_double_quotes))
}

/// Converts value elements into a phrase of soft-expansion characters.
pub(crate) fn into_phrase(values: Vec<String>, in_double_quotes: bool) -> Phrase {
    let fields: Vec<Vec<AttrChar>> = values
        .iter()
        .map(|value| to_field(value, Origin::SoftExpansion, in_double_quotes))
        .collect();
    let mut phrase = match fields.len() {
        1 => Phrase::Field(fields.into_iter().next().unwrap()),
        _ => Phrase::Full(fields),
    };
    if in_double_quotes {
        quote_fields(&mut phrase);
    }
    phrase
}

/// Marks every character quoted and wraps each field in dummy quotes.
///
/// The dummy quotes keep fields that are empty (an empty `"$@"`
/// element, say) from being discarded by field splitting; quote removal
/// drops them again later.
pub(crate) fn quote_fields(phrase: &mut Phrase) {
    const QUOTE: AttrChar = AttrChar {
        value: '"',
        origin: Origin::Literal,
        is_quoted: false,
        is_quoting: true,
    };

    fn quote_field(field: &mut Vec<AttrChar>) {
        for c in field.iter_mut() {
            c.is_quoted = true;
        }
        field.insert(0, QUOTE);
        field.push(QUOTE);
    }

    match phrase {
        Phrase::Field(field) => quote_field(field),
        Phrase::Full(fields) => fields.iter_mut().for_each(quote_field),
    }
}

/// Expands a modifier's pattern word and compiles it for matching.
///
/// Whether a character acts as pattern syntax is decided by its
/// [expansion attributes](AttrChar::is_pattern_active): a quoting
/// character disappears, and a character the expansion protected
/// matches only itself. A pattern that does not compile matches
/// nothing, reported as `None`.
fn compile_pattern(
    ctx: &mut Ctx<'_>,
    word: &Word,
    config: Config,
) -> Result<Option<Pattern>, Error> {
    let phrase = initial::expand_word_attr(ctx, word, TildeMode::Single)?;
    let joiner = ctx.env.variables.ifs_joiner();
    let field = phrase.ifs_join(&joiner);
    let chars = field.iter().filter(|c| !c.is_quoting).map(|c| {
        if c.is_pattern_active() {
            PatternChar::Normal(c.value)
        } else {
            PatternChar::Literal(c.value)
        }
    });
    Ok(Pattern::parse_with_config(chars, config).ok())
}

/// Changes literal characters of a substituted word to soft expansion.
///
/// A word substituted by a parameter expansion modifier is part of the
/// expansion result, so its literal characters become subject to field
/// splitting like any other expansion output.
pub(crate) fn attribute(mut phrase: Phrase) -> Phrase {
    phrase.for_each_char_mut(|c| {
        if c.origin == Origin::Literal && !c.is_quoting {
            c.origin = Origin::SoftExpansion;
        }
    });
    phrase
}

#[cfg(test)]
mod tests {
    use super::super::tests::ctx_env;
    use super::super::tests::expand_param_str;
    use super::*;
    use rosh_env::variable::{Scope, Value};
    use rosh_syntax::syntax::Word;

    #[test]
    fn plain_scalar() {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, "foo", Value::scalar("bar"))
            .unwrap();
        let param = Param::new("foo");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["bar".to_string()]));
    }

    #[test]
    fn unset_parameter_is_empty() {
        let mut env = ctx_env();
        let param = Param::new("foo");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec![String::new()]));
    }

    #[test]
    fn at_keeps_fields() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a", "b c"]);
        let param = Param::new("@");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["a".to_string(), "b c".to_string()])
        );
    }

    #[test]
    fn at_with_no_params_is_zero_fields() {
        let mut env = ctx_env();
        let param = Param::new("@");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec![]));
    }

    #[test]
    fn asterisk_joins_with_first_ifs_char() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a", "b"]);
        env.variables
            .assign(Scope::Global, rosh_env::variable::IFS, Value::scalar(":;"))
            .unwrap();
        let param = Param::new("*");
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["a:b".to_string()])
        );
    }

    #[test]
    fn positional_parameter_by_number() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["one", "two"]);
        let param = Param::new("2");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["two".to_string()]));
        let param = Param::new("3");
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec![String::new()]));
    }

    #[test]
    fn length_of_scalar_and_array() {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, "foo", Value::scalar("abcde"))
            .unwrap();
        let mut param = Param::new("foo");
        param.modifier = Modifier::Length;
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["5".to_string()]));

        env.variables.set_positional_params(["xy", ""]);
        let mut param = Param::new("@");
        param.modifier = Modifier::Length;
        assert_eq!(
            expand_param_str(&mut env, &param, false),
            Ok(vec!["2".to_string(), "0".to_string()])
        );
    }

    #[test]
    fn length_of_unset_is_zero() {
        let mut env = ctx_env();
        let mut param = Param::new("foo");
        param.modifier = Modifier::Length;
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["0".to_string()]));
    }

    #[test]
    fn nested_expansion_concatenates() {
        let mut env = ctx_env();
        env.variables
            .assign(Scope::Global, "inner", Value::scalar("x"))
            .unwrap();
        let mut word = Word::default();
        word.units
            .push(rosh_syntax::syntax::WordUnit::Param(Param::new("inner")));
        let param = Param {
            target: ParamTarget::Nested(Box::new(word)),
            modifier: Modifier::Length,
        };
        assert_eq!(expand_param_str(&mut env, &param, false), Ok(vec!["1".to_string()]));
    }

    #[test]
    fn quoted_fields_carry_dummy_quotes() {
        let mut env = ctx_env();
        env.variables.set_positional_params(["a", ""]);
        let param = Param::new("@");
        let mut ctx = Ctx {
            env: &mut env,
            runner: &mut super::super::NoCommandSubst,
        };
        let phrase = expand_param(&mut ctx, &param, true, TildeMode::None).unwrap();
        let fields = phrase.into_fields();
        assert_eq!(fields.len(), 2);
        // The empty element is represented by its dummy quotes alone.
        assert_eq!(fields[1].len(), 2);
        assert!(fields[1].iter().all(|c| c.is_quoting));
        assert!(fields[0][1].is_quoted);
    }
}
