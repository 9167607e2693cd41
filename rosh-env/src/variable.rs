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

//! Shell variables
//!
//! A [`VariableSet`] is a stack of contexts. The base context is always
//! present; functions and dot-scripts push a context for their locals and
//! pop it when they return. A variable defined in an upper context hides
//! one of the same name below it. Positional parameters belong to the
//! topmost context.

use std::collections::HashMap;
use std::ffi::CString;
use thiserror::Error;

/// Name of the field separator variable
pub const IFS: &str = "IFS";
/// Field separators assumed when `$IFS` is unset
pub const DEFAULT_IFS: &str = " \t\n";
/// Name of the home directory variable
pub const HOME: &str = "HOME";
/// Name of the working directory variable
pub const PWD: &str = "PWD";
/// Name of the previous working directory variable
pub const OLDPWD: &str = "OLDPWD";
/// Name of the variable selecting the `echo` built-in's behaviour
pub const ECHO_STYLE: &str = "ECHO_STYLE";
/// Name of the shell nesting level variable
pub const SHLVL: &str = "SHLVL";

/// Value of a variable
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Scalar(String),
    Array(Vec<String>),
}

impl Value {
    /// Creates a scalar value.
    #[must_use]
    pub fn scalar<S: Into<String>>(value: S) -> Self {
        Value::Scalar(value.into())
    }

    /// Creates an array value.
    #[must_use]
    pub fn array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Variable definition
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Variable {
    pub value: Option<Value>,
    /// Whether the variable is passed to child process environments
    pub exported: bool,
    /// Whether assignment and unsetting are rejected
    pub read_only: bool,
}

impl Variable {
    /// Creates a variable with a scalar value and default attributes.
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Variable {
            value: Some(Value::scalar(value)),
            ..Default::default()
        }
    }
}

/// Error in assigning or unsetting a variable
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum AssignError {
    #[error("`{0}` is read-only")]
    ReadOnly(String),
    #[error("`{0}` is not a valid variable name")]
    InvalidName(String),
}

/// Tests whether the string is a valid variable name.
#[must_use]
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Choice of context for assignment
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scope {
    /// The base context
    Global,
    /// The topmost context
    Local,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct VariableInContext {
    variable: Variable,
    context_index: usize,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Context {
    positional_params: Vec<String>,
}

/// Collection of variables
///
/// See the [module documentation](self).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableSet {
    /// All variables keyed by name; each entry is a stack of definitions
    /// sorted by ascending context index, the visible one last.
    all_variables: HashMap<String, Vec<VariableInContext>>,
    contexts: Vec<Context>,
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet {
            all_variables: HashMap::new(),
            contexts: vec![Context::default()],
        }
    }
}

impl VariableSet {
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the visible variable of the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Variable> {
        Some(&self.all_variables.get(name)?.last()?.variable)
    }

    /// Returns the visible value of the given name.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.get(name)?.value.as_ref()
    }

    /// Returns the visible value of the given name if it is a scalar.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&str> {
        match self.value_of(name)? {
            Value::Scalar(value) => Some(value),
            Value::Array(_) => None,
        }
    }

    /// Assigns a value to the named variable.
    ///
    /// With `Scope::Global`, an existing visible variable is updated in
    /// the context it lives in, or a new one is created in the base
    /// context. With `Scope::Local`, a variable is updated or created in
    /// the topmost context, shadowing any definition below.
    pub fn assign(
        &mut self,
        scope: Scope,
        name: &str,
        value: Value,
    ) -> Result<&mut Variable, AssignError> {
        if !is_name(name) {
            return Err(AssignError::InvalidName(name.to_string()));
        }

        let top = self.contexts.len() - 1;
        let stack = self.all_variables.entry(name.to_string()).or_default();

        if let Some(vic) = stack.last_mut() {
            if vic.variable.read_only {
                return Err(AssignError::ReadOnly(name.to_string()));
            }
            let update_in_place = match scope {
                Scope::Global => true,
                Scope::Local => vic.context_index == top,
            };
            if update_in_place {
                vic.variable.value = Some(value);
                return Ok(&mut stack.last_mut().unwrap().variable);
            }
        }

        let context_index = match scope {
            Scope::Global => 0,
            Scope::Local => top,
        };
        let variable = Variable {
            value: Some(value),
            ..Default::default()
        };
        let position = stack
            .iter()
            .position(|vic| vic.context_index > context_index)
            .unwrap_or(stack.len());
        stack.insert(
            position,
            VariableInContext {
                variable,
                context_index,
            },
        );
        Ok(&mut stack.last_mut().unwrap().variable)
    }

    /// Marks the named variable as exported, creating it if necessary.
    pub fn export(&mut self, name: &str, exported: bool) -> Result<(), AssignError> {
        if !is_name(name) {
            return Err(AssignError::InvalidName(name.to_string()));
        }
        let stack = self.all_variables.entry(name.to_string()).or_default();
        if let Some(vic) = stack.last_mut() {
            vic.variable.exported = exported;
        } else {
            stack.push(VariableInContext {
                variable: Variable {
                    exported,
                    ..Default::default()
                },
                context_index: 0,
            });
        }
        Ok(())
    }

    /// Marks the visible variable of the given name read-only.
    pub fn make_read_only(&mut self, name: &str) {
        if let Some(stack) = self.all_variables.get_mut(name) {
            if let Some(vic) = stack.last_mut() {
                vic.variable.read_only = true;
            }
        }
    }

    /// Removes the visible variable of the given name.
    pub fn unset(&mut self, name: &str) -> Result<Option<Variable>, AssignError> {
        let Some(stack) = self.all_variables.get_mut(name) else {
            return Ok(None);
        };
        match stack.last() {
            None => Ok(None),
            Some(vic) if vic.variable.read_only => Err(AssignError::ReadOnly(name.to_string())),
            Some(_) => Ok(stack.pop().map(|vic| vic.variable)),
        }
    }

    /// Pushes a context for function or dot-script locals.
    pub fn push_context(&mut self) {
        let positional_params = self.positional_params().to_vec();
        self.contexts.push(Context { positional_params });
    }

    /// Pops the topmost context, dropping its variables.
    ///
    /// The base context cannot be popped.
    pub fn pop_context(&mut self) {
        debug_assert!(self.contexts.len() > 1, "cannot pop the base context");
        if self.contexts.len() < 2 {
            return;
        }
        let index = self.contexts.len() - 1;
        self.contexts.pop();
        self.all_variables.retain(|_, stack| {
            while stack.last().is_some_and(|vic| vic.context_index >= index) {
                stack.pop();
            }
            !stack.is_empty()
        });
    }

    /// Positional parameters of the topmost context
    #[must_use]
    pub fn positional_params(&self) -> &[String] {
        &self.contexts.last().unwrap().positional_params
    }

    /// Replaces the positional parameters of the topmost context.
    pub fn set_positional_params<I, S>(&mut self, params: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts.last_mut().unwrap().positional_params =
            params.into_iter().map(Into::into).collect();
    }

    /// Positional parameter `$i` (1-based)
    #[must_use]
    pub fn positional_param(&self, i: usize) -> Option<&str> {
        let params = self.positional_params();
        i.checked_sub(1)
            .and_then(|index| params.get(index))
            .map(String::as_str)
    }

    /// Field separators, falling back to space-tab-newline when `$IFS`
    /// is unset
    #[must_use]
    pub fn ifs(&self) -> &str {
        match self.get(IFS) {
            None => DEFAULT_IFS,
            Some(variable) => match &variable.value {
                Some(Value::Scalar(value)) => value,
                _ => "",
            },
        }
    }

    /// String joining multi-value expansions: the first character of
    /// `$IFS`, a space when `$IFS` is unset, or nothing when it is empty
    #[must_use]
    pub fn ifs_joiner(&self) -> String {
        match self.get(IFS) {
            None => " ".to_string(),
            Some(variable) => match &variable.value {
                Some(Value::Scalar(value)) => value.chars().take(1).collect(),
                _ => String::new(),
            },
        }
    }

    /// Renders the exported scalar variables as `name=value` strings for
    /// a child process environment.
    ///
    /// Variables whose name or value contains a NUL byte are skipped.
    #[must_use]
    pub fn environment(&self) -> Vec<CString> {
        let mut result = Vec::new();
        for (name, stack) in &self.all_variables {
            let Some(vic) = stack.last() else { continue };
            if !vic.variable.exported {
                continue;
            }
            let Some(Value::Scalar(value)) = &vic.variable.value else {
                continue;
            };
            if let Ok(entry) = CString::new(format!("{name}={value}")) {
                result.push(entry);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_name("foo"));
        assert!(is_name("_foo_bar"));
        assert!(is_name("F00"));
        assert!(!is_name(""));
        assert!(!is_name("1foo"));
        assert!(!is_name("foo-bar"));
    }

    #[test]
    fn assign_and_get() {
        let mut set = VariableSet::new();
        set.assign(Scope::Global, "foo", Value::scalar("bar"))
            .unwrap();
        assert_eq!(set.scalar("foo"), Some("bar"));
        assert_eq!(set.scalar("missing"), None);
    }

    #[test]
    fn invalid_name_rejected() {
        let mut set = VariableSet::new();
        let error = set
            .assign(Scope::Global, "1st", Value::scalar(""))
            .unwrap_err();
        assert_eq!(error, AssignError::InvalidName("1st".to_string()));
    }

    #[test]
    fn read_only_rejected() {
        let mut set = VariableSet::new();
        set.assign(Scope::Global, "foo", Value::scalar("bar"))
            .unwrap();
        set.make_read_only("foo");
        let error = set
            .assign(Scope::Global, "foo", Value::scalar("baz"))
            .unwrap_err();
        assert_eq!(error, AssignError::ReadOnly("foo".to_string()));
        assert_eq!(set.unset("foo"), Err(AssignError::ReadOnly("foo".to_string())));
        assert_eq!(set.scalar("foo"), Some("bar"));
    }

    #[test]
    fn local_shadows_global() {
        let mut set = VariableSet::new();
        set.assign(Scope::Global, "foo", Value::scalar("outer"))
            .unwrap();
        set.push_context();
        set.assign(Scope::Local, "foo", Value::scalar("inner"))
            .unwrap();
        assert_eq!(set.scalar("foo"), Some("inner"));
        set.pop_context();
        assert_eq!(set.scalar("foo"), Some("outer"));
    }

    #[test]
    fn global_assignment_inside_context() {
        let mut set = VariableSet::new();
        set.push_context();
        set.assign(Scope::Global, "foo", Value::scalar("value"))
            .unwrap();
        set.pop_context();
        assert_eq!(set.scalar("foo"), Some("value"));
    }

    #[test]
    fn positional_params_per_context() {
        let mut set = VariableSet::new();
        set.set_positional_params(["a", "b"]);
        set.push_context();
        set.set_positional_params(["c"]);
        assert_eq!(set.positional_params(), ["c"]);
        assert_eq!(set.positional_param(1), Some("c"));
        assert_eq!(set.positional_param(2), None);
        set.pop_context();
        assert_eq!(set.positional_params(), ["a", "b"]);
        assert_eq!(set.positional_param(0), None);
    }

    #[test]
    fn ifs_fallbacks() {
        let mut set = VariableSet::new();
        assert_eq!(set.ifs(), DEFAULT_IFS);
        assert_eq!(set.ifs_joiner(), " ");

        set.assign(Scope::Global, IFS, Value::scalar(":,")).unwrap();
        assert_eq!(set.ifs(), ":,");
        assert_eq!(set.ifs_joiner(), ":");

        set.assign(Scope::Global, IFS, Value::scalar("")).unwrap();
        assert_eq!(set.ifs(), "");
        assert_eq!(set.ifs_joiner(), "");
    }

    #[test]
    fn environment_contains_exported_scalars_only() {
        let mut set = VariableSet::new();
        set.assign(Scope::Global, "A", Value::scalar("1")).unwrap();
        set.assign(Scope::Global, "B", Value::scalar("2")).unwrap();
        set.export("B", true).unwrap();
        let environment = set.environment();
        assert_eq!(environment, [CString::new("B=2").unwrap()]);
    }
}
