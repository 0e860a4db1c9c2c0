//! This module defines machine states and the set that owns them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

lazy_static! {
    static ref LABEL: Regex = Regex::new(r"^q[A-Za-z0-9]+$").expect("state label pattern");
}

/// Returns true if `label` is a valid state label (`q` followed by letters or digits).
pub fn is_valid_label(label: &str) -> bool {
    LABEL.is_match(label)
}

/// Errors raised when building or editing a state set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("invalid state label '{0}': expected q followed by letters or digits")]
    InvalidLabel(String),
    #[error("state '{0}' is already declared")]
    Duplicate(String),
    #[error("state '{new}' cannot be initial: '{existing}' is already the initial state")]
    MultipleInitial { existing: String, new: String },
    #[error("state '{0}' is not declared")]
    NotFound(String),
}

/// A named machine state.
///
/// Two states are equal when their labels are equal; the flags are not compared.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct State {
    label: String,
    initial: bool,
    terminal: bool,
}

impl State {
    pub fn new(label: impl Into<String>) -> Result<Self, StateError> {
        let label = label.into();
        if !is_valid_label(&label) {
            return Err(StateError::InvalidLabel(label));
        }

        Ok(Self {
            label,
            initial: false,
            terminal: false,
        })
    }

    pub fn with_initial(mut self, initial: bool) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A duplicate-free collection of states in declaration order.
///
/// At most one member is initial. The initial state and the terminal/non-terminal
/// subsets are derived from the members' flags on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateSet {
    states: Vec<State>,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: State) -> Result<(), StateError> {
        if self.contains(state.label()) {
            return Err(StateError::Duplicate(state.label));
        }

        if state.is_initial() {
            if let Some(existing) = self.initial() {
                return Err(StateError::MultipleInitial {
                    existing: existing.label.clone(),
                    new: state.label,
                });
            }
        }

        self.states.push(state);
        Ok(())
    }

    pub fn remove(&mut self, label: &str) -> Option<State> {
        let pos = self.position(label)?;
        Some(self.states.remove(pos))
    }

    pub fn get(&self, label: &str) -> Option<&State> {
        self.states.iter().find(|s| s.label == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    /// Makes `label` the only initial state.
    pub fn set_initial(&mut self, label: &str) -> Result<(), StateError> {
        let pos = self
            .position(label)
            .ok_or_else(|| StateError::NotFound(label.to_string()))?;

        for (i, state) in self.states.iter_mut().enumerate() {
            state.initial = i == pos;
        }

        Ok(())
    }

    pub fn set_terminal(&mut self, label: &str, terminal: bool) -> Result<(), StateError> {
        let pos = self
            .position(label)
            .ok_or_else(|| StateError::NotFound(label.to_string()))?;
        self.states[pos].terminal = terminal;
        Ok(())
    }

    pub fn initial(&self) -> Option<&State> {
        self.states.iter().find(|s| s.initial)
    }

    pub fn terminal(&self) -> impl Iterator<Item = &State> {
        self.states.iter().filter(|s| s.terminal)
    }

    pub fn non_terminal(&self) -> impl Iterator<Item = &State> {
        self.states.iter().filter(|s| !s.terminal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s.label == label)
    }
}
