//! This module defines transition rules and the ordered transition table δ.
//!
//! A transition is keyed by its source state and the tuple of symbols it reads, one
//! per tape. The table holds at most one transition per key; the order of its rules
//! only matters for listing and reordering.

use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Represents the possible directions a head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left (`E`).
    Left,
    /// Move the head one cell to the right (`D`).
    Right,
    /// Keep the head on the same cell (`P`).
    Stay,
}

impl Direction {
    /// Parses a DSL direction token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "E" => Some(Direction::Left),
            "D" => Some(Direction::Right),
            "P" => Some(Direction::Stay),
            _ => None,
        }
    }

    pub fn token(self) -> char {
        match self {
            Direction::Left => 'E',
            Direction::Right => 'D',
            Direction::Stay => 'P',
        }
    }

    /// The head displacement produced by this direction.
    pub fn offset(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Errors raised when building transitions or editing the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("inconsistent transition: read={read}, write={write}, directions={directions}")]
    Arity {
        read: usize,
        write: usize,
        directions: usize,
    },
    #[error("a transition for state {state} reading {read:?} already exists")]
    Duplicate { state: String, read: Vec<char> },
    #[error("transition index {0} is out of range")]
    IndexOutOfRange(usize),
}

/// A single transition rule: `state, read... = next_state, write..., directions...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// The state the rule fires from.
    pub state: String,
    /// The symbols read from each tape.
    pub read: Vec<Symbol>,
    /// The symbols written to each tape.
    pub write: Vec<Symbol>,
    /// The head movement for each tape.
    pub directions: Vec<Direction>,
    /// The state the machine moves to.
    pub next_state: String,
}

impl Transition {
    pub fn new(
        state: impl Into<String>,
        read: Vec<Symbol>,
        next_state: impl Into<String>,
        write: Vec<Symbol>,
        directions: Vec<Direction>,
    ) -> Result<Self, TransitionError> {
        if read.is_empty() || read.len() != write.len() || read.len() != directions.len() {
            return Err(TransitionError::Arity {
                read: read.len(),
                write: write.len(),
                directions: directions.len(),
            });
        }

        Ok(Self {
            state: state.into(),
            read,
            write,
            directions,
            next_state: next_state.into(),
        })
    }

    /// Number of tapes this rule drives.
    pub fn tapes(&self) -> usize {
        self.read.len()
    }

    pub fn read_chars(&self) -> Vec<char> {
        self.read.iter().map(Symbol::ch).collect()
    }
}

/// The ordered transition table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionFunction {
    transitions: Vec<Transition>,
    #[serde(skip)]
    index: HashMap<String, HashMap<Vec<char>, usize>>,
}

impl TransitionFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transition, returning its ordinal. Fails if a transition with the
    /// same state and read symbols is already present.
    pub fn insert(&mut self, transition: Transition) -> Result<usize, TransitionError> {
        let read = transition.read_chars();
        if self.position(&transition.state, &read).is_some() {
            return Err(TransitionError::Duplicate {
                state: transition.state,
                read,
            });
        }

        let ordinal = self.transitions.len();
        self.index
            .entry(transition.state.clone())
            .or_default()
            .insert(read, ordinal);
        self.transitions.push(transition);

        Ok(ordinal)
    }

    /// Finds the transition for `state` reading `read`.
    pub fn get(&self, state: &str, read: &[char]) -> Option<&Transition> {
        self.position(state, read).map(|i| &self.transitions[i])
    }

    /// Finds the ordinal of the transition for `state` reading `read`.
    pub fn position(&self, state: &str, read: &[char]) -> Option<usize> {
        self.index.get(state)?.get(read).copied()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Result<Transition, TransitionError> {
        if index >= self.transitions.len() {
            return Err(TransitionError::IndexOutOfRange(index));
        }

        let removed = self.transitions.remove(index);
        self.reindex();
        Ok(removed)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), TransitionError> {
        for i in [a, b] {
            if i >= self.transitions.len() {
                return Err(TransitionError::IndexOutOfRange(i));
            }
        }

        self.transitions.swap(a, b);
        self.reindex();
        Ok(())
    }

    pub fn move_up(&mut self, index: usize) -> Result<(), TransitionError> {
        if index == 0 {
            return Err(TransitionError::IndexOutOfRange(index));
        }
        self.swap(index - 1, index)
    }

    pub fn move_down(&mut self, index: usize) -> Result<(), TransitionError> {
        self.swap(index, index + 1)
    }

    /// Returns true if any transition leaves `state`.
    pub fn has_transitions_from(&self, state: &str) -> bool {
        self.index.get(state).is_some_and(|rules| !rules.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, transition) in self.transitions.iter().enumerate() {
            self.index
                .entry(transition.state.clone())
                .or_default()
                .insert(transition.read_chars(), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(state: &str, read: char, write: char, direction: Direction, next: &str) -> Transition {
        Transition::new(
            state,
            vec![Symbol::new(read)],
            next,
            vec![Symbol::new(write)],
            vec![direction],
        )
        .unwrap()
    }

    #[test]
    fn test_direction_tokens() {
        assert_eq!(Direction::from_token("D"), Some(Direction::Right));
        assert_eq!(Direction::from_token("E"), Some(Direction::Left));
        assert_eq!(Direction::from_token("P"), Some(Direction::Stay));
        assert_eq!(Direction::from_token("R"), None);
        assert_eq!(Direction::Left.to_string(), "E");
        assert_eq!(Direction::Left.offset(), -1);
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&Direction::Right).unwrap();
        assert_eq!(json, "\"Right\"");
        assert_eq!(
            serde_json::from_str::<Direction>(&json).unwrap(),
            Direction::Right
        );
    }

    #[test]
    fn test_transition_arity() {
        let result = Transition::new(
            "q0",
            vec![Symbol::new('a'), Symbol::new('b')],
            "q1",
            vec![Symbol::new('c')],
            vec![Direction::Right, Direction::Right],
        );

        assert_eq!(
            result,
            Err(TransitionError::Arity {
                read: 2,
                write: 1,
                directions: 2
            })
        );
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut table = TransitionFunction::new();
        table.insert(rule("q0", 'a', 'b', Direction::Right, "q1")).unwrap();

        let result = table.insert(rule("q0", 'a', 'c', Direction::Left, "q2"));
        assert_eq!(
            result,
            Err(TransitionError::Duplicate {
                state: "q0".to_string(),
                read: vec!['a']
            })
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup_by_key_and_index() {
        let mut table = TransitionFunction::new();
        table.insert(rule("q0", 'a', 'b', Direction::Right, "q1")).unwrap();
        table.insert(rule("q0", 'b', 'b', Direction::Right, "q0")).unwrap();

        assert_eq!(table.position("q0", &['b']), Some(1));
        assert_eq!(table.get("q0", &['a']).unwrap().next_state, "q1");
        assert!(table.get("q1", &['a']).is_none());
        assert_eq!(table.get_by_index(1).unwrap().next_state, "q0");
        assert!(table.has_transitions_from("q0"));
        assert!(!table.has_transitions_from("q1"));
    }

    #[test]
    fn test_reordering_keeps_lookup_consistent() {
        let mut table = TransitionFunction::new();
        table.insert(rule("q0", 'a', 'a', Direction::Right, "q0")).unwrap();
        table.insert(rule("q0", 'b', 'b', Direction::Right, "q0")).unwrap();
        table.insert(rule("q0", '_', '_', Direction::Stay, "q1")).unwrap();

        table.move_down(0).unwrap();
        assert_eq!(table.position("q0", &['a']), Some(1));
        assert_eq!(table.position("q0", &['b']), Some(0));

        table.move_up(2).unwrap();
        assert_eq!(table.position("q0", &['_']), Some(1));

        assert_eq!(table.move_up(0), Err(TransitionError::IndexOutOfRange(0)));
        assert_eq!(table.move_down(2), Err(TransitionError::IndexOutOfRange(3)));

        let removed = table.remove(0).unwrap();
        assert_eq!(removed.read_chars(), vec!['b']);
        assert_eq!(table.position("q0", &['a']), Some(1));
        assert_eq!(table.position("q0", &['b']), None);
    }
}
