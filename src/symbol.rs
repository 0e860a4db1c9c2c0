//! This module defines tape symbols and the alphabets that group them.
//!
//! A `Symbol` is a single character plus two flags (auxiliary, reserved). Equality,
//! ordering and hashing only look at the character, so a symbol can be looked up in
//! any alphabet regardless of how it was flagged.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// The symbol occupying every cell that has not been written yet.
pub const BLANK: char = '_';
/// Marks the first cell of a tape.
pub const START_MARKER: char = '>';
/// Separates sections of a tape; see the left-bounded engine policy in `machine`.
pub const SECTION_DELIMITER: char = '#';
/// The reserved symbols, in the order they open every tape alphabet.
pub const RESERVED: [char; 3] = [BLANK, START_MARKER, SECTION_DELIMITER];

/// Escape token standing for a literal space.
pub const ESCAPE_SPACE: &str = "$e";
/// Escape token standing for a literal comma.
pub const ESCAPE_COMMA: &str = "$v";

/// A single tape symbol.
#[derive(Debug, Clone, Copy, Eq, Serialize)]
pub struct Symbol {
    ch: char,
    auxiliary: bool,
    reserved: bool,
}

impl Symbol {
    /// Creates an input symbol.
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            auxiliary: false,
            reserved: false,
        }
    }

    /// Creates an auxiliary symbol.
    pub fn auxiliary(ch: char) -> Self {
        Self {
            ch,
            auxiliary: true,
            reserved: false,
        }
    }

    fn reserved(ch: char) -> Self {
        Self {
            ch,
            auxiliary: false,
            reserved: true,
        }
    }

    /// The blank symbol.
    pub fn blank() -> Self {
        Self::reserved(BLANK)
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn is_auxiliary(&self) -> bool {
        self.auxiliary
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    pub fn is_blank(&self) -> bool {
        self.ch == BLANK
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ch == other.ch
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ch.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ch.cmp(&other.ch)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ch)
    }
}

/// Returns true if `ch` is one of the reserved symbols.
pub fn is_reserved(ch: char) -> bool {
    RESERVED.contains(&ch)
}

/// Expands the `$e`/`$v` escape tokens of a DSL token.
pub fn unescape(token: &str) -> String {
    token.replace(ESCAPE_SPACE, " ").replace(ESCAPE_COMMA, ",")
}

/// Writes a symbol the way the DSL expects it, escaping space and comma.
pub fn escape(ch: char) -> String {
    match ch {
        ' ' => ESCAPE_SPACE.to_string(),
        ',' => ESCAPE_COMMA.to_string(),
        c => c.to_string(),
    }
}

/// Errors raised when editing an alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlphabetError {
    #[error("symbol '{0}' is already in the alphabet")]
    Duplicate(char),
    #[error("symbol '{0}' is reserved")]
    Reserved(char),
    #[error("symbol '{0}' cannot be both an input and an auxiliary symbol")]
    Overlap(char),
    #[error("symbol '{0}' is not in the alphabet")]
    NotFound(char),
}

/// A duplicate-free sequence of symbols sorted by character code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Alphabet {
    symbols: Vec<Symbol>,
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a symbol at its sorted position. Returns `false` if the character is
    /// already present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        match self.symbols.binary_search(&symbol) {
            Ok(_) => false,
            Err(pos) => {
                self.symbols.insert(pos, symbol);
                true
            }
        }
    }

    pub fn remove(&mut self, ch: char) -> Option<Symbol> {
        self.position(ch).map(|pos| self.symbols.remove(pos))
    }

    pub fn contains(&self, ch: char) -> bool {
        self.position(ch).is_some()
    }

    pub fn get(&self, ch: char) -> Option<&Symbol> {
        self.position(ch).map(|pos| &self.symbols[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.symbols.iter().map(Symbol::ch)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn position(&self, ch: char) -> Option<usize> {
        self.symbols.binary_search(&Symbol::new(ch)).ok()
    }
}

impl FromIterator<Symbol> for Alphabet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut alphabet = Alphabet::new();
        for symbol in iter {
            alphabet.insert(symbol);
        }
        alphabet
    }
}

/// The full tape alphabet Γ: the reserved symbols, then the input alphabet Σ, then
/// the auxiliary alphabet. Σ and the auxiliary alphabet are disjoint and never
/// contain a reserved symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TapeAlphabet {
    input: Alphabet,
    auxiliary: Alphabet,
}

impl TapeAlphabet {
    /// Builds a tape alphabet from input and auxiliary characters.
    pub fn new<I, A>(input: I, auxiliary: A) -> Result<Self, AlphabetError>
    where
        I: IntoIterator<Item = char>,
        A: IntoIterator<Item = char>,
    {
        let mut alphabet = Self::default();
        for ch in input {
            alphabet.add_input(ch)?;
        }
        for ch in auxiliary {
            alphabet.add_auxiliary(ch)?;
        }
        Ok(alphabet)
    }

    pub fn add_input(&mut self, ch: char) -> Result<(), AlphabetError> {
        Self::check_new(ch, &self.input, &self.auxiliary)?;
        self.input.insert(Symbol::new(ch));
        Ok(())
    }

    pub fn add_auxiliary(&mut self, ch: char) -> Result<(), AlphabetError> {
        Self::check_new(ch, &self.auxiliary, &self.input)?;
        self.auxiliary.insert(Symbol::auxiliary(ch));
        Ok(())
    }

    /// Removes an input or auxiliary symbol. Reserved symbols cannot be removed.
    pub fn remove(&mut self, ch: char) -> Result<Symbol, AlphabetError> {
        if is_reserved(ch) {
            return Err(AlphabetError::Reserved(ch));
        }

        self.input
            .remove(ch)
            .or_else(|| self.auxiliary.remove(ch))
            .ok_or(AlphabetError::NotFound(ch))
    }

    pub fn reserved(&self) -> [Symbol; 3] {
        RESERVED.map(Symbol::reserved)
    }

    pub fn input(&self) -> &Alphabet {
        &self.input
    }

    pub fn auxiliary(&self) -> &Alphabet {
        &self.auxiliary
    }

    pub fn blank(&self) -> Symbol {
        Symbol::blank()
    }

    /// Looks up a character in Γ, returning the symbol with its flags.
    pub fn resolve(&self, ch: char) -> Option<Symbol> {
        if is_reserved(ch) {
            return Some(Symbol::reserved(ch));
        }

        self.input
            .get(ch)
            .or_else(|| self.auxiliary.get(ch))
            .copied()
    }

    pub fn contains(&self, ch: char) -> bool {
        self.resolve(ch).is_some()
    }

    /// All symbols of Γ in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.reserved()
            .into_iter()
            .chain(self.input.iter().copied())
            .chain(self.auxiliary.iter().copied())
    }

    pub fn len(&self) -> usize {
        RESERVED.len() + self.input.len() + self.auxiliary.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn check_new(ch: char, own: &Alphabet, other: &Alphabet) -> Result<(), AlphabetError> {
        if is_reserved(ch) {
            Err(AlphabetError::Reserved(ch))
        } else if own.contains(ch) {
            Err(AlphabetError::Duplicate(ch))
        } else if other.contains(ch) {
            Err(AlphabetError::Overlap(ch))
        } else {
            Ok(())
        }
    }
}
