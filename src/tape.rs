//! This module implements a tape: an unbounded storage medium backed by a growable
//! buffer.
//!
//! Cells are addressed by *virtual* addresses spanning the non-negative `i32` range,
//! with the tape's start at [`VIRTUAL_START`]. The buffer only holds the cells that
//! have been touched; `pivot` is the physical index that represents the virtual start.
//!
//! ```text
//!  virtual   ... S-2  S-1   S   S+1  S+2 ...
//!  physical        0    1    2    3    4      pivot = 2
//! ```
//!
//! A left-infinite tape grows in both directions by prepending or appending blank
//! cells and shifting the pivot. A left-bounded tape keeps its pivot at 0 and refuses
//! any access left of the virtual start.

use serde::Serialize;
use thiserror::Error;

use crate::symbol::Symbol;
use crate::types::VIRTUAL_START;

/// A virtual tape address.
pub type Address = i32;

/// How a tape behaves at its left end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapeMode {
    /// The tape has a first cell at the virtual start.
    LeftBounded,
    /// The tape extends without bound in both directions.
    LeftInfinite,
}

/// Errors raised by tape accesses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapeError {
    #[error("address {0} is left of the tape's first cell")]
    LeftEdge(Address),
    #[error("a left-bounded tape cannot grow to the left")]
    FixedLeftEdge,
    #[error("address {0} is outside the addressable range")]
    OutOfRange(i64),
}

/// Maps a virtual address to a physical index for a tape whose virtual start sits at
/// `pivot`. The result may be negative or past the end of the buffer.
pub fn translate(pivot: usize, address: Address) -> i64 {
    pivot as i64 + (i64::from(address) - i64::from(VIRTUAL_START))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Symbol>,
    pivot: usize,
    mode: TapeMode,
}

impl Tape {
    /// Creates an all-blank tape holding `size` cells (at least one).
    pub fn new(mode: TapeMode, size: usize) -> Self {
        Self {
            cells: vec![Symbol::blank(); size.max(1)],
            pivot: 0,
            mode,
        }
    }

    /// Blanks every cell, then writes `word` starting at the virtual start.
    pub fn initialize(&mut self, word: &[Symbol]) -> Result<(), TapeError> {
        self.cells.fill(Symbol::blank());

        for (address, symbol) in (VIRTUAL_START..).zip(word) {
            self.write(address, *symbol)?;
        }

        Ok(())
    }

    /// Reads the cell at `address`, materializing it if needed.
    pub fn read(&mut self, address: Address) -> Result<Symbol, TapeError> {
        let index = self.locate(address)?;
        Ok(self.cells[index])
    }

    /// Writes `symbol` at `address`, materializing the cell if needed.
    pub fn write(&mut self, address: Address, symbol: Symbol) -> Result<(), TapeError> {
        let index = self.locate(address)?;
        self.cells[index] = symbol;
        Ok(())
    }

    /// Reads the cell at `address` without growing the tape. Cells that were never
    /// materialized read as blank.
    pub fn peek(&self, address: Address) -> Symbol {
        usize::try_from(self.relative_position(address))
            .ok()
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or_else(Symbol::blank)
    }

    /// Grows the tape by `|n|` blank cells, prepending if `n < 0` and appending
    /// otherwise.
    pub fn adjust(&mut self, n: isize) -> Result<(), TapeError> {
        let count = n.unsigned_abs();
        if n < 0 {
            if self.mode == TapeMode::LeftBounded {
                return Err(TapeError::FixedLeftEdge);
            }
            let mut grown = vec![Symbol::blank(); count];
            grown.append(&mut self.cells);
            self.cells = grown;
            self.pivot += count;
        } else {
            self.cells
                .resize(self.cells.len() + count, Symbol::blank());
        }

        Ok(())
    }

    /// The physical index that `address` maps to (possibly out of bounds).
    pub fn relative_position(&self, address: Address) -> i64 {
        translate(self.pivot, address)
    }

    pub fn pivot(&self) -> usize {
        self.pivot
    }

    pub fn mode(&self) -> TapeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }

    /// The physical contents as a string.
    pub fn contents(&self) -> String {
        self.cells.iter().map(Symbol::ch).collect()
    }

    /// Resolves `address` to a valid physical index, growing the buffer by the
    /// minimum number of cells when it falls outside.
    fn locate(&mut self, address: Address) -> Result<usize, TapeError> {
        if address < 0 {
            return Err(TapeError::OutOfRange(i64::from(address)));
        }

        let index = self.relative_position(address);
        if index < 0 {
            if self.mode == TapeMode::LeftBounded {
                return Err(TapeError::LeftEdge(address));
            }
            let missing = isize::try_from(-index).map_err(|_| TapeError::OutOfRange(index))?;
            self.adjust(-missing)?;
            return Ok(0);
        }

        let index = usize::try_from(index).map_err(|_| TapeError::OutOfRange(index))?;
        if index >= self.cells.len() {
            let missing = isize::try_from(index + 1 - self.cells.len())
                .map_err(|_| TapeError::OutOfRange(index as i64))?;
            self.adjust(missing)?;
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn symbols(word: &str) -> Vec<Symbol> {
        word.chars().map(Symbol::new).collect()
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate(0, VIRTUAL_START), 0);
        assert_eq!(translate(3, VIRTUAL_START - 1), 2);
        assert_eq!(translate(0, VIRTUAL_START - 2), -2);
        assert_eq!(translate(1, VIRTUAL_START + 5), 6);
    }

    #[test]
    fn test_initialize_writes_from_virtual_start() {
        let mut tape = Tape::new(TapeMode::LeftInfinite, 2);
        tape.initialize(&symbols("abc")).unwrap();

        assert_eq!(tape.contents(), "abc");
        assert_eq!(tape.peek(VIRTUAL_START + 1).ch(), 'b');
        assert_eq!(tape.peek(VIRTUAL_START + 9).ch(), '_');

        tape.initialize(&symbols("z")).unwrap();
        assert_eq!(tape.contents(), "z__");
    }

    #[test]
    fn test_left_growth_shifts_pivot() {
        let mut tape = Tape::new(TapeMode::LeftInfinite, 3);
        tape.write(VIRTUAL_START, Symbol::new('a')).unwrap();
        tape.write(VIRTUAL_START - 2, Symbol::new('x')).unwrap();

        assert_eq!(tape.pivot(), 2);
        assert_eq!(tape.len(), 5);
        assert_eq!(tape.contents(), "x_a__");
        assert_eq!(tape.relative_position(VIRTUAL_START), 2);
        assert_eq!(tape.read(VIRTUAL_START).unwrap().ch(), 'a');
    }

    #[test]
    fn test_right_growth_is_minimal() {
        let mut tape = Tape::new(TapeMode::LeftInfinite, 2);
        tape.write(VIRTUAL_START + 4, Symbol::new('b')).unwrap();

        assert_eq!(tape.len(), 5);
        assert_eq!(tape.contents(), "____b");
    }

    #[test]
    fn test_left_bounded_tape_refuses_left_access() {
        let mut tape = Tape::new(TapeMode::LeftBounded, 2);

        assert_eq!(
            tape.read(VIRTUAL_START - 1),
            Err(TapeError::LeftEdge(VIRTUAL_START - 1))
        );
        assert_eq!(tape.adjust(-1), Err(TapeError::FixedLeftEdge));
        assert_eq!(tape.pivot(), 0);
        assert_eq!(tape.len(), 2);
    }

    #[test]
    fn test_adjust() {
        let mut tape = Tape::new(TapeMode::LeftInfinite, 1);
        tape.write(VIRTUAL_START, Symbol::new('a')).unwrap();
        tape.adjust(-2).unwrap();
        tape.adjust(3).unwrap();

        assert_eq!(tape.contents(), "__a___");
        assert_eq!(tape.pivot(), 2);
        assert_eq!(tape.peek(VIRTUAL_START).ch(), 'a');
    }

    #[test]
    fn test_negative_address_is_out_of_range() {
        let mut tape = Tape::new(TapeMode::LeftInfinite, 1);
        assert_eq!(tape.read(-1), Err(TapeError::OutOfRange(-1)));
    }

    proptest! {
        #[test]
        fn writes_survive_growth(
            ops in prop::collection::vec((-40i32..40, prop::char::range('a', 'z')), 1..60)
        ) {
            let mut tape = Tape::new(TapeMode::LeftInfinite, 4);
            let mut expected = HashMap::new();
            let mut len = tape.len();

            for (offset, ch) in ops {
                let address = VIRTUAL_START + offset;
                tape.write(address, Symbol::new(ch)).unwrap();
                expected.insert(address, ch);

                prop_assert!(tape.len() >= len);
                len = tape.len();

                for (&address, &ch) in &expected {
                    prop_assert_eq!(tape.peek(address).ch(), ch);
                }
            }
        }

        #[test]
        fn unwritten_cells_are_blank(offset in -100i32..100) {
            let mut tape = Tape::new(TapeMode::LeftInfinite, 4);
            prop_assert!(tape.read(VIRTUAL_START + offset).unwrap().is_blank());
            prop_assert!(tape.peek(VIRTUAL_START - 500).is_blank());
        }
    }
}
