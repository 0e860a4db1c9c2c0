//! This module defines the compiled machine configuration, the runtime status and
//! snapshot types, the engine constants, and the crate-level error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::DiagnosticReport;
use crate::session::SessionError;
use crate::state::StateSet;
use crate::symbol::TapeAlphabet;
use crate::tape::{Address, TapeError};
use crate::transition::TransitionFunction;

/// The maximum allowed size for a program in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The virtual address of a tape's start: the midpoint of the non-negative `i32` range.
pub const VIRTUAL_START: Address = i32::MAX / 2;
/// Blank cells allocated past the input word when a machine is reset.
pub const TAPE_SLACK: usize = 8;
/// The largest tape count a machine may declare.
pub const MAX_TAPES: usize = 64;

/// The immutable result of compiling a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineConfig {
    name: String,
    alphabet: TapeAlphabet,
    states: StateSet,
    transitions: TransitionFunction,
    tape_count: usize,
}

impl MachineConfig {
    /// Bundles the parts of a machine, checking that they agree with each other.
    pub fn new(
        name: impl Into<String>,
        alphabet: TapeAlphabet,
        states: StateSet,
        transitions: TransitionFunction,
        tape_count: usize,
    ) -> Result<Self, ConfigError> {
        if tape_count == 0 {
            return Err(ConfigError::ZeroTapes);
        }
        if tape_count > MAX_TAPES {
            return Err(ConfigError::TooManyTapes(tape_count));
        }

        if states.initial().is_none() {
            return Err(ConfigError::MissingInitialState);
        }

        for transition in transitions.iter() {
            if transition.tapes() != tape_count {
                return Err(ConfigError::Arity {
                    state: transition.state.clone(),
                    expected: tape_count,
                    found: transition.tapes(),
                });
            }

            for label in [&transition.state, &transition.next_state] {
                if !states.contains(label) {
                    return Err(ConfigError::UnknownState(label.clone()));
                }
            }

            if let Some(symbol) = transition
                .read
                .iter()
                .chain(&transition.write)
                .find(|s| !alphabet.contains(s.ch()))
            {
                return Err(ConfigError::UnknownSymbol(symbol.ch()));
            }
        }

        Ok(Self {
            name: name.into(),
            alphabet,
            states,
            transitions,
            tape_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &TapeAlphabet {
        &self.alphabet
    }

    pub fn states(&self) -> &StateSet {
        &self.states
    }

    pub fn transitions(&self) -> &TransitionFunction {
        &self.transitions
    }

    pub fn tape_count(&self) -> usize {
        self.tape_count
    }

    /// The label of the initial state.
    pub fn initial_state(&self) -> &str {
        self.states.initial().map(|s| s.label()).unwrap_or_default()
    }

    pub fn is_terminal(&self, label: &str) -> bool {
        self.states.get(label).is_some_and(|s| s.is_terminal())
    }
}

/// Errors raised when assembling a `MachineConfig` by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("a machine needs at least one tape")]
    ZeroTapes,
    #[error("{0} tapes exceed the limit of {max}", max = MAX_TAPES)]
    TooManyTapes(usize),
    #[error("no initial state is defined")]
    MissingInitialState,
    #[error("transition from {state} drives {found} tapes, expected {expected}")]
    Arity {
        state: String,
        expected: usize,
        found: usize,
    },
    #[error("state '{0}' is not declared")]
    UnknownState(String),
    #[error("symbol '{0}' is not in the tape alphabet")]
    UnknownSymbol(char),
}

/// The execution status of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Running,
    Accepted,
    Rejected,
}

/// Why a machine stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// The machine entered a terminal state.
    Accepted,
    /// No transition matches the current state and symbols.
    NoTransition,
    /// A head tried to move left of a left-bounded tape's first cell.
    LeftEdge,
    /// A head tried to pass through a section delimiter.
    SectionDelimiter,
    /// A head left the addressable range.
    OutOfRange,
}

impl From<TapeError> for HaltReason {
    fn from(error: TapeError) -> Self {
        match error {
            TapeError::LeftEdge(_) | TapeError::FixedLeftEdge => HaltReason::LeftEdge,
            TapeError::OutOfRange(_) => HaltReason::OutOfRange,
        }
    }
}

/// The full observable state of a machine after a reset or a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// The active state.
    pub state: String,
    /// Physical contents of each tape.
    pub tapes: Vec<String>,
    /// Virtual position of each head.
    pub heads: Vec<Address>,
    /// Physical index of each tape's virtual start.
    pub pivots: Vec<usize>,
    /// Ordinal of the transition that fires next, if any.
    pub transition: Option<usize>,
    pub step_count: usize,
    pub status: Status,
    pub halt_reason: Option<HaltReason>,
}

impl Snapshot {
    pub fn accepted(&self) -> bool {
        self.status == Status::Accepted
    }

    pub fn rejected(&self) -> bool {
        self.status == Status::Rejected
    }

    /// Physical index of head `tape` within `tapes[tape]`.
    pub fn head_index(&self, tape: usize) -> Option<i64> {
        let pivot = *self.pivots.get(tape)?;
        let head = *self.heads.get(tape)?;
        Some(crate::tape::translate(pivot, head))
    }
}

/// Errors raised by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("a machine needs at least one tape")]
    ZeroTapes,
    #[error("the left-bounded engine drives a single tape, the program declares {0}")]
    VariantMismatch(usize),
    #[error("symbol '{0}' is not in the input alphabet")]
    InvalidInputSymbol(char),
    #[error(transparent)]
    Tape(#[from] TapeError),
}

/// The crate-level error type.
#[derive(Debug, Error)]
pub enum FitaError {
    /// The program text did not compile.
    #[error("Compilation failed:\n{0}")]
    Compile(#[from] DiagnosticReport),
    #[error("Machine error: {0}")]
    Machine(#[from] MachineError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    /// Indicates an error related to reading program files.
    #[error("File error: {0}")]
    FileError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
