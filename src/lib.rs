//! This crate provides the core logic for a deterministic Turing machine simulator.
//! It includes a compiler for the textual machine description language, a renderer that
//! turns a compiled machine back into text, virtual tapes, a unified execution engine
//! for one or more tapes, a lint pass, an editor session state machine, and a catalogue
//! of bundled sample programs.

pub mod analyzer;
pub mod codegen;
pub mod compiler;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod session;
pub mod state;
pub mod symbol;
pub mod tape;
pub mod transition;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `Warning` enum from the analyzer module.
pub use analyzer::{analyze, Warning};
pub use codegen::{render, template};
pub use compiler::{compile, Diagnostic, DiagnosticKind, DiagnosticReport};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
pub use machine::{Machine, Observer, Variant};
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
pub use session::{Event, Session, SessionError, SessionState};
pub use state::{State, StateSet};
pub use symbol::{Alphabet, Symbol, TapeAlphabet, BLANK, SECTION_DELIMITER, START_MARKER};
pub use tape::{Address, Tape, TapeMode};
pub use transition::{Direction, Transition, TransitionFunction};
/// Re-exports the configuration, runtime and error types from the types module.
pub use types::{
    FitaError, HaltReason, MachineConfig, MachineError, Snapshot, Status, MAX_PROGRAM_SIZE, MAX_TAPES,
    VIRTUAL_START,
};
