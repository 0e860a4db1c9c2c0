//! This module compiles program text into a [`MachineConfig`].
//!
//! A program has three sections, each opened by a bracketed header and always in this
//! order:
//!
//! ```text
//! [Descricao]
//!     Nome = Binary increment
//! [Parametros]
//!     AlfabetoEntrada = { 0, 1 }
//!     AlfabetoAuxiliar = {}
//!     Estados = { q0, q1, q2 }
//!     EstadoInicial = q0
//!     EstadosTerminais = { q2 }
//!     NumeroFitas = 1
//! [Programa]
//!     q0, 0 = q0, 0, D
//! ```
//!
//! Lines starting with `//` are comments. Compilation runs in phases (headers, fields,
//! field values, program lines). Every phase collects all the defects it can find
//! before giving up, so a single attempt reports as much as possible. Missing or
//! misordered headers stop compilation right away.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use thiserror::Error;
use tracing::debug;

use crate::parser::{parse_set, parse_transition};
use crate::state::{State, StateSet};
use crate::symbol::{unescape, AlphabetError, Symbol, TapeAlphabet};
use crate::transition::{Direction, Transition, TransitionError, TransitionFunction};
use crate::types::{ConfigError, MachineConfig, MAX_TAPES};

/// The three sections of a program, in their mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Description,
    Parameters,
    Program,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Description, Section::Parameters, Section::Program];

    pub fn name(self) -> &'static str {
        match self {
            Section::Description => "Descricao",
            Section::Parameters => "Parametros",
            Section::Program => "Programa",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Section::Description => "[Descricao]",
            Section::Parameters => "[Parametros]",
            Section::Program => "[Programa]",
        }
    }
}

/// The `key = value` fields of the description and parameter sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    InputAlphabet,
    AuxiliaryAlphabet,
    States,
    InitialState,
    TerminalStates,
    TapeCount,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::InputAlphabet,
        Field::AuxiliaryAlphabet,
        Field::States,
        Field::InitialState,
        Field::TerminalStates,
        Field::TapeCount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "Nome",
            Field::InputAlphabet => "AlfabetoEntrada",
            Field::AuxiliaryAlphabet => "AlfabetoAuxiliar",
            Field::States => "Estados",
            Field::InitialState => "EstadoInicial",
            Field::TerminalStates => "EstadosTerminais",
            Field::TapeCount => "NumeroFitas",
        }
    }

    pub fn section(self) -> Section {
        match self {
            Field::Name => Section::Description,
            _ => Section::Parameters,
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// A single compile defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("section not found: {0}")]
    MissingSection(&'static str),
    #[error("section out of order: {0}")]
    SectionOrder(&'static str),
    #[error("field not found: {0}")]
    MissingField(&'static str),
    #[error("field declared more than once: {0}")]
    DuplicateField(&'static str),
    #[error("unexpected line in {0}")]
    UnexpectedLine(&'static str),
    #[error("malformed set notation in {0}: expected {{ item, ... }}")]
    MalformedSet(&'static str),
    #[error("empty symbol in {0}")]
    EmptySymbol(&'static str),
    #[error("symbol '{token}' in {field} is not a single character")]
    SymbolLength { field: &'static str, token: String },
    #[error("reserved symbol '{symbol}' cannot be declared in {field}")]
    ReservedSymbol { field: &'static str, symbol: char },
    #[error("symbol '{symbol}' is declared more than once in {field}")]
    DuplicateSymbol { field: &'static str, symbol: char },
    #[error("symbol '{0}' is declared in both AlfabetoEntrada and AlfabetoAuxiliar")]
    SymbolOverlap(char),
    #[error("invalid state label '{0}': expected q followed by letters or digits")]
    InvalidState(String),
    #[error("state '{0}' is declared more than once")]
    DuplicateState(String),
    #[error("initial state '{0}' is not declared in Estados")]
    UndeclaredInitialState(String),
    #[error("terminal state '{0}' is not declared in Estados")]
    UndeclaredTerminalState(String),
    #[error("NumeroFitas must be an integer, found '{0}'")]
    TapeCountNotInteger(String),
    #[error("NumeroFitas must be at least 1, found {0}")]
    TapeCountTooSmall(i64),
    #[error("NumeroFitas must be at most {max}, found {0}", max = MAX_TAPES)]
    TapeCountTooLarge(i64),
    #[error("transition is missing '='")]
    MissingEquals,
    #[error("left side has {found} fields, expected {expected}")]
    LhsArity { expected: usize, found: usize },
    #[error("right side has {found} fields, expected {expected}")]
    RhsArity { expected: usize, found: usize },
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("unknown state '{0}'")]
    UnknownState(String),
    #[error("unknown direction '{0}': expected D, E or P")]
    UnknownDirection(String),
    #[error("duplicate transition for state {state} reading ({read})")]
    DuplicateTransition { state: String, read: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A defect together with the source line it was found on, when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line number.
    pub line: Option<usize>,
    /// The raw text of the offending line.
    pub text: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind) -> Self {
        Self {
            kind,
            line: None,
            text: None,
        }
    }

    pub fn at(kind: DiagnosticKind, line: usize, text: &str) -> Self {
        Self {
            kind,
            line: Some(line),
            text: Some(text.to_string()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, &self.text) {
            (Some(line), Some(text)) => write!(f, "line {line}: {} [{}]", self.kind, text.trim()),
            (Some(line), None) => write!(f, "line {line}: {}", self.kind),
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// The ordered, duplicate-free list of defects from one compile attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns true if any diagnostic has the given kind.
    pub fn contains(&self, kind: &DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| &d.kind == kind)
    }

    fn into_result(self) -> Result<(), DiagnosticReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DiagnosticReport {}

/// Compiles program text into a machine configuration.
///
/// # Returns
///
/// * `Ok(MachineConfig)` if the program is well formed.
/// * `Err(DiagnosticReport)` listing every defect found by the phase that failed.
pub fn compile(text: &str) -> Result<MachineConfig, DiagnosticReport> {
    let lines: Vec<&str> = text.lines().collect();

    let layout = Layout::locate(&lines)?;
    debug!(?layout, "located sections");

    let fields = collect_fields(&lines, &layout)?;
    debug!(count = fields.len(), "collected fields");

    let parameters = Parameters::build(&fields)?;
    debug!(
        symbols = parameters.alphabet.len(),
        states = parameters.states.len(),
        tapes = parameters.tape_count,
        "validated parameters"
    );

    let transitions = compile_program(&lines, layout.range(Section::Program), &parameters)?;
    debug!(transitions = transitions.len(), "compiled program");

    MachineConfig::new(
        parameters.name,
        parameters.alphabet,
        parameters.states,
        transitions,
        parameters.tape_count,
    )
    .map_err(|e| {
        let mut report = DiagnosticReport::default();
        report.push(Diagnostic::new(e.into()));
        report
    })
}

/// Returns true for lines the compiler ignores.
pub(crate) fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("//")
}

/// Recognizes a `key = value` line of `section`, returning the field and its trimmed
/// value.
pub(crate) fn split_field(line: &str, section: Section) -> Option<(Field, &str)> {
    let (key, value) = line.split_once('=')?;
    let field = Field::from_key(key.trim())?;
    (field.section() == section).then_some((field, value.trim()))
}

/// Line indexes (0-based) of the three section headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    headers: [usize; 3],
}

impl Layout {
    /// Finds the first occurrence of each header, comparing lines with all
    /// whitespace removed.
    pub(crate) fn locate(lines: &[&str]) -> Result<Self, DiagnosticReport> {
        let mut report = DiagnosticReport::default();
        let mut found = [None; 3];

        for (i, line) in lines.iter().enumerate() {
            let stripped: String = line.split_whitespace().collect();
            for (slot, section) in Section::ALL.iter().enumerate() {
                if found[slot].is_none() && stripped == section.header() {
                    found[slot] = Some(i);
                }
            }
        }

        for (slot, section) in Section::ALL.iter().enumerate() {
            if found[slot].is_none() {
                report.push(Diagnostic::new(DiagnosticKind::MissingSection(
                    section.name(),
                )));
            }
        }

        let [Some(description), Some(parameters), Some(program)] = found else {
            return Err(report);
        };

        let headers = [description, parameters, program];
        let mut sorted = headers;
        sorted.sort_unstable();
        for (slot, section) in Section::ALL.iter().enumerate() {
            if headers[slot] != sorted[slot] {
                let line = headers[slot];
                report.push(Diagnostic::at(
                    DiagnosticKind::SectionOrder(section.name()),
                    line + 1,
                    lines[line],
                ));
            }
        }

        report.into_result().map(|_| Self { headers })
    }

    /// The line indexes of a section's body, header excluded.
    pub(crate) fn range(&self, section: Section) -> Range<usize> {
        match section {
            Section::Description => self.headers[0] + 1..self.headers[1],
            Section::Parameters => self.headers[1] + 1..self.headers[2],
            Section::Program => self.headers[2] + 1..usize::MAX,
        }
    }

    pub(crate) fn header(&self, section: Section) -> usize {
        match section {
            Section::Description => self.headers[0],
            Section::Parameters => self.headers[1],
            Section::Program => self.headers[2],
        }
    }
}

/// A field occurrence: its 1-based line number, raw text and trimmed value.
#[derive(Debug, Clone)]
struct FieldLine {
    line: usize,
    raw: String,
    value: String,
}

impl FieldLine {
    fn defect(&self, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic::at(kind, self.line, &self.raw)
    }
}

fn collect_fields(
    lines: &[&str],
    layout: &Layout,
) -> Result<HashMap<Field, FieldLine>, DiagnosticReport> {
    let mut report = DiagnosticReport::default();
    let mut fields = HashMap::new();

    for (i, line) in lines[..layout.header(Section::Description)].iter().enumerate() {
        if !is_blank_or_comment(line) {
            report.push(Diagnostic::at(
                DiagnosticKind::UnexpectedLine("the preamble"),
                i + 1,
                line,
            ));
        }
    }

    for section in [Section::Description, Section::Parameters] {
        for i in layout.range(section) {
            let line = lines[i];
            if is_blank_or_comment(line) {
                continue;
            }

            match split_field(line, section) {
                Some((field, _)) if fields.contains_key(&field) => report.push(Diagnostic::at(
                    DiagnosticKind::DuplicateField(field.key()),
                    i + 1,
                    line,
                )),
                Some((field, value)) => {
                    fields.insert(
                        field,
                        FieldLine {
                            line: i + 1,
                            raw: line.to_string(),
                            value: value.to_string(),
                        },
                    );
                }
                None => report.push(Diagnostic::at(
                    DiagnosticKind::UnexpectedLine(section.name()),
                    i + 1,
                    line,
                )),
            }
        }
    }

    for field in Field::ALL {
        if !fields.contains_key(&field) {
            report.push(Diagnostic::new(DiagnosticKind::MissingField(field.key())));
        }
    }

    report.into_result().map(|_| fields)
}

/// The validated contents of the description and parameter sections.
struct Parameters {
    name: String,
    alphabet: TapeAlphabet,
    states: StateSet,
    tape_count: usize,
}

impl Parameters {
    fn build(fields: &HashMap<Field, FieldLine>) -> Result<Self, DiagnosticReport> {
        let mut report = DiagnosticReport::default();
        let mut alphabet = TapeAlphabet::default();
        let mut states = StateSet::new();

        let name = fields
            .get(&Field::Name)
            .map(|f| f.value.clone())
            .unwrap_or_default();

        for field in [Field::InputAlphabet, Field::AuxiliaryAlphabet] {
            let Some((items, entry)) = set_items(fields, field, &mut report) else {
                continue;
            };
            for token in items {
                let Some(ch) = single_symbol(&token, field, entry, &mut report) else {
                    continue;
                };
                let added = match field {
                    Field::InputAlphabet => alphabet.add_input(ch),
                    _ => alphabet.add_auxiliary(ch),
                };
                if let Err(e) = added {
                    report.push(entry.defect(alphabet_defect(e, field)));
                }
            }
        }

        let declared = set_items(fields, Field::States, &mut report);
        if let Some((items, entry)) = &declared {
            for token in items {
                match State::new(token.as_str()) {
                    Ok(state) => {
                        if states.insert(state).is_err() {
                            report.push(entry.defect(DiagnosticKind::DuplicateState(token.clone())));
                        }
                    }
                    Err(_) => {
                        report.push(entry.defect(DiagnosticKind::InvalidState(token.clone())))
                    }
                }
            }
        }

        if let Some(entry) = fields.get(&Field::InitialState) {
            let label = entry.value.as_str();
            if !crate::state::is_valid_label(label) {
                report.push(entry.defect(DiagnosticKind::InvalidState(label.to_string())));
            } else if declared.is_some() && states.set_initial(label).is_err() {
                report.push(entry.defect(DiagnosticKind::UndeclaredInitialState(
                    label.to_string(),
                )));
            }
        }

        if let Some((items, entry)) = set_items(fields, Field::TerminalStates, &mut report) {
            for label in items {
                if declared.is_some() && states.set_terminal(&label, true).is_err() {
                    report.push(entry.defect(DiagnosticKind::UndeclaredTerminalState(label)));
                }
            }
        }

        let mut tape_count = 0;
        if let Some(entry) = fields.get(&Field::TapeCount) {
            match entry.value.parse::<i64>() {
                Ok(n) if n < 1 => report.push(entry.defect(DiagnosticKind::TapeCountTooSmall(n))),
                Ok(n) => match usize::try_from(n) {
                    Ok(k) if k <= MAX_TAPES => tape_count = k,
                    _ => report.push(entry.defect(DiagnosticKind::TapeCountTooLarge(n))),
                },
                Err(_) => report.push(entry.defect(DiagnosticKind::TapeCountNotInteger(
                    entry.value.clone(),
                ))),
            }
        }

        report.into_result().map(|_| Self {
            name,
            alphabet,
            states,
            tape_count,
        })
    }
}

/// Parses a set-valued field into its raw items.
fn set_items<'a>(
    fields: &'a HashMap<Field, FieldLine>,
    field: Field,
    report: &mut DiagnosticReport,
) -> Option<(Vec<String>, &'a FieldLine)> {
    let entry = fields.get(&field)?;
    let compact: String = entry.value.split_whitespace().collect();

    match parse_set(&compact) {
        Ok(items) => Some((items, entry)),
        Err(_) => {
            report.push(entry.defect(DiagnosticKind::MalformedSet(field.key())));
            None
        }
    }
}

/// Decodes an alphabet token into exactly one character.
fn single_symbol(
    token: &str,
    field: Field,
    entry: &FieldLine,
    report: &mut DiagnosticReport,
) -> Option<char> {
    let decoded = unescape(token);
    let mut chars = decoded.chars();

    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        (None, _) => {
            report.push(entry.defect(DiagnosticKind::EmptySymbol(field.key())));
            None
        }
        _ => {
            report.push(entry.defect(DiagnosticKind::SymbolLength {
                field: field.key(),
                token: token.to_string(),
            }));
            None
        }
    }
}

fn alphabet_defect(error: AlphabetError, field: Field) -> DiagnosticKind {
    match error {
        AlphabetError::Reserved(symbol) => DiagnosticKind::ReservedSymbol {
            field: field.key(),
            symbol,
        },
        AlphabetError::Duplicate(symbol) | AlphabetError::NotFound(symbol) => {
            DiagnosticKind::DuplicateSymbol {
                field: field.key(),
                symbol,
            }
        }
        AlphabetError::Overlap(symbol) => DiagnosticKind::SymbolOverlap(symbol),
    }
}

/// Compiles every program line into the transition table.
fn compile_program(
    lines: &[&str],
    range: Range<usize>,
    parameters: &Parameters,
) -> Result<TransitionFunction, DiagnosticReport> {
    let mut report = DiagnosticReport::default();
    let mut table = TransitionFunction::new();
    let end = range.end.min(lines.len());

    for i in range.start..end {
        let line = lines[i];
        if is_blank_or_comment(line) {
            continue;
        }

        let defects = match compile_line(line, parameters) {
            Ok(transition) => match table.insert(transition) {
                Ok(_) => continue,
                Err(TransitionError::Duplicate { state, read }) => {
                    vec![DiagnosticKind::DuplicateTransition {
                        state,
                        read: read.iter().map(char::to_string).collect::<Vec<_>>().join(", "),
                    }]
                }
                Err(e) => vec![e.into()],
            },
            Err(defects) => defects,
        };

        for kind in defects {
            report.push(Diagnostic::at(kind, i + 1, line));
        }
    }

    report.into_result().map(|_| table)
}

/// Compiles one program line, collecting every defect on it.
fn compile_line(line: &str, parameters: &Parameters) -> Result<Transition, Vec<DiagnosticKind>> {
    let k = parameters.tape_count;
    let raw = parse_transition(line).map_err(|_| vec![DiagnosticKind::MissingEquals])?;

    let mut defects = Vec::new();
    if raw.lhs.len() != k + 1 {
        defects.push(DiagnosticKind::LhsArity {
            expected: k + 1,
            found: raw.lhs.len(),
        });
    }
    if raw.rhs.len() != 2 * k + 1 {
        defects.push(DiagnosticKind::RhsArity {
            expected: 2 * k + 1,
            found: raw.rhs.len(),
        });
    }
    if !defects.is_empty() {
        return Err(defects);
    }

    let state = resolve_state(&raw.lhs[0], parameters, &mut defects);
    let read = resolve_symbols(&raw.lhs[1..], parameters, &mut defects);
    let next_state = resolve_state(&raw.rhs[0], parameters, &mut defects);
    let write = resolve_symbols(&raw.rhs[1..=k], parameters, &mut defects);

    let mut directions = Vec::with_capacity(k);
    for token in &raw.rhs[k + 1..] {
        match Direction::from_token(token) {
            Some(direction) => directions.push(direction),
            None => defects.push(DiagnosticKind::UnknownDirection(token.clone())),
        }
    }

    if !defects.is_empty() {
        return Err(defects);
    }

    Transition::new(state, read, next_state, write, directions).map_err(|e| vec![e.into()])
}

fn resolve_state(
    token: &str,
    parameters: &Parameters,
    defects: &mut Vec<DiagnosticKind>,
) -> String {
    if !parameters.states.contains(token) {
        defects.push(DiagnosticKind::UnknownState(token.to_string()));
    }
    token.to_string()
}

fn resolve_symbols(
    tokens: &[String],
    parameters: &Parameters,
    defects: &mut Vec<DiagnosticKind>,
) -> Vec<Symbol> {
    let mut symbols = Vec::with_capacity(tokens.len());

    for token in tokens {
        let decoded = unescape(token);
        let mut chars = decoded.chars();
        let symbol = match (chars.next(), chars.next()) {
            (Some(ch), None) => parameters.alphabet.resolve(ch),
            _ => None,
        };

        match symbol {
            Some(symbol) => symbols.push(symbol),
            None => defects.push(DiagnosticKind::UnknownSymbol(token.clone())),
        }
    }

    symbols
}
