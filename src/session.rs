//! Editor session lifecycle.
//!
//! A session owns the program text, the last configuration that compiled from it, and
//! the machine currently loaded from that configuration. Which operations are legal is
//! decided by a single [`SessionState`] driven by [`Event`]s:
//!
//! | from                      | event             | to                             |
//! |---------------------------|-------------------|--------------------------------|
//! | any but `Running`         | `edit`            | `CompiledStale` once compiled, else `Edited` |
//! | any but `Running`         | `compile`/`apply` | `CompiledClean`                |
//! | `CompiledClean`/`Running` | `load`            | `Running`                      |
//! | `Running`                 | `step`            | `Running`                      |
//! | `Running`                 | `stop`            | `CompiledClean`                |

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::codegen::render;
use crate::compiler::{compile, DiagnosticReport};
use crate::machine::Machine;
use crate::types::{MachineConfig, MachineError, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// The text has never compiled since it was last edited.
    Edited,
    /// The configuration matches the text.
    CompiledClean,
    /// A configuration exists, but the text changed after it was compiled.
    CompiledStale,
    /// A machine is loaded from the current configuration.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Event {
    Edit,
    Compile,
    Apply,
    Load,
    Step,
    Stop,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Event::Edit => "edit",
            Event::Compile => "compile",
            Event::Apply => "apply",
            Event::Load => "load",
            Event::Step => "step",
            Event::Stop => "stop",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{event} is not allowed while the session is {state:?}")]
    InvalidEvent { event: Event, state: SessionState },
    #[error("compilation failed:\n{0}")]
    Compile(#[from] DiagnosticReport),
    #[error(transparent)]
    Machine(#[from] MachineError),
}

impl SessionState {
    /// The state reached by a successful `event`, or `None` if the event is not legal
    /// here. `has_config` tells whether an earlier compilation succeeded.
    pub fn next(self, event: Event, has_config: bool) -> Option<SessionState> {
        use Event::*;
        use SessionState::*;

        match (self, event) {
            (Running, Edit | Compile | Apply) => None,
            (_, Edit) if has_config => Some(CompiledStale),
            (_, Edit) => Some(Edited),
            (_, Compile | Apply) => Some(CompiledClean),
            (CompiledClean | Running, Load) => Some(Running),
            (Running, Step) => Some(Running),
            (Running, Stop) => Some(CompiledClean),
            _ => None,
        }
    }
}

/// Program text, its compiled configuration, and the running machine.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    text: String,
    config: Option<Arc<MachineConfig>>,
    diagnostics: DiagnosticReport,
    machine: Option<Machine>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new("")
    }
}

impl Session {
    /// Starts an uncompiled session over `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: SessionState::Edited,
            text: text.into(),
            config: None,
            diagnostics: DiagnosticReport::default(),
            machine: None,
        }
    }

    /// Replaces the program text.
    pub fn edit(&mut self, text: impl Into<String>) -> Result<SessionState, SessionError> {
        let next = self.advance(Event::Edit)?;
        self.text = text.into();
        Ok(self.enter(next))
    }

    /// Compiles the current text. On failure the previous configuration is kept and
    /// the state does not change.
    pub fn compile(&mut self) -> Result<&MachineConfig, SessionError> {
        let next = self.advance(Event::Compile)?;

        match compile(&self.text) {
            Ok(config) => {
                self.diagnostics = DiagnosticReport::default();
                self.enter(next);
                let config = self.config.insert(Arc::new(config));
                Ok(&**config)
            }
            Err(report) => {
                debug!(defects = report.len(), "session compilation failed");
                self.diagnostics = report.clone();
                Err(report.into())
            }
        }
    }

    /// Replaces the configuration from a structured edit and re-renders the text,
    /// keeping its layout.
    pub fn apply(&mut self, config: MachineConfig) -> Result<SessionState, SessionError> {
        let next = self.advance(Event::Apply)?;
        self.text = render(&config, &self.text);
        self.config = Some(Arc::new(config));
        self.diagnostics = DiagnosticReport::default();
        Ok(self.enter(next))
    }

    /// Loads `word` into a fresh machine built from the current configuration.
    pub fn load(&mut self, word: &str) -> Result<Status, SessionError> {
        let next = self.advance(Event::Load)?;
        let config = self.config.clone().ok_or(SessionError::InvalidEvent {
            event: Event::Load,
            state: self.state,
        })?;

        let mut machine = Machine::new(config)?;
        let status = machine.reset(word)?;
        self.machine = Some(machine);
        self.enter(next);

        Ok(status)
    }

    pub fn step(&mut self) -> Result<Status, SessionError> {
        let next = self.advance(Event::Step)?;
        let status = match self.machine.as_mut() {
            Some(machine) => machine.step(),
            None => {
                return Err(SessionError::InvalidEvent {
                    event: Event::Step,
                    state: self.state,
                })
            }
        };
        self.enter(next);

        Ok(status)
    }

    /// Unloads the machine.
    pub fn stop(&mut self) -> Result<SessionState, SessionError> {
        let next = self.advance(Event::Stop)?;
        self.machine = None;
        Ok(self.enter(next))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The last configuration that compiled, even if the text has changed since.
    pub fn config(&self) -> Option<&MachineConfig> {
        self.config.as_deref()
    }

    /// Diagnostics of the last failed compilation.
    pub fn diagnostics(&self) -> &DiagnosticReport {
        &self.diagnostics
    }

    pub fn machine(&self) -> Option<&Machine> {
        self.machine.as_ref()
    }

    pub fn machine_mut(&mut self) -> Option<&mut Machine> {
        self.machine.as_mut()
    }

    fn advance(&self, event: Event) -> Result<SessionState, SessionError> {
        self.state
            .next(event, self.config.is_some())
            .ok_or(SessionError::InvalidEvent {
                event,
                state: self.state,
            })
    }

    fn enter(&mut self, next: SessionState) -> SessionState {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "session state changed");
        }
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "[Descricao]\nNome = Session\n[Parametros]\n\
                           AlfabetoEntrada = { a, b }\nAlfabetoAuxiliar = {}\n\
                           Estados = { q0, q1 }\nEstadoInicial = q0\n\
                           EstadosTerminais = { q1 }\nNumeroFitas = 1\n\
                           [Programa]\nq0, a = q1, a, P\n";

    fn invalid(result: Result<impl fmt::Debug, SessionError>, event: Event) {
        match result {
            Err(SessionError::InvalidEvent { event: e, .. }) => assert_eq!(e, event),
            other => panic!("expected invalid {event}, got {other:?}"),
        }
    }

    #[test]
    fn test_transition_table() {
        use SessionState::*;

        assert_eq!(Edited.next(Event::Edit, false), Some(Edited));
        assert_eq!(CompiledClean.next(Event::Edit, true), Some(CompiledStale));
        assert_eq!(CompiledStale.next(Event::Compile, true), Some(CompiledClean));
        assert_eq!(CompiledClean.next(Event::Load, true), Some(Running));
        assert_eq!(Running.next(Event::Load, true), Some(Running));
        assert_eq!(Running.next(Event::Stop, true), Some(CompiledClean));
        assert_eq!(Edited.next(Event::Load, false), None);
        assert_eq!(CompiledStale.next(Event::Load, true), None);
        assert_eq!(CompiledClean.next(Event::Step, true), None);
        assert_eq!(Running.next(Event::Edit, true), None);
    }

    #[test]
    fn test_running_refuses_every_text_change() {
        use SessionState::*;

        for event in [Event::Edit, Event::Compile, Event::Apply] {
            assert_eq!(Running.next(event, true), None, "{event}");
        }
        for state in [Edited, CompiledClean, CompiledStale] {
            assert_eq!(state.next(Event::Apply, false), Some(CompiledClean));
            assert_eq!(state.next(Event::Step, true), None);
            assert_eq!(state.next(Event::Stop, true), None);
        }
        assert_eq!(Running.next(Event::Step, true), Some(Running));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut session = Session::new(PROGRAM);
        assert_eq!(session.state(), SessionState::Edited);

        session.compile().unwrap();
        assert_eq!(session.state(), SessionState::CompiledClean);

        assert_eq!(session.load("a").unwrap(), Status::Running);
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.step().unwrap(), Status::Accepted);
        assert_eq!(session.machine().unwrap().step_count(), 1);

        assert_eq!(session.stop().unwrap(), SessionState::CompiledClean);
        assert!(session.machine().is_none());
    }

    #[test]
    fn test_load_requires_clean_compilation() {
        let mut session = Session::new(PROGRAM);
        invalid(session.load("a"), Event::Load);

        session.compile().unwrap();
        assert_eq!(
            session.edit(PROGRAM.replace("Session", "Other")).unwrap(),
            SessionState::CompiledStale
        );
        invalid(session.load("a"), Event::Load);
        assert_eq!(session.config().unwrap().name(), "Session");
    }

    #[test]
    fn test_failed_compilation_keeps_state() {
        let mut session = Session::new("garbage");

        assert!(matches!(session.compile(), Err(SessionError::Compile(_))));
        assert_eq!(session.state(), SessionState::Edited);
        assert!(!session.diagnostics().is_empty());
        assert!(session.config().is_none());
    }

    #[test]
    fn test_running_session_refuses_edits() {
        let mut session = Session::new(PROGRAM);
        session.compile().unwrap();
        session.load("b").unwrap();

        invalid(session.edit("x"), Event::Edit);
        invalid(session.compile().map(|_| ()), Event::Compile);
        assert_eq!(session.step().unwrap(), Status::Rejected);

        session.stop().unwrap();
        invalid(session.step(), Event::Step);
        invalid(session.stop(), Event::Stop);
    }

    #[test]
    fn test_invalid_word_does_not_start_running() {
        let mut session = Session::new(PROGRAM);
        session.compile().unwrap();

        assert!(matches!(
            session.load("c"),
            Err(SessionError::Machine(MachineError::InvalidInputSymbol('c')))
        ));
        assert_eq!(session.state(), SessionState::CompiledClean);
    }

    #[test]
    fn test_apply_rerenders_text() {
        let mut session = Session::new(PROGRAM);
        let config = session.compile().unwrap().clone();
        let renamed = compile(&PROGRAM.replace("Session", "Renamed")).unwrap();
        session.edit(PROGRAM.replace("q0, a = q1, a, P", "")).unwrap();

        assert_eq!(session.apply(renamed.clone()).unwrap(), SessionState::CompiledClean);
        assert!(session.text().contains("Nome = Renamed"));
        assert!(session.text().contains("q0, a = q1, a, P"));
        assert_ne!(session.config(), Some(&config));
        assert_eq!(compile(session.text()).unwrap(), renamed);
    }
}
