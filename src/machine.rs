//! This module defines the `Machine` engine, which executes a compiled
//! [`MachineConfig`] one step at a time over one or more synchronized tapes.
//!
//! The engine comes in two variants:
//!
//! * `LeftBounded`: a single tape with a first cell. Moving left of it, or passing
//!   through a section delimiter, rejects the input.
//! * `LeftInfinite`: any number of tapes unbounded in both directions. All tapes share
//!   one virtual address scheme, so they are always grown together and keep the same
//!   physical length.
//!
//! After every reset and step the engine notifies its observers with a [`Snapshot`].
//! Calls are synchronous and `step` is not reentrant; a driver that animates execution
//! must wait for one call to return before issuing the next.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::symbol::{Symbol, SECTION_DELIMITER};
use crate::tape::{Address, Tape, TapeMode};
use crate::transition::{Direction, Transition};
use crate::types::{
    HaltReason, MachineConfig, MachineError, Snapshot, Status, TAPE_SLACK, VIRTUAL_START,
};

/// Which engine variant drives the tapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variant {
    LeftBounded,
    LeftInfinite,
}

impl Variant {
    fn tape_mode(self) -> TapeMode {
        match self {
            Variant::LeftBounded => TapeMode::LeftBounded,
            Variant::LeftInfinite => TapeMode::LeftInfinite,
        }
    }
}

/// Receives a snapshot after every reset and step.
pub trait Observer {
    fn notify(&mut self, snapshot: &Snapshot);
}

impl<F: FnMut(&Snapshot)> Observer for F {
    fn notify(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// A Turing machine loaded with an input word.
pub struct Machine {
    config: Arc<MachineConfig>,
    variant: Variant,
    state: String,
    tapes: Vec<Tape>,
    heads: Vec<Address>,
    /// Direction of the move that placed each head on its current cell.
    entered: Vec<Direction>,
    step_count: usize,
    status: Status,
    halt_reason: Option<HaltReason>,
    word: String,
    observers: Vec<Box<dyn Observer>>,
}

impl Machine {
    /// Creates a machine for `config` loaded with the empty word. One-tape programs run
    /// on the left-bounded engine, others on the left-infinite one.
    pub fn new(config: impl Into<Arc<MachineConfig>>) -> Result<Self, MachineError> {
        let config = config.into();
        let variant = if config.tape_count() == 1 {
            Variant::LeftBounded
        } else {
            Variant::LeftInfinite
        };
        Self::with_variant(config, variant)
    }

    pub fn with_variant(
        config: impl Into<Arc<MachineConfig>>,
        variant: Variant,
    ) -> Result<Self, MachineError> {
        let config = config.into();
        match (variant, config.tape_count()) {
            (_, 0) => return Err(MachineError::ZeroTapes),
            (Variant::LeftBounded, n) if n > 1 => return Err(MachineError::VariantMismatch(n)),
            _ => {}
        }

        let mut machine = Self {
            state: config.initial_state().to_string(),
            config,
            variant,
            tapes: Vec::new(),
            heads: Vec::new(),
            entered: Vec::new(),
            step_count: 0,
            status: Status::Running,
            halt_reason: None,
            word: String::new(),
            observers: Vec::new(),
        };
        machine.load("")?;

        Ok(machine)
    }

    /// Registers an observer. It is called synchronously after every reset and step.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Loads `word` onto the first tape and returns the machine to its initial
    /// configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(Status)` with `Running`, or `Accepted` if the initial state is terminal.
    /// * `Err(MachineError::InvalidInputSymbol)` if `word` uses a symbol outside the
    ///   input alphabet.
    pub fn reset(&mut self, word: &str) -> Result<Status, MachineError> {
        self.load(word)?;
        debug!(
            word,
            state = %self.state,
            variant = ?self.variant,
            transition = ?self.transition().map(|(i, _)| i),
            "machine reset"
        );
        self.publish();
        Ok(self.status)
    }

    /// Executes one transition.
    ///
    /// Does nothing unless the machine is running. When no transition matches, or a
    /// head would leave a left-bounded tape or pass a section delimiter, the machine
    /// rejects and nothing of the step is applied.
    pub fn step(&mut self) -> Status {
        if self.status != Status::Running {
            return self.status;
        }

        let config = Arc::clone(&self.config);
        let Some((ordinal, transition)) = self.transition_in(&config) else {
            return self.halt(HaltReason::NoTransition);
        };

        let next_heads = match self.plan_moves(&transition.directions) {
            Ok(heads) => heads,
            Err(reason) => return self.halt(reason),
        };

        let written = self
            .tapes
            .iter_mut()
            .zip(&self.heads)
            .zip(&transition.write)
            .try_for_each(|((tape, &head), &symbol)| tape.write(head, symbol));
        if let Err(e) = written {
            return self.halt(e.into());
        }

        for (i, direction) in transition.directions.iter().enumerate() {
            if *direction != Direction::Stay {
                self.entered[i] = *direction;
            }
        }
        self.heads = next_heads;
        if let Err(reason) = self.synchronize() {
            return self.halt(reason);
        }

        self.state.clone_from(&transition.next_state);
        self.step_count += 1;
        trace!(
            step = self.step_count,
            transition = ordinal,
            state = %self.state,
            heads = ?self.heads,
            "step"
        );

        if config.is_terminal(&self.state) {
            self.status = Status::Accepted;
            self.halt_reason = Some(HaltReason::Accepted);
            debug!(state = %self.state, steps = self.step_count, "machine accepted");
        }

        self.publish();
        self.status
    }

    /// Steps until the machine accepts or rejects. This does not return for inputs on
    /// which the program loops forever.
    pub fn run(&mut self) -> Status {
        while self.status == Status::Running {
            self.step();
        }
        self.status
    }

    /// The current observable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            tapes: self.tapes.iter().map(Tape::contents).collect(),
            heads: self.heads.clone(),
            pivots: self.tapes.iter().map(Tape::pivot).collect(),
            transition: match self.status {
                Status::Running => self.transition().map(|(i, _)| i),
                _ => None,
            },
            step_count: self.step_count,
            status: self.status,
            halt_reason: self.halt_reason,
        }
    }

    /// Finds the transition matching the current state and the symbols under the
    /// heads, together with its ordinal.
    pub fn transition(&self) -> Option<(usize, &Transition)> {
        self.transition_in(&self.config)
    }

    /// Returns the symbols currently under each head.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tapes
            .iter()
            .zip(&self.heads)
            .map(|(tape, &head)| tape.peek(head))
            .collect()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    pub fn is_halted(&self) -> bool {
        self.status != Status::Running
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn tapes(&self) -> &[Tape] {
        &self.tapes
    }

    /// Virtual head positions.
    pub fn heads(&self) -> &[Address] {
        &self.heads
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The word loaded by the last reset.
    pub fn word(&self) -> &str {
        &self.word
    }

    fn transition_in<'a>(
        &self,
        config: &'a MachineConfig,
    ) -> Option<(usize, &'a Transition)> {
        let read: Vec<char> = self.symbols().iter().map(Symbol::ch).collect();
        let ordinal = config.transitions().position(&self.state, &read)?;
        config.transitions().get_by_index(ordinal).map(|t| (ordinal, t))
    }

    fn load(&mut self, word: &str) -> Result<(), MachineError> {
        let input = self.config.alphabet().input();
        let symbols = word
            .chars()
            .map(|ch| {
                input
                    .get(ch)
                    .copied()
                    .ok_or(MachineError::InvalidInputSymbol(ch))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let k = self.config.tape_count();
        let size = symbols.len() + TAPE_SLACK;
        self.tapes = (0..k)
            .map(|_| Tape::new(self.variant.tape_mode(), size))
            .collect();
        self.tapes[0].initialize(&symbols)?;
        self.heads = vec![VIRTUAL_START; k];
        self.entered = vec![Direction::Stay; k];
        self.state = self.config.initial_state().to_string();
        self.step_count = 0;
        self.word = word.to_string();

        if self.config.is_terminal(&self.state) {
            self.status = Status::Accepted;
            self.halt_reason = Some(HaltReason::Accepted);
        } else {
            self.status = Status::Running;
            self.halt_reason = None;
        }

        // A fresh tape always has room for the margin; keep the reason if it ever fails.
        if let Err(reason) = self.synchronize() {
            self.status = Status::Rejected;
            self.halt_reason = Some(reason);
        }

        Ok(())
    }

    /// Computes where every head lands, enforcing the left-bounded policies.
    fn plan_moves(&self, directions: &[Direction]) -> Result<Vec<Address>, HaltReason> {
        let mut next = Vec::with_capacity(directions.len());

        for (i, &direction) in directions.iter().enumerate() {
            let head = self.heads[i];
            let target = head
                .checked_add(direction.offset())
                .filter(|a| *a >= 0)
                .ok_or(HaltReason::OutOfRange)?;

            if self.variant == Variant::LeftBounded {
                if target < VIRTUAL_START {
                    return Err(HaltReason::LeftEdge);
                }
                if direction != Direction::Stay
                    && direction == self.entered[i]
                    && self.tapes[i].peek(head).ch() == SECTION_DELIMITER
                {
                    return Err(HaltReason::SectionDelimiter);
                }
            }

            next.push(target);
        }

        Ok(next)
    }

    /// Grows every tape so that each head keeps at least one materialized cell on
    /// either side of it. All tapes grow by the same amount.
    fn synchronize(&mut self) -> Result<(), HaltReason> {
        let mut left = 0i64;
        let mut right = 0i64;

        for (tape, &head) in self.tapes.iter().zip(&self.heads) {
            let index = tape.relative_position(head);
            left = left.max(1 - index);
            right = right.max(index + 2 - tape.len() as i64);
        }

        if self.variant == Variant::LeftBounded {
            left = 0;
        }

        for tape in &mut self.tapes {
            if left > 0 {
                tape.adjust(-(left as isize)).map_err(HaltReason::from)?;
            }
            if right > 0 {
                tape.adjust(right as isize).map_err(HaltReason::from)?;
            }
        }

        Ok(())
    }

    fn halt(&mut self, reason: HaltReason) -> Status {
        self.status = match reason {
            HaltReason::Accepted => Status::Accepted,
            _ => Status::Rejected,
        };
        self.halt_reason = Some(reason);
        debug!(
            state = %self.state,
            symbols = ?self.symbols(),
            ?reason,
            "machine halted"
        );
        self.publish();
        self.status
    }

    fn publish(&mut self) {
        if self.observers.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.notify(&snapshot);
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("variant", &self.variant)
            .field("state", &self.state)
            .field("heads", &self.heads)
            .field("step_count", &self.step_count)
            .field("status", &self.status)
            .field("halt_reason", &self.halt_reason)
            .finish_non_exhaustive()
    }
}
