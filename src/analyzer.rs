//! This module provides a lint pass over a compiled [`MachineConfig`]. It reports
//! constructs that are legal but almost certainly unintended: states that can never be
//! entered, transitions that can never fire, and states where the machine can only
//! reject.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::types::MachineConfig;

/// A non-fatal finding about a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Warning {
    /// States that no sequence of transitions reaches from the initial state.
    #[error("unreachable states: {}", .0.join(", "))]
    UnreachableStates(Vec<String>),
    /// A transition leaves a terminal state. The machine halts on entry, so it never
    /// fires.
    #[error("transition {index} leaves terminal state {state} and never fires")]
    TerminalTransition { index: usize, state: String },
    /// Non-terminal states without outgoing transitions; entering one always rejects.
    #[error("states without transitions always reject: {}", .0.join(", "))]
    DeadEndStates(Vec<String>),
    #[error("no terminal state is declared; no input can be accepted")]
    NoTerminalStates,
}

/// Runs every check over `config`.
///
/// # Returns
///
/// The warnings found, in check order. An empty vector means the program is clean.
pub fn analyze(config: &MachineConfig) -> Vec<Warning> {
    [
        check_terminal_states,
        check_unreachable_states,
        check_terminal_transitions,
        check_dead_end_states,
    ]
    .iter()
    .flat_map(|check| check(config))
    .collect()
}

fn check_terminal_states(config: &MachineConfig) -> Vec<Warning> {
    if config.states().terminal().next().is_none() {
        vec![Warning::NoTerminalStates]
    } else {
        Vec::new()
    }
}

/// Depth-first traversal from the initial state. Terminal states are entered but not
/// expanded.
fn check_unreachable_states(config: &MachineConfig) -> Vec<Warning> {
    let mut visited = HashSet::new();
    let mut queue = vec![config.initial_state()];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) || config.is_terminal(state) {
            continue;
        }

        for transition in config.transitions().iter() {
            if transition.state == state && !visited.contains(transition.next_state.as_str()) {
                queue.push(transition.next_state.as_str());
            }
        }
    }

    let unreachable: Vec<String> = config
        .states()
        .iter()
        .filter(|s| !visited.contains(s.label()))
        .map(|s| s.label().to_string())
        .collect();

    if unreachable.is_empty() {
        Vec::new()
    } else {
        vec![Warning::UnreachableStates(unreachable)]
    }
}

fn check_terminal_transitions(config: &MachineConfig) -> Vec<Warning> {
    config
        .transitions()
        .iter()
        .enumerate()
        .filter(|(_, t)| config.is_terminal(&t.state))
        .map(|(index, t)| Warning::TerminalTransition {
            index,
            state: t.state.clone(),
        })
        .collect()
}

fn check_dead_end_states(config: &MachineConfig) -> Vec<Warning> {
    let dead: Vec<String> = config
        .states()
        .non_terminal()
        .filter(|s| !config.transitions().has_transitions_from(s.label()))
        .map(|s| s.label().to_string())
        .collect();

    if dead.is_empty() {
        Vec::new()
    } else {
        vec![Warning::DeadEndStates(dead)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn config(states: &str, terminals: &str, rules: &str) -> MachineConfig {
        compile(&format!(
            "[Descricao]\nNome = lint\n[Parametros]\nAlfabetoEntrada = {{ a }}\n\
             AlfabetoAuxiliar = {{}}\nEstados = {{ {states} }}\nEstadoInicial = q0\n\
             EstadosTerminais = {{ {terminals} }}\nNumeroFitas = 1\n[Programa]\n{rules}\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_clean_program() {
        let config = config("q0, q1", "q1", "q0, a = q0, a, D\nq0, _ = q1, _, P");
        assert!(analyze(&config).is_empty());
    }

    #[test]
    fn test_unreachable_states() {
        let config = config(
            "q0, q1, q2, q3",
            "q1",
            "q0, a = q1, a, P\nq2, a = q3, a, P\nq3, a = q1, a, P",
        );

        assert_eq!(
            analyze(&config),
            vec![Warning::UnreachableStates(vec![
                "q2".to_string(),
                "q3".to_string()
            ])]
        );
    }

    #[test]
    fn test_states_behind_terminal_are_unreachable() {
        let config = config("q0, q1, q2", "q1", "q0, a = q1, a, P\nq1, a = q2, a, P\nq2, a = q1, a, P");
        let warnings = analyze(&config);

        assert!(warnings.contains(&Warning::UnreachableStates(vec!["q2".to_string()])));
        assert!(warnings.contains(&Warning::TerminalTransition {
            index: 1,
            state: "q1".to_string()
        }));
    }

    #[test]
    fn test_dead_end_and_missing_terminals() {
        let config = config("q0, q1", "", "q0, a = q1, a, D");
        let warnings = analyze(&config);

        assert_eq!(warnings[0], Warning::NoTerminalStates);
        assert!(warnings.contains(&Warning::DeadEndStates(vec!["q1".to_string()])));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::UnreachableStates(vec!["q2".to_string(), "q3".to_string()]);
        assert_eq!(warning.to_string(), "unreachable states: q2, q3");
    }
}
