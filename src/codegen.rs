//! This module renders a [`MachineConfig`] back into program text.
//!
//! When previous text is available, only the values of the description and parameter
//! fields are rewritten in place; comments, blank lines and indentation survive. The
//! program section is always regenerated from the transition table.

use std::collections::HashSet;

use crate::compiler::{split_field, Field, Layout, Section};
use crate::symbol::escape;
use crate::transition::Transition;
use crate::types::MachineConfig;

const INDENT: &str = "    ";

/// Renders `config` as program text, reusing the layout of `existing` when it has
/// one.
pub fn render(config: &MachineConfig, existing: &str) -> String {
    if existing.trim().is_empty() {
        return template(config);
    }

    let lines: Vec<&str> = existing.lines().collect();
    let Ok(layout) = Layout::locate(&lines) else {
        return template(config);
    };

    let parameters = layout.header(Section::Parameters);
    let program = layout.header(Section::Program);
    let mut written = HashSet::new();
    let mut out = Vec::with_capacity(lines.len() + config.transitions().len());

    for (i, line) in lines[..=program].iter().enumerate() {
        if i == parameters {
            push_missing(&mut out, config, Section::Description, &written);
        }
        if i == program {
            push_missing(&mut out, config, Section::Parameters, &written);
            out.push(line.to_string());
            break;
        }

        let section = match i {
            i if i > parameters => Some(Section::Parameters),
            i if i > layout.header(Section::Description) => Some(Section::Description),
            _ => None,
        };

        match section.and_then(|s| split_field(line, s)) {
            Some((field, _)) if !written.insert(field) => {}
            Some((field, _)) => out.push(patch(line, &field_value(config, field))),
            None => out.push(line.to_string()),
        }
    }

    out.extend(
        config
            .transitions()
            .iter()
            .map(|t| format!("{INDENT}{}", render_transition(t))),
    );

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// The canonical text of a configuration.
pub fn template(config: &MachineConfig) -> String {
    let mut out = Vec::new();

    for section in [Section::Description, Section::Parameters] {
        out.push(section.header().to_string());
        for field in Field::ALL.into_iter().filter(|f| f.section() == section) {
            out.push(field_line(config, field));
        }
    }

    out.push(Section::Program.header().to_string());
    for transition in config.transitions().iter() {
        out.push(format!("{INDENT}{}", render_transition(transition)));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Renders a transition as a program line, without indentation.
pub fn render_transition(transition: &Transition) -> String {
    let read = transition.read.iter().map(|s| escape(s.ch()));
    let write = transition.write.iter().map(|s| escape(s.ch()));
    let directions = transition.directions.iter().map(|d| d.to_string());

    let lhs: Vec<String> = std::iter::once(transition.state.clone())
        .chain(read)
        .collect();
    let rhs: Vec<String> = std::iter::once(transition.next_state.clone())
        .chain(write)
        .chain(directions)
        .collect();

    format!("{} = {}", lhs.join(", "), rhs.join(", "))
}

/// The serialized value of a field.
pub fn field_value(config: &MachineConfig, field: Field) -> String {
    match field {
        Field::Name => config.name().to_string(),
        Field::InputAlphabet => set(config.alphabet().input().chars().map(escape)),
        Field::AuxiliaryAlphabet => set(config.alphabet().auxiliary().chars().map(escape)),
        Field::States => set(config.states().iter().map(|s| s.label().to_string())),
        Field::InitialState => config.initial_state().to_string(),
        Field::TerminalStates => set(config.states().terminal().map(|s| s.label().to_string())),
        Field::TapeCount => config.tape_count().to_string(),
    }
}

fn field_line(config: &MachineConfig, field: Field) -> String {
    format!("{INDENT}{} = {}", field.key(), field_value(config, field))
}

fn push_missing(
    out: &mut Vec<String>,
    config: &MachineConfig,
    section: Section,
    written: &HashSet<Field>,
) {
    for field in Field::ALL {
        if field.section() == section && !written.contains(&field) {
            out.push(field_line(config, field));
        }
    }
}

/// Replaces the text after the first `=` of a field line and the blanks that follow it.
fn patch(line: &str, value: &str) -> String {
    match line.find('=') {
        Some(eq) => {
            let rest = &line[eq + 1..];
            let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            format!("{}{}", &line[..eq + 1 + blanks], value)
        }
        None => line.to_string(),
    }
}

fn set(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", items.join(", "))
    }
}
