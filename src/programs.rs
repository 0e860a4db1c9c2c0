use crate::compiler::compile;
use crate::types::{FitaError, MachineConfig};

use serde::Serialize;
use std::sync::RwLock;
use tracing::warn;

// Bundled sample programs
const PROGRAM_TEXTS: [&str; 4] = [
    include_str!("../programs/even-ones.mt"),
    include_str!("../programs/palindrome.mt"),
    include_str!("../programs/copy.mt"),
    include_str!("../programs/anbn.mt"),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: RwLock<Vec<MachineConfig>> = RwLock::new(Vec::new());
}

pub struct ProgramManager;

impl ProgramManager {
    /// Compiles the bundled programs into the shared catalogue. Calling it again is a
    /// no-op once the catalogue is filled.
    pub fn load() -> Result<(), FitaError> {
        if PROGRAMS.read().is_ok_and(|programs| !programs.is_empty()) {
            return Ok(());
        }

        let mut programs = Vec::new();
        for (index, text) in PROGRAM_TEXTS.iter().enumerate() {
            match compile(text) {
                Ok(config) => programs.push(config),
                Err(report) => warn!(index, %report, "bundled program does not compile"),
            }
        }

        let mut write_guard = PROGRAMS
            .write()
            .map_err(|_| FitaError::FileError("Failed to acquire write lock".to_string()))?;
        *write_guard = programs;

        Ok(())
    }

    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        let _ = Self::load();

        PROGRAMS.read().map(|programs| programs.len()).unwrap_or(0)
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<MachineConfig, FitaError> {
        let _ = Self::load();

        PROGRAMS
            .read()
            .map_err(|_| FitaError::FileError("Failed to acquire read lock".to_string()))?
            .get(index)
            .cloned()
            .ok_or_else(|| FitaError::ValidationError(format!("Program index {} out of range", index)))
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<MachineConfig, FitaError> {
        let _ = Self::load();

        PROGRAMS
            .read()
            .map_err(|_| FitaError::FileError("Failed to acquire read lock".to_string()))?
            .iter()
            .find(|program| program.name() == name)
            .cloned()
            .ok_or_else(|| FitaError::ValidationError(format!("Program '{}' not found", name)))
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        let _ = Self::load();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .map(|program| program.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_program_info(index: usize) -> Result<ProgramInfo, FitaError> {
        let program = Self::get_program_by_index(index)?;

        Ok(ProgramInfo {
            index,
            name: program.name().to_string(),
            initial_state: program.initial_state().to_string(),
            tape_count: program.tape_count(),
            state_count: program.states().len(),
            transition_count: program.transitions().len(),
        })
    }

    /// Search for programs by name, case-insensitively
    pub fn search_programs(query: &str) -> Vec<usize> {
        let _ = Self::load();
        let query = query.to_lowercase();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .enumerate()
                    .filter(|(_, program)| program.name().to_lowercase().contains(&query))
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the original text of a program by its index
    pub fn get_program_text_by_index(index: usize) -> Result<&'static str, FitaError> {
        PROGRAM_TEXTS.get(index).copied().ok_or_else(|| {
            FitaError::ValidationError(format!("Program text index {} out of range", index))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub initial_state: String,
    pub tape_count: usize,
    pub state_count: usize,
    pub transition_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Machine;
    use crate::types::Status;

    fn run(name: &str, word: &str) -> Status {
        let config = ProgramManager::get_program_by_name(name).unwrap();
        let mut machine = Machine::new(config).unwrap();
        machine.reset(word).unwrap();
        machine.run()
    }

    #[test]
    fn test_all_programs_compile() {
        assert!(ProgramManager::load().is_ok());
        assert_eq!(ProgramManager::get_program_count(), PROGRAM_TEXTS.len());
    }

    #[test]
    fn test_program_names() {
        let names = ProgramManager::list_program_names();

        assert!(names.contains(&"Even ones".to_string()));
        assert!(names.contains(&"Palindrome".to_string()));
        assert!(names.contains(&"Copy".to_string()));
        assert!(names.contains(&"Balanced a b".to_string()));
    }

    #[test]
    fn test_program_manager_get_program_by_index() {
        assert!(ProgramManager::get_program_by_index(0).is_ok());
        assert!(ProgramManager::get_program_by_index(999).is_err());
        assert!(ProgramManager::get_program_text_by_index(0)
            .unwrap()
            .contains("[Programa]"));
        assert!(ProgramManager::get_program_text_by_index(999).is_err());
    }

    #[test]
    fn test_program_manager_get_program_info() {
        let index = ProgramManager::search_programs("copy")[0];
        let info = ProgramManager::get_program_info(index).unwrap();

        assert_eq!(info.name, "Copy");
        assert_eq!(info.initial_state, "q0");
        assert_eq!(info.tape_count, 2);
        assert_eq!(info.state_count, 2);
        assert_eq!(info.transition_count, 3);
        assert!(ProgramManager::get_program_info(999).is_err());
    }

    #[test]
    fn test_program_manager_search_programs() {
        assert_eq!(ProgramManager::search_programs("PALIN").len(), 1);
        assert!(ProgramManager::search_programs("nonexistent").is_empty());
    }

    #[test]
    fn test_even_ones() {
        assert_eq!(run("Even ones", ""), Status::Accepted);
        assert_eq!(run("Even ones", "0110"), Status::Accepted);
        assert_eq!(run("Even ones", "0111"), Status::Rejected);
    }

    #[test]
    fn test_palindrome() {
        for word in ["", "a", "abba", "aba", "babbab"] {
            assert_eq!(run("Palindrome", word), Status::Accepted, "{word}");
        }
        for word in ["ab", "abb", "aab", "babba"] {
            assert_eq!(run("Palindrome", word), Status::Rejected, "{word}");
        }
    }

    #[test]
    fn test_copy() {
        let config = ProgramManager::get_program_by_name("Copy").unwrap();
        let mut machine = Machine::new(config).unwrap();
        machine.reset("abba").unwrap();

        assert_eq!(machine.run(), Status::Accepted);
        assert!(machine.snapshot().tapes[1].contains("abba"));
    }

    #[test]
    fn test_balanced() {
        for word in ["", "ab", "aaabbb"] {
            assert_eq!(run("Balanced a b", word), Status::Accepted, "{word}");
        }
        for word in ["a", "b", "aab", "abb", "ba", "aba"] {
            assert_eq!(run("Balanced a b", word), Status::Rejected, "{word}");
        }
    }
}
