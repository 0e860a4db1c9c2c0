//! This module provides the `ProgramLoader` struct, responsible for loading machine
//! descriptions from files, strings and directories.

use crate::compiler::compile;
use crate::types::{FitaError, MachineConfig, MAX_PROGRAM_SIZE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of machine description files.
pub const PROGRAM_EXTENSION: &str = "mt";

/// `ProgramLoader` is a utility struct for loading machine descriptions.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.mt` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Reads the text of a program file without compiling it.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` with the file contents.
    /// * `Err(FitaError::FileError)` if the file cannot be read or is larger than
    ///   [`MAX_PROGRAM_SIZE`].
    pub fn read_program(path: &Path) -> Result<String, FitaError> {
        let metadata = fs::metadata(path).map_err(|e| {
            FitaError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if metadata.len() > MAX_PROGRAM_SIZE as u64 {
            return Err(FitaError::FileError(format!(
                "File {} is {} bytes, larger than the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_PROGRAM_SIZE
            )));
        }

        fs::read_to_string(path).map_err(|e| {
            FitaError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    /// Loads and compiles a single program from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineConfig)` if the file is read and compiles cleanly.
    /// * `Err(FitaError::FileError)` if the file cannot be read.
    /// * `Err(FitaError::Compile)` with every diagnostic if the text does not compile.
    pub fn load_program(path: &Path) -> Result<MachineConfig, FitaError> {
        let content = Self::read_program(path)?;
        debug!(path = %path.display(), bytes = content.len(), "loading program");

        Self::load_program_from_string(&content)
    }

    /// Compiles a program from the provided string content.
    pub fn load_program_from_string(content: &str) -> Result<MachineConfig, FitaError> {
        if content.len() > MAX_PROGRAM_SIZE {
            return Err(FitaError::ValidationError(format!(
                "Program is {} bytes, larger than the {} byte limit",
                content.len(),
                MAX_PROGRAM_SIZE
            )));
        }

        Ok(compile(content)?)
    }

    /// Loads every `.mt` file in `directory`. Subdirectories and other files are
    /// skipped; each program yields its own result.
    pub fn load_programs(
        directory: &Path,
    ) -> Vec<Result<(PathBuf, MachineConfig), FitaError>> {
        if !directory.exists() {
            return vec![Err(FitaError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(FitaError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => results.push(Err(FitaError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }

        // Directory order is platform dependent.
        paths.sort();
        results.extend(
            paths
                .into_iter()
                .filter(|path| {
                    !path.is_dir()
                        && path
                            .extension()
                            .is_some_and(|ext| ext == PROGRAM_EXTENSION)
                })
                .map(|path| Self::load_program(&path).map(|config| (path, config))),
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID: &str = "[Descricao]\nNome = Test Program\n[Parametros]\n\
                         AlfabetoEntrada = { a }\nAlfabetoAuxiliar = {}\nEstados = { q0, q1 }\n\
                         EstadoInicial = q0\nEstadosTerminais = { q1 }\nNumeroFitas = 1\n\
                         [Programa]\nq0, a = q1, a, D\n";

    fn write(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_valid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.mt");
        write(&file_path, VALID);

        let config = ProgramLoader::load_program(&file_path).unwrap();
        assert_eq!(config.name(), "Test Program");
        assert_eq!(config.tape_count(), 1);
        assert_eq!(config.transitions().len(), 1);
    }

    #[test]
    fn test_load_invalid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.mt");
        write(&file_path, "This is not a valid program");

        let result = ProgramLoader::load_program(&file_path);
        assert!(matches!(result, Err(FitaError::Compile(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = ProgramLoader::load_program(&dir.path().join("missing.mt"));

        assert!(matches!(result, Err(FitaError::FileError(_))));
    }

    #[test]
    fn test_oversized_program_is_refused() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("big.mt");
        let content = format!("{VALID}{}", "// padding\n".repeat(MAX_PROGRAM_SIZE / 8));
        write(&file_path, &content);

        assert!(matches!(
            ProgramLoader::load_program(&file_path),
            Err(FitaError::FileError(_))
        ));
        assert!(matches!(
            ProgramLoader::load_program_from_string(&content),
            Err(FitaError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_programs_from_directory() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("valid.mt"), VALID);
        write(&dir.path().join("invalid.mt"), "This is not a valid program");
        write(&dir.path().join("ignored.txt"), "This file should be ignored");
        std::fs::create_dir(dir.path().join("nested.mt")).unwrap();

        let results = ProgramLoader::load_programs(dir.path());

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        let (path, config) = results[1].as_ref().unwrap();
        assert!(path.ends_with("valid.mt"));
        assert_eq!(config.name(), "Test Program");
    }

    #[test]
    fn test_load_programs_missing_directory() {
        let results = ProgramLoader::load_programs(Path::new("/definitely/not/here"));

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FitaError::FileError(_))));
    }
}
