//! Program persistence
//!
//! The engine never performs partial writes: it loads a full program
//! document, computes, and hands a full document back. Implementations do
//! one read and one write per update; simultaneous updates to the same user
//! are last-write-wins on the whole document.

use crate::error::EngineError;
use crate::program::UserProgram;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence seam for user programs.
pub trait ProgramStore {
    /// Load a user's full program document.
    fn load(&self, user_id: &str) -> Result<UserProgram, EngineError>;

    /// Persist a user's full program document.
    fn save(&mut self, program: &UserProgram) -> Result<(), EngineError>;
}

/// In-memory store for tests and for hosts that persist programs themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    programs: HashMap<String, UserProgram>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a program directly, bypassing the trait.
    pub fn insert(&mut self, program: UserProgram) {
        self.programs.insert(program.user_id.clone(), program);
    }
}

impl ProgramStore for MemoryStore {
    fn load(&self, user_id: &str) -> Result<UserProgram, EngineError> {
        self.programs
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    fn save(&mut self, program: &UserProgram) -> Result<(), EngineError> {
        self.programs
            .insert(program.user_id.clone(), program.clone());
        Ok(())
    }
}

/// One JSON document per user under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{user_id}.json"))
    }

    /// Load a program straight from a file path.
    pub fn load_path(path: &Path) -> Result<UserProgram, EngineError> {
        let json = fs::read_to_string(path)
            .map_err(|e| EngineError::PersistenceFailure(format!("{}: {e}", path.display())))?;
        Ok(UserProgram::from_json(&json)?)
    }

    /// Write a program straight to a file path.
    pub fn save_path(path: &Path, program: &UserProgram) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(program)?;
        fs::write(path, json)
            .map_err(|e| EngineError::PersistenceFailure(format!("{}: {e}", path.display())))
    }
}

impl ProgramStore for JsonFileStore {
    fn load(&self, user_id: &str) -> Result<UserProgram, EngineError> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Err(EngineError::UserNotFound(user_id.to_string()));
        }
        Self::load_path(&path)
    }

    fn save(&mut self, program: &UserProgram) -> Result<(), EngineError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| EngineError::PersistenceFailure(e.to_string()))?;
        Self::save_path(&self.path_for(&program.user_id), program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        let program = UserProgram::new("u1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(matches!(
            store.load("u1"),
            Err(EngineError::UserNotFound(_))
        ));
        store.save(&program).unwrap();
        assert_eq!(store.load("u1").unwrap(), program);
    }
}
