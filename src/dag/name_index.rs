// src/dag/name_index.rs

//! Task name → dense index mapping.

use std::collections::HashMap;

use crate::errors::{MasterError, Result};

/// Maps unique, case-sensitive task names to dense indices `0..len`.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: HashMap<String, usize>,
    names: Vec<String>,
}

impl NameIndex {
    /// Build the index from task names in task order.
    ///
    /// Fails with [`MasterError::DuplicateTask`] on the first repeated name.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = NameIndex::default();
        for name in names {
            let name = name.into();
            let next = index.names.len();
            if !index.insert(&name, next, false) {
                return Err(MasterError::DuplicateTask(name));
            }
            index.names.push(name);
        }
        Ok(index)
    }

    /// Insert `name -> idx`.
    ///
    /// Returns `true` if the name was not present before. An existing entry
    /// is only replaced when `overwrite` is set.
    pub fn insert(&mut self, name: &str, idx: usize, overwrite: bool) -> bool {
        match self.by_name.get_mut(name) {
            Some(existing) => {
                if overwrite {
                    *existing = idx;
                }
                false
            }
            None => {
                self.by_name.insert(name.to_string(), idx);
                true
            }
        }
    }

    /// Look up the index of `name`.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Name of the task at `idx`.
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    /// All names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
