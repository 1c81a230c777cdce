//! Variable stores.
//!
//! [`VarStore`] is a plain string-valued table; scripts use one for their
//! locals.  [`GlobalVars`] wraps a store behind a lock so the classifier and
//! every running script can share one process-wide namespace.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Key/value variable store.  Names are case-sensitive.
#[derive(Debug, Default, Clone)]
pub struct VarStore {
    vars: HashMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value parsed as a number; a missing or blank variable counts as 0.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        match self.vars.get(name).map(|v| v.trim()) {
            None | Some("") => Some(0.0),
            Some(v) => v.parse().ok(),
        }
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The longest variable name that is a prefix of `text`, with its value.
    ///
    /// This is how `%name` and `$name` references are resolved: the name is
    /// not delimited, so `%tarantulaSkillSets` finds `tarantulaSkillSet`.
    pub fn longest_prefix(&self, text: &str) -> Option<(&str, &str)> {
        self.vars
            .iter()
            .filter(|(k, _)| !k.is_empty() && text.starts_with(k.as_str()))
            .max_by_key(|(k, _)| k.len())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ── Shared globals ────────────────────────────────────────────────────────────

/// Process-wide global variables, shared by cloning the handle.
///
/// Writes are last-writer-wins.  A poisoned lock is recovered, not
/// propagated.
#[derive(Debug, Default, Clone)]
pub struct GlobalVars {
    inner: Arc<RwLock<VarStore>>,
}

impl GlobalVars {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, VarStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VarStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.read().get(name).map(str::to_owned)
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().set(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains(name)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.write().unset(name)
    }

    /// Owned copy of every variable.
    pub fn snapshot(&self) -> VarStore {
        self.read().clone()
    }

    /// Apply several writes under one lock acquisition.
    pub fn update<R>(&self, f: impl FnOnce(&mut VarStore) -> R) -> R {
        f(&mut self.write())
    }

    pub fn longest_prefix(&self, text: &str) -> Option<(String, String)> {
        self.read()
            .longest_prefix(text)
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
