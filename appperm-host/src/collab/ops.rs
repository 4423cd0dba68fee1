//! Operation-mode store: per-app overrides of low-level operations

use appperm_api::{AppIdentity, OpId, OpMode};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::grant::StoreError;

/// Trait for the operation-mode service
pub trait OpModeStore: Send + Sync {
    /// Explicit override for (op, app), if one was ever set
    fn get_mode(&self, op: OpId, app: &AppIdentity) -> Option<OpMode>;

    /// Persist an override
    fn set_mode(&self, op: OpId, app: &AppIdentity, mode: OpMode) -> Result<(), StoreError>;

    /// Whether the operation only has two meaningful states
    fn is_strict(&self, op: OpId) -> bool;

    /// Mode that applies when no override exists
    fn default_mode(&self, op: OpId) -> OpMode;
}

/// In-memory operation-mode store
pub struct MemoryOpModeStore {
    overrides: RwLock<HashMap<(OpId, AppIdentity), OpMode>>,
    strict: HashSet<OpId>,
    defaults: HashMap<OpId, OpMode>,
    fallback: OpMode,
    writes: AtomicUsize,
}

impl MemoryOpModeStore {
    /// Create a store where every operation defaults to allowed
    pub fn new() -> Self {
        Self {
            overrides: RwLock::new(HashMap::new()),
            strict: HashSet::new(),
            defaults: HashMap::new(),
            fallback: OpMode::Allowed,
            writes: AtomicUsize::new(0),
        }
    }

    /// Mark an operation as strict
    pub fn strict(mut self, op: OpId) -> Self {
        self.strict.insert(op);
        self
    }

    /// Set the policy default for an operation
    pub fn default_for(mut self, op: OpId, mode: OpMode) -> Self {
        self.defaults.insert(op, mode);
        self
    }

    /// Set the default for operations without their own default
    pub fn fallback(mut self, mode: OpMode) -> Self {
        self.fallback = mode;
        self
    }

    /// Seed an explicit override
    pub fn with_override(self, op: OpId, app: AppIdentity, mode: OpMode) -> Self {
        self.overrides.write().unwrap().insert((op, app), mode);
        self
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryOpModeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OpModeStore for MemoryOpModeStore {
    fn get_mode(&self, op: OpId, app: &AppIdentity) -> Option<OpMode> {
        let overrides = self.overrides.read().unwrap();
        overrides.get(&(op, app.clone())).copied()
    }

    fn set_mode(&self, op: OpId, app: &AppIdentity, mode: OpMode) -> Result<(), StoreError> {
        self.overrides
            .write()
            .unwrap()
            .insert((op, app.clone()), mode);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_strict(&self, op: OpId) -> bool {
        self.strict.contains(&op)
    }

    fn default_mode(&self, op: OpId) -> OpMode {
        self.defaults.get(&op).copied().unwrap_or(self.fallback)
    }
}

impl std::fmt::Debug for MemoryOpModeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOpModeStore")
            .field("strict", &self.strict.len())
            .field("defaults", &self.defaults.len())
            .field("writes", &self.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_fallback() {
        let store = MemoryOpModeStore::new()
            .default_for(OpId(1), OpMode::Ask)
            .fallback(OpMode::Ignored);

        assert_eq!(store.default_mode(OpId(1)), OpMode::Ask);
        assert_eq!(store.default_mode(OpId(2)), OpMode::Ignored);
    }

    #[test]
    fn test_overrides_are_per_app() {
        let a = AppIdentity::new("com.a", 1);
        let b = AppIdentity::new("com.b", 2);
        let store = MemoryOpModeStore::new().with_override(OpId(5), a.clone(), OpMode::Ignored);

        assert_eq!(store.get_mode(OpId(5), &a), Some(OpMode::Ignored));
        assert_eq!(store.get_mode(OpId(5), &b), None);

        store.set_mode(OpId(5), &b, OpMode::Ask).unwrap();
        assert_eq!(store.get_mode(OpId(5), &b), Some(OpMode::Ask));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_strict_ops() {
        let store = MemoryOpModeStore::new().strict(OpId(9));
        assert!(store.is_strict(OpId(9)));
        assert!(!store.is_strict(OpId(10)));
    }
}
