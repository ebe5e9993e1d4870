use super::StorageBackend;
use crate::error::{MealError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the cache is single-threaded.
#[derive(Default)]
pub struct MemStorage {
    entries: RefCell<HashMap<String, String>>,
    failing_writes: Cell<usize>,
    write_attempts: Cell<usize>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `set` fail, as a full quota would.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.set(count);
    }

    /// Number of `set` calls seen so far, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.get()
    }

    /// Seed a raw value without going through failure injection.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl StorageBackend for MemStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write_attempts.set(self.write_attempts.get() + 1);
        let failing = self.failing_writes.get();
        if failing > 0 {
            self.failing_writes.set(failing - 1);
            return Err(MealError::Storage("Simulated quota exceeded".to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failures_are_consumed() {
        let storage = MemStorage::new();
        storage.fail_next_writes(1);

        assert!(storage.set("k", "1").is_err());
        assert!(storage.set("k", "2").is_ok());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.write_attempts(), 2);
    }
}
