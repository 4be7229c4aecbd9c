use crate::program::Program;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Parsed programs keyed by their source text.
///
/// Parsing is a pure function of the text (and the bound feature names, which
/// callers fold into the key), so entries never go stale.
pub struct ProgramCache {
    data: Mutex<HashMap<String, Arc<Program>>>,
    capacity: usize,
}

impl ProgramCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(HashMap::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Program>> {
        let data = self.data.lock().ok()?;
        data.get(key).cloned()
    }

    pub fn set(&self, key: String, value: Arc<Program>) {
        if let Ok(mut data) = self.data.lock() {
            if data.len() >= self.capacity {
                // Clear everything when full.
                data.clear();
            }
            data.insert(key, value);
        }
    }

    /// Returns the cached program for `key`, parsing it with `parse` on a miss.
    pub fn get_or_try_insert<F>(&self, key: &str, parse: F) -> crate::error::Result<Arc<Program>>
    where
        F: FnOnce() -> crate::error::Result<Program>,
    {
        if let Some(program) = self.get(key) {
            return Ok(program);
        }
        let program = Arc::new(parse()?);
        self.set(key.to_string(), program.clone());
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new(64)
    }
}
