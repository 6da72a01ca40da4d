//! Per-profile write serialization
//!
//! One mutex per [`ProfileKey`] with a live operation. Entries are created
//! on demand and dropped when the last holder leaves, so the table only
//! holds keys that are currently in use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::collaborators::ProfileKey;
use super::errors::{ProfileError, ProfileResult};

/// Keyed mutex table
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<ProfileKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    pub fn run<T, F>(&self, key: &ProfileKey, f: F) -> ProfileResult<T>
    where
        F: FnOnce() -> ProfileResult<T>,
    {
        let entry = {
            let mut table = self.table.lock().map_err(|_| ProfileError::Lock)?;
            Arc::clone(table.entry(*key).or_default())
        };

        let result = {
            let _guard = entry.lock().map_err(|_| ProfileError::Lock)?;
            f()
        };

        let mut table = self.table.lock().map_err(|_| ProfileError::Lock)?;
        // One reference in the table, one held here: nobody else waits
        if Arc::strong_count(&entry) == 2 {
            table.remove(key);
        }
        result
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_entry_removed_after_use() {
        let locks = KeyLocks::new();
        let key = ProfileKey::new(1, 1, 1);
        let value = locks.run(&key, || Ok(5)).unwrap();
        assert_eq!(value, 5);
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_error_passes_through() {
        let locks = KeyLocks::new();
        let key = ProfileKey::new(1, 1, 1);
        let result: ProfileResult<()> =
            locks.run(&key, || Err(ProfileError::UnknownItem("x".into())));
        assert!(matches!(result, Err(ProfileError::UnknownItem(_))));
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let key = ProfileKey::new(1, 1, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks
                            .run(&key, || {
                                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                                inside.fetch_sub(1, Ordering::SeqCst);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(locks.active(), 0);
    }
}
