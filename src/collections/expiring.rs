//! List whose entries expire after an idle period.
//!
//! Entries are addressed by position, or by an opaque id minted with
//! [`ExpiringList::add_and_get_id`]. Reading or writing an entry touches it.
//! A sweep removes every entry idle for longer than the TTL and shifts the
//! id table so each surviving id still points at its entry.
//!
//! No iterator is provided. With eviction running concurrently, positions
//! are only meaningful for the duration of one call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use uuid::Uuid;

struct Entry<T> {
    value: T,
    accessed: Instant,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            accessed: Instant::now(),
        }
    }

    fn touch(&mut self) -> &mut T {
        self.accessed = Instant::now();
        &mut self.value
    }
}

struct Inner<T> {
    items: Vec<Entry<T>>,
    ids: HashMap<String, usize>,
}

impl<T> Inner<T> {
    /// Removes position `index`, dropping ids mapped to it and shifting
    /// every id above it down by one.
    fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }

        let entry = self.items.remove(index);
        self.ids.retain(|_, pos| *pos != index);
        for pos in self.ids.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
        Some(entry.value)
    }
}

/// Thread-safe list with idle-time eviction.
pub struct ExpiringList<T> {
    ttl: Duration,
    inner: Mutex<Inner<T>>,
}

impl<T> ExpiringList<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner {
                items: Vec::new(),
                ids: HashMap::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // Only `with_mut` runs caller code under the lock, after the touch.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a value.
    pub fn add(&self, value: T) {
        self.lock().items.push(Entry::new(value));
    }

    /// Appends a value and returns a new id that resolves to it.
    pub fn add_and_get_id(&self, value: T) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut inner = self.lock();
        inner.items.push(Entry::new(value));
        let pos = inner.items.len() - 1;
        inner.ids.insert(id.clone(), pos);
        id
    }

    /// Inserts at `index` (clamped to the length), shifting later ids up.
    pub fn insert(&self, index: usize, value: T) {
        let mut inner = self.lock();
        let index = index.min(inner.items.len());
        inner.items.insert(index, Entry::new(value));
        for pos in inner.ids.values_mut() {
            if *pos >= index {
                *pos += 1;
            }
        }
    }

    /// Replaces the value at `index`, touching it. Returns false when out of
    /// range.
    pub fn set(&self, index: usize, value: T) -> bool {
        match self.lock().items.get_mut(index) {
            Some(entry) => {
                *entry.touch() = value;
                true
            }
            None => false,
        }
    }

    /// Runs `f` on the value at `index`, touching it.
    pub fn with_mut<R>(&self, index: usize, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.lock().items.get_mut(index).map(|entry| f(entry.touch()))
    }

    /// Removes and returns the value at `index`.
    pub fn remove_at(&self, index: usize) -> Option<T> {
        self.lock().remove_at(index)
    }

    /// Position currently held by `id`; `None` if unknown or evicted.
    pub fn lookup_id(&self, id: &str) -> Option<usize> {
        self.lock().ids.get(id).copied()
    }

    /// Removes the entry for `id` and forgets the id.
    pub fn remove_id(&self, id: &str) -> Option<T> {
        let mut inner = self.lock();
        let index = inner.ids.remove(id)?;
        inner.remove_at(index)
    }

    /// Removes the entry at `index` together with any id mapped to it.
    pub fn remove_index(&self, index: usize) -> Option<T> {
        self.remove_at(index)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.ids.clear();
    }

    /// Removes every entry idle for longer than the TTL.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Sweeps as if the current time were `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        let mut i = 0;

        while i < inner.items.len() {
            let idle = now.saturating_duration_since(inner.items[i].accessed);
            if idle > self.ttl {
                inner.remove_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }

        removed
    }
}

impl<T: Clone> ExpiringList<T> {
    /// Clones out the value at `index`, touching it.
    pub fn get(&self, index: usize) -> Option<T> {
        self.lock().items.get_mut(index).map(|entry| entry.touch().clone())
    }

    /// Clones out the value for `id`, touching it.
    pub fn get_by_id(&self, id: &str) -> Option<T> {
        let mut inner = self.lock();
        let index = *inner.ids.get(id)?;
        inner.items.get_mut(index).map(|entry| entry.touch().clone())
    }
}

impl<T: PartialEq> ExpiringList<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.index_of(value).is_some()
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.lock().items.iter().position(|entry| entry.value == *value)
    }

    /// Removes the first entry equal to `value`.
    pub fn remove(&self, value: &T) -> bool {
        let mut inner = self.lock();
        match inner.items.iter().position(|entry| entry.value == *value) {
            Some(index) => inner.remove_at(index).is_some(),
            None => false,
        }
    }
}

impl<T: Send + 'static> ExpiringList<T> {
    /// Spawns a task that sweeps once per TTL period.
    ///
    /// The task holds only a weak reference and ends once the list is
    /// dropped. Must be called from within a Tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let list: Weak<Self> = Arc::downgrade(self);
        let period = self.ttl.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(strong) = list.upgrade() else {
                    break;
                };
                let removed = strong.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = strong.len(), "Swept expired entries");
                }
            }
        })
    }
}
