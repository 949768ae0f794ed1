//! Per-step fetch bookkeeping.
//!
//! Every fetch issued by a wizard step is stamped with a [`Generation`].
//! Starting a new fetch for the same step supersedes all earlier ones, and
//! a result carrying a superseded generation is dropped on arrival. This
//! makes "last issued wins" hold regardless of the order responses come
//! back in.
//!
//! [`SelectionCache`] keeps fetched lists keyed by the upstream selection
//! (professionals by category id, slots by professional id) so navigating
//! back and forward re-uses data only when it belongs to the same
//! selection.

use std::collections::HashMap;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// Generations
// ---------------------------------------------------------------------------

/// Opaque stamp identifying one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic generation counter for one step.
#[derive(Debug, Clone, Default)]
pub struct RequestGenerations {
    current: u64,
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new generation, superseding every earlier one.
    pub fn next(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    /// Supersede every issued generation without issuing a new one.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }
}

// ---------------------------------------------------------------------------
// Step fetch state
// ---------------------------------------------------------------------------

/// Loading / error / data triple of one step, guarded by generations.
#[derive(Debug, Clone)]
pub struct StepFetch<T> {
    generations: RequestGenerations,
    loading: bool,
    error: Option<String>,
    data: Option<T>,
}

impl<T> Default for StepFetch<T> {
    fn default() -> Self {
        Self {
            generations: RequestGenerations::new(),
            loading: false,
            error: None,
            data: None,
        }
    }
}

impl<T> StepFetch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch: clears data and error, sets loading, and returns the
    /// ticket the result must be resolved with.
    pub fn begin(&mut self) -> Generation {
        self.loading = true;
        self.error = None;
        self.data = None;
        self.generations.next()
    }

    /// Apply a fetch result.
    ///
    /// Returns `false` (and changes nothing) when `ticket` was superseded.
    pub fn resolve(&mut self, ticket: Generation, result: Result<T, String>) -> bool {
        if !self.generations.is_current(ticket) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(message) => {
                self.data = None;
                self.error = Some(message);
            }
        }
        true
    }

    /// Fill the step from already-known data, superseding in-flight fetches.
    pub fn fill(&mut self, data: T) {
        self.generations.invalidate();
        self.loading = false;
        self.error = None;
        self.data = Some(data);
    }

    /// Drop everything and supersede in-flight fetches.
    pub fn reset(&mut self) {
        self.generations.invalidate();
        self.loading = false;
        self.error = None;
        self.data = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_current(&self, ticket: Generation) -> bool {
        self.generations.is_current(ticket)
    }
}

// ---------------------------------------------------------------------------
// Selection cache
// ---------------------------------------------------------------------------

/// Fetched lists keyed by the upstream selection that produced them.
#[derive(Debug, Clone)]
pub struct SelectionCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for SelectionCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> SelectionCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Forget the entry for `key`; the next lookup misses.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
