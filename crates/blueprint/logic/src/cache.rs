//! Expression cache: memoisation keyed by expression content
//!
//! Two expressions that were parsed independently but have the same
//! content share one entry. The key is a BLAKE3 digest of a canonical
//! encoding in which object keys are sorted, so key order in the source
//! document does not matter.
//!
//! Concurrency: the map is sharded ([`DashMap`]). Hits take a shard read
//! lock only. A miss computes the value through the shard's entry guard,
//! so concurrent first callers for one key wait for a single factory run
//! and all get that value back. Factories must not call back into the
//! same cache.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

/// Content-derived cache key for a logic expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpressionKey([u8; 32]);

impl ExpressionKey {
    pub fn of(expression: &Value) -> Self {
        let mut hasher = blake3::Hasher::new();
        feed(&mut hasher, expression);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ExpressionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// Tagged, length-prefixed encoding so that e.g. `["ab"]` and `["a","b"]`
// cannot collide.
fn feed(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(b) => {
            hasher.update(if *b { b"t" } else { b"f" });
        }
        Value::Number(n) => {
            let text = n.to_string();
            hasher.update(b"d");
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        Value::String(s) => {
            hasher.update(b"s");
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Value::Array(items) => {
            hasher.update(b"a");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                feed(hasher, item);
            }
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            hasher.update(b"o");
            hasher.update(&(entries.len() as u64).to_le_bytes());
            for (key, item) in entries {
                hasher.update(&(key.len() as u64).to_le_bytes());
                hasher.update(key.as_bytes());
                feed(hasher, item);
            }
        }
    }
}

/// Process-wide memoisation of values derived from expressions.
///
/// One instance stores at most one value per expression; callers keep
/// the value type consistent by using one cache per purpose.
pub struct ExpressionCache<V> {
    entries: DashMap<ExpressionKey, V>,
}

impl<V: Clone> ExpressionCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached value for `expression`, computing it on a miss
    pub fn get_or_add<F>(&self, expression: &Value, factory: F) -> V
    where
        F: FnOnce() -> V,
    {
        let key = ExpressionKey::of(expression);
        if let Some(hit) = self.entries.get(&key) {
            return hit.value().clone();
        }
        self.entries.entry(key).or_insert_with(factory).value().clone()
    }

    /// Like [`get_or_add`](Self::get_or_add) with a fallible factory.
    /// Errors are returned to the caller and nothing is cached.
    pub fn get_or_try_add<E, F>(&self, expression: &Value, factory: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let key = ExpressionKey::of(expression);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.value().clone());
        }
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let value = factory()?;
                Ok(entry.insert(value).value().clone())
            }
        }
    }

    pub fn try_get(&self, expression: &Value) -> Option<V> {
        self.entries
            .get(&ExpressionKey::of(expression))
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, expression: &Value) -> Option<V> {
        self.entries
            .remove(&ExpressionKey::of(expression))
            .map(|(_, value)| value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for ExpressionCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for ExpressionCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
