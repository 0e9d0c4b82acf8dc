//! Hierarchical document store contract and an in-memory implementation.
//!
//! Paths are slash-separated (`poems/-Nx3.../likes/ada`). The remote store is
//! an external collaborator; the engine only relies on path-addressed
//! read/write/merge/delete, time-ordered key generation and a single-field
//! equality query.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Path-addressed access to a JSON document tree.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the subtree at `path`; `None` when nothing is stored there.
    async fn read(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Replace the subtree at `path`. Writing `null` removes it.
    async fn write(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Set each child of `partial` under `path`, leaving other children alone.
    async fn merge(&self, path: &str, partial: Map<String, Value>) -> StoreResult<()>;

    /// Remove the subtree at `path`.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Write `value` under a freshly generated, time-ordered child key of
    /// `path` and return the key. Never overwrites an existing child.
    async fn push(&self, path: &str, value: Value) -> StoreResult<String>;

    /// Children of `path` whose `field` equals `value`, in key order.
    async fn query_equal(&self, path: &str, field: &str, value: &Value)
        -> StoreResult<Option<Value>>;
}

/// Split a path into its non-empty segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join path segments with `/`.
pub fn child_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent, child)
    }
}

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generator of 20-character, lexicographically time-ordered keys.
///
/// Eight characters encode the millisecond timestamp, twelve are random.
/// Keys generated in the same millisecond increment the previous random
/// part, so one generator never produces out-of-order keys.
#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    last_time: i64,
    last_random: [u8; 12],
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key for the given millisecond timestamp.
    pub fn next_key(&mut self, now_ms: i64) -> String {
        if now_ms <= self.last_time {
            self.increment_random();
        } else {
            self.last_time = now_ms;
            let entropy = uuid::Uuid::new_v4();
            for (slot, byte) in self.last_random.iter_mut().zip(entropy.as_bytes()) {
                *slot = byte % 64;
            }
        }

        let mut key = String::with_capacity(20);
        let mut time = self.last_time.max(0) as u64;
        let mut time_chars = [0u8; 8];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        key.extend(time_chars.iter().map(|c| *c as char));
        key.extend(self.last_random.iter().map(|i| PUSH_CHARS[*i as usize] as char));
        key
    }

    fn increment_random(&mut self) {
        for slot in self.last_random.iter_mut().rev() {
            if *slot == 63 {
                *slot = 0;
            } else {
                *slot += 1;
                return;
            }
        }
    }
}

/// In-memory document tree.
///
/// Can be switched offline to simulate an unreachable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: Mutex<Map<String, Value>>,
    keys: Mutex<PushKeyGenerator>,
    offline: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of the whole tree.
    pub fn dump(&self) -> Value {
        Value::Object(lock(&self.root).clone())
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn get(root: &Map<String, Value>, path: &str) -> Option<Value> {
        let segs = segments(path);
        let Some((first, rest)) = segs.split_first() else {
            return Some(Value::Object(root.clone()));
        };
        let mut node = root.get(*first)?;
        for seg in rest {
            node = node.as_object()?.get(*seg)?;
        }
        Some(node.clone())
    }

    fn set(root: &mut Map<String, Value>, path: &str, value: Value) -> StoreResult<()> {
        let segs = segments(path);
        let Some((last, parents)) = segs.split_last() else {
            return match value {
                Value::Object(map) => {
                    *root = map;
                    Ok(())
                }
                Value::Null => {
                    root.clear();
                    Ok(())
                }
                _ => Err(StoreError::Rejected {
                    path: path.to_string(),
                    reason: "root must be an object".into(),
                }),
            };
        };

        let mut node = root;
        for seg in parents {
            let child = node
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = child.as_object_mut().ok_or_else(|| StoreError::Rejected {
                path: path.to_string(),
                reason: format!("'{}' is not an object", seg),
            })?;
        }

        if value.is_null() {
            node.remove(*last);
        } else {
            node.insert(last.to_string(), value);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        self.ensure_online()?;
        Ok(Self::get(&lock(&self.root), path))
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        self.ensure_online()?;
        Self::set(&mut lock(&self.root), path, value)
    }

    async fn merge(&self, path: &str, partial: Map<String, Value>) -> StoreResult<()> {
        self.ensure_online()?;
        let mut root = lock(&self.root);
        for (key, value) in partial {
            Self::set(&mut root, &child_path(path, &key), value)?;
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.ensure_online()?;
        Self::set(&mut lock(&self.root), path, Value::Null)
    }

    async fn push(&self, path: &str, value: Value) -> StoreResult<String> {
        self.ensure_online()?;
        let mut root = lock(&self.root);
        let now = chrono::Utc::now().timestamp_millis();
        let mut keys = lock(&self.keys);
        loop {
            let key = keys.next_key(now);
            let target = child_path(path, &key);
            if Self::get(&root, &target).is_none() {
                Self::set(&mut root, &target, value)?;
                return Ok(key);
            }
        }
    }

    async fn query_equal(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Value>> {
        self.ensure_online()?;
        let Some(node) = Self::get(&lock(&self.root), path) else {
            return Ok(None);
        };
        let Value::Object(children) = node else {
            return Ok(None);
        };
        let matched: Map<String, Value> = children
            .into_iter()
            .filter(|(_, child)| child.get(field) == Some(value))
            .collect();
        Ok(Some(Value::Object(matched)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_keys_are_ordered_within_one_millisecond() {
        let mut gen = PushKeyGenerator::new();
        let keys: Vec<String> = (0..200).map(|_| gen.next_key(1_706_745_600_000)).collect();

        assert!(keys.iter().all(|k| k.len() == 20));
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 200);
    }

    #[test]
    fn push_keys_follow_time() {
        let mut gen = PushKeyGenerator::new();
        let early = gen.next_key(1_000);
        let late = gen.next_key(2_000);
        assert!(early < late);
    }

    #[tokio::test]
    async fn write_read_delete() {
        let store = MemoryStore::new();
        store
            .write("poems/p1", json!({"title": "Ode"}))
            .await
            .unwrap();

        assert_eq!(
            store.read("poems/p1/title").await.unwrap(),
            Some(json!("Ode"))
        );

        store.delete("poems/p1").await.unwrap();
        assert_eq!(store.read("poems/p1").await.unwrap(), None);
        assert_eq!(store.read("poems").await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn merge_keeps_untouched_children() {
        let store = MemoryStore::new();
        store
            .write("poems/p1", json!({"title": "Ode", "likes": {"u1": true}}))
            .await
            .unwrap();

        let partial = json!({"title": "Ode II", "author": "Keats"});
        store
            .merge("poems/p1", partial.as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(
            store.read("poems/p1").await.unwrap(),
            Some(json!({"title": "Ode II", "author": "Keats", "likes": {"u1": true}}))
        );
    }

    #[tokio::test]
    async fn push_generates_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.push("books", json!({"n": 1})).await.unwrap();
        let b = store.push("books", json!({"n": 2})).await.unwrap();

        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(
            store.read(&child_path("books", &b)).await.unwrap(),
            Some(json!({"n": 2}))
        );
    }

    #[tokio::test]
    async fn query_equal_filters_children() {
        let store = MemoryStore::new();
        store
            .write(
                "books",
                json!({
                    "a": {"type": "story"},
                    "b": {"type": "novel"},
                    "c": {"type": "story"}
                }),
            )
            .await
            .unwrap();

        let result = store
            .query_equal("books", "type", &json!("story"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, json!({"a": {"type": "story"}, "c": {"type": "story"}}));

        assert_eq!(
            store
                .query_equal("missing", "type", &json!("story"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);

        assert!(matches!(
            store.read("poems").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.push("poems", json!({})).await.is_err());

        store.set_offline(false);
        assert!(store.read("poems").await.is_ok());
    }

    #[test]
    fn path_helpers() {
        assert_eq!(segments("/poems//p1/"), vec!["poems", "p1"]);
        assert_eq!(child_path("poems/", "p1"), "poems/p1");
        assert_eq!(child_path("", "p1"), "p1");
    }
}
