use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{KeyValueStore, RepositoryError};

/// Process-local key-value store, used when no database is wired in.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    values: RwLock<HashMap<String, Value>>,
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn store(&self, key: &str, value: Value) -> Result<(), RepositoryError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        let mut values = self.values.write().await;
        Ok(values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::InMemoryKeyValueStore;
    use crate::repositories::KeyValueStore;

    #[tokio::test]
    async fn in_memory_store_behaves_like_sql_store() {
        let store = InMemoryKeyValueStore::default();
        assert_eq!(store.load("k").await.expect("load"), None);

        store.store("k", json!(1)).await.expect("store");
        store.store("k", json!(2)).await.expect("overwrite");
        assert_eq!(store.load("k").await.expect("load"), Some(json!(2)));

        assert!(store.delete("k").await.expect("delete"));
        assert!(!store.delete("k").await.expect("delete missing"));
    }
}
