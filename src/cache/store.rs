use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

/// キャッシュに保存される一件。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub cached_at: DateTime<Utc>,
    pub payload: V,
}

/// キャッシュのバックエンド。今はプロセス内メモリのみだが、
/// 外部 KVS に差し替えられるよう非同期・失敗可能なインターフェースにしている。
#[async_trait]
pub trait CacheStore<V>: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry<V>>>;
    async fn save(&self, key: &str, entry: CacheEntry<V>) -> Result<()>;
    async fn evict(&self, key: &str) -> Result<()>;
    async fn len(&self) -> usize;
}

/// プロセス内のハッシュマップ。容量上限なし。
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: RwLock<FxHashMap<String, CacheEntry<V>>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<V> MemoryStore<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn load(&self, key: &str) -> Result<Option<CacheEntry<V>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, entry: CacheEntry<V>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
