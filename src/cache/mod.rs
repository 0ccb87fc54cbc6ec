//! 分析結果の TTL 付きメモ化。
//!
//! ハンドラには [`ResultCache`] を共有参照で渡す。期限切れの判定は参照時に
//! 遅延評価し、バックグラウンドでの掃除は行わない。同一キーの同時ミスは
//! キーごとのゲートで一本化し、上流呼び出しは一度だけにする。

pub mod clock;
pub mod store;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheEntry, CacheStore, MemoryStore};

/// 参照結果の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// 有効期限内のエントリを返した。
    Hit,
    /// 同一キーの先行計算を待ち、その結果を返した。
    Coalesced,
    /// 新たに計算して保存した。
    Miss,
}

/// 参照結果。
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: V,
    pub outcome: CacheOutcome,
    pub cached_at: DateTime<Utc>,
    /// この参照で期限切れのエントリを削除したか。
    pub evicted: bool,
}

impl<V> Lookup<V> {
    pub fn into_value(self) -> V {
        self.value
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// キーごとのゲートへの参照。待機中・計算中に future が破棄されても
/// `Drop` で後片付けするので、`inflight` に孤立したゲートが残らない。
struct GateSlot<'a> {
    inflight: &'a Mutex<FxHashMap<String, Gate>>,
    key: &'a str,
    gate: Gate,
}

impl Drop for GateSlot<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus this slot: no other request holds the gate
        let last = inflight.get(self.key).is_some_and(|current| {
            Arc::ptr_eq(current, &self.gate) && Arc::strong_count(current) == 2
        });
        if last {
            inflight.remove(self.key);
        }
    }
}

enum Freshness<V> {
    Fresh(CacheEntry<V>),
    Expired,
    Absent,
}

pub struct ResultCache<V> {
    store: Arc<dyn CacheStore<V>>,
    clock: Arc<dyn Clock>,
    inflight: Mutex<FxHashMap<String, Gate>>,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore<V>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            inflight: Mutex::new(FxHashMap::default()),
        }
    }

    /// メモリストアとシステム時計で構築する。
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    /// TTL 内であれば保存済みの値を返し、なければ `compute` を実行して保存する。
    ///
    /// `now - cached_at <= ttl` の間はヒット扱い。`compute` が失敗した場合は
    /// 何も保存せずにエラーを返す。
    ///
    /// # Errors
    /// `compute` が返したエラーをそのまま返す。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Lookup<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut evicted = false;
        match self.fresh_entry(key, ttl).await {
            Freshness::Fresh(entry) => {
                debug!(key, "analysis cache hit");
                return Ok(Lookup {
                    value: entry.payload,
                    outcome: CacheOutcome::Hit,
                    cached_at: entry.cached_at,
                    evicted,
                });
            }
            Freshness::Expired => evicted = true,
            Freshness::Absent => {}
        }

        let slot = self.gate_for(key);
        let _turn = slot.gate.lock().await;

        // Double-check after acquiring the gate (another task may have filled it)
        match self.fresh_entry(key, ttl).await {
            Freshness::Fresh(entry) => {
                debug!(key, "analysis cache filled by concurrent request");
                return Ok(Lookup {
                    value: entry.payload,
                    outcome: CacheOutcome::Coalesced,
                    cached_at: entry.cached_at,
                    evicted,
                });
            }
            Freshness::Expired => evicted = true,
            Freshness::Absent => {}
        }

        let value = compute().await?;
        let cached_at = self.clock.now();
        let entry = CacheEntry {
            cached_at,
            payload: value.clone(),
        };
        if let Err(error) = self.store.save(key, entry).await {
            warn!(key, error = ?error, "failed to store analysis result");
        }
        Ok(Lookup {
            value,
            outcome: CacheOutcome::Miss,
            cached_at,
            evicted,
        })
    }

    async fn fresh_entry(&self, key: &str, ttl: Duration) -> Freshness<V> {
        let entry = match self.store.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Freshness::Absent,
            Err(error) => {
                warn!(key, error = ?error, "analysis cache read failed; treating as miss");
                return Freshness::Absent;
            }
        };

        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let age = self.clock.now().signed_duration_since(entry.cached_at);
        if age <= ttl {
            return Freshness::Fresh(entry);
        }

        debug!(key, age_secs = age.num_seconds(), "evicting expired analysis");
        if let Err(error) = self.store.evict(key).await {
            warn!(key, error = ?error, "failed to evict expired analysis");
        }
        Freshness::Expired
    }

    fn gate_for<'a>(&'a self, key: &'a str) -> GateSlot<'a> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(inflight.entry(key.to_string()).or_default());
        GateSlot {
            inflight: &self.inflight,
            key,
            gate,
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
