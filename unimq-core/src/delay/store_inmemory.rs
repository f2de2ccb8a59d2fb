//! 内存版延迟存储（InMemoryDelayStore）
//!
//! 以 tokio 定时器模拟 TTL，以 `tokio::sync::broadcast` 模拟
//! 过期通知通道，满足 `DelayStore` 协议，用于测试与本地开发。
//! 与真实键值存储一致：无订阅者时过期通知即被丢弃。
//!
use super::entry::DurableDelayEntry;
use super::store::DelayStore;
use crate::error::UnimqResult;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

pub struct InMemoryDelayStore {
    entries: Arc<DashMap<String, DurableDelayEntry>>,
    timers: Arc<DashMap<String, ()>>,
    expired_tx: broadcast::Sender<String>,
}

impl InMemoryDelayStore {
    pub fn new(capacity: usize) -> Self {
        let (expired_tx, _rx) = broadcast::channel(capacity);
        Self {
            entries: Arc::new(DashMap::new()),
            timers: Arc::new(DashMap::new()),
            expired_tx,
        }
    }
}

impl Default for InMemoryDelayStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl DelayStore for InMemoryDelayStore {
    async fn put_entry(&self, id: &str, entry: &DurableDelayEntry) -> UnimqResult<()> {
        self.entries.insert(id.to_string(), entry.clone());
        Ok(())
    }

    async fn put_timer(&self, id: &str, ttl: Duration) -> UnimqResult<()> {
        let id = id.to_string();
        self.timers.insert(id.clone(), ());
        let timers = self.timers.clone();
        let tx = self.expired_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // 定时键先消失，再发通知；无订阅者时通知即丢失
            if timers.remove(&id).is_some() {
                let _ = tx.send(id);
            }
        });
        Ok(())
    }

    async fn take_entry(&self, id: &str) -> UnimqResult<Option<DurableDelayEntry>> {
        Ok(self.entries.remove(id).map(|(_, entry)| entry))
    }

    async fn scan_entry_ids(&self) -> UnimqResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }

    async fn timer_exists(&self, id: &str) -> UnimqResult<bool> {
        Ok(self.timers.contains_key(id))
    }

    async fn subscribe_expirations(&self) -> UnimqResult<BoxStream<'static, String>> {
        let rx = self.expired_tx.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(|r| futures_util::future::ready(r.ok()));
        Ok(Box::pin(stream))
    }
}
