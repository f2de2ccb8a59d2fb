//! 内存版协作客户端
//!
//! 基于 `tokio::sync::broadcast` 的轻量实现，满足 `SendClient`/
//! `PollClient`/`PubSubClient` 协议，用于测试、示例与本地开发：
//! - `InMemoryBroker`：按主题广播，`subscribe` 产出拉取客户端；
//! - `InMemoryPubSub`：全局广播 + 模式过滤。
//!
//! 注意：广播语义下无订阅者时发送将被忽略，不保证持久化。
//!
use super::poll::PollClient;
use super::pubsub::{PubSubClient, PubSubEvent, pattern_matches};
use super::send::{Ack, SendClient};
use crate::error::{UnimqError, UnimqResult};
use crate::record::RawRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

const TOPIC_CHANNEL_CAPACITY: usize = 1024;

/// 内存消息代理：同一实例可同时充当发送端与订阅入口
pub struct InMemoryBroker {
    topics: Arc<DashMap<String, broadcast::Sender<RawRecord>>>,
    seq: AtomicU64,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            seq: AtomicU64::new(0),
        }
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<RawRecord> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CHANNEL_CAPACITY).0)
            .value()
            .clone()
    }

    /// 订阅一个主题，`max_batch` 限定单次拉取的批大小
    pub fn subscribe(&self, topic: &str, max_batch: usize) -> InMemoryPollClient {
        let rx = self.sender(topic).subscribe();
        InMemoryPollClient {
            rx: Mutex::new(Some(rx)),
            max_batch: max_batch.max(1),
        }
    }
}

#[async_trait]
impl SendClient for InMemoryBroker {
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &str,
        headers: &BTreeMap<String, String>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> UnimqResult<Ack> {
        let id = format!("{}-{}", topic, self.seq.fetch_add(1, Ordering::Relaxed));
        let raw = RawRecord::builder()
            .id(id.clone())
            .topic(topic.to_string())
            .maybe_key(key.map(str::to_string))
            .headers(headers.clone())
            .body(value.to_string())
            .build();

        let tx = self.sender(topic);
        match scheduled_at {
            Some(at) => {
                // 原生定时投递：到期后才对订阅者可见
                let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    let _ = tx.send(raw);
                });
            }
            None => {
                let _ = tx.send(raw);
            }
        }

        Ok(Ack { id })
    }
}

/// 内存代理的拉取客户端：关闭后拉取返回错误
pub struct InMemoryPollClient {
    rx: Mutex<Option<broadcast::Receiver<RawRecord>>>,
    max_batch: usize,
}

#[async_trait]
impl PollClient for InMemoryPollClient {
    async fn poll(&self, timeout: Duration) -> UnimqResult<Vec<RawRecord>> {
        let mut guard = self.rx.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(UnimqError::transport("poll on a closed consumer"));
        };

        let mut batch = Vec::new();
        match tokio::time::timeout(timeout, rx.recv()).await {
            Err(_) => return Ok(batch),
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                return Err(UnimqError::transport("broker channel closed"));
            }
            Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                warn!(lagged = n, "consumer lagged, records dropped");
                return Ok(batch);
            }
            Ok(Ok(first)) => batch.push(first),
        }
        while batch.len() < self.max_batch {
            match rx.try_recv() {
                Ok(raw) => batch.push(raw),
                Err(_) => break,
            }
        }
        Ok(batch)
    }

    async fn close(&self) {
        self.rx.lock().await.take();
    }
}

/// 内存发布/订阅：单通道广播，订阅端按模式过滤
#[derive(Clone)]
pub struct InMemoryPubSub {
    tx: broadcast::Sender<PubSubEvent>,
}

impl InMemoryPubSub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }
}

#[async_trait]
impl PubSubClient for InMemoryPubSub {
    async fn publish(&self, channel: &str, value: &str) -> UnimqResult<()> {
        // 无订阅者时 send 返回错误，视为非致命并忽略
        let _ = self.tx.send(PubSubEvent {
            channel: channel.to_string(),
            payload: value.to_string(),
        });
        Ok(())
    }

    async fn psubscribe(&self, pattern: &str) -> UnimqResult<BoxStream<'static, PubSubEvent>> {
        let pattern = pattern.to_string();
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx).filter_map(move |r| {
            let keep = match r {
                Ok(ev) if pattern_matches(&pattern, &ev.channel) => Some(ev),
                _ => None,
            };
            futures_util::future::ready(keep)
        });
        Ok(Box::pin(stream))
    }
}
