//! 键值存储发布/订阅的传输处理器（KvStoreHandler）
//!
//! 发送侧：出站消息序列化为传输中立的 `RawRecord` 后发布到
//! 以主题命名的频道。无原生定时投递能力。
//! 订阅侧：订阅流经适配器折算为拉取型客户端，复用统一的
//! 调度循环；`cache_limit` 即适配缓冲的容量（背压）。
//!
use super::{TransportHandler, TransportKind, check_sendable, record_headers};
use crate::clients::{PollClient, PubSubClient};
use crate::consumer::{ListenerHandle, ListenerOptions, MessageListener, spawn_dispatch_loop};
use crate::error::UnimqResult;
use crate::pipeline::PipelineEngine;
use crate::record::{ConsumerRecord, ProducerRecord, RawRecord, TransportResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct KvStoreHandler {
    pubsub: Arc<dyn PubSubClient>,
    listener_pipeline: Arc<PipelineEngine<ConsumerRecord>>,
}

impl KvStoreHandler {
    pub fn new(
        pubsub: Arc<dyn PubSubClient>,
        listener_pipeline: Arc<PipelineEngine<ConsumerRecord>>,
    ) -> Self {
        Self {
            pubsub,
            listener_pipeline,
        }
    }
}

#[async_trait]
impl TransportHandler for KvStoreHandler {
    fn kind(&self) -> TransportKind {
        TransportKind::KvStore
    }

    fn native_delay(&self) -> bool {
        false
    }

    async fn send(
        &self,
        _producer_name: &str,
        record: &ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>> {
        if !check_sendable(self.kind(), record) {
            return Ok(None);
        }
        if !record.is_immediate() {
            debug!(topic = record.topic(), "residual delay ignored by kv store");
        }

        let id = Uuid::new_v4().to_string();
        let raw = RawRecord::builder()
            .id(id.clone())
            .topic(record.topic().to_string())
            .maybe_key(record.partition_key().map(str::to_string))
            .headers(record_headers(record))
            .body(record.body().to_string())
            .build();
        let payload = serde_json::to_string(&raw)?;

        self.pubsub.publish(record.topic(), &payload).await?;
        Ok(Some(TransportResult::new(record.topic(), id)))
    }

    async fn push_listener(
        &self,
        opts: ListenerOptions,
        listener: Arc<dyn MessageListener>,
    ) -> UnimqResult<ListenerHandle> {
        let stream = self.pubsub.psubscribe(opts.topic()).await?;
        let client = Arc::new(PubSubPollClient::spawn(stream, opts.cache_limit()));
        Ok(spawn_dispatch_loop(
            client,
            opts,
            self.listener_pipeline.clone(),
            listener,
        ))
    }
}

/// 订阅流到拉取客户端的适配器
///
/// 后台任务将事件解析为 `RawRecord` 并写入有界缓冲，
/// 缓冲满时暂停消费上游（背压）。
pub struct PubSubPollClient {
    rx: Mutex<Option<mpsc::Receiver<RawRecord>>>,
    pump: JoinHandle<()>,
    max_batch: usize,
}

impl PubSubPollClient {
    pub fn spawn(
        mut stream: futures_core::stream::BoxStream<'static, crate::clients::PubSubEvent>,
        cache_limit: usize,
    ) -> Self {
        let capacity = cache_limit.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let pump = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match serde_json::from_str::<RawRecord>(&event.payload) {
                    Ok(raw) => {
                        if tx.send(raw).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(channel = %event.channel, error = %e, "malformed record, skipped");
                    }
                }
            }
        });
        Self {
            rx: Mutex::new(Some(rx)),
            pump,
            max_batch: capacity,
        }
    }
}

#[async_trait]
impl PollClient for PubSubPollClient {
    async fn poll(&self, timeout: Duration) -> UnimqResult<Vec<RawRecord>> {
        let mut guard = self.rx.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(crate::error::UnimqError::transport(
                "poll on a closed subscription",
            ));
        };

        let mut batch = Vec::new();
        match tokio::time::timeout(timeout, rx.recv()).await {
            Err(_) => return Ok(batch),
            Ok(None) => {
                return Err(crate::error::UnimqError::transport(
                    "subscription stream ended",
                ));
            }
            Ok(Some(first)) => batch.push(first),
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
        self.pump.abort();
        self.rx.lock().await.take();
    }
}
