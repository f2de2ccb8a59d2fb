//! 传输处理器（transport）
//!
//! 以统一签名对上层暴露收发能力，每个后端一个实现：
//! - `TransportHandler`：发送/异步发送/订阅的统一契约；
//! - `HandlerRegistry`：传输标识到处理器实例的只读路由表；
//! - 变体为固定闭集 {LogBroker, PushBroker, KvStore}，
//!   启动期依配置选定一次，调用期不再重选。
//!
//! 校验约定：主题或消息体为空的消息不抛错，记录告警并返回
//! `Ok(None)`，底层客户端不会被触达；传输级失败以 `Err` 上抛。
//!
pub mod kv_store;
pub mod log_broker;
pub mod producers;
pub mod push_broker;
pub mod registry;

pub use kv_store::KvStoreHandler;
pub use log_broker::LogBrokerHandler;
pub use producers::{ProducerPool, SendClientFactory};
pub use push_broker::PushBrokerHandler;
pub use registry::HandlerRegistry;

use crate::clients::PollClient;
use crate::consumer::{ListenerHandle, ListenerOptions, MessageListener};
use crate::error::UnimqResult;
use crate::record::{KEYS_HEADER, ProducerRecord, TAG_HEADER, TransportResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// 拉取客户端工厂：按订阅参数建立一条底层订阅连接
pub type PollClientFactory =
    Arc<dyn Fn(&ListenerOptions) -> UnimqResult<Arc<dyn PollClient>> + Send + Sync>;

/// 传输标识（固定闭集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// 分区日志型代理
    LogBroker,
    /// 推送消费型代理
    PushBroker,
    /// 键值存储的发布/订阅
    KvStore,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogBroker => "log-broker",
            Self::PushBroker => "push-broker",
            Self::KvStore => "kv-store",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 传输处理器契约（各变体统一）
#[async_trait]
pub trait TransportHandler: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// 是否具备原生定时投递能力；不具备者的延迟消息由上层
    /// 转交延迟投递引擎
    fn native_delay(&self) -> bool;

    /// 发送一条消息
    ///
    /// 校验失败返回 `Ok(None)` 并告警；传输失败返回 `Err`。
    async fn send(
        &self,
        producer_name: &str,
        record: &ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>>;

    /// 建立长驻订阅，按 `ListenerOptions` 过滤与限流，
    /// 返回可关闭/等待的句柄
    async fn push_listener(
        &self,
        opts: ListenerOptions,
        listener: Arc<dyn MessageListener>,
    ) -> UnimqResult<ListenerHandle>;
}

/// 异步发送扩展：I/O 在独立任务中执行，调用方持有结果句柄
pub trait TransportHandlerExt {
    fn send_async(
        &self,
        producer_name: &str,
        record: ProducerRecord,
    ) -> JoinHandle<UnimqResult<Option<TransportResult>>>;
}

impl TransportHandlerExt for Arc<dyn TransportHandler> {
    fn send_async(
        &self,
        producer_name: &str,
        record: ProducerRecord,
    ) -> JoinHandle<UnimqResult<Option<TransportResult>>> {
        let handler = self.clone();
        let producer_name = producer_name.to_string();
        tokio::spawn(async move { handler.send(&producer_name, &record).await })
    }
}

/// 公共校验：不合法的消息在此拦截，不触达底层客户端
pub(crate) fn check_sendable(kind: TransportKind, record: &ProducerRecord) -> bool {
    if record.is_sendable() {
        return true;
    }
    warn!(
        transport = kind.as_str(),
        topic = record.topic(),
        "rejecting record with empty topic or body"
    );
    false
}

/// 由出站消息组装传输头部：标签与附加业务键
pub(crate) fn record_headers(record: &ProducerRecord) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if let Some(tag) = record.tag() {
        headers.insert(TAG_HEADER.to_string(), tag.to_string());
    }
    let extra: Vec<&str> = record.keys().iter().skip(1).map(String::as_str).collect();
    if !extra.is_empty() {
        headers.insert(KEYS_HEADER.to_string(), extra.join(","));
    }
    headers
}
