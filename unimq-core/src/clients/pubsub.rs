//! 发布/订阅型客户端协议（PubSubClient）
//!
//! KV 存储传输的收发与延迟引擎的过期通知监听共用该协议。
//! 订阅支持尾部 `*` 通配模式。
//!
use crate::error::UnimqResult;
use async_trait::async_trait;
use futures_core::stream::BoxStream;

/// 订阅推送的事件
#[derive(Debug, Clone)]
pub struct PubSubEvent {
    pub channel: String,
    pub payload: String,
}

/// 发布/订阅型客户端
#[async_trait]
pub trait PubSubClient: Send + Sync {
    async fn publish(&self, channel: &str, value: &str) -> UnimqResult<()>;

    /// 按模式订阅，返回 `'static` 生命周期事件流，便于在 `tokio::spawn` 中消费
    async fn psubscribe(&self, pattern: &str) -> UnimqResult<BoxStream<'static, PubSubEvent>>;
}

/// 模式匹配：`*` 匹配全部；尾部 `*` 做前缀匹配；否则精确相等
pub fn pattern_matches(pattern: &str, channel: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => pattern == channel,
    }
}
