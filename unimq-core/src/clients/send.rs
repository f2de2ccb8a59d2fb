//! 发送型客户端协议（SendClient）
//!
use crate::error::UnimqResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// 发送回执
#[derive(Debug, Clone)]
pub struct Ack {
    /// 传输侧生成的消息标识
    pub id: String,
}

/// 发送型客户端：每个传输处理器变体底层复用的统一发送接口
///
/// `scheduled_at` 仅对具备原生定时投递能力的传输有意义，
/// 其余传输应忽略该参数。
#[async_trait]
pub trait SendClient: Send + Sync {
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &str,
        headers: &BTreeMap<String, String>,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> UnimqResult<Ack>;
}
