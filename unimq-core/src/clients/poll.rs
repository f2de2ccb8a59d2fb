//! 拉取型客户端协议（PollClient）
//!
use crate::error::UnimqResult;
use crate::record::RawRecord;
use async_trait::async_trait;
use std::time::Duration;

/// 拉取型客户端：消费调度循环持续从中取出原始消息批次
#[async_trait]
pub trait PollClient: Send + Sync {
    /// 阻塞等待至多 `timeout`，返回一批原始消息（可能为空）
    ///
    /// 传输级错误（连接断开等）以 `Err` 返回，调度循环据此终止。
    async fn poll(&self, timeout: Duration) -> UnimqResult<Vec<RawRecord>>;

    /// 释放底层连接；之后的 `poll` 应返回错误
    async fn close(&self);
}
