//! 延迟存储协议（DelayStore）
//!
//! 待投递延迟消息的唯一事实来源，写入、触发与恢复三条路径
//! 并发访问；对同一标识的取出必须是原子的比较并删除。
//!
use super::entry::DurableDelayEntry;
use crate::error::UnimqResult;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::time::Duration;

/// 延迟存储：持久条目 + 一次性定时键 + 过期通知
#[async_trait]
pub trait DelayStore: Send + Sync {
    /// 写入持久条目（无 TTL）
    async fn put_entry(&self, id: &str, entry: &DurableDelayEntry) -> UnimqResult<()>;

    /// 写入一次性定时键，TTL 即延迟时长
    async fn put_timer(&self, id: &str, ttl: Duration) -> UnimqResult<()>;

    /// 原子取出条目（比较并删除）
    ///
    /// 触发与恢复两条路径都经由该操作收敛：对同一标识，
    /// 至多一个调用方取得条目。先读后删的实现不满足本协议。
    async fn take_entry(&self, id: &str) -> UnimqResult<Option<DurableDelayEntry>>;

    /// 列出全部持久条目的标识（恢复扫描用）
    async fn scan_entry_ids(&self) -> UnimqResult<Vec<String>>;

    /// 定时键是否仍然存在；不存在说明已过期
    async fn timer_exists(&self, id: &str) -> UnimqResult<bool>;

    /// 订阅过期通知，流元素为到期条目的标识
    ///
    /// 通知只发一次：订阅缺席时的到期事件即告丢失。
    async fn subscribe_expirations(&self) -> UnimqResult<BoxStream<'static, String>>;
}
