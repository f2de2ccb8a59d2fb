//! 延迟投递引擎（DelayedDeliveryEngine）
//!
//! 编排延迟消息的三条路径：
//! - 写入：条目持久化 + 一次性定时键，消息此时不发送；
//! - 触发：长驻任务消费过期通知，原子取出条目后清除延迟字段，
//!   经正常立即发送路径重投（重新进入管线）；
//! - 恢复：启动时与可选周期扫描全部条目，定时键已消失者按策略
//!   丢弃或立即重投，这是订阅缺席期间漏发到期的唯一补偿途径。
//!
//! 同一条目可能被触发与恢复同时视为到期，原子取出保证至多一次投递。
//!
use super::entry::DurableDelayEntry;
use super::store::DelayStore;
use crate::error::{UnimqError, UnimqResult};
use crate::record::{ProducerRecord, TransportResult};
use crate::transport::TransportKind;
use async_trait::async_trait;
use bon::Builder;
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// 立即发送路径：延迟到期后的重投入口（重新进入管线）
#[async_trait]
pub trait DelaySender: Send + Sync {
    async fn send_now(
        &self,
        producer_name: &str,
        transport: TransportKind,
        record: ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>>;
}

/// 漏发到期的恢复策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// 丢弃条目并记录，不投递
    Discard,
    /// 立即投递（到期时刻已过，延迟字段清空）
    Resend,
}

/// 延迟引擎配置
#[derive(Debug, Clone, Copy)]
pub struct DelayConfig {
    /// 漏发到期的处置策略
    pub recovery_policy: RecoveryPolicy,
    /// 周期恢复扫描的间隔；`None` 表示仅在启动时扫描一次
    pub scan_interval: Option<Duration>,
    /// 重投宽限窗口：超期超过该窗口的条目改为丢弃
    pub resend_grace: Option<Duration>,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            recovery_policy: RecoveryPolicy::Resend,
            scan_interval: Some(Duration::from_secs(60)),
            resend_grace: None,
        }
    }
}

/// 延迟投递引擎
#[derive(Builder)]
pub struct DelayedDeliveryEngine {
    store: Arc<dyn DelayStore>,
    sender: Arc<dyn DelaySender>,
    #[builder(default)]
    config: DelayConfig,
}

impl DelayedDeliveryEngine {
    /// 写入一条延迟消息；消息不发送，仅持久化并挂定时器
    pub async fn schedule(
        &self,
        producer_name: &str,
        transport: TransportKind,
        record: ProducerRecord,
    ) -> UnimqResult<String> {
        let delay_ms = record.delivery_delay_ms().unwrap_or(0);
        if delay_ms == 0 {
            return Err(UnimqError::config(
                "schedule requires a positive delivery delay",
            ));
        }

        let id = Uuid::new_v4().to_string();
        let due_at = Utc::now() + chrono::Duration::milliseconds(delay_ms as i64);
        let entry = DurableDelayEntry::builder()
            .identifier(id.clone())
            .producer_name(producer_name.to_string())
            .transport(transport)
            .payload(record)
            .due_at(due_at)
            .build();

        // 条目先落库，定时键随后；反序会让极短 TTL 先于条目出现
        self.store.put_entry(&id, &entry).await?;
        self.store
            .put_timer(&id, Duration::from_millis(delay_ms))
            .await?;

        debug!(identifier = %id, delay_ms, "delayed record persisted");
        Ok(id)
    }

    /// 启动过期订阅与恢复任务，返回可关闭/等待的句柄
    pub fn start(self: Arc<Self>) -> DelayEngineHandle {
        let token = CancellationToken::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(2);

        tasks.push(tokio::spawn(Self::expiration_loop(
            self.clone(),
            token.clone(),
        )));
        tasks.push(tokio::spawn(Self::recovery_loop(self, token.clone())));

        DelayEngineHandle { token, tasks }
    }

    async fn expiration_loop(self: Arc<Self>, token: CancellationToken) {
        let mut stream = match self.store.subscribe_expirations().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "failed to subscribe expirations");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                maybe_id = stream.next() => match maybe_id {
                    Some(id) => {
                        if let Err(e) = self.fire(&id).await {
                            error!(identifier = %id, error = %e, "delayed delivery failed");
                        }
                    }
                    None => break,
                }
            }
        }
    }

    async fn recovery_loop(self: Arc<Self>, token: CancellationToken) {
        if let Err(e) = self.recover().await {
            error!(error = %e, "startup recovery scan failed");
        }

        let Some(interval) = self.config.scan_interval else {
            return;
        };
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.recover().await {
                        error!(error = %e, "recovery scan failed");
                    }
                }
            }
        }
    }

    /// 消费一条过期通知；条目缺失（已投递或从未存在）即空操作
    async fn fire(&self, id: &str) -> UnimqResult<()> {
        let Some(entry) = self.store.take_entry(id).await? else {
            debug!(identifier = %id, "expiration without pending entry, ignoring");
            return Ok(());
        };
        self.deliver(entry).await
    }

    /// 扫描全部条目，补偿定时键已消失的漏发到期；返回处置条数
    pub async fn recover(&self) -> UnimqResult<usize> {
        let mut handled = 0;
        for id in self.store.scan_entry_ids().await? {
            if self.store.timer_exists(&id).await? {
                continue;
            }
            // 触发路径可能同时取走该条目；取不到即让渡
            let Some(entry) = self.store.take_entry(&id).await? else {
                continue;
            };
            handled += 1;

            match self.config.recovery_policy {
                RecoveryPolicy::Discard => {
                    warn!(identifier = %id, "missed expiration, discarded per policy");
                }
                RecoveryPolicy::Resend => {
                    if let Some(grace) = self.config.resend_grace {
                        let overdue = Utc::now()
                            .signed_duration_since(entry.due_at())
                            .num_milliseconds()
                            .max(0) as u128;
                        if overdue > grace.as_millis() {
                            warn!(
                                identifier = %id,
                                "missed expiration beyond grace window, discarded"
                            );
                            continue;
                        }
                    }
                    warn!(identifier = %id, "missed expiration, resending immediately");
                    if let Err(e) = self.deliver(entry).await {
                        error!(identifier = %id, error = %e, "recovery resend failed");
                    }
                }
            }
        }
        Ok(handled)
    }

    async fn deliver(&self, entry: DurableDelayEntry) -> UnimqResult<()> {
        let (producer_name, transport, mut record) = entry.into_parts();
        record.clear_delay();
        self.sender
            .send_now(&producer_name, transport, record)
            .await?;
        Ok(())
    }
}

/// 引擎运行句柄：用于优雅关闭与等待任务结束
pub struct DelayEngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl DelayEngineHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for DelayEngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
