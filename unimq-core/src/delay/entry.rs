//! 延迟条目（DurableDelayEntry）
//!
//! 一条待投递延迟消息的持久化形态：仅在延迟未到期间存在，
//! 由过期订阅者或恢复扫描作为投递/丢弃动作的一部分删除，
//! 正常运行下不会悬挂残留。
//!
use crate::record::ProducerRecord;
use crate::transport::TransportKind;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct DurableDelayEntry {
    /// 条目标识（持久键与定时键共用）
    identifier: String,
    /// 原发送请求的生产者名
    producer_name: String,
    /// 原发送请求的目标传输
    transport: TransportKind,
    /// 原始出站消息
    payload: ProducerRecord,
    /// 应当投递的时刻
    due_at: DateTime<Utc>,
}

impl DurableDelayEntry {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn producer_name(&self) -> &str {
        &self.producer_name
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn payload(&self) -> &ProducerRecord {
        &self.payload
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// 拆解为投递所需的路由与消息
    pub fn into_parts(self) -> (String, TransportKind, ProducerRecord) {
        (self.producer_name, self.transport, self.payload)
    }
}
