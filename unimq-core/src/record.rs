//! 规范消息模型（Canonical Record）
//!
//! 定义在各边界之间流转的统一消息形态：
//! - `ProducerRecord`：出站消息（主题、标签、消息体、延迟与业务键）；
//! - `ConsumerRecord`：入站消息的规范形态，传输特定字段统一折算为 `message_id`；
//! - `TransportResult`：发送成功后的回执；
//! - `RawRecord`：拉取客户端产出的传输中立原始形态，标签从头部派生。
//!
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 标签头部键：无一等标签概念的传输通过该头部派生标签
pub const TAG_HEADER: &str = "tag";
/// 消息组头部键
pub const GROUP_HEADER: &str = "group";
/// 附加业务键头部键（逗号分隔）
pub const KEYS_HEADER: &str = "keys";

/// 出站消息
///
/// `delivery_delay_ms` 为 `None` 或 0 表示立即投递；
/// `keys[0]`（如存在）约定为分区/去重键。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ProducerRecord {
    /// 目标主题
    topic: String,
    /// 可选标签（与主题正交的二级过滤维度）
    tag: Option<String>,
    /// 消息体
    body: String,
    /// 期望的最小延迟投递时间（毫秒）
    delivery_delay_ms: Option<u64>,
    /// 业务键列表（有序）
    #[builder(default)]
    keys: Vec<String>,
}

impl ProducerRecord {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn delivery_delay_ms(&self) -> Option<u64> {
        self.delivery_delay_ms
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 约定的分区/去重键（keys[0]）
    pub fn partition_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    /// 主题与消息体均非空才允许到达传输处理器
    pub fn is_sendable(&self) -> bool {
        !self.topic.is_empty() && !self.body.is_empty()
    }

    /// 是否立即投递（无延迟或延迟为 0）
    pub fn is_immediate(&self) -> bool {
        self.delivery_delay_ms.unwrap_or(0) == 0
    }

    /// 清除延迟字段（到期重投时使用）
    pub fn clear_delay(&mut self) {
        self.delivery_delay_ms = None;
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }
}

/// 入站消息的规范形态
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ConsumerRecord {
    /// 来源主题
    topic: String,
    /// 标签（可能由头部派生）
    tag: Option<String>,
    /// 消息标识；偏移量/分区等传输特定字段统一折算到该字段
    message_id: String,
    /// 消息组
    message_group: Option<String>,
    /// 业务键集合
    #[builder(default)]
    keys: BTreeSet<String>,
    /// 消息体
    body: String,
}

impl ConsumerRecord {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn message_group(&self) -> Option<&str> {
        self.message_group.as_deref()
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// 发送成功回执
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportResult {
    topic: String,
    msg_id: String,
}

impl TransportResult {
    pub fn new(topic: impl Into<String>, msg_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            msg_id: msg_id.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn msg_id(&self) -> &str {
        &self.msg_id
    }
}

/// 拉取客户端产出的传输中立原始消息
///
/// 头部携带标签/消息组/附加业务键，由各传输处理器的客户端适配产出；
/// 转换为 `ConsumerRecord` 前先做标签过滤以避免无谓的转换开销。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct RawRecord {
    /// 传输侧消息标识
    id: String,
    /// 来源主题
    topic: String,
    /// 分区/去重键
    key: Option<String>,
    /// 传输头部（标签、消息组、附加键等）
    #[builder(default)]
    headers: BTreeMap<String, String>,
    /// 消息体
    body: String,
}

impl RawRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// 标签从 `tag` 头部派生
    pub fn tag(&self) -> Option<&str> {
        self.headers.get(TAG_HEADER).map(String::as_str)
    }

    pub fn message_group(&self) -> Option<&str> {
        self.headers.get(GROUP_HEADER).map(String::as_str)
    }
}

impl From<RawRecord> for ConsumerRecord {
    fn from(raw: RawRecord) -> Self {
        let tag = raw.tag().map(str::to_string);
        let message_group = raw.message_group().map(str::to_string);

        let mut keys = BTreeSet::new();
        if let Some(key) = raw.key() {
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        }
        if let Some(extra) = raw.headers.get(KEYS_HEADER) {
            keys.extend(
                extra
                    .split(',')
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );
        }

        ConsumerRecord::builder()
            .topic(raw.topic)
            .maybe_tag(tag)
            .message_id(raw.id)
            .maybe_message_group(message_group)
            .keys(keys)
            .body(raw.body)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, topic: &str, tag: Option<&str>, key: Option<&str>, body: &str) -> RawRecord {
        let mut headers = BTreeMap::new();
        if let Some(t) = tag {
            headers.insert(TAG_HEADER.to_string(), t.to_string());
        }
        RawRecord::builder()
            .id(id.to_string())
            .topic(topic.to_string())
            .maybe_key(key.map(str::to_string))
            .headers(headers)
            .body(body.to_string())
            .build()
    }

    #[test]
    fn producer_record_validity() {
        let ok = ProducerRecord::builder()
            .topic("t".to_string())
            .body("hello".to_string())
            .build();
        assert!(ok.is_sendable());
        assert!(ok.is_immediate());

        let empty_topic = ProducerRecord::builder()
            .topic(String::new())
            .body("hello".to_string())
            .build();
        assert!(!empty_topic.is_sendable());

        let empty_body = ProducerRecord::builder()
            .topic("t".to_string())
            .body(String::new())
            .build();
        assert!(!empty_body.is_sendable());
    }

    #[test]
    fn partition_key_is_first_key() {
        let record = ProducerRecord::builder()
            .topic("t".to_string())
            .body("b".to_string())
            .keys(vec!["k1".to_string(), "k2".to_string()])
            .build();
        assert_eq!(record.partition_key(), Some("k1"));
    }

    #[test]
    fn zero_delay_is_immediate() {
        let record = ProducerRecord::builder()
            .topic("t".to_string())
            .body("b".to_string())
            .delivery_delay_ms(0)
            .build();
        assert!(record.is_immediate());

        let mut delayed = ProducerRecord::builder()
            .topic("t".to_string())
            .body("b".to_string())
            .delivery_delay_ms(500)
            .build();
        assert!(!delayed.is_immediate());
        delayed.clear_delay();
        assert!(delayed.is_immediate());
    }

    #[test]
    fn raw_to_consumer_conversion() {
        let mut record = raw("m-1", "t", Some("g"), Some("k1"), "hello");
        record
            .headers
            .insert(KEYS_HEADER.to_string(), "k2,k3".to_string());
        record
            .headers
            .insert(GROUP_HEADER.to_string(), "grp".to_string());

        let consumer = ConsumerRecord::from(record);
        assert_eq!(consumer.topic(), "t");
        assert_eq!(consumer.tag(), Some("g"));
        assert_eq!(consumer.message_id(), "m-1");
        assert_eq!(consumer.message_group(), Some("grp"));
        assert_eq!(consumer.body(), "hello");
        assert!(consumer.keys().contains("k1"));
        assert!(consumer.keys().contains("k2"));
        assert!(consumer.keys().contains("k3"));
    }

    #[test]
    fn conversion_without_tag_or_keys() {
        let record = raw("m-2", "t", None, None, "x");
        let consumer = ConsumerRecord::from(record);
        assert_eq!(consumer.tag(), None);
        assert!(consumer.keys().is_empty());
    }
}
