//! 配置与路由绑定
//!
//! 路由元数据（主题/标签/生产者名/消费组）不再在调用时解析，
//! 而是由调用方在注册期以构建器显式提供、一次解析：
//! - `ProducerBinding`：某一消息类型的出站路由绑定；
//! - `ConsumerBinding`：某一订阅的入站路由绑定；
//! - `TransportConfig`：传输连接参数（地址、凭证、超时等），
//!   仅被外部的连接构建逻辑消费，本核心不负责建连。
//!
use crate::consumer::ListenerOptions;
use crate::record::ProducerRecord;
use crate::transport::TransportKind;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 出站路由绑定：按消息类型注册一次，发送时复用
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ProducerBinding {
    /// 逻辑生产者名（客户端按名懒创建并缓存）
    name: String,
    /// 目标传输
    transport: TransportKind,
    /// 目标主题
    topic: String,
    /// 默认标签
    tag: Option<String>,
}

impl ProducerBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// 以绑定的主题/标签构造一条出站消息
    pub fn record(&self, body: impl Into<String>) -> ProducerRecord {
        ProducerRecord::builder()
            .topic(self.topic.clone())
            .maybe_tag(self.tag.clone())
            .body(body.into())
            .build()
    }

    /// 构造一条延迟投递的出站消息
    pub fn delayed_record(&self, body: impl Into<String>, delay_ms: u64) -> ProducerRecord {
        ProducerRecord::builder()
            .topic(self.topic.clone())
            .maybe_tag(self.tag.clone())
            .body(body.into())
            .delivery_delay_ms(delay_ms)
            .build()
    }
}

/// 入站路由绑定：一条订阅对应一个调度循环
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ConsumerBinding {
    /// 消费组名
    consumer_group: String,
    /// 来源传输
    transport: TransportKind,
    /// 订阅主题
    topic: String,
    /// 标签过滤：空串或 "*" 匹配全部，否则精确相等
    #[builder(default = String::from("*"))]
    tag_filter: String,
    /// 回调并发上限
    #[builder(default = 4)]
    thread_count: usize,
    /// 在途缓冲上限（背压）
    #[builder(default = 256)]
    cache_limit: usize,
}

impl ConsumerBinding {
    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag_filter(&self) -> &str {
        &self.tag_filter
    }

    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions::builder()
            .consumer_group(self.consumer_group.clone())
            .topic(self.topic.clone())
            .tag_filter(self.tag_filter.clone())
            .thread_count(self.thread_count)
            .cache_limit(self.cache_limit)
            .build()
    }
}

/// 传输连接参数（由外部建连逻辑消费）
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct TransportConfig {
    kind: TransportKind,
    /// 接入地址
    endpoint: String,
    access_key: Option<String>,
    secret_key: Option<String>,
    /// 网络往返超时（毫秒）
    #[builder(default = 3000)]
    timeout_ms: u64,
    /// 传输客户端自身的重试次数；本核心不做重试
    #[builder(default = 2)]
    retry_times: u32,
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn retry_times(&self) -> u32 {
        self.retry_times
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_binding_builds_records() {
        let binding = ProducerBinding::builder()
            .name("order-producer".to_string())
            .transport(TransportKind::LogBroker)
            .topic("orders".to_string())
            .tag("created".to_string())
            .build();

        let record = binding.record("payload");
        assert_eq!(record.topic(), "orders");
        assert_eq!(record.tag(), Some("created"));
        assert!(record.is_immediate());

        let delayed = binding.delayed_record("payload", 500);
        assert_eq!(delayed.delivery_delay_ms(), Some(500));
    }

    #[test]
    fn consumer_binding_defaults() {
        let binding = ConsumerBinding::builder()
            .consumer_group("g".to_string())
            .transport(TransportKind::KvStore)
            .topic("orders".to_string())
            .build();
        assert_eq!(binding.tag_filter(), "*");

        let opts = binding.listener_options();
        assert_eq!(opts.consumer_group(), "g");
        assert_eq!(opts.thread_count(), 4);
        assert_eq!(opts.cache_limit(), 256);
    }
}
