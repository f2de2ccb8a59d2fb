//! 监听协议与订阅参数
//!
use crate::record::ConsumerRecord;
use async_trait::async_trait;
use bon::Builder;
use std::time::Duration;

/// 消息监听器：消费一条规范入站消息
///
/// 回调出错由调度循环捕获并记录，不会中断订阅，
/// 也不影响其他消息或其他订阅。
#[async_trait]
pub trait MessageListener: Send + Sync {
    /// 监听器名称（用于失败记录与审计）
    fn listener_name(&self) -> &str;

    async fn on_message(&self, record: ConsumerRecord) -> anyhow::Result<()>;
}

/// 订阅参数
#[derive(Debug, Clone, Builder)]
pub struct ListenerOptions {
    /// 消费组名
    consumer_group: String,
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
    /// 单次拉取的最长等待
    #[builder(default = Duration::from_secs(1))]
    poll_timeout: Duration,
}

impl ListenerOptions {
    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag_filter(&self) -> &str {
        &self.tag_filter
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn cache_limit(&self) -> usize {
        self.cache_limit
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// 标签是否通过过滤
    pub fn matches_tag(&self, tag: Option<&str>) -> bool {
        match self.tag_filter.as_str() {
            "" | "*" => true,
            filter => tag == Some(filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(filter: &str) -> ListenerOptions {
        ListenerOptions::builder()
            .consumer_group("g".to_string())
            .topic("t".to_string())
            .tag_filter(filter.to_string())
            .build()
    }

    #[test]
    fn wildcard_and_empty_match_everything() {
        for filter in ["*", ""] {
            let o = opts(filter);
            assert!(o.matches_tag(Some("a")));
            assert!(o.matches_tag(None));
        }
    }

    #[test]
    fn explicit_filter_requires_exact_equality() {
        let o = opts("X");
        assert!(o.matches_tag(Some("X")));
        assert!(!o.matches_tag(Some("Y")));
        assert!(!o.matches_tag(None));
    }
}
