//! 生产者客户端缓存（ProducerPool）
//!
//! 每个逻辑生产者名对应一个底层客户端，按名懒创建并缓存。
//! 创建经由分片写锁去重：并发首次使用同一名称时，
//! 工厂只会被调用一次。
//!
use crate::clients::SendClient;
use dashmap::DashMap;
use std::sync::Arc;

/// 生产者客户端工厂：按名构建底层发送客户端
pub type SendClientFactory = Arc<dyn Fn(&str) -> Arc<dyn SendClient> + Send + Sync>;

/// 生产者客户端缓存
pub struct ProducerPool {
    factory: SendClientFactory,
    clients: DashMap<String, Arc<dyn SendClient>>,
}

impl ProducerPool {
    pub fn new(factory: SendClientFactory) -> Self {
        Self {
            factory,
            clients: DashMap::new(),
        }
    }

    /// 取得指定生产者名的客户端，必要时创建
    pub fn client(&self, name: &str) -> Arc<dyn SendClient> {
        self.clients
            .entry(name.to_string())
            .or_insert_with(|| (self.factory)(name))
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Ack;
    use crate::error::UnimqResult;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullClient;

    #[async_trait]
    impl SendClient for NullClient {
        async fn send(
            &self,
            _topic: &str,
            _key: Option<&str>,
            _value: &str,
            _headers: &BTreeMap<String, String>,
            _scheduled_at: Option<DateTime<Utc>>,
        ) -> UnimqResult<Ack> {
            Ok(Ack { id: "x".into() })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_first_use_creates_one_client() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let pool = Arc::new(ProducerPool::new(Arc::new(move |_name| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(NullClient) as Arc<dyn SendClient>
        })));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                let _ = pool.client("producer-a");
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_names_get_distinct_clients() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let pool = ProducerPool::new(Arc::new(move |_name| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(NullClient) as Arc<dyn SendClient>
        }));

        let _ = pool.client("a");
        let _ = pool.client("b");
        let _ = pool.client("a");
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }
}
