//! 消费调度循环
//!
//! 状态机：订阅 → 拉取 → （过滤 → 转换 → 管线 → 回调）→ 拉取 → …，
//! 收到停止信号或传输级错误后进入终态并释放连接：
//! - 标签过滤在转换前进行，未通过者不进管线也不进回调；
//! - 单条消息的管线/回调失败记录后继续，不终止循环；
//! - 拉取失败视为致命，终止循环并关闭客户端。
//!
use crate::clients::PollClient;
use crate::consumer::listener::{ListenerOptions, MessageListener};
use crate::pipeline::{PipelineCode, PipelineContext, PipelineEngine};
use crate::record::{ConsumerRecord, RawRecord};
use futures_util::{StreamExt, stream};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// 订阅句柄：用于优雅关闭与等待循环结束
pub struct ListenerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ListenerHandle {
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

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 为一条订阅启动调度循环
pub fn spawn_dispatch_loop(
    client: Arc<dyn PollClient>,
    opts: ListenerOptions,
    pipeline: Arc<PipelineEngine<ConsumerRecord>>,
    listener: Arc<dyn MessageListener>,
) -> ListenerHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(dispatch_loop(
        client,
        opts,
        pipeline,
        listener,
        token.clone(),
    ));
    ListenerHandle {
        token,
        tasks: vec![task],
    }
}

async fn dispatch_loop(
    client: Arc<dyn PollClient>,
    opts: ListenerOptions,
    pipeline: Arc<PipelineEngine<ConsumerRecord>>,
    listener: Arc<dyn MessageListener>,
    token: CancellationToken,
) {
    debug!(
        group = opts.consumer_group(),
        topic = opts.topic(),
        "subscription established"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            polled = client.poll(opts.poll_timeout()) => match polled {
                Ok(batch) => {
                    if batch.is_empty() {
                        continue;
                    }
                    let matched: Vec<RawRecord> = batch
                        .into_iter()
                        .filter(|raw| opts.matches_tag(raw.tag()))
                        .collect();

                    stream::iter(matched)
                        .for_each_concurrent(Some(opts.thread_count()), |raw| {
                            let pipeline = pipeline.clone();
                            let listener = listener.clone();
                            async move {
                                handle_record(raw, &pipeline, listener.as_ref()).await;
                            }
                        })
                        .await;
                }
                Err(e) => {
                    error!(
                        group = opts.consumer_group(),
                        topic = opts.topic(),
                        error = %e,
                        "poll failed, closing subscription"
                    );
                    break;
                }
            }
        }
    }

    client.close().await;
    debug!(
        group = opts.consumer_group(),
        topic = opts.topic(),
        "subscription closed"
    );
}

async fn handle_record(
    raw: RawRecord,
    pipeline: &PipelineEngine<ConsumerRecord>,
    listener: &dyn MessageListener,
) {
    let record = ConsumerRecord::from(raw);
    let ctx = PipelineContext::new(PipelineCode::Listener, record);
    let mut ctx = match pipeline.process(ctx) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(error = %e, "listener pipeline failed, record skipped");
            return;
        }
    };
    // 模型被管线丢弃时不进入回调
    let Some(record) = ctx.take_model() else {
        return;
    };

    if let Err(e) = listener.on_message(record).await {
        warn!(
            listener = listener.listener_name(),
            error = %e,
            "listener callback failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{UnimqError, UnimqResult};
    use crate::record::TAG_HEADER;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn raw(id: &str, tag: Option<&str>, body: &str) -> RawRecord {
        let mut headers = BTreeMap::new();
        if let Some(t) = tag {
            headers.insert(TAG_HEADER.to_string(), t.to_string());
        }
        RawRecord::builder()
            .id(id.to_string())
            .topic("t".to_string())
            .headers(headers)
            .body(body.to_string())
            .build()
    }

    /// 预置批次出队后阻塞的拉取客户端
    struct ScriptedPollClient {
        batches: Mutex<Vec<UnimqResult<Vec<RawRecord>>>>,
        closed: AtomicBool,
    }

    impl ScriptedPollClient {
        fn new(batches: Vec<UnimqResult<Vec<RawRecord>>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                closed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PollClient for ScriptedPollClient {
        async fn poll(&self, timeout: Duration) -> UnimqResult<Vec<RawRecord>> {
            let next = self.batches.lock().await.pop();
            match next {
                Some(batch) => batch,
                None => {
                    tokio::time::sleep(timeout).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct CountingListener {
        seen: StdMutex<Vec<String>>,
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    impl CountingListener {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                seen: StdMutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl MessageListener for CountingListener {
        fn listener_name(&self) -> &str {
            "counting"
        }

        async fn on_message(&self, record: ConsumerRecord) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(bad) = self.fail_on {
                if record.body() == bad {
                    anyhow::bail!("fail requested");
                }
            }
            self.seen.lock().unwrap().push(record.body().to_string());
            Ok(())
        }
    }

    fn empty_pipeline() -> Arc<PipelineEngine<ConsumerRecord>> {
        Arc::new(PipelineEngine::builder().build())
    }

    fn opts(filter: &str) -> ListenerOptions {
        ListenerOptions::builder()
            .consumer_group("g".to_string())
            .topic("t".to_string())
            .tag_filter(filter.to_string())
            .poll_timeout(Duration::from_millis(20))
            .build()
    }

    async fn wait_until(check: impl Fn() -> bool) {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if check() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tag_filter_drops_non_matching_records() {
        // 批次逆序出队
        let client = Arc::new(ScriptedPollClient::new(vec![Ok(vec![
            raw("1", Some("X"), "x1"),
            raw("2", Some("Y"), "y1"),
            raw("3", None, "untagged"),
            raw("4", Some("X"), "x2"),
        ])]));
        let listener = Arc::new(CountingListener::new(None));

        let handle = spawn_dispatch_loop(
            client.clone(),
            opts("X"),
            empty_pipeline(),
            listener.clone(),
        );

        let l = listener.clone();
        wait_until(move || l.calls.load(Ordering::SeqCst) >= 2).await;
        handle.shutdown();
        handle.join().await;

        // 仅 tag=X 的消息触达回调
        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
        let mut seen = listener.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["x1".to_string(), "x2".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wildcard_filter_receives_all_tags() {
        let client = Arc::new(ScriptedPollClient::new(vec![Ok(vec![
            raw("1", Some("X"), "x"),
            raw("2", Some("Y"), "y"),
            raw("3", None, "n"),
        ])]));
        let listener = Arc::new(CountingListener::new(None));

        let handle = spawn_dispatch_loop(
            client.clone(),
            opts("*"),
            empty_pipeline(),
            listener.clone(),
        );

        let l = listener.clone();
        wait_until(move || l.calls.load(Ordering::SeqCst) >= 3).await;
        handle.shutdown();
        handle.join().await;

        assert_eq!(listener.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn callback_failure_does_not_stop_the_loop() {
        // 两个批次：第一批含失败消息，第二批仍应被消费
        let client = Arc::new(ScriptedPollClient::new(vec![
            Ok(vec![raw("2", None, "after")]),
            Ok(vec![raw("1", None, "boom")]),
        ]));
        let listener = Arc::new(CountingListener::new(Some("boom")));

        let handle = spawn_dispatch_loop(
            client.clone(),
            opts("*"),
            empty_pipeline(),
            listener.clone(),
        );

        let l = listener.clone();
        wait_until(move || l.calls.load(Ordering::SeqCst) >= 2).await;
        handle.shutdown();
        handle.join().await;

        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*listener.seen.lock().unwrap(), vec!["after".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn poll_error_terminates_and_releases_connection() {
        let client = Arc::new(ScriptedPollClient::new(vec![Err(UnimqError::transport(
            "connection lost",
        ))]));
        let listener = Arc::new(CountingListener::new(None));

        let handle =
            spawn_dispatch_loop(client.clone(), opts("*"), empty_pipeline(), listener.clone());

        let c = client.clone();
        wait_until(move || c.closed.load(Ordering::SeqCst)).await;
        handle.join().await;

        assert!(client.closed.load(Ordering::SeqCst));
        assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_closes_the_subscription() {
        let client = Arc::new(ScriptedPollClient::new(Vec::new()));
        let listener = Arc::new(CountingListener::new(None));

        let handle =
            spawn_dispatch_loop(client.clone(), opts("*"), empty_pipeline(), listener.clone());
        handle.shutdown();
        handle.join().await;

        assert!(client.closed.load(Ordering::SeqCst));
    }
}
