use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use unimq_core::clients::{InMemoryBroker, PollClient, SendClient};
use unimq_core::config::{ConsumerBinding, ProducerBinding};
use unimq_core::consumer::{ListenerOptions, MessageListener};
use unimq_core::delay::{DelayConfig, DelayedDeliveryEngine, InMemoryDelayStore};
use unimq_core::dispatcher::{MessageDispatcher, PipelineSender};
use unimq_core::pipeline::{PipelineCode, PipelineContext, PipelineEngine, PipelineStage};
use unimq_core::record::{ConsumerRecord, ProducerRecord};
use unimq_core::transport::{
    HandlerRegistry, LogBrokerHandler, PollClientFactory, ProducerPool, SendClientFactory,
    TransportKind,
};

/// 出站阶段：缺省标签补齐
struct DefaultTagStage;

impl PipelineStage<ProducerRecord> for DefaultTagStage {
    fn stage_name(&self) -> &str {
        "default-tag"
    }

    fn process(&self, ctx: &mut PipelineContext<ProducerRecord>) -> anyhow::Result<()> {
        if let Some(record) = ctx.model_mut() {
            if record.tag().is_none() {
                record.set_tag("demo");
            }
        }
        Ok(())
    }
}

struct PrintListener;

#[async_trait]
impl MessageListener for PrintListener {
    fn listener_name(&self) -> &str {
        "print"
    }

    async fn on_message(&self, record: ConsumerRecord) -> anyhow::Result<()> {
        info!(
            topic = record.topic(),
            tag = record.tag().unwrap_or("-"),
            id = record.message_id(),
            body = record.body(),
            "received"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,unimq_core=debug".into()),
        )
        .init();

    let broker = Arc::new(InMemoryBroker::new());
    let send_factory: SendClientFactory = {
        let broker = broker.clone();
        Arc::new(move |_| broker.clone() as Arc<dyn SendClient>)
    };
    let poll_factory: PollClientFactory = {
        let broker = broker.clone();
        Arc::new(move |opts: &ListenerOptions| {
            Ok(Arc::new(broker.subscribe(opts.topic(), opts.cache_limit())) as Arc<dyn PollClient>)
        })
    };

    let send_pipeline: Arc<PipelineEngine<ProducerRecord>> = Arc::new(
        PipelineEngine::builder()
            .stage(PipelineCode::Send, Arc::new(DefaultTagStage))
            .build(),
    );
    let listener_pipeline: Arc<PipelineEngine<ConsumerRecord>> =
        Arc::new(PipelineEngine::builder().build());

    let registry = Arc::new(HandlerRegistry::new());
    registry.put(
        TransportKind::LogBroker,
        Arc::new(LogBrokerHandler::new(
            ProducerPool::new(send_factory),
            poll_factory,
            listener_pipeline,
        )),
    );

    // 延迟引擎：到期重投与崩溃恢复
    let store = Arc::new(InMemoryDelayStore::default());
    let delay_engine = Arc::new(
        DelayedDeliveryEngine::builder()
            .store(store)
            .sender(Arc::new(PipelineSender::new(
                registry.clone(),
                send_pipeline.clone(),
            )))
            .config(DelayConfig::default())
            .build(),
    );
    let engine_handle = delay_engine.clone().start();

    let dispatcher = MessageDispatcher::builder()
        .registry(registry)
        .send_pipeline(send_pipeline)
        .delay_engine(delay_engine)
        .build();

    // 路由绑定在注册期解析一次，发送与订阅时复用
    let producer = ProducerBinding::builder()
        .name("demo-producer".to_string())
        .transport(TransportKind::LogBroker)
        .topic("orders".to_string())
        .build();
    let consumer = ConsumerBinding::builder()
        .consumer_group("demo-group".to_string())
        .transport(TransportKind::LogBroker)
        .topic("orders".to_string())
        .build();

    let handle = dispatcher
        .subscribe(
            consumer.transport(),
            consumer.listener_options(),
            Arc::new(PrintListener),
        )
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 立即发送
    let receipt = dispatcher
        .send(
            producer.name(),
            producer.transport(),
            producer.record("order created"),
        )
        .await?;
    info!(?receipt, "immediate send");

    // 延迟发送：1 秒后经同一条管线重投
    let receipt = dispatcher
        .send(
            producer.name(),
            producer.transport(),
            producer.delayed_record("order reminder", 1_000),
        )
        .await?;
    info!(?receipt, "delayed send");

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    handle.shutdown();
    handle.join().await;
    engine_handle.shutdown();
    engine_handle.join().await;
    Ok(())
}
