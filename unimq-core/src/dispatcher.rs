//! 消息调度器（MessageDispatcher）
//!
//! 对业务代码的唯一门面：发送、异步发送与订阅一律经调度器，
//! 由其按传输标识路由处理器、驱动出站管线，并在传输不具备
//! 原生定时能力时把延迟消息分流给延迟投递引擎。
//!
//! 每次发送出站管线恰好执行一次：延迟消息在进入管线前分流，
//! 到期重投时再经 `PipelineSender` 走同一条管线。
//!
use crate::consumer::{ListenerHandle, ListenerOptions, MessageListener};
use crate::delay::{DelaySender, DelayedDeliveryEngine};
use crate::error::{UnimqError, UnimqResult};
use crate::pipeline::{PipelineCode, PipelineContext, PipelineEngine};
use crate::record::{ProducerRecord, TransportResult};
use crate::transport::{HandlerRegistry, TransportKind, check_sendable};
use async_trait::async_trait;
use bon::Builder;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// 消息调度器
#[derive(Clone, Builder)]
pub struct MessageDispatcher {
    registry: Arc<HandlerRegistry>,
    send_pipeline: Arc<PipelineEngine<ProducerRecord>>,
    /// 缺省为 `None`：不启用延迟分流，延迟消息仅能走原生定时传输
    delay_engine: Option<Arc<DelayedDeliveryEngine>>,
}

impl MessageDispatcher {
    /// 发送一条消息
    ///
    /// 返回 `Ok(None)` 表示消息被校验拒绝或被管线丢弃；
    /// 延迟消息分流成功时回执的 `msg_id` 为延迟条目标识。
    pub async fn send(
        &self,
        producer_name: &str,
        transport: TransportKind,
        record: ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>> {
        let handler = self
            .registry
            .route(transport)
            .ok_or_else(|| UnimqError::HandlerNotFound {
                transport: transport.to_string(),
            })?;

        if !record.is_immediate() && !handler.native_delay() {
            if !check_sendable(transport, &record) {
                return Ok(None);
            }
            let Some(engine) = &self.delay_engine else {
                return Err(UnimqError::config(format!(
                    "transport {transport} has no native delay and no delay engine is configured"
                )));
            };
            let topic = record.topic().to_string();
            let id = engine.schedule(producer_name, transport, record).await?;
            debug!(producer = producer_name, %transport, identifier = %id, "record diverted to delay engine");
            return Ok(Some(TransportResult::new(topic, id)));
        }

        pipeline_send(&self.registry, &self.send_pipeline, producer_name, transport, record).await
    }

    /// 异步发送：调用立即返回，I/O 在独立任务中执行
    pub fn send_async(
        &self,
        producer_name: &str,
        transport: TransportKind,
        record: ProducerRecord,
    ) -> JoinHandle<UnimqResult<Option<TransportResult>>> {
        let dispatcher = self.clone();
        let producer_name = producer_name.to_string();
        tokio::spawn(async move { dispatcher.send(&producer_name, transport, record).await })
    }

    /// 建立订阅：路由到目标传输的处理器，返回可关闭/等待的句柄
    pub async fn subscribe(
        &self,
        transport: TransportKind,
        opts: ListenerOptions,
        listener: Arc<dyn MessageListener>,
    ) -> UnimqResult<ListenerHandle> {
        let handler = self
            .registry
            .route(transport)
            .ok_or_else(|| UnimqError::HandlerNotFound {
                transport: transport.to_string(),
            })?;
        handler.push_listener(opts, listener).await
    }
}

/// 出站公共路径：路由处理器、执行出站管线、交付传输
///
/// 管线丢弃模型即视为消息被拦截，返回 `Ok(None)`，处理器不被触达。
pub(crate) async fn pipeline_send(
    registry: &HandlerRegistry,
    pipeline: &PipelineEngine<ProducerRecord>,
    producer_name: &str,
    transport: TransportKind,
    record: ProducerRecord,
) -> UnimqResult<Option<TransportResult>> {
    let handler = registry
        .route(transport)
        .ok_or_else(|| UnimqError::HandlerNotFound {
            transport: transport.to_string(),
        })?;

    let mut ctx = pipeline.process(PipelineContext::new(PipelineCode::Send, record))?;
    let Some(record) = ctx.take_model() else {
        debug!(producer = producer_name, %transport, "record dropped by send pipeline");
        return Ok(None);
    };

    handler.send(producer_name, &record).await
}

/// 延迟到期的重投入口：与立即发送共用同一条出站管线
pub struct PipelineSender {
    registry: Arc<HandlerRegistry>,
    send_pipeline: Arc<PipelineEngine<ProducerRecord>>,
}

impl PipelineSender {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        send_pipeline: Arc<PipelineEngine<ProducerRecord>>,
    ) -> Self {
        Self {
            registry,
            send_pipeline,
        }
    }
}

#[async_trait]
impl DelaySender for PipelineSender {
    async fn send_now(
        &self,
        producer_name: &str,
        transport: TransportKind,
        record: ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>> {
        pipeline_send(
            &self.registry,
            &self.send_pipeline,
            producer_name,
            transport,
            record,
        )
        .await
    }
}
