//! 分区日志型代理的传输处理器（LogBrokerHandler）
//!
//! 发送侧：按生产者名复用底层客户端，keys[0] 作为分区键，
//! 标签与附加键经头部传递。无原生定时投递能力，
//! 延迟消息由上层转交延迟投递引擎。
//! 订阅侧：按订阅参数建立拉取客户端并启动调度循环。
//!
use super::{TransportHandler, TransportKind, check_sendable, record_headers};
use super::{PollClientFactory, producers::ProducerPool};
use crate::consumer::{ListenerHandle, ListenerOptions, MessageListener, spawn_dispatch_loop};
use crate::error::UnimqResult;
use crate::pipeline::PipelineEngine;
use crate::record::{ConsumerRecord, ProducerRecord, TransportResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct LogBrokerHandler {
    producers: ProducerPool,
    consumers: PollClientFactory,
    listener_pipeline: Arc<PipelineEngine<ConsumerRecord>>,
}

impl LogBrokerHandler {
    pub fn new(
        producers: ProducerPool,
        consumers: PollClientFactory,
        listener_pipeline: Arc<PipelineEngine<ConsumerRecord>>,
    ) -> Self {
        Self {
            producers,
            consumers,
            listener_pipeline,
        }
    }
}

#[async_trait]
impl TransportHandler for LogBrokerHandler {
    fn kind(&self) -> TransportKind {
        TransportKind::LogBroker
    }

    fn native_delay(&self) -> bool {
        false
    }

    async fn send(
        &self,
        producer_name: &str,
        record: &ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>> {
        if !check_sendable(self.kind(), record) {
            return Ok(None);
        }
        if !record.is_immediate() {
            // 延迟由上层分流；到达此处时按立即投递处理
            debug!(topic = record.topic(), "residual delay ignored by log broker");
        }

        let client = self.producers.client(producer_name);
        let headers = record_headers(record);
        let ack = client
            .send(
                record.topic(),
                record.partition_key(),
                record.body(),
                &headers,
                None,
            )
            .await?;

        Ok(Some(TransportResult::new(record.topic(), ack.id)))
    }

    async fn push_listener(
        &self,
        opts: ListenerOptions,
        listener: Arc<dyn MessageListener>,
    ) -> UnimqResult<ListenerHandle> {
        let client = (self.consumers)(&opts)?;
        Ok(spawn_dispatch_loop(
            client,
            opts,
            self.listener_pipeline.clone(),
            listener,
        ))
    }
}
