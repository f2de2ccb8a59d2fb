//! 推送消费型代理的传输处理器（PushBrokerHandler）
//!
//! 具备原生定时投递能力：延迟消息折算为生产者时钟上的
//! `now + delay` 交由底层客户端调度，不经延迟投递引擎。
//!
use super::{PollClientFactory, producers::ProducerPool};
use super::{TransportHandler, TransportKind, check_sendable, record_headers};
use crate::consumer::{ListenerHandle, ListenerOptions, MessageListener, spawn_dispatch_loop};
use crate::error::UnimqResult;
use crate::pipeline::PipelineEngine;
use crate::record::{ConsumerRecord, ProducerRecord, TransportResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub struct PushBrokerHandler {
    producers: ProducerPool,
    consumers: PollClientFactory,
    listener_pipeline: Arc<PipelineEngine<ConsumerRecord>>,
}

impl PushBrokerHandler {
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
impl TransportHandler for PushBrokerHandler {
    fn kind(&self) -> TransportKind {
        TransportKind::PushBroker
    }

    fn native_delay(&self) -> bool {
        true
    }

    async fn send(
        &self,
        producer_name: &str,
        record: &ProducerRecord,
    ) -> UnimqResult<Option<TransportResult>> {
        if !check_sendable(self.kind(), record) {
            return Ok(None);
        }

        // 延迟在调用时刻折算为绝对时间
        let scheduled_at = record
            .delivery_delay_ms()
            .filter(|d| *d > 0)
            .map(|d| Utc::now() + chrono::Duration::milliseconds(d as i64));

        let client = self.producers.client(producer_name);
        let headers = record_headers(record);
        let ack = client
            .send(
                record.topic(),
                record.partition_key(),
                record.body(),
                &headers,
                scheduled_at,
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
