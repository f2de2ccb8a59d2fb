//! 处理器路由表（HandlerRegistry）
//!
//! 传输标识到处理器实例的映射：启动期逐个注册，之后只读。
//! 未注册的标识返回 `None`（调用方视为配置错误），不会崩溃。
//! 不提供更新与移除；传输集合在进程生命周期内固定。
//!
use super::{TransportHandler, TransportKind};
use dashmap::DashMap;
use std::sync::Arc;

/// 传输处理器路由表
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<TransportKind, Arc<dyn TransportHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器；仅应在启动期调用，不与 `route` 并发
    pub fn put(&self, kind: TransportKind, handler: Arc<dyn TransportHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// 解析传输标识；未注册返回 `None`
    pub fn route(&self, kind: TransportKind) -> Option<Arc<dyn TransportHandler>> {
        self.handlers.get(&kind).map(|h| h.value().clone())
    }
}
