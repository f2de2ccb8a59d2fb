//! unimq-core 统一消息调度层
//!
//! 在异构消息中间件之上提供统一的收发门面：
//! - `record`：规范消息模型（出站/入站/回执/原始形态）；
//! - `transport`：传输处理器契约、路由表与三类后端实现；
//! - `pipeline`：发送前/回调前的有序可中断拦截管线；
//! - `delay`：基于键值 TTL 与过期通知的延迟投递引擎；
//! - `consumer`：订阅调度循环与用户回调协议；
//! - `dispatcher`：对业务代码的唯一入口。
//!
//! 底层中间件客户端以协议（`clients`）形式注入，核心层不依赖
//! 任何具体厂商 SDK；内存实现用于测试与本地开发。
//!
pub mod clients;
pub mod config;
pub mod consumer;
pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod transport;

pub use dispatcher::{MessageDispatcher, PipelineSender};
pub use error::{UnimqError, UnimqResult};
