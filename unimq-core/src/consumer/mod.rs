//! 消费调度（consumer）
//!
//! 每条订阅一个长驻任务：持续拉取原始消息，过滤、转换为规范形态，
//! 经入站管线后交付用户回调：
//! - `MessageListener`：用户回调协议；
//! - `ListenerOptions`：订阅参数（消费组、标签过滤、并发与缓冲上限）；
//! - `spawn_dispatch_loop` / `ListenerHandle`：调度循环与其关闭句柄。
//!
pub mod dispatch;
pub mod listener;

pub use dispatch::{ListenerHandle, spawn_dispatch_loop};
pub use listener::{ListenerOptions, MessageListener};
