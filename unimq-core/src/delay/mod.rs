//! 延迟投递引擎（delay）
//!
//! 为无原生定时能力的传输模拟定时投递，以键值存储的 TTL 与
//! 键过期通知作为定时器：
//! - `DurableDelayEntry`：待投递消息的持久化形态；
//! - `DelayStore`：持久键、一次性定时键与过期通知的存储协议；
//! - `DelayedDeliveryEngine`：写入、到期触发与崩溃恢复的编排；
//! - `InMemoryDelayStore`：基于 tokio 定时器的内存实现。
//!
//! 过期通知只发一次，订阅缺席期间的到期仅能靠恢复扫描补偿；
//! 触发与恢复对同一条目的竞争由存储的原子取出收敛为至多一次投递。
//!
pub mod engine;
pub mod entry;
pub mod store;
pub mod store_inmemory;

pub use engine::{
    DelayConfig, DelayEngineHandle, DelaySender, DelayedDeliveryEngine, RecoveryPolicy,
};
pub use entry::DurableDelayEntry;
pub use store::DelayStore;
pub use store_inmemory::InMemoryDelayStore;
