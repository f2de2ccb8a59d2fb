//! 外部协作客户端协议（clients）
//!
//! 本核心不定义线缆格式，仅消费三类协作接口：
//! - `SendClient`：发送型接口，所有传输处理器变体使用；
//! - `PollClient`：拉取型接口，消费调度循环使用；
//! - `PubSubClient`：发布/订阅型接口，KV 存储传输与延迟引擎的过期监听使用。
//!
//! 附带基于 tokio 的内存实现，用于测试与本地开发。
//!
pub mod inmemory;
pub mod poll;
pub mod pubsub;
pub mod send;

pub use inmemory::{InMemoryBroker, InMemoryPollClient, InMemoryPubSub};
pub use poll::PollClient;
pub use pubsub::{PubSubClient, PubSubEvent, pattern_matches};
pub use send::{Ack, SendClient};
