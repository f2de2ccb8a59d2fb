//! 消息管线（pipeline）
//!
//! 在消息离开进程（SEND）或到达用户回调（LISTENER）之前，
//! 按序执行一组可配置的策略阶段：
//! - `PipelineContext`：单次调用的上下文，阶段就地修改；
//! - `PipelineStage`：单个有序、可条件生效的拦截阶段；
//! - `PipelineEngine`：按 code 查找阶段列表并依序执行的引擎。
//!
//! 阶段列表在启动期构建完成后只读；启动后注册阶段不受支持。
//!
pub mod context;
pub mod engine;
pub mod stage;

pub use context::{PipelineCode, PipelineContext};
pub use engine::{PipelineEngine, PipelineEngineBuilder};
pub use stage::PipelineStage;
