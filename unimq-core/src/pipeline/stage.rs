//! 管线阶段（PipelineStage）
//!
//! 定义单个拦截阶段的协议：是否生效、执行顺序与处理逻辑。
//! 阶段应保持无状态；同一 `order` 的阶段按注册顺序执行。
//!
use super::context::PipelineContext;

/// 管线阶段：对消息施加校验、富化、审计或丢弃等横切行为
pub trait PipelineStage<M>: Send + Sync {
    /// 阶段名称（用于错误归因与审计）
    fn stage_name(&self) -> &str;

    /// 是否对当前上下文生效；不生效的阶段被跳过
    fn support(&self, ctx: &PipelineContext<M>) -> bool {
        let _ = ctx;
        true
    }

    /// 执行顺序，升序排列；相同顺序按注册先后稳定排序
    fn order(&self) -> i32 {
        0
    }

    /// 处理上下文；出错即中止本次调用的剩余阶段并向调用方传播
    fn process(&self, ctx: &mut PipelineContext<M>) -> anyhow::Result<()>;
}
