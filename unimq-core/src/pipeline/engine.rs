//! 管线引擎（PipelineEngine）
//!
//! 按 `PipelineCode` 查找阶段列表并依序执行：
//! - 未注册任何阶段时直接透传（告警而非报错）；
//! - 过滤 `support` 为假的阶段，按 `order` 升序稳定执行；
//! - 每个阶段执行后检查 `need_break`，置位则提前结束；
//! - 阶段出错即失败快返，剩余阶段不再执行。
//!
use super::context::{PipelineCode, PipelineContext};
use super::stage::PipelineStage;
use crate::error::{UnimqError, UnimqResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// 管线引擎：阶段列表在构建期排序完成，运行期只读
pub struct PipelineEngine<M> {
    stages: HashMap<PipelineCode, Vec<Arc<dyn PipelineStage<M>>>>,
}

impl<M> PipelineEngine<M> {
    pub fn builder() -> PipelineEngineBuilder<M> {
        PipelineEngineBuilder {
            stages: HashMap::new(),
        }
    }

    /// 执行一次管线调用，返回（可能被修改的）上下文
    ///
    /// 调用方必须在继续之前检查 `model` 是否已被丢弃。
    pub fn process(&self, mut ctx: PipelineContext<M>) -> UnimqResult<PipelineContext<M>> {
        let Some(stages) = self.stages.get(&ctx.code()) else {
            warn!(code = ?ctx.code(), "no pipeline stages registered, passing through");
            return Ok(ctx);
        };

        for stage in stages {
            if !stage.support(&ctx) {
                continue;
            }
            // 中断标记在进入阶段前快照：置位后，紧随其后的一个生效阶段
            // 仍会执行完毕，随后停止剩余阶段
            let break_requested = ctx.need_break();
            stage.process(&mut ctx).map_err(|e| UnimqError::Pipeline {
                stage: stage.stage_name().to_string(),
                reason: e.to_string(),
            })?;
            if break_requested {
                break;
            }
        }

        Ok(ctx)
    }
}

/// 管线引擎构建器：仅在启动期使用
pub struct PipelineEngineBuilder<M> {
    stages: HashMap<PipelineCode, Vec<Arc<dyn PipelineStage<M>>>>,
}

impl<M> PipelineEngineBuilder<M> {
    /// 注册一个阶段到指定方向
    pub fn stage(mut self, code: PipelineCode, stage: Arc<dyn PipelineStage<M>>) -> Self {
        self.stages.entry(code).or_default().push(stage);
        self
    }

    /// 完成构建；各方向的阶段按 `order` 升序稳定排序
    pub fn build(mut self) -> PipelineEngine<M> {
        for stages in self.stages.values_mut() {
            stages.sort_by_key(|s| s.order());
        }
        PipelineEngine {
            stages: self.stages,
        }
    }
}
