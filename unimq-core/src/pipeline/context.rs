//! 管线上下文（PipelineContext）
//!
//! 单次管线调用的可变载体：携带方向 code、消息模型与中断/应答标记。
//! `model` 置空表示丢弃该消息；`need_break` 仅中断本次调用的剩余阶段，
//! 不影响其他并发调用。
//!
/// 管线方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineCode {
    /// 出站：消息发送前
    Send,
    /// 入站：用户回调前
    Listener,
}

/// 管线调用上下文
#[derive(Debug)]
pub struct PipelineContext<M> {
    code: PipelineCode,
    model: Option<M>,
    need_break: bool,
    response: Option<String>,
}

impl<M> PipelineContext<M> {
    pub fn new(code: PipelineCode, model: M) -> Self {
        Self {
            code,
            model: Some(model),
            need_break: false,
            response: None,
        }
    }

    pub fn code(&self) -> PipelineCode {
        self.code
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut M> {
        self.model.as_mut()
    }

    /// 取出模型；`None` 表示消息已被某个阶段丢弃
    pub fn take_model(&mut self) -> Option<M> {
        self.model.take()
    }

    /// 丢弃消息：后续调用方必须检查 `model` 是否为空
    pub fn drop_model(&mut self) {
        self.model = None;
    }

    pub fn need_break(&self) -> bool {
        self.need_break
    }

    /// 置位后当前阶段执行完即停止剩余阶段
    pub fn set_need_break(&mut self, need_break: bool) {
        self.need_break = need_break;
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn set_response(&mut self, response: impl Into<String>) {
        self.response = Some(response.into());
    }
}
