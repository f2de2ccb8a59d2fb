//! 统一错误定义
//!
//! 聚焦传输、管线、延迟存储与配置校验等最小必要集合，
//! 便于各实现层统一转换为 `UnimqError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum UnimqError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- 传输层 ---
    #[error("transport error: {reason}")]
    Transport { reason: String },
    #[error("transport handler not found: {transport}")]
    HandlerNotFound { transport: String },

    // --- 管线 ---
    #[error("pipeline stage error: stage={stage}, reason={reason}")]
    Pipeline { stage: String, reason: String },

    // --- 延迟投递 ---
    #[error("delay store error: {reason}")]
    DelayStore { reason: String },

    // --- 配置/订阅 ---
    #[error("configuration error: {reason}")]
    Config { reason: String },
    #[error("listener error: {reason}")]
    Listener { reason: String },
}

impl UnimqError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn delay_store(reason: impl Into<String>) -> Self {
        Self::DelayStore {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn listener(reason: impl Into<String>) -> Self {
        Self::Listener {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type UnimqResult<T> = Result<T, UnimqError>;
