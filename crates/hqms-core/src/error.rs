//! 错误定义模块

use thiserror::Error;

/// 排队系统统一错误类型
#[derive(Error, Debug)]
pub enum HqmsError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态转换: 从 {from} 响应 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("语音播报错误: {0}")]
    Announcement(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 排队系统统一结果类型
pub type Result<T> = std::result::Result<T, HqmsError>;
