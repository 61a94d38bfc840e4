//! 调度框架统一错误定义
//!
//! 覆盖配置期（注册/装饰）、解析期（派发寻址）与执行期（处理器失败）的
//! 最小必要集合。配置类错误代表装配缺陷，应在启动阶段尽早失败，不参与重试；
//! 处理器自身的失败经 [`BusError::Handler`] 原样上抛，调用方可 downcast 还原。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    // --- 解析期 ---
    #[error("handler not found: {0}")]
    HandlerNotFound(&'static str),

    // --- 配置期 ---
    #[error("handler already registered: command={command}")]
    AlreadyRegisteredCommand { command: &'static str },
    #[error("handler already registered: query={query}")]
    AlreadyRegisteredQuery { query: &'static str },
    #[error("invalid decorator: target={target}, reason={reason}")]
    InvalidDecorator {
        target: &'static str,
        reason: String,
    },
    #[error("unresolved shape arguments: implementation={implementation}, shape={shape}")]
    UnresolvedShapeArguments {
        implementation: &'static str,
        shape: &'static str,
    },
    #[error("configuration: {reason}")]
    Configuration { reason: String },

    // --- 防御性检查 ---
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 执行期 ---
    #[error("cancelled: {0}")]
    Cancelled(&'static str),
    #[error("transaction: {reason}")]
    Transaction { reason: String },
    #[error("handler: {0}")]
    Handler(#[from] anyhow::Error),
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;
