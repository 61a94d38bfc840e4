/// 命令（Command）
///
/// 表达“意图”的写操作请求，通常会改变系统状态。
/// - 不返回业务数据，仅表达执行结果（成功/失败）；
/// - 与 [`Query`](crate::message::Query) 相对，`Command` 应避免读写混用；
/// - 建议保持语义化的“动宾结构”命名，如 `CreateOrder`、`CloseAccount`。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志、追踪与错误定位。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;
}

/// 查询（Query）
///
/// 表达只读意图，不改变系统状态。
/// - 结果类型由 [`Query::Output`] 静态关联，由调度方原样返回；
/// - 与 [`Command`](crate::message::Command) 相对，`Query` 应避免副作用。
pub trait Query: Send + Sync + 'static {
    /// 查询的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 查询返回的结果类型
    type Output: Send + 'static;
}
