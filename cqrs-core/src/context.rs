use crate::provider::Scope;

pub use tokio_util::sync::CancellationToken;

/// 调度上下文（DispatchContext）
///
/// 承载一次调度（命令/查询）所需的横切信息：
/// - 协作式取消信号（[`CancellationToken`]）：原样穿透每个装饰器直至终端处理器，
///   装饰器在调用内层前观察到取消应避免开始工作；
/// - 请求作用域（[`Scope`]）：由宿主按“一次逻辑请求”划定边界，
///   Scoped 生命周期的绑定在同一作用域内复用同一实例。
///
/// 典型用法：
/// ```rust
/// use cqrs_core::context::{CancellationToken, DispatchContext};
/// use cqrs_core::provider::Scope;
///
/// let token = CancellationToken::new();
/// let ctx = DispatchContext::new()
///     .with_cancellation(token.clone())
///     .with_scope(Scope::new());
/// ```
#[derive(Clone, Debug)]
pub struct DispatchContext {
    cancellation: CancellationToken,
    scope: Option<Scope>,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            scope: None,
        }
    }
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 附加取消信号（由调用方持有并触发）
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// 附加请求作用域（Scoped 生命周期的共享边界）
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }
}
