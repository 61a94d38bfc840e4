//! 事务装饰器
//!
//! 在调用内层处理器前打开事务作用域，仅当内层返回成功且未观察到取消时
//! 才标记完成；错误与取消路径均不标记，未完成即释放由外围事务设施视作
//! 回滚。作用域作为显式值随调用传递（而非线程局部环境态），跨挂起点
//! 保持关联。
//!
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cqrs_core::{BusError, BusResult, Command, CommandHandler, CqrsRegistry, DispatchContext};

/// 隔离级别
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// 嵌套策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScopePolicy {
    /// 存在环境事务则加入，否则新建
    #[default]
    JoinOrCreate,
    /// 始终新建独立事务
    RequiresNew,
    /// 作用域内抑制事务
    Suppress,
}

/// 事务选项；默认：读已提交、一分钟超时、加入或新建
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: IsolationLevel,
    pub timeout: Duration,
    pub policy: ScopePolicy,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            isolation: IsolationLevel::ReadCommitted,
            timeout: Duration::from_secs(60),
            policy: ScopePolicy::JoinOrCreate,
        }
    }
}

/// 事务管理器契约（外部协作者）
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// 按选项打开一个事务作用域
    async fn begin(&self, options: TransactionOptions) -> BusResult<Box<dyn TransactionScope>>;
}

/// 事务作用域：未调用 [`complete`](TransactionScope::complete) 即释放视作回滚
#[async_trait]
pub trait TransactionScope: Send + Sync {
    /// 标记事务完成（提交）
    async fn complete(self: Box<Self>) -> BusResult<()>;
}

/// 命令事务装饰器
pub struct TransactionCommandDecorator<C: Command> {
    inner: Arc<dyn CommandHandler<C>>,
    manager: Arc<dyn TransactionManager>,
    options: TransactionOptions,
}

impl<C: Command> TransactionCommandDecorator<C> {
    pub fn new(inner: Arc<dyn CommandHandler<C>>, manager: Arc<dyn TransactionManager>) -> Self {
        Self::with_options(inner, manager, TransactionOptions::default())
    }

    pub fn with_options(
        inner: Arc<dyn CommandHandler<C>>,
        manager: Arc<dyn TransactionManager>,
        options: TransactionOptions,
    ) -> Self {
        Self {
            inner,
            manager,
            options,
        }
    }
}

#[async_trait]
impl<C: Command> CommandHandler<C> for TransactionCommandDecorator<C> {
    async fn handle(&self, ctx: &DispatchContext, cmd: C) -> BusResult<()> {
        // 取消已发生：不开始任何工作
        if ctx.cancellation().is_cancelled() {
            return Err(BusError::Cancelled(C::NAME));
        }

        let scope = self.manager.begin(self.options).await?;
        // 内层失败：作用域未完成即释放（回滚）
        self.inner.handle(ctx, cmd).await?;

        // 执行期间观察到取消：不提交
        if ctx.cancellation().is_cancelled() {
            return Err(BusError::Cancelled(C::NAME));
        }
        scope.complete().await
    }
}

/// 为命令能力装配事务装饰器（默认选项）
pub fn decorate_command_with_transactions<C: Command>(
    registry: &CqrsRegistry,
    manager: Arc<dyn TransactionManager>,
) -> BusResult<()> {
    registry.decorate_command_with::<C, _, _>(move |inner| {
        TransactionCommandDecorator::new(inner, manager.clone())
    })
}
