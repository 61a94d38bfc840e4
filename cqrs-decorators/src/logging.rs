//! 日志装饰器
//!
//! 进入时记录消息的稳定名称，内层成功后记录耗时，失败时记录错误与耗时
//! 并原样返回；绝不吞掉或转换内层错误。
//!
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cqrs_core::{
    BusResult, Command, CommandHandler, CqrsRegistry, DispatchContext, Query, QueryHandler,
};

/// 命令日志装饰器
pub struct LoggingCommandDecorator<C: Command> {
    inner: Arc<dyn CommandHandler<C>>,
}

impl<C: Command> LoggingCommandDecorator<C> {
    pub fn new(inner: Arc<dyn CommandHandler<C>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Command> CommandHandler<C> for LoggingCommandDecorator<C> {
    async fn handle(&self, ctx: &DispatchContext, cmd: C) -> BusResult<()> {
        tracing::info!(command = C::NAME, "start executing command");
        let started = Instant::now();

        match self.inner.handle(ctx, cmd).await {
            Ok(()) => {
                tracing::info!(
                    command = C::NAME,
                    elapsed = ?started.elapsed(),
                    "executed command"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    command = C::NAME,
                    elapsed = ?started.elapsed(),
                    error = %err,
                    "error while executing command"
                );
                Err(err)
            }
        }
    }
}

/// 查询日志装饰器
pub struct LoggingQueryDecorator<Q: Query> {
    inner: Arc<dyn QueryHandler<Q>>,
}

impl<Q: Query> LoggingQueryDecorator<Q> {
    pub fn new(inner: Arc<dyn QueryHandler<Q>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Q: Query> QueryHandler<Q> for LoggingQueryDecorator<Q> {
    async fn handle(&self, ctx: &DispatchContext, query: Q) -> BusResult<Q::Output> {
        tracing::info!(query = Q::NAME, "start reading query");
        let started = Instant::now();

        match self.inner.handle(ctx, query).await {
            Ok(output) => {
                tracing::info!(
                    query = Q::NAME,
                    elapsed = ?started.elapsed(),
                    "executed query"
                );
                Ok(output)
            }
            Err(err) => {
                tracing::error!(
                    query = Q::NAME,
                    elapsed = ?started.elapsed(),
                    error = %err,
                    "error while reading query"
                );
                Err(err)
            }
        }
    }
}

/// 为命令能力装配日志装饰器
pub fn decorate_command_with_logging<C: Command>(registry: &CqrsRegistry) -> BusResult<()> {
    registry.decorate_command_with::<C, _, _>(LoggingCommandDecorator::new)
}

/// 为查询能力装配日志装饰器
pub fn decorate_query_with_logging<Q: Query>(registry: &CqrsRegistry) -> BusResult<()> {
    registry.decorate_query_with::<Q, _, _>(LoggingQueryDecorator::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqrs_core::{BusError, Lifetime};

    #[derive(Debug, thiserror::Error)]
    #[error("insufficient stock")]
    struct InsufficientStock;

    struct CreateOrder;
    impl Command for CreateOrder {
        const NAME: &'static str = "CreateOrder";
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler<CreateOrder> for FailingHandler {
        async fn handle(&self, _ctx: &DispatchContext, _cmd: CreateOrder) -> BusResult<()> {
            Err(anyhow::Error::new(InsufficientStock).into())
        }
    }

    #[tokio::test]
    async fn failure_is_rethrown_unchanged() {
        let registry = CqrsRegistry::new();
        registry
            .register_command::<CreateOrder, _, _>(|| FailingHandler, Lifetime::Transient)
            .unwrap();
        decorate_command_with_logging::<CreateOrder>(&registry).unwrap();

        let bus = cqrs_core::InProcessCommandBus::new(std::sync::Arc::new(registry));
        let ctx = DispatchContext::default();
        let err = cqrs_core::CommandBus::send(&bus, &ctx, CreateOrder)
            .await
            .unwrap_err();

        // 原始失败类型穿过日志装饰器保持可还原
        match err {
            BusError::Handler(source) => {
                assert!(source.downcast_ref::<InsufficientStock>().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    struct Total;
    impl Query for Total {
        const NAME: &'static str = "Total";
        type Output = u64;
    }

    struct TotalHandler;

    #[async_trait]
    impl QueryHandler<Total> for TotalHandler {
        async fn handle(&self, _ctx: &DispatchContext, _query: Total) -> BusResult<u64> {
            Ok(7)
        }
    }

    #[tokio::test]
    async fn success_passes_the_output_through() {
        let registry = CqrsRegistry::new();
        registry
            .register_query::<Total, _, _>(|| TotalHandler, Lifetime::Transient)
            .unwrap();
        decorate_query_with_logging::<Total>(&registry).unwrap();

        let processor = cqrs_core::InProcessQueryProcessor::new(std::sync::Arc::new(registry));
        let ctx = DispatchContext::default();
        let out = cqrs_core::QueryProcessor::process(&processor, &ctx, Total)
            .await
            .unwrap();
        assert_eq!(out, 7);
    }
}
