use crate::{
    context::DispatchContext,
    error::BusResult,
    message::{Command, Query},
};
use async_trait::async_trait;

#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    async fn handle(&self, ctx: &DispatchContext, cmd: C) -> BusResult<()>;
}

#[async_trait]
pub trait QueryHandler<Q>: Send + Sync
where
    Q: Query,
{
    async fn handle(&self, ctx: &DispatchContext, query: Q) -> BusResult<Q::Output>;
}
