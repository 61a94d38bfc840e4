use crate::{context::DispatchContext, error::BusResult, message::Query, registry::CqrsRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// 查询处理器入口（QueryProcessor）
///
/// - 按查询的具体运行时类型路由到唯一的处理器链，不存在向基类型的回退；
/// - 对外返回与查询静态关联的结果类型。
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    /// 派发查询到对应处理器链，返回该查询的结果
    async fn process<Q: Query>(&self, ctx: &DispatchContext, query: Q) -> BusResult<Q::Output>;
}

/// 进程内 QueryProcessor：基于共享注册表解析与调度
pub struct InProcessQueryProcessor {
    registry: Arc<CqrsRegistry>,
}

impl InProcessQueryProcessor {
    pub fn new(registry: Arc<CqrsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CqrsRegistry> {
        &self.registry
    }
}

#[async_trait]
impl QueryProcessor for InProcessQueryProcessor {
    async fn process<Q: Query>(&self, ctx: &DispatchContext, query: Q) -> BusResult<Q::Output> {
        self.registry.dispatch_query(ctx, query).await
    }
}
