use crate::{
    context::DispatchContext, error::BusResult, message::Command, registry::CqrsRegistry,
};
use async_trait::async_trait;
use std::sync::Arc;

/// 命令总线（CommandBus）
///
/// - 按命令的具体运行时类型路由到唯一的处理器链，不存在向基类型的回退；
/// - 框架可提供不同实现（进程内、消息队列等）；
/// - 该 trait 带有泛型方法，通常以具体实现类型注入使用。
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// 派发命令到对应处理器链，传播完成或失败
    ///
    /// - `ctx`：调度上下文（取消信号、请求作用域）
    /// - `cmd`：具体命令实例
    async fn send<C: Command>(&self, ctx: &DispatchContext, cmd: C) -> BusResult<()>;
}

/// 进程内 CommandBus：基于共享注册表解析与调度
///
/// 实例共享策略由链状态按登记的生命周期执行，总线自身不做任何缓存。
pub struct InProcessCommandBus {
    registry: Arc<CqrsRegistry>,
}

impl InProcessCommandBus {
    pub fn new(registry: Arc<CqrsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CqrsRegistry> {
        &self.registry
    }
}

#[async_trait]
impl CommandBus for InProcessCommandBus {
    async fn send<C: Command>(&self, ctx: &DispatchContext, cmd: C) -> BusResult<()> {
        self.registry.dispatch_command(ctx, cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use crate::handler::CommandHandler;
    use crate::provider::Lifetime;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    struct Bump;
    impl Command for Bump {
        const NAME: &'static str = "Bump";
    }

    struct BumpHandler {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler<Bump> for BumpHandler {
        async fn handle(&self, _ctx: &DispatchContext, _cmd: Bump) -> BusResult<()> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn send_routes_to_registered_handler() {
        let registry = Arc::new(CqrsRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let handler_counter = counter.clone();
        registry
            .register_command::<Bump, _, _>(
                move || BumpHandler {
                    counter: handler_counter.clone(),
                },
                Lifetime::Singleton,
            )
            .unwrap();

        let bus = InProcessCommandBus::new(registry);
        let ctx = DispatchContext::default();
        bus.send(&ctx, Bump).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn not_found_error_when_unregistered() {
        let bus = InProcessCommandBus::new(Arc::new(CqrsRegistry::new()));
        let ctx = DispatchContext::default();
        let err = bus.send(&ctx, Bump).await.unwrap_err();
        assert!(matches!(err, BusError::HandlerNotFound("Bump")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatch_is_safe() {
        let registry = Arc::new(CqrsRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let handler_counter = counter.clone();
        registry
            .register_command::<Bump, _, _>(
                move || BumpHandler {
                    counter: handler_counter.clone(),
                },
                Lifetime::Singleton,
            )
            .unwrap();

        let bus = Arc::new(InProcessCommandBus::new(registry));
        let mut set = JoinSet::new();
        for _ in 0..100 {
            let bus = bus.clone();
            set.spawn(async move {
                let ctx = DispatchContext::default();
                bus.send(&ctx, Bump).await.unwrap()
            });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }
}
