//! 装饰器链（DecoratorChainBuilder）
//!
//! 为单一能力维护“终端处理器工厂 + 有序装饰器工厂”的类型化状态，
//! 并按生命周期策略在调用期物化为组合后的处理器链：
//! - 组合次序：先注册的装饰器最内层（紧贴终端处理器），
//!   后注册者最外层，最先与最后执行（洋葱式）；
//! - Singleton：组合链只物化一次，跨并发调度共享；
//! - Scoped：组合链缓存在上下文携带的 `Scope` 内，作用域之间互不可见；
//! - Transient：每次调度重新构造完整链。
//!
//! 装饰器工厂只接收已组合完成的内层链，因此装饰器在构造上无法直接或
//! 间接包装自身。组合后的链与裸处理器对调用方不可区分。
//!
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::context::DispatchContext;
use crate::error::{BusError, BusResult};
use crate::handler::{CommandHandler, QueryHandler};
use crate::message::{Command, Query};
use crate::provider::Lifetime;

/// 终端命令处理器工厂
pub type CommandHandlerFactory<C> = Arc<dyn Fn() -> Arc<dyn CommandHandler<C>> + Send + Sync>;
/// 命令装饰器工厂：接收内层链，返回包装后的同能力处理器
pub type CommandDecoratorFactory<C> =
    Arc<dyn Fn(Arc<dyn CommandHandler<C>>) -> Arc<dyn CommandHandler<C>> + Send + Sync>;
/// 终端查询处理器工厂
pub type QueryHandlerFactory<Q> = Arc<dyn Fn() -> Arc<dyn QueryHandler<Q>> + Send + Sync>;
/// 查询装饰器工厂：接收内层链，返回包装后的同能力处理器
pub type QueryDecoratorFactory<Q> =
    Arc<dyn Fn(Arc<dyn QueryHandler<Q>>) -> Arc<dyn QueryHandler<Q>> + Send + Sync>;

// 进程内链标识：作用域缓存键的组成部分，同一消息类型的不同链互不串用
static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(0);

struct Decorators<F> {
    items: Vec<F>,
    // 单例物化时封印；封印后的装饰请求立即失败而非静默不生效
    sealed: bool,
}

impl<F> Default for Decorators<F> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            sealed: false,
        }
    }
}

pub(crate) struct CommandChain<C: Command> {
    id: u64,
    lifetime: Lifetime,
    base: CommandHandlerFactory<C>,
    decorators: RwLock<Decorators<CommandDecoratorFactory<C>>>,
    singleton: OnceLock<Arc<dyn CommandHandler<C>>>,
}

impl<C: Command> CommandChain<C> {
    pub(crate) fn new(base: CommandHandlerFactory<C>, lifetime: Lifetime) -> Self {
        Self {
            id: NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed),
            lifetime,
            base,
            decorators: RwLock::new(Decorators::default()),
            singleton: OnceLock::new(),
        }
    }

    /// 追加一个装饰器（后注册者在链上更外层）
    ///
    /// 单例链一旦物化即不可再装饰；封印判定与追加在同一把写锁下完成，
    /// 与首次物化并发时要么进入组合要么立即失败，不存在被接受却未生效的路径。
    pub(crate) fn push_decorator(&self, factory: CommandDecoratorFactory<C>) -> BusResult<()> {
        let mut decorators = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if decorators.sealed {
            return Err(BusError::InvalidDecorator {
                target: C::NAME,
                reason: "chain already materialized".to_string(),
            });
        }
        decorators.items.push(factory);
        Ok(())
    }

    /// 自终端处理器起按注册序依次包装
    fn compose_from(&self, decorators: &[CommandDecoratorFactory<C>]) -> Arc<dyn CommandHandler<C>> {
        let mut handler = (self.base)();
        for factory in decorators {
            handler = factory(handler);
        }
        handler
    }

    fn compose(&self) -> Arc<dyn CommandHandler<C>> {
        let decorators = self
            .decorators
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.compose_from(&decorators.items)
    }

    /// 物化并封印装饰器列表（单例路径）
    fn compose_and_seal(&self) -> Arc<dyn CommandHandler<C>> {
        let mut decorators = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        decorators.sealed = true;
        self.compose_from(&decorators.items)
    }

    /// 按生命周期策略解析链实例
    pub(crate) fn resolve(&self, ctx: &DispatchContext) -> BusResult<Arc<dyn CommandHandler<C>>> {
        match self.lifetime {
            Lifetime::Singleton => Ok(self.singleton.get_or_init(|| self.compose_and_seal()).clone()),
            Lifetime::Scoped => {
                // 上下文未携带作用域：退化为每次调度独立实例
                let Some(scope) = ctx.scope() else {
                    return Ok(self.compose());
                };
                scope
                    .instance_or_else((TypeId::of::<Self>(), self.id), || self.compose())
                    .ok_or(BusError::TypeMismatch {
                        expected: C::NAME,
                        found: "scoped command chain",
                    })
            }
            Lifetime::Transient => Ok(self.compose()),
        }
    }
}

pub(crate) struct QueryChain<Q: Query> {
    id: u64,
    lifetime: Lifetime,
    base: QueryHandlerFactory<Q>,
    decorators: RwLock<Decorators<QueryDecoratorFactory<Q>>>,
    singleton: OnceLock<Arc<dyn QueryHandler<Q>>>,
}

impl<Q: Query> QueryChain<Q> {
    pub(crate) fn new(base: QueryHandlerFactory<Q>, lifetime: Lifetime) -> Self {
        Self {
            id: NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed),
            lifetime,
            base,
            decorators: RwLock::new(Decorators::default()),
            singleton: OnceLock::new(),
        }
    }

    pub(crate) fn push_decorator(&self, factory: QueryDecoratorFactory<Q>) -> BusResult<()> {
        let mut decorators = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if decorators.sealed {
            return Err(BusError::InvalidDecorator {
                target: Q::NAME,
                reason: "chain already materialized".to_string(),
            });
        }
        decorators.items.push(factory);
        Ok(())
    }

    fn compose_from(&self, decorators: &[QueryDecoratorFactory<Q>]) -> Arc<dyn QueryHandler<Q>> {
        let mut handler = (self.base)();
        for factory in decorators {
            handler = factory(handler);
        }
        handler
    }

    fn compose(&self) -> Arc<dyn QueryHandler<Q>> {
        let decorators = self
            .decorators
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.compose_from(&decorators.items)
    }

    fn compose_and_seal(&self) -> Arc<dyn QueryHandler<Q>> {
        let mut decorators = self
            .decorators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        decorators.sealed = true;
        self.compose_from(&decorators.items)
    }

    pub(crate) fn resolve(&self, ctx: &DispatchContext) -> BusResult<Arc<dyn QueryHandler<Q>>> {
        match self.lifetime {
            Lifetime::Singleton => Ok(self.singleton.get_or_init(|| self.compose_and_seal()).clone()),
            Lifetime::Scoped => {
                let Some(scope) = ctx.scope() else {
                    return Ok(self.compose());
                };
                scope
                    .instance_or_else((TypeId::of::<Self>(), self.id), || self.compose())
                    .ok_or(BusError::TypeMismatch {
                        expected: Q::NAME,
                        found: "scoped query chain",
                    })
            }
            Lifetime::Transient => Ok(self.compose()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Scope;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    struct Step;
    impl Command for Step {
        const NAME: &'static str = "Step";
    }

    struct Recorder {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl CommandHandler<Step> for Recorder {
        async fn handle(&self, _ctx: &DispatchContext, _cmd: Step) -> BusResult<()> {
            self.log.lock().unwrap().push("handler");
            Ok(())
        }
    }

    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        inner: Arc<dyn CommandHandler<Step>>,
    }

    #[async_trait]
    impl CommandHandler<Step> for Tagged {
        async fn handle(&self, ctx: &DispatchContext, cmd: Step) -> BusResult<()> {
            self.log.lock().unwrap().push(self.tag);
            self.inner.handle(ctx, cmd).await?;
            self.log.lock().unwrap().push(self.tag);
            Ok(())
        }
    }

    fn tagged(
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    ) -> CommandDecoratorFactory<Step> {
        Arc::new(move |inner| {
            Arc::new(Tagged {
                tag,
                log: log.clone(),
                inner,
            })
        })
    }

    #[tokio::test]
    async fn decorators_compose_in_onion_order() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let base: CommandHandlerFactory<Step> = {
            let log = log.clone();
            Arc::new(move || Arc::new(Recorder { log: log.clone() }))
        };

        let chain = CommandChain::new(base, Lifetime::Transient);
        chain.push_decorator(tagged("d1", log.clone())).unwrap();
        chain.push_decorator(tagged("d2", log.clone())).unwrap();

        let ctx = DispatchContext::default();
        let handler = chain.resolve(&ctx).unwrap();
        handler.handle(&ctx, Step).await.unwrap();

        // 后注册的 d2 最先与最后执行
        assert_eq!(*log.lock().unwrap(), vec!["d2", "d1", "handler", "d1", "d2"]);
    }

    struct Counting;

    #[async_trait]
    impl CommandHandler<Step> for Counting {
        async fn handle(&self, _ctx: &DispatchContext, _cmd: Step) -> BusResult<()> {
            Ok(())
        }
    }

    fn counting_base(counter: Arc<AtomicUsize>) -> CommandHandlerFactory<Step> {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Counting)
        })
    }

    #[tokio::test]
    async fn transient_builds_a_fresh_chain_per_resolution() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = CommandChain::new(counting_base(counter.clone()), Lifetime::Transient);
        let ctx = DispatchContext::default();

        chain.resolve(&ctx).unwrap();
        chain.resolve(&ctx).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn singleton_materializes_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = CommandChain::new(counting_base(counter.clone()), Lifetime::Singleton);
        let ctx = DispatchContext::default();

        chain.resolve(&ctx).unwrap();
        chain.resolve(&ctx).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scoped_shares_within_one_scope_only() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = CommandChain::new(counting_base(counter.clone()), Lifetime::Scoped);

        let first = DispatchContext::default().with_scope(Scope::new());
        chain.resolve(&first).unwrap();
        chain.resolve(&first).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let second = DispatchContext::default().with_scope(Scope::new());
        chain.resolve(&second).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scoped_cache_distinguishes_chains_for_the_same_message() {
        // 同一消息类型的两条链共享一个作用域：各自解析各自的实例
        let first_built = Arc::new(AtomicUsize::new(0));
        let second_built = Arc::new(AtomicUsize::new(0));
        let first = CommandChain::new(counting_base(first_built.clone()), Lifetime::Scoped);
        let second = CommandChain::new(counting_base(second_built.clone()), Lifetime::Scoped);

        let ctx = DispatchContext::default().with_scope(Scope::new());
        first.resolve(&ctx).unwrap();
        second.resolve(&ctx).unwrap();

        assert_eq!(first_built.load(Ordering::SeqCst), 1);
        assert_eq!(second_built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn accepted_decorations_always_reach_the_singleton_chain() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = Arc::new(CommandChain::new(
            counting_base(counter.clone()),
            Lifetime::Singleton,
        ));
        let applied = Arc::new(AtomicUsize::new(0));

        let mut set = JoinSet::new();
        for _ in 0..16 {
            let chain = chain.clone();
            let applied = applied.clone();
            set.spawn(async move {
                let factory: CommandDecoratorFactory<Step> = Arc::new(move |inner| {
                    applied.fetch_add(1, Ordering::SeqCst);
                    inner
                });
                chain.push_decorator(factory).is_ok()
            });
        }
        for _ in 0..4 {
            let chain = chain.clone();
            set.spawn(async move {
                let ctx = DispatchContext::default();
                chain.resolve(&ctx).unwrap();
                false
            });
        }

        let mut accepted = 0;
        while let Some(res) = set.join_next().await {
            if res.unwrap() {
                accepted += 1;
            }
        }

        // 被接受的装饰器必定进入被缓存的组合链
        let ctx = DispatchContext::default();
        chain.resolve(&ctx).unwrap();
        assert_eq!(applied.load(Ordering::SeqCst), accepted);
    }

    #[tokio::test]
    async fn decorating_a_materialized_singleton_fails_fast() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = CommandChain::new(counting_base(counter.clone()), Lifetime::Singleton);
        let ctx = DispatchContext::default();
        chain.resolve(&ctx).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let err = chain.push_decorator(tagged("late", log)).unwrap_err();
        assert!(matches!(err, BusError::InvalidDecorator { .. }));
    }
}
