//! 处理器注册表（HandlerRegistry）
//!
//! 将每个消息类型绑定到唯一的终端处理器（工厂 + 生命周期），并维护其
//! 装饰器链：
//! - 同一能力的重复注册被拒绝（配置错误，显式优于静默覆盖）；
//! - 解析未注册能力返回独立的 `HandlerNotFound`，而非空结果；
//! - 装饰必须发生在已绑定能力之上，校验在装饰时立即失败（fail fast）；
//! - 提供按模块批量注册处理器与批量发现装饰器的装配操作。
//!
//! 运行期以类型擦除（Any）方式调度，擦除闭包与注册入口共享同一泛型参数，
//! downcast 正常情况下不会失败。
//!
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::capability::Capability;
use crate::chain::{
    CommandChain, CommandDecoratorFactory, CommandHandlerFactory, QueryChain,
    QueryDecoratorFactory, QueryHandlerFactory,
};
use crate::context::DispatchContext;
use crate::error::{BusError, BusResult};
use crate::handler::{CommandHandler, QueryHandler};
use crate::message::{Command, Query};
use crate::module::Module;
use crate::provider::Lifetime;
use crate::scanner::{ShapeMatch, scan};
use crate::shape;

type BoxAnySend = Box<dyn Any + Send>;

type CmdInvokeFuture<'a> = Pin<Box<dyn Future<Output = BusResult<()>> + Send + 'a>>;
type CmdInvokeFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a DispatchContext) -> CmdInvokeFuture<'a> + Send + Sync>;

type QueryInvokeFuture<'a> = Pin<Box<dyn Future<Output = BusResult<BoxAnySend>> + Send + 'a>>;
type QueryInvokeFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a DispatchContext) -> QueryInvokeFuture<'a> + Send + Sync>;

struct CommandSlot {
    capability: Capability,
    // Arc<CommandChain<C>>，装饰时按消息类型还原
    chain: Arc<dyn Any + Send + Sync>,
    invoke: CmdInvokeFn,
}

struct QuerySlot {
    capability: Capability,
    chain: Arc<dyn Any + Send + Sync>,
    invoke: QueryInvokeFn,
}

/// CQRS 注册表：命令/查询各自的绑定与装饰器链
#[derive(Default)]
pub struct CqrsRegistry {
    commands: DashMap<TypeId, CommandSlot>,
    queries: DashMap<TypeId, QuerySlot>,
}

impl CqrsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器（工厂 + 生命周期）；重复注册返回配置错误
    pub fn register_command<C, H, F>(&self, factory: F, lifetime: Lifetime) -> BusResult<()>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let erased: CommandHandlerFactory<C> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn CommandHandler<C>>);
        self.register_command_factory::<C>(erased, lifetime)
    }

    pub(crate) fn register_command_factory<C: Command>(
        &self,
        factory: CommandHandlerFactory<C>,
        lifetime: Lifetime,
    ) -> BusResult<()> {
        let chain = Arc::new(CommandChain::<C>::new(factory, lifetime));

        let invoke: CmdInvokeFn = {
            let chain = chain.clone();
            Arc::new(move |boxed_cmd, ctx| {
                let chain = chain.clone();
                Box::pin(async move {
                    // 键与擦除闭包同一泛型 C，正常情况下 downcast 不会失败
                    let cmd = boxed_cmd
                        .downcast::<C>()
                        .map_err(|_| BusError::TypeMismatch {
                            expected: C::NAME,
                            found: "unknown",
                        })?;
                    let handler = chain.resolve(ctx)?;
                    handler.handle(ctx, *cmd).await
                })
            })
        };

        match self.commands.entry(TypeId::of::<C>()) {
            Entry::Occupied(_) => Err(BusError::AlreadyRegisteredCommand { command: C::NAME }),
            Entry::Vacant(slot) => {
                tracing::debug!(command = C::NAME, ?lifetime, "registered command handler");
                slot.insert(CommandSlot {
                    capability: Capability::command::<C>(),
                    chain,
                    invoke,
                });
                Ok(())
            }
        }
    }

    /// 注册查询处理器（工厂 + 生命周期）；重复注册返回配置错误
    pub fn register_query<Q, H, F>(&self, factory: F, lifetime: Lifetime) -> BusResult<()>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let erased: QueryHandlerFactory<Q> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn QueryHandler<Q>>);
        self.register_query_factory::<Q>(erased, lifetime)
    }

    pub(crate) fn register_query_factory<Q: Query>(
        &self,
        factory: QueryHandlerFactory<Q>,
        lifetime: Lifetime,
    ) -> BusResult<()> {
        let chain = Arc::new(QueryChain::<Q>::new(factory, lifetime));

        let invoke: QueryInvokeFn = {
            let chain = chain.clone();
            Arc::new(move |boxed_query, ctx| {
                let chain = chain.clone();
                Box::pin(async move {
                    let query = boxed_query
                        .downcast::<Q>()
                        .map_err(|_| BusError::TypeMismatch {
                            expected: Q::NAME,
                            found: "unknown",
                        })?;
                    let handler = chain.resolve(ctx)?;
                    let output = handler.handle(ctx, *query).await?;
                    Ok(Box::new(output) as BoxAnySend)
                })
            })
        };

        match self.queries.entry(TypeId::of::<Q>()) {
            Entry::Occupied(_) => Err(BusError::AlreadyRegisteredQuery { query: Q::NAME }),
            Entry::Vacant(slot) => {
                tracing::debug!(query = Q::NAME, ?lifetime, "registered query handler");
                slot.insert(QuerySlot {
                    capability: Capability::query::<Q>(),
                    chain,
                    invoke,
                });
                Ok(())
            }
        }
    }

    /// 为命令能力追加一个装饰器；后注册者最先执行（最外层）
    ///
    /// 目标能力必须已绑定终端处理器，否则立即返回配置错误。
    pub fn decorate_command<C: Command>(
        &self,
        factory: CommandDecoratorFactory<C>,
    ) -> BusResult<()> {
        let chain = {
            let Some(slot) = self.commands.get(&TypeId::of::<C>()) else {
                return Err(BusError::InvalidDecorator {
                    target: C::NAME,
                    reason: "no handler bound for capability".to_string(),
                });
            };
            slot.chain
                .clone()
                .downcast::<CommandChain<C>>()
                .map_err(|_| BusError::TypeMismatch {
                    expected: C::NAME,
                    found: "command chain",
                })?
        };
        chain.push_decorator(factory)?;
        tracing::debug!(command = C::NAME, "decorated command handler");
        Ok(())
    }

    /// 类型化便捷入口：以包装函数装饰命令能力
    pub fn decorate_command_with<C, D, F>(&self, wrap: F) -> BusResult<()>
    where
        C: Command,
        D: CommandHandler<C> + 'static,
        F: Fn(Arc<dyn CommandHandler<C>>) -> D + Send + Sync + 'static,
    {
        let factory: CommandDecoratorFactory<C> =
            Arc::new(move |inner| Arc::new(wrap(inner)) as Arc<dyn CommandHandler<C>>);
        self.decorate_command::<C>(factory)
    }

    /// 为查询能力追加一个装饰器；后注册者最先执行（最外层）
    pub fn decorate_query<Q: Query>(&self, factory: QueryDecoratorFactory<Q>) -> BusResult<()> {
        let chain = {
            let Some(slot) = self.queries.get(&TypeId::of::<Q>()) else {
                return Err(BusError::InvalidDecorator {
                    target: Q::NAME,
                    reason: "no handler bound for capability".to_string(),
                });
            };
            slot.chain
                .clone()
                .downcast::<QueryChain<Q>>()
                .map_err(|_| BusError::TypeMismatch {
                    expected: Q::NAME,
                    found: "query chain",
                })?
        };
        chain.push_decorator(factory)?;
        tracing::debug!(query = Q::NAME, "decorated query handler");
        Ok(())
    }

    /// 类型化便捷入口：以包装函数装饰查询能力
    pub fn decorate_query_with<Q, D, F>(&self, wrap: F) -> BusResult<()>
    where
        Q: Query,
        D: QueryHandler<Q> + 'static,
        F: Fn(Arc<dyn QueryHandler<Q>>) -> D + Send + Sync + 'static,
    {
        let factory: QueryDecoratorFactory<Q> =
            Arc::new(move |inner| Arc::new(wrap(inner)) as Arc<dyn QueryHandler<Q>>);
        self.decorate_query::<Q>(factory)
    }

    pub(crate) async fn dispatch_command<C: Command>(
        &self,
        ctx: &DispatchContext,
        cmd: C,
    ) -> BusResult<()> {
        let Some(invoke) = self
            .commands
            .get(&TypeId::of::<C>())
            .map(|slot| slot.invoke.clone())
        else {
            return Err(BusError::HandlerNotFound(C::NAME));
        };

        (invoke)(Box::new(cmd), ctx).await
    }

    pub(crate) async fn dispatch_query<Q: Query>(
        &self,
        ctx: &DispatchContext,
        query: Q,
    ) -> BusResult<Q::Output> {
        let Some(invoke) = self
            .queries
            .get(&TypeId::of::<Q>())
            .map(|slot| slot.invoke.clone())
        else {
            return Err(BusError::HandlerNotFound(Q::NAME));
        };

        let out = (invoke)(Box::new(query), ctx).await?;
        match out.downcast::<Q::Output>() {
            Ok(output) => Ok(*output),
            Err(_) => Err(BusError::TypeMismatch {
                expected: Q::NAME,
                found: "query output",
            }),
        }
    }

    // --- 模块批量装配 ---

    /// 注册模块内全部命令处理器（装饰器形状排除在外）
    pub fn register_module_command_handlers(
        &self,
        module: &dyn Module,
        lifetime: Lifetime,
    ) -> BusResult<()> {
        let candidates = module.candidate_types();
        let matches = scan(
            &candidates,
            &shape::command_handler(),
            &[shape::command_decorator()],
        )?;
        self.bind_all(module, matches, lifetime)
    }

    /// 注册模块内全部查询处理器（装饰器形状排除在外）
    pub fn register_module_query_handlers(
        &self,
        module: &dyn Module,
        lifetime: Lifetime,
    ) -> BusResult<()> {
        let candidates = module.candidate_types();
        let matches = scan(
            &candidates,
            &shape::query_handler(),
            &[shape::query_decorator()],
        )?;
        self.bind_all(module, matches, lifetime)
    }

    /// 发现并装配模块内全部命令装饰器
    ///
    /// 同一能力上多个装饰器的链序即候选顺序；装饰器实例随链物化，
    /// 生命周期随所装饰的链。
    pub fn decorate_module_command_handlers(&self, module: &dyn Module) -> BusResult<()> {
        let candidates = module.candidate_types();
        let matches = scan(&candidates, &shape::command_decorator(), &[])?;
        self.bind_all(module, matches, Lifetime::Transient)
    }

    /// 发现并装配模块内全部查询装饰器
    pub fn decorate_module_query_handlers(&self, module: &dyn Module) -> BusResult<()> {
        let candidates = module.candidate_types();
        let matches = scan(&candidates, &shape::query_decorator(), &[])?;
        self.bind_all(module, matches, Lifetime::Transient)
    }

    fn bind_all(
        &self,
        module: &dyn Module,
        matches: Vec<ShapeMatch>,
        lifetime: Lifetime,
    ) -> BusResult<()> {
        for m in matches {
            let Some(bind) = m.bind() else {
                return Err(BusError::Configuration {
                    reason: format!(
                        "module {}: {} declares a shape without a factory",
                        module.name(),
                        m.implementation()
                    ),
                });
            };
            bind(self, lifetime)?;
        }
        Ok(())
    }

    // --- 只读视图 ---

    /// 已注册命令的稳定名称列表
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.commands
            .iter()
            .map(|slot| slot.capability.message().name())
            .collect()
    }

    /// 已注册查询的稳定名称列表
    pub fn registered_queries(&self) -> Vec<&'static str> {
        self.queries
            .iter()
            .map(|slot| slot.capability.message().name())
            .collect()
    }

    /// 全部已注册能力描述
    pub fn capabilities(&self) -> Vec<Capability> {
        self.commands
            .iter()
            .map(|slot| slot.capability)
            .chain(self.queries.iter().map(|slot| slot.capability))
            .collect()
    }
}
