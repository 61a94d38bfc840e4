//! 模块与候选类型描述（Module 契约）
//!
//! 宿主以“启动期已知”的有限列表提供候选类型描述，供扫描与批量装配使用：
//! - 描述面仅包含：是否抽象/接口、直接实现的形状实例（带泛型定义同一性）、
//!   基类型链接；
//! - 可自动装配的形状实例附带类型化的绑定闭包（在消息类型静态已知处构造），
//!   扫描命中后由批量装配操作调用，替代运行时反射实例化；
//! - 装饰器在结构上同时满足处理器形状（接口继承），因此处理器注册扫描
//!   必须以装饰器形状为排除项。
//!
use std::sync::Arc;

use crate::chain::{
    CommandDecoratorFactory, CommandHandlerFactory, QueryDecoratorFactory, QueryHandlerFactory,
};
use crate::error::BusResult;
use crate::handler::{CommandHandler, QueryHandler};
use crate::message::{Command, Query};
use crate::provider::Lifetime;
use crate::registry::CqrsRegistry;
use crate::shape::{ShapeDef, ShapeId, ShapeInstance};

/// 绑定闭包：在类型参数静态已知处构造，由批量装配按扫描结果调用
pub(crate) type BindFn = Arc<dyn Fn(&CqrsRegistry, Lifetime) -> BusResult<()> + Send + Sync>;

/// 模块：候选类型描述的有限枚举（外部协作者）
pub trait Module: Send + Sync {
    /// 模块名称（用于日志与错误定位）
    fn name(&self) -> &'static str;

    /// 候选类型列表；列表顺序即批量装配顺序，
    /// 同一能力上多个自动发现装饰器的链序随之而定（宿主不保证顺序时链序不保证）
    fn candidate_types(&self) -> Vec<CandidateType>;
}

/// 候选类型实现的一个形状实例，可选携带绑定闭包
#[derive(Clone)]
pub struct ImplementedShape {
    instance: ShapeInstance,
    bind: Option<BindFn>,
}

impl ImplementedShape {
    /// 仅声明（参与匹配，无法自动装配）
    pub fn declared(instance: ShapeInstance) -> Self {
        Self {
            instance,
            bind: None,
        }
    }

    pub fn instance(&self) -> &ShapeInstance {
        &self.instance
    }

    pub(crate) fn bind(&self) -> Option<&BindFn> {
        self.bind.as_ref()
    }
}

/// 候选类型描述
#[derive(Clone)]
pub struct CandidateType {
    name: &'static str,
    is_abstract: bool,
    is_interface: bool,
    generic_def: Option<ShapeId>,
    interfaces: Vec<ImplementedShape>,
    base: Option<Arc<CandidateType>>,
}

impl CandidateType {
    /// 具体（可实例化）类型
    pub fn concrete(name: &'static str) -> Self {
        Self {
            name,
            is_abstract: false,
            is_interface: false,
            generic_def: None,
            interfaces: Vec::new(),
            base: None,
        }
    }

    /// 抽象类型（参与匹配与继承，不会被扫描选中）
    pub fn abstract_type(name: &'static str) -> Self {
        Self {
            is_abstract: true,
            ..Self::concrete(name)
        }
    }

    /// 接口类型（参与匹配与继承，不会被扫描选中）
    pub fn interface(name: &'static str) -> Self {
        Self {
            is_interface: true,
            ..Self::concrete(name)
        }
    }

    /// 声明候选自身即某泛型定义的参数化类型
    pub fn with_generic_def(mut self, def: &ShapeDef) -> Self {
        self.generic_def = Some(def.id());
        self
    }

    /// 设置基类型
    pub fn with_base(mut self, base: CandidateType) -> Self {
        self.base = Some(Arc::new(base));
        self
    }

    /// 仅声明实现某形状实例（无自动装配闭包）
    pub fn declares(mut self, instance: ShapeInstance) -> Self {
        self.interfaces.push(ImplementedShape::declared(instance));
        self
    }

    /// 声明实现命令处理器形状，并提供构造工厂用于自动注册
    pub fn handles_command<C, H, F>(mut self, factory: F) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let erased: CommandHandlerFactory<C> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn CommandHandler<C>>);
        let bind: BindFn = Arc::new(move |registry, lifetime| {
            registry.register_command_factory::<C>(erased.clone(), lifetime)
        });
        self.interfaces.push(ImplementedShape {
            instance: ShapeInstance::command_handler::<C>(),
            bind: Some(bind),
        });
        self
    }

    /// 声明实现查询处理器形状，并提供构造工厂用于自动注册
    pub fn handles_query<Q, H, F>(mut self, factory: F) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let erased: QueryHandlerFactory<Q> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn QueryHandler<Q>>);
        let bind: BindFn = Arc::new(move |registry, lifetime| {
            registry.register_query_factory::<Q>(erased.clone(), lifetime)
        });
        self.interfaces.push(ImplementedShape {
            instance: ShapeInstance::query_handler::<Q>(),
            bind: Some(bind),
        });
        self
    }

    /// 声明实现命令装饰器形状，并提供包装工厂用于自动装饰
    ///
    /// 装饰器同时声明处理器形状（继承而来），注册扫描以装饰器形状排除之。
    pub fn decorates_command<C: Command>(mut self, factory: CommandDecoratorFactory<C>) -> Self {
        self.interfaces.push(ImplementedShape::declared(
            ShapeInstance::command_handler::<C>(),
        ));
        let bind: BindFn =
            Arc::new(move |registry, _lifetime| registry.decorate_command::<C>(factory.clone()));
        self.interfaces.push(ImplementedShape {
            instance: ShapeInstance::command_decorator::<C>(),
            bind: Some(bind),
        });
        self
    }

    /// 声明实现查询装饰器形状，并提供包装工厂用于自动装饰
    pub fn decorates_query<Q: Query>(mut self, factory: QueryDecoratorFactory<Q>) -> Self {
        self.interfaces.push(ImplementedShape::declared(
            ShapeInstance::query_handler::<Q>(),
        ));
        let bind: BindFn =
            Arc::new(move |registry, _lifetime| registry.decorate_query::<Q>(factory.clone()));
        self.interfaces.push(ImplementedShape {
            instance: ShapeInstance::query_decorator::<Q>(),
            bind: Some(bind),
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && !self.is_interface
    }

    pub fn generic_def(&self) -> Option<ShapeId> {
        self.generic_def
    }

    pub fn interfaces(&self) -> &[ImplementedShape] {
        &self.interfaces
    }

    pub fn base(&self) -> Option<&CandidateType> {
        self.base.as_deref()
    }
}
