//! 能力形状（Shape）
//!
//! 以“启动期声明”的方式表达可参数化的处理器接口，替代运行时类型内省：
//! - [`ShapeDef`]：未参数化的泛型定义（如 `CommandHandler<_>`），
//!   以标记类型的 `TypeId` 作为定义同一性；
//! - [`ShapeInstance`]：带具体类型实参的接口实例（如 `CommandHandler<CreateOrder>`）；
//! - [`TargetShape`]：匹配目标，区分“具体实例”与“泛型定义”两种匹配语义。
//!
use std::any::TypeId;

use crate::capability::TypeKey;
use crate::message::{Command, Query};

/// 形状定义的同一性标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeId(TypeId);

impl ShapeId {
    pub fn of<S: 'static>() -> Self {
        Self(TypeId::of::<S>())
    }
}

/// 未参数化的形状定义：同一性标识、展示名称与类型实参个数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeDef {
    id: ShapeId,
    name: &'static str,
    arity: usize,
}

impl ShapeDef {
    pub fn of<S: 'static>(name: &'static str, arity: usize) -> Self {
        Self {
            id: ShapeId::of::<S>(),
            name,
            arity,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// 带具体类型实参的形状实例
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeInstance {
    def: ShapeDef,
    args: Vec<TypeKey>,
}

impl ShapeInstance {
    pub fn new(def: ShapeDef, args: Vec<TypeKey>) -> Self {
        Self { def, args }
    }

    pub fn command_handler<C: Command>() -> Self {
        Self::new(command_handler(), vec![TypeKey::named::<C>(C::NAME)])
    }

    pub fn query_handler<Q: Query>() -> Self {
        Self::new(
            query_handler(),
            vec![TypeKey::named::<Q>(Q::NAME), TypeKey::of::<Q::Output>()],
        )
    }

    pub fn command_decorator<C: Command>() -> Self {
        Self::new(command_decorator(), vec![TypeKey::named::<C>(C::NAME)])
    }

    pub fn query_decorator<Q: Query>() -> Self {
        Self::new(
            query_decorator(),
            vec![TypeKey::named::<Q>(Q::NAME), TypeKey::of::<Q::Output>()],
        )
    }

    pub fn def(&self) -> &ShapeDef {
        &self.def
    }

    pub fn args(&self) -> &[TypeKey] {
        &self.args
    }
}

/// 匹配目标
#[derive(Clone, Debug)]
pub enum TargetShape {
    /// 具体接口实例：按“自身或祖先直接实现同一实例”判定
    Concrete(ShapeInstance),
    /// 泛型定义：按“任一直接实现接口的定义相等”判定，并沿基类型链递归
    Generic(ShapeDef),
}

// --- 内建形状 ---

/// 命令处理器形状 `CommandHandler<C>`（一元）
pub struct CommandHandlerShape;
/// 查询处理器形状 `QueryHandler<Q, Output>`（二元）
pub struct QueryHandlerShape;
/// 命令装饰器形状（本身亦满足命令处理器能力）
pub struct CommandDecoratorShape;
/// 查询装饰器形状（本身亦满足查询处理器能力）
pub struct QueryDecoratorShape;

pub fn command_handler() -> ShapeDef {
    ShapeDef::of::<CommandHandlerShape>("CommandHandler", 1)
}

pub fn query_handler() -> ShapeDef {
    ShapeDef::of::<QueryHandlerShape>("QueryHandler", 2)
}

pub fn command_decorator() -> ShapeDef {
    ShapeDef::of::<CommandDecoratorShape>("CommandDecorator", 1)
}

pub fn query_decorator() -> ShapeDef {
    ShapeDef::of::<QueryDecoratorShape>("QueryDecorator", 2)
}
