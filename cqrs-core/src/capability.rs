use std::any::{TypeId, type_name};
use std::fmt;

use crate::message::{Command, Query};

/// 类型键：`TypeId` 同一性加稳定可读名称
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// 以 `type_name` 作为展示名称（结果类型等无稳定名称的场合）
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// 以显式稳定名称构造（消息类型使用其 `NAME` 常量）
    pub fn named<T: 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// 能力种类：命令处理或查询处理
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Command,
    Query,
}

/// 能力（Capability）：对“消息类型 X 的处理器（返回 Y）”的抽象描述
///
/// - 命令能力：`{ Command, message }`，无结果类型；
/// - 查询能力：`{ Query, message, result }`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capability {
    kind: CapabilityKind,
    message: TypeKey,
    result: Option<TypeKey>,
}

impl Capability {
    pub fn command<C: Command>() -> Self {
        Self {
            kind: CapabilityKind::Command,
            message: TypeKey::named::<C>(C::NAME),
            result: None,
        }
    }

    pub fn query<Q: Query>() -> Self {
        Self {
            kind: CapabilityKind::Query,
            message: TypeKey::named::<Q>(Q::NAME),
            result: Some(TypeKey::of::<Q::Output>()),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn message(&self) -> TypeKey {
        self.message
    }

    pub fn result(&self) -> Option<TypeKey> {
        self.result
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.result) {
            (CapabilityKind::Command, _) => write!(f, "CommandHandler<{}>", self.message.name()),
            (CapabilityKind::Query, Some(result)) => {
                write!(f, "QueryHandler<{}, {}>", self.message.name(), result.name())
            }
            (CapabilityKind::Query, None) => write!(f, "QueryHandler<{}>", self.message.name()),
        }
    }
}
