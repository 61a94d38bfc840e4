//! 进程内 CQRS 消息调度框架（cqrs-core）
//!
//! 将“命令”（改变状态的意图，无业务返回值）与“查询”（带类型化结果的读请求）
//! 分离，每个消息实例路由到唯一注册的处理器，并允许以装饰器为处理器叠加
//! 横切行为（日志、事务边界）而无需修改处理器代码。
//!
//! 组成（自底向上）：
//! - `matcher`：候选实现类型与目标能力形状的匹配判定；
//! - `scanner`：在模块候选列表中发现处理器/装饰器实现并提取类型实参；
//! - `registry`：消息类型到终端处理器绑定（工厂 + 生命周期）的唯一映射；
//! - `chain`：装饰器链的校验、组合与按生命周期物化；
//! - `bus`/`processor`：命令与查询的调度入口。
//!
//! 典型用法：
//! 1. 定义消息类型并实现 [`Command`]/[`Query`]；
//! 2. 实现 [`CommandHandler`]/[`QueryHandler`]，注册到 [`CqrsRegistry`]
//!    （显式逐个注册，或通过 [`Module`] 批量发现）；
//! 3. 按需装饰（显式调用或模块批量发现）；
//! 4. 通过 [`InProcessCommandBus`]/[`InProcessQueryProcessor`] 派发。
//!
pub mod bus;
pub mod capability;
pub mod chain;
pub mod context;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod message;
pub mod module;
pub mod processor;
pub mod provider;
pub mod registry;
pub mod scanner;
pub mod shape;

pub use bus::{CommandBus, InProcessCommandBus};
pub use capability::{Capability, CapabilityKind, TypeKey};
pub use chain::{
    CommandDecoratorFactory, CommandHandlerFactory, QueryDecoratorFactory, QueryHandlerFactory,
};
pub use context::{CancellationToken, DispatchContext};
pub use error::{BusError, BusResult};
pub use handler::{CommandHandler, QueryHandler};
pub use matcher::is_based_on;
pub use message::{Command, Query};
pub use module::{CandidateType, ImplementedShape, Module};
pub use processor::{InProcessQueryProcessor, QueryProcessor};
pub use provider::{Lifetime, Scope};
pub use registry::CqrsRegistry;
pub use scanner::{ShapeMatch, scan};
