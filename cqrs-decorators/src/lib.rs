//! 参考横切装饰器（cqrs-decorators）
//!
//! 基于 cqrs-core 公共接口实现的两类常用装饰器：
//! - `logging`：记录消息执行的开始、耗时与失败，原样传播内层错误；
//! - `transaction`：以显式事务作用域包裹命令处理，
//!   仅当内层成功且未观察到取消时才标记完成。
//!
//! 两者均满足与所装饰处理器相同的能力形状，对调度方不可区分。
//!
pub mod logging;
pub mod transaction;

pub use logging::{
    LoggingCommandDecorator, LoggingQueryDecorator, decorate_command_with_logging,
    decorate_query_with_logging,
};
pub use transaction::{
    IsolationLevel, ScopePolicy, TransactionCommandDecorator, TransactionManager,
    TransactionOptions, TransactionScope, decorate_command_with_transactions,
};
