//! 生命周期与作用域（外部提供者契约）
//!
//! 实例的创建与回收策略由宿主（依赖注入/服务定位）负责，核心只约定：
//! - [`Lifetime`]：登记在绑定上的实例共享策略，解析时由链状态按策略执行；
//! - [`Scope`]：宿主划定的“一次逻辑请求”实例缓存，放入
//!   [`DispatchContext`](crate::context::DispatchContext) 后，
//!   Scoped 绑定在同一作用域内复用同一实例，作用域之间互不可见。
//!
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 实例共享策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifetime {
    /// 全局共享单例；跨并发调度复用，实现必须可并发重入
    Singleton,
    /// 同一作用域内共享一个实例
    Scoped,
    /// 每次解析新建实例，无需同步
    #[default]
    Transient,
}

/// 请求作用域：Scoped 生命周期的实例缓存
///
/// 由宿主创建并决定边界；克隆共享同一底层缓存。
/// 缓存键包含链的进程内标识：同一消息类型在不同注册表中的绑定
/// 共享一个作用域时互不串用。
#[derive(Clone, Default)]
pub struct Scope {
    instances: Arc<DashMap<(TypeId, u64), Box<dyn Any + Send + Sync>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出或构建并缓存一个作用域内实例
    ///
    /// 返回 `None` 表示缓存中的实例与期望类型不一致（防御性，正常不应发生）。
    pub(crate) fn instance_or_else<T, F>(&self, key: (TypeId, u64), make: F) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let entry = self
            .instances
            .entry(key)
            .or_insert_with(|| Box::new(make()));
        entry.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("instances", &self.instances.len())
            .finish()
    }
}
