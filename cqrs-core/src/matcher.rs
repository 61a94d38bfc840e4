//! 类型匹配（TypeMatcher）
//!
//! 判定候选实现类型是否满足目标能力形状：
//! - 具体实例目标：候选自身或任一祖先直接实现同一接口实例（定义与实参均相等）；
//! - 泛型定义目标：任一直接实现接口的未参数化定义相等，
//!   或候选自身即该定义的参数化类型，两步沿基类型链递归；
//! - 链上无匹配即返回 `false`，不是错误。
//!
//! 该判定为纯函数，扫描期间会被反复调用，不得产生副作用。
//!
use crate::module::CandidateType;
use crate::shape::{ShapeDef, ShapeInstance, TargetShape};

/// 候选类型是否满足目标形状
pub fn is_based_on(candidate: &CandidateType, target: &TargetShape) -> bool {
    match target {
        TargetShape::Concrete(instance) => implements_instance(candidate, instance),
        TargetShape::Generic(def) => assignable_to_generic(candidate, def),
    }
}

fn implements_instance(candidate: &CandidateType, instance: &ShapeInstance) -> bool {
    if candidate
        .interfaces()
        .iter()
        .any(|imp| imp.instance() == instance)
    {
        return true;
    }
    candidate
        .base()
        .is_some_and(|base| implements_instance(base, instance))
}

fn assignable_to_generic(candidate: &CandidateType, def: &ShapeDef) -> bool {
    // 直接实现的接口中存在同一泛型定义
    if candidate
        .interfaces()
        .iter()
        .any(|imp| imp.instance().def().id() == def.id())
    {
        return true;
    }

    // 候选自身即该定义的参数化类型
    if candidate.generic_def().is_some_and(|id| id == def.id()) {
        return true;
    }

    // 沿基类型链递归
    candidate
        .base()
        .is_some_and(|base| assignable_to_generic(base, def))
}
