//! 能力扫描（CapabilityScanner）
//!
//! 在候选类型列表中发现满足目标形状的具体实现：
//! - 过滤抽象类型与接口；
//! - 排除形状命中者被剔除（装饰器结构上亦满足处理器形状，
//!   注册扫描时必须排除，防止装饰器被当作主处理器装配）；
//! - 对每个命中者定位具体的形状实例并提取类型实参（消息类型，
//!   二元形状另有结果类型），同一实现对多个消息类型产生多条结果，
//!   按实参元组去重；
//! - 扫描不修改候选；对固定的候选顺序，结果是确定性的。
//!
use std::any::TypeId;
use std::collections::HashSet;

use crate::capability::TypeKey;
use crate::error::{BusError, BusResult};
use crate::matcher::is_based_on;
use crate::module::{BindFn, CandidateType};
use crate::shape::{ShapeDef, TargetShape};

/// 一次扫描命中：实现类型加提取出的类型实参
#[derive(Clone)]
pub struct ShapeMatch {
    implementation: &'static str,
    args: Vec<TypeKey>,
    bind: Option<BindFn>,
}

impl std::fmt::Debug for ShapeMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeMatch")
            .field("implementation", &self.implementation)
            .field("args", &self.args)
            .field("bind", &self.bind.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ShapeMatch {
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    /// 消息类型实参
    pub fn message(&self) -> TypeKey {
        self.args[0]
    }

    /// 结果类型实参（二元形状）
    pub fn result(&self) -> Option<TypeKey> {
        self.args.get(1).copied()
    }

    pub fn args(&self) -> &[TypeKey] {
        &self.args
    }

    pub(crate) fn bind(&self) -> Option<&BindFn> {
        self.bind.as_ref()
    }
}

/// 扫描候选列表，返回满足 `target` 且不满足任一 `excluded` 形状的具体实现
pub fn scan(
    candidates: &[CandidateType],
    target: &ShapeDef,
    excluded: &[ShapeDef],
) -> BusResult<Vec<ShapeMatch>> {
    // 无类型实参的形状提取不出消息类型，属配置错误
    if target.arity() == 0 {
        return Err(BusError::Configuration {
            reason: format!("shape {}: at least one type argument required", target.name()),
        });
    }

    let mut matches = Vec::new();

    for candidate in candidates {
        if !candidate.is_concrete() {
            continue;
        }
        if !is_based_on(candidate, &TargetShape::Generic(*target)) {
            continue;
        }
        if excluded
            .iter()
            .any(|shape| is_based_on(candidate, &TargetShape::Generic(*shape)))
        {
            continue;
        }

        collect_matches(candidate, target, &mut matches)?;
    }

    Ok(matches)
}

fn collect_matches(
    candidate: &CandidateType,
    target: &ShapeDef,
    out: &mut Vec<ShapeMatch>,
) -> BusResult<()> {
    let mut seen: HashSet<Vec<TypeId>> = HashSet::new();
    let mut current = Some(candidate);

    while let Some(ty) = current {
        for imp in ty.interfaces() {
            let instance = imp.instance();
            if instance.def().id() != target.id() {
                continue;
            }
            // 匹配成立但实参与定义元数不符：配置错误（防御性，正常不应发生）
            if instance.args().len() != target.arity() {
                return Err(BusError::UnresolvedShapeArguments {
                    implementation: candidate.name(),
                    shape: target.name(),
                });
            }
            let key: Vec<TypeId> = instance.args().iter().map(|arg| arg.id()).collect();
            if !seen.insert(key) {
                continue;
            }
            out.push(ShapeMatch {
                implementation: candidate.name(),
                args: instance.args().to_vec(),
                bind: imp.bind().cloned(),
            });
        }
        current = ty.base();
    }

    Ok(())
}
