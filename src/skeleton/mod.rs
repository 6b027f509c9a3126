//! 骨骼系统
//!
//! 核心设计思想：
//! - BoneLink: 单个骨骼节点
//! - BoneSet: 骨骼层次结构（按索引存储的骨骼数组 + 规范名映射）
//! - BoneChain: 根-中-末端骨骼链，保存绑定姿态下的长度与静止方向
//! - IkSolver: 三种可替换的 IK 算法（解析两骨骼 / CCD / FABRIK）

mod bone_chain;
mod bone_link;
mod bone_name;
mod bone_set;
mod ccd;
mod constraint;
mod fabrik;
mod ik_solver;
mod two_bone;

pub use bone_chain::{BoneChain, Limb};
pub use bone_link::{BoneDesc, BoneFlags, BoneLink};
pub use bone_name::{is_finger_name, normalize_bone_name, BoneName, JointClass, Side};
pub use bone_set::BoneSet;
pub use ccd::CcdSolver;
pub use constraint::{ConstraintSet, JointConstraint};
pub use fabrik::FabrikSolver;
pub use ik_solver::{BoneRotation, ChainSolver, IkAlgorithm, IkGoal, IkResult, IkSolver};
pub use two_bone::{bend_angles, TwoBoneSolver};

#[cfg(test)]
pub(crate) use bone_set::tests::t_pose_descs;

use glam::{Mat4, Quat, Vec3};

// ============================================================================
// 公共类型定义
// ============================================================================

/// 骨骼变换数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    /// 转换为 4x4 矩阵
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// 单位化，长度过小时返回备用轴
#[inline]
pub(crate) fn direction_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len = v.length();
    if len > DEGENERATE_EPSILON {
        v / len
    } else {
        fallback
    }
}

/// 退化几何判定阈值
pub(crate) const DEGENERATE_EPSILON: f32 = 1.0e-6;
