//! 骨骼节点
//!
//! BoneLink 是骨骼系统的核心单元，每个 BoneLink 代表层次中的一个节点。
//! 绑定姿态数据在加载时确定，之后只有动画 / IK 旋转每帧变化。

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

use super::bone_name::BoneName;
use super::BoneTransform;

// ============================================================================
// 骨骼标志
// ============================================================================

bitflags! {
    /// 骨骼标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BoneFlags: u32 {
        /// 本地旋转由 IK 结果覆盖
        const IK_ENABLED = 1 << 0;
        /// 手指骨骼（不参与规范名匹配）
        const FINGER = 1 << 1;
        /// 属于手臂
        const ARM = 1 << 2;
        /// 属于腿部
        const LEG = 1 << 3;
    }
}

// ============================================================================
// 原始骨骼描述
// ============================================================================

/// 资源加载层提供的原始骨骼描述
#[derive(Clone, Debug)]
pub struct BoneDesc {
    pub name: String,
    /// 父骨骼索引 (-1 表示根骨骼)
    pub parent: i32,
    /// 绑定姿态下相对父骨骼的变换
    pub bind: BoneTransform,
}

impl BoneDesc {
    pub fn new(name: impl Into<String>, parent: i32, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            parent,
            bind: BoneTransform {
                translation,
                ..Default::default()
            },
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.bind.rotation = rotation;
        self
    }
}

// ============================================================================
// 骨骼节点
// ============================================================================

/// 骨骼节点
///
/// 变换计算：local_to_world = parent.local_to_world * local_to_parent
#[derive(Clone, Debug)]
pub struct BoneLink {
    // ========================================
    // 静态数据（初始化后不变）
    // ========================================
    /// 骨骼名称（原始）
    pub name: String,

    /// 父骨骼索引 (-1 表示根骨骼)
    pub parent_index: i32,

    /// 解析出的规范名
    pub canonical: Option<BoneName>,

    /// 骨骼标志
    pub flags: BoneFlags,

    /// 绑定姿态本地变换
    pub bind: BoneTransform,

    /// 绑定姿态世界位置（模型缩放为 1 时）
    pub initial_position: Vec3,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================
    /// 动画旋转（叠加在绑定旋转之上）
    pub animation_rotate: Quat,

    /// IK 旋转（完整的本地旋转，启用时替换绑定 * 动画）
    pub ik_rotate: Quat,

    /// 本地变换矩阵 (local_to_parent)
    pub local_to_parent: Mat4,

    /// 全局变换矩阵 (local_to_world)
    pub local_to_world: Mat4,

    /// 是否为叶节点
    pub(crate) is_leaf: bool,
}

impl BoneLink {
    /// 创建新骨骼
    pub fn new(name: String) -> Self {
        Self {
            name,
            parent_index: -1,
            canonical: None,
            flags: BoneFlags::empty(),
            bind: BoneTransform::default(),
            initial_position: Vec3::ZERO,
            animation_rotate: Quat::IDENTITY,
            ik_rotate: Quat::IDENTITY,
            local_to_parent: Mat4::IDENTITY,
            local_to_world: Mat4::IDENTITY,
            is_leaf: true,
        }
    }

    /// 从原始描述创建
    pub fn from_desc(desc: &BoneDesc) -> Self {
        let mut bone = Self::new(desc.name.clone());
        bone.parent_index = desc.parent;
        bone.bind = desc.bind;
        bone.ik_rotate = desc.bind.rotation;
        bone.compute_local_transform();
        bone
    }

    // ========================================
    // 访问器
    // ========================================

    /// 父骨骼索引
    #[inline]
    pub fn parent_id(&self) -> Option<usize> {
        if self.parent_index >= 0 {
            Some(self.parent_index as usize)
        } else {
            None
        }
    }

    /// 是否为根骨骼
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_index < 0
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// 获取世界位置
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.col(3).truncate()
    }

    /// 获取世界旋转
    #[inline]
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.local_to_world.to_scale_rotation_translation();
        rotation
    }

    /// 当前本地旋转
    #[inline]
    pub fn local_rotation(&self) -> Quat {
        if self.flags.contains(BoneFlags::IK_ENABLED) {
            self.ik_rotate
        } else {
            self.bind.rotation * self.animation_rotate
        }
    }

    // ========================================
    // 变换计算
    // ========================================

    /// 重置动画状态
    #[inline]
    pub fn reset_animation(&mut self) {
        self.animation_rotate = Quat::IDENTITY;
        self.ik_rotate = self.bind.rotation;
        self.flags.remove(BoneFlags::IK_ENABLED);
    }

    /// 计算本地变换 (local_to_parent)
    ///
    /// 平移与缩放始终取绑定值，旋转见 `local_rotation`
    pub fn compute_local_transform(&mut self) {
        self.local_to_parent = Mat4::from_scale_rotation_translation(
            self.bind.scale,
            self.local_rotation(),
            self.bind.translation,
        );
    }

    // ========================================
    // 标志检查方法
    // ========================================

    #[inline]
    pub fn is_finger(&self) -> bool {
        self.flags.contains(BoneFlags::FINGER)
    }

    #[inline]
    pub fn enable_ik(&self) -> bool {
        self.flags.contains(BoneFlags::IK_ENABLED)
    }

    #[inline]
    pub fn set_enable_ik(&mut self, enabled: bool) {
        if enabled {
            self.flags.insert(BoneFlags::IK_ENABLED);
        } else {
            self.flags.remove(BoneFlags::IK_ENABLED);
        }
    }
}

impl Default for BoneLink {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_rotation_switches_on_ik_flag() {
        let desc = BoneDesc::new("arm", -1, Vec3::X).with_rotation(Quat::from_rotation_y(0.3));
        let mut bone = BoneLink::from_desc(&desc);
        bone.animation_rotate = Quat::from_rotation_z(0.2);
        let animated = bone.local_rotation();
        assert!(animated.angle_between(Quat::from_rotation_y(0.3) * Quat::from_rotation_z(0.2)) < 1e-5);

        bone.ik_rotate = Quat::from_rotation_x(1.0);
        bone.set_enable_ik(true);
        assert!(bone.local_rotation().angle_between(Quat::from_rotation_x(1.0)) < 1e-5);

        bone.reset_animation();
        assert!(!bone.enable_ik());
        assert!(bone.local_rotation().angle_between(Quat::from_rotation_y(0.3)) < 1e-5);
    }

    #[test]
    fn test_local_transform_keeps_bind_translation() {
        let mut bone = BoneLink::from_desc(&BoneDesc::new("b", 0, Vec3::new(0.0, 2.0, 0.0)));
        bone.ik_rotate = Quat::from_rotation_z(1.2);
        bone.set_enable_ik(true);
        bone.compute_local_transform();
        assert!((bone.local_to_parent.col(3).truncate() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }
}
