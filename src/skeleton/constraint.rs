//! 关节约束 - 逐轴欧拉角限制
//!
//! 限制作用于骨骼相对绑定旋转的增量，XYZ 三轴独立、依次钳制。
//! 多轴互相冲突时不会求最近的合法旋转，极端输入下结果可能落在
//! 各轴限制组合之外。肘 / 膝近似单自由度，影响很小；肩部只是近似。

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{EulerRot, Quat, Vec3};

use super::bone_name::JointClass;
use super::bone_set::BoneSet;

/// 单个关节的约束
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointConstraint {
    /// 角度下限 (弧度，XYZ 欧拉)
    pub limit_min: Vec3,
    /// 角度上限 (弧度，XYZ 欧拉)
    pub limit_max: Vec3,
    /// 偏好的弯曲方向（世界空间极向量）
    pub pole: Option<Vec3>,
}

impl JointConstraint {
    pub fn new(limit_min: Vec3, limit_max: Vec3) -> Self {
        Self {
            limit_min: limit_min.min(limit_max),
            limit_max: limit_min.max(limit_max),
            pole: None,
        }
    }

    pub fn with_pole(mut self, pole: Vec3) -> Self {
        self.pole = Some(pole);
        self
    }

    /// 肘部：手臂沿 ±X 的 T 姿态绑定，主弯曲轴为 Y
    pub fn elbow() -> Self {
        Self::new(Vec3::new(-FRAC_PI_2, -2.6, -0.2), Vec3::new(FRAC_PI_2, 2.6, 0.2))
            .with_pole(Vec3::new(0.0, -1.0, -1.0))
    }

    /// 肩部：三自由度，范围宽
    pub fn shoulder() -> Self {
        Self::new(Vec3::new(-PI, -1.6, -1.6), Vec3::new(PI, 1.6, 1.6))
    }

    /// 膝部：腿沿 -Y 的绑定，只绕 X 向后弯
    pub fn knee() -> Self {
        Self::new(Vec3::new(0.0, -0.1, -0.1), Vec3::new(2.6, 0.1, 0.1))
            .with_pole(Vec3::new(0.0, 0.0, 1.0))
    }

    /// 对旋转做逐轴钳制
    pub fn clamp(&self, rotation: Quat) -> Quat {
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        let x = x.clamp(self.limit_min.x, self.limit_max.x);
        let y = y.clamp(self.limit_min.y, self.limit_max.y);
        let z = z.clamp(self.limit_min.z, self.limit_max.z);
        Quat::from_euler(EulerRot::XYZ, x, y, z)
    }

    /// 对本地旋转中相对绑定旋转的增量做钳制
    pub fn clamp_local(&self, bind_rotation: Quat, local: Quat) -> Quat {
        let delta = bind_rotation.inverse() * local;
        (bind_rotation * self.clamp(delta)).normalize()
    }

    /// 旋转是否在限制内
    pub fn contains(&self, rotation: Quat) -> bool {
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        let v = Vec3::new(x, y, z);
        v.cmpge(self.limit_min - Vec3::splat(1e-5)).all() && v.cmple(self.limit_max + Vec3::splat(1e-5)).all()
    }
}

/// 按关节类别组织的约束集合
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet {
    pub shoulder: Option<JointConstraint>,
    pub elbow: Option<JointConstraint>,
    pub hip: Option<JointConstraint>,
    pub knee: Option<JointConstraint>,
}

impl ConstraintSet {
    /// 不设约束
    pub fn none() -> Self {
        Self::default()
    }

    /// 人体预设
    pub fn humanoid() -> Self {
        Self {
            shoulder: Some(JointConstraint::shoulder()),
            elbow: Some(JointConstraint::elbow()),
            hip: None,
            knee: Some(JointConstraint::knee()),
        }
    }

    pub fn for_class(&self, class: JointClass) -> Option<&JointConstraint> {
        match class {
            JointClass::Shoulder => self.shoulder.as_ref(),
            JointClass::Elbow => self.elbow.as_ref(),
            JointClass::Hip => self.hip.as_ref(),
            JointClass::Knee => self.knee.as_ref(),
            JointClass::Other => None,
        }
    }

    /// 按骨骼的规范名查找约束
    pub fn for_bone(&self, bones: &BoneSet, idx: usize) -> Option<&JointConstraint> {
        let class = bones.get_bone(idx)?.canonical?.joint_class();
        self.for_class(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_rotation_unchanged() {
        let c = JointConstraint::elbow();
        let q = Quat::from_rotation_y(1.0);
        assert!(c.clamp(q).angle_between(q) < 1e-5);
        assert!(c.contains(q));
    }

    #[test]
    fn test_out_of_range_axis_clamped() {
        let c = JointConstraint::knee();
        let q = Quat::from_rotation_x(-0.8);
        let clamped = c.clamp(q);
        assert!(clamped.angle_between(Quat::IDENTITY) < 1e-5);

        let twist = Quat::from_rotation_z(1.0);
        let (_, _, z) = c.clamp(twist).to_euler(EulerRot::XYZ);
        assert!((z - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_local_relative_to_bind() {
        let c = JointConstraint::knee();
        let bind = Quat::from_rotation_y(0.5);
        // 相对绑定增量 x = 3.0，超过 2.6
        let local = bind * Quat::from_rotation_x(3.0);
        let clamped = c.clamp_local(bind, local);
        let delta = bind.inverse() * clamped;
        assert!((delta.angle_between(Quat::IDENTITY) - 2.6).abs() < 1e-3);
    }

    #[test]
    fn test_constraint_set_lookup() {
        let set = ConstraintSet::humanoid();
        assert!(set.for_class(JointClass::Elbow).is_some());
        assert!(set.for_class(JointClass::Other).is_none());
        assert!(ConstraintSet::none().for_class(JointClass::Knee).is_none());
    }
}
