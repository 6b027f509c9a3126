//! 解析两骨骼 IK（余弦定理）
//!
//! 肩-肘-手三角形由两段长度与目标距离唯一确定，剩下的弯曲平面
//! 由极向量决定。结果是"从静止方向旋到目标方向"的本地旋转，
//! 因此依赖骨骼链缓存的绑定静止方向。

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use super::bone_chain::BoneChain;
use super::bone_set::BoneSet;
use super::constraint::ConstraintSet;
use super::ik_solver::{ChainPose, ChainSolver, IkGoal, IkResult};
use super::{direction_or, DEGENERATE_EPSILON};

/// 不可达时有效距离向内收缩的比例，避免三角形退化
const MAX_REACH_SHRINK: f32 = 0.999;
const MIN_REACH_GROW: f32 = 1.001;

/// 余弦定理求两骨骼角度
///
/// 返回 (根关节相对目标方向的偏角, 中间关节弯曲角)，完全伸直时均为 0。
pub fn bend_angles(upper: f32, lower: f32, dist: f32) -> (f32, f32) {
    if upper <= DEGENERATE_EPSILON || lower <= DEGENERATE_EPSILON || dist <= DEGENERATE_EPSILON {
        return (0.0, 0.0);
    }
    let cos_root = ((upper * upper + dist * dist - lower * lower) / (2.0 * upper * dist)).clamp(-1.0, 1.0);
    let cos_middle = ((upper * upper + lower * lower - dist * dist) / (2.0 * upper * lower)).clamp(-1.0, 1.0);
    (cos_root.acos(), PI - cos_middle.acos())
}

/// 解析两骨骼求解器
#[derive(Clone, Copy, Debug)]
pub struct TwoBoneSolver {
    /// 可达范围判定与收敛的容差
    pub tolerance: f32,
}

impl Default for TwoBoneSolver {
    fn default() -> Self {
        Self { tolerance: 1.0e-3 }
    }
}

impl TwoBoneSolver {
    /// 钳制目标距离，返回 (有效距离, 是否在可达范围内)
    fn effective_distance(&self, chain: &BoneChain, dist: f32) -> (f32, bool) {
        let max = chain.max_reach();
        let min = chain.min_reach();
        if dist <= DEGENERATE_EPSILON || dist < min - self.tolerance {
            ((min * MIN_REACH_GROW).max(DEGENERATE_EPSILON), false)
        } else if dist > max + self.tolerance {
            (max * MAX_REACH_SHRINK, false)
        } else {
            (dist.clamp(min, max), true)
        }
    }

    /// 世界空间弯曲方向：目标极向量 > 约束极向量 > 当前肘部偏移 > 任意正交轴
    fn bend_direction(
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
        dir: Vec3,
        current_offset: Vec3,
    ) -> Vec3 {
        let candidates = [
            goal.pole,
            constraints.for_bone(bones, chain.middle).and_then(|c| c.pole),
            Some(current_offset),
        ];
        for pole in candidates.into_iter().flatten() {
            let perpendicular = pole - dir * pole.dot(dir);
            if perpendicular.length() > DEGENERATE_EPSILON {
                return perpendicular.normalize();
            }
        }
        dir.any_orthonormal_vector()
    }
}

impl ChainSolver for TwoBoneSolver {
    fn solve(
        &self,
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
    ) -> IkResult {
        let mut pose = ChainPose::capture(bones, chain);
        let positions = pose.positions();
        let root_pos = positions[0];
        let effector_pos = positions[positions.len() - 1];

        let to_target = goal.position - root_pos;
        let (dist, reachable) = self.effective_distance(chain, to_target.length());

        // 目标与根重合时沿当前手臂方向
        let fallback = direction_or(effector_pos - root_pos, Vec3::X);
        let dir = direction_or(to_target, fallback);

        let bend = Self::bend_direction(
            bones,
            chain,
            goal,
            constraints,
            dir,
            positions[chain.middle_link] - root_pos,
        );

        let (root_angle, _) = bend_angles(chain.upper_len, chain.lower_len, dist);
        let middle_target = root_pos
            + dir * root_angle.cos() * chain.upper_len
            + bend * root_angle.sin() * chain.upper_len;
        let effector_target = root_pos + dir * dist;

        // 根骨骼：静止方向 → 上臂方向
        let worlds = pose.world_matrices();
        let upper_dir = direction_or(middle_target - root_pos, dir);
        let root_rotation = Quat::from_rotation_arc(
            pose.bind_rotations[0] * chain.root_rest_dir,
            pose.parent_rotation(&worlds, 0).inverse() * upper_dir,
        ) * pose.bind_rotations[0];
        pose.rotations[0] = match constraints.for_bone(bones, chain.root) {
            Some(c) => c.clamp_local(pose.bind_rotations[0], root_rotation),
            None => root_rotation.normalize(),
        };

        // 中间骨骼：以实际肘部位置为起点，指向手的目标
        let m = chain.middle_link;
        let worlds = pose.world_matrices();
        let middle_pos = worlds[m].col(3).truncate();
        let lower_dir = direction_or(effector_target - middle_pos, upper_dir);
        let middle_rotation = Quat::from_rotation_arc(
            pose.bind_rotations[m] * chain.middle_rest_dir,
            pose.parent_rotation(&worlds, m).inverse() * lower_dir,
        ) * pose.bind_rotations[m];
        pose.rotations[m] = match constraints.for_bone(bones, chain.middle) {
            Some(c) => c.clamp_local(pose.bind_rotations[m], middle_rotation),
            None => middle_rotation.normalize(),
        };

        let error = pose.effector_position().distance(goal.position);
        IkResult {
            success: reachable && error <= self.tolerance,
            iterations: 1,
            error,
            rotations: pose.into_rotations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::bone_chain::Limb;
    use crate::skeleton::bone_link::BoneDesc;
    use crate::skeleton::bone_set::tests::t_pose_descs;

    fn arm(upper: f32, lower: f32) -> (BoneSet, BoneChain) {
        let descs = vec![
            BoneDesc::new("root", -1, Vec3::ZERO),
            BoneDesc::new("LeftArm", 0, Vec3::ZERO),
            BoneDesc::new("LeftForeArm", 1, Vec3::new(upper, 0.0, 0.0)),
            BoneDesc::new("LeftHand", 2, Vec3::new(lower, 0.0, 0.0)),
        ];
        let set = BoneSet::from_descs(&descs).unwrap();
        let chain = BoneChain::from_limb(&set, Limb::LeftArm).unwrap();
        (set, chain)
    }

    #[test]
    fn test_bend_angles_fully_extended() {
        let (root, middle) = bend_angles(1.0, 1.0, 2.0);
        assert!(root.abs() < 1e-4);
        assert!(middle.abs() < 1e-4);
    }

    #[test]
    fn test_bend_angles_right_triangle() {
        // 3-4-5 三角形：中间关节内角 90°
        let (_, middle) = bend_angles(3.0, 4.0, 5.0);
        assert!((middle - PI / 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_full_extension_is_success() {
        let (set, chain) = arm(1.0, 1.0);
        let goal = IkGoal::new(Vec3::new(0.0, -2.0, 0.0));
        let result = TwoBoneSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success);
        assert_eq!(result.iterations, 1);
        assert!(result.error < 1e-4);
        let (root_angle, bend) = bend_angles(chain.upper_len, chain.lower_len, 2.0);
        assert!(root_angle.abs() < 1e-4 && bend.abs() < 1e-4);
    }

    #[test]
    fn test_target_at_root_is_clamped() {
        let (set, chain) = arm(1.0, 0.6);
        let goal = IkGoal::new(Vec3::ZERO);
        let result = TwoBoneSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(!result.success);
        assert_eq!(result.rotations.len(), 2);
        // 手停在 minReach * 1.001 处
        assert!((result.error - 0.4 * 1.001).abs() < 1e-4);
    }

    #[test]
    fn test_out_of_reach_points_toward_target() {
        let (set, chain) = arm(1.0, 1.0);
        let goal = IkGoal::new(Vec3::new(0.0, 0.0, 5.0));
        let result = TwoBoneSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(!result.success);

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let hand = posed.get_bone(chain.effector).unwrap().position();
        assert!((hand.normalize() - Vec3::Z).length() < 1e-3);
        assert!((hand.length() - 2.0 * 0.999).abs() < 1e-3);
    }

    #[test]
    fn test_reachable_target_with_pole() {
        let set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let chain = BoneChain::from_limb(&set, Limb::LeftArm).unwrap();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.4, 0.0, 0.0)).with_pole(Vec3::NEG_Z);

        let result = TwoBoneSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success);

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let hand = posed.get_bone(chain.effector).unwrap().position();
        let elbow = posed.get_bone(chain.middle).unwrap().position();
        assert!((hand - goal.position).length() < 1e-4);
        assert!(elbow.z < shoulder.z - 0.1);
        assert!((elbow.distance(shoulder) - chain.upper_len).abs() < 1e-4);
    }
}
