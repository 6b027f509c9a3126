//! CCD IK（循环坐标下降）
//!
//! 每次迭代从末端的父骨骼向根逐个旋转，使"关节→末端"对准"关节→目标"。
//! 单步角度受 `max_step` 限制，每根骨骼更新后立即套用约束。
//!
//! 终止条件：末端进入 `tolerance`、达到 `max_iterations`，或某一趟迭代
//! 没有减小误差（此时恢复到目前最好的姿态；被约束卡住时继续迭代不会再改进）。

use glam::Quat;

use super::bone_chain::BoneChain;
use super::bone_set::BoneSet;
use super::constraint::ConstraintSet;
use super::ik_solver::{ChainPose, ChainSolver, IkGoal, IkResult};
use super::DEGENERATE_EPSILON;

/// CCD 求解器
#[derive(Clone, Copy, Debug)]
pub struct CcdSolver {
    pub max_iterations: u32,
    pub tolerance: f32,
    /// 单根骨骼单步最大旋转角（弧度）
    pub max_step: f32,
}

impl Default for CcdSolver {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            tolerance: 1.0e-3,
            max_step: std::f32::consts::FRAC_PI_4,
        }
    }
}

impl CcdSolver {
    /// 单次迭代：末端父骨骼 → 根
    fn solve_iteration(
        &self,
        pose: &mut ChainPose,
        goal: &IkGoal,
        bones: &BoneSet,
        constraints: &ConstraintSet,
    ) {
        let effector = pose.len() - 1;
        for i in (0..effector).rev() {
            let worlds = pose.world_matrices();
            let joint_pos = worlds[i].col(3).truncate();
            let effector_pos = worlds[effector].col(3).truncate();

            let to_effector = effector_pos - joint_pos;
            let to_target = goal.position - joint_pos;
            if to_effector.length() < DEGENERATE_EPSILON || to_target.length() < DEGENERATE_EPSILON {
                continue;
            }

            let delta = Quat::from_rotation_arc(to_effector.normalize(), to_target.normalize());
            let (axis, angle) = delta.to_axis_angle();
            if angle < 1.0e-5 {
                continue;
            }
            let delta = if angle > self.max_step {
                Quat::from_axis_angle(axis, self.max_step)
            } else {
                delta
            };

            pose.rotate_world(&worlds, i, delta);
            pose.constrain(i, bones, constraints);
        }
    }
}

impl ChainSolver for CcdSolver {
    fn solve(
        &self,
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
    ) -> IkResult {
        let mut pose = ChainPose::capture(bones, chain);
        let mut best_error = pose.effector_position().distance(goal.position);
        let mut best_rotations = pose.rotations.clone();
        let mut iterations = 0;

        while iterations < self.max_iterations && best_error > self.tolerance {
            self.solve_iteration(&mut pose, goal, bones, constraints);
            iterations += 1;

            let error = pose.effector_position().distance(goal.position);
            if error < best_error {
                best_error = error;
                best_rotations.clone_from(&pose.rotations);
            } else {
                // 没有改进：恢复最佳结果并退出
                break;
            }
        }

        pose.rotations = best_rotations;
        IkResult {
            success: best_error <= self.tolerance,
            iterations,
            error: best_error,
            rotations: pose.into_rotations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::bone_chain::Limb;
    use crate::skeleton::bone_set::tests::t_pose_descs;
    use glam::Vec3;

    fn left_arm() -> (BoneSet, BoneChain) {
        let set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let chain = BoneChain::from_limb(&set, Limb::LeftArm).unwrap();
        (set, chain)
    }

    #[test]
    fn test_converges_on_reachable_target() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.2, -0.3, 0.15));
        let solver = CcdSolver {
            max_iterations: 64,
            ..CcdSolver::default()
        };
        let result = solver.solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success, "error {}", result.error);
        assert!(result.iterations <= solver.max_iterations);
        assert!(result.error <= solver.tolerance);
    }

    #[test]
    fn test_unreachable_target_reports_failure() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.0, -2.0, 0.0));
        let result = CcdSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(!result.success);
        assert_eq!(result.rotations.len(), 2);
        // 尽力而为：末端离目标的距离接近 2.0 - 0.6
        assert!(result.error < 1.45);
    }

    #[test]
    fn test_already_at_target_needs_no_iteration() {
        let (set, chain) = left_arm();
        let hand = set.get_bone(chain.effector).unwrap().position();
        let result = CcdSolver::default().solve(&set, &chain, &IkGoal::new(hand), &ConstraintSet::none());
        assert!(result.success);
        assert_eq!(result.iterations, 0);
    }
}
