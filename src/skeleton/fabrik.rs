//! FABRIK IK（前后向到达）
//!
//! 在关节位置上迭代：先把末端拉到目标并向根回推，再把根钉回原位向末端推进，
//! 两趟都保持分段长度。收敛后按位置逐段换算出骨骼旋转。
//!
//! 伸直的链条与目标共线时前后向无法弯曲，此时先按极向量给中间关节一个
//! 三角形初值；接近满伸展时 FABRIK 本身收敛很慢，这个初值也避免了那里的残差。

use glam::{Quat, Vec3};

use super::bone_chain::BoneChain;
use super::bone_set::BoneSet;
use super::constraint::ConstraintSet;
use super::ik_solver::{ChainPose, ChainSolver, IkGoal, IkResult};
use super::{direction_or, DEGENERATE_EPSILON};

/// 中间关节偏离"根→末端"连线小于该比例（相对总长）时视为伸直
const POLE_BIAS: f32 = 0.05;

/// FABRIK 求解器
#[derive(Clone, Copy, Debug)]
pub struct FabrikSolver {
    pub max_iterations: u32,
    pub tolerance: f32,
}

impl Default for FabrikSolver {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            tolerance: 1.0e-3,
        }
    }
}

impl FabrikSolver {
    /// 前向：末端钉到目标，向根回推
    fn forward_pass(points: &mut [Vec3], lengths: &[f32], target: Vec3) {
        let last = points.len() - 1;
        points[last] = target;
        for i in (0..last).rev() {
            let dir = direction_or(points[i] - points[i + 1], Vec3::NEG_X);
            points[i] = points[i + 1] + dir * lengths[i];
        }
    }

    /// 后向：根钉回原位，向末端推进
    fn backward_pass(points: &mut [Vec3], lengths: &[f32], root: Vec3) {
        points[0] = root;
        for i in 0..points.len() - 1 {
            let dir = direction_or(points[i + 1] - points[i], Vec3::X);
            points[i + 1] = points[i] + dir * lengths[i];
        }
    }

    /// 绕"根→末端"轴整体旋转中间关节，使弯曲平面朝向极向量
    fn align_to_pole(points: &mut [Vec3], middle: usize, pole: Vec3) {
        let last = points.len() - 1;
        let root = points[0];
        let axis = points[last] - root;
        if axis.length() < DEGENERATE_EPSILON {
            return;
        }
        let axis = axis.normalize();
        let bend = points[middle] - root;
        let bend = bend - axis * bend.dot(axis);
        let pole = pole - axis * pole.dot(axis);
        if bend.length() < DEGENERATE_EPSILON || pole.length() < DEGENERATE_EPSILON {
            return;
        }
        let twist = Quat::from_rotation_arc(bend.normalize(), pole.normalize());
        for p in &mut points[1..last] {
            *p = root + twist * (*p - root);
        }
    }

    /// 链条几乎伸直时无法区分弯曲侧：按上下两段的三角形把中间关节
    /// 放到极向量一侧，其余关节按累计长度落在两段连线上。
    /// 返回是否改写了关节位置。
    fn seed_bend(points: &mut [Vec3], middle: usize, lengths: &[f32], target: Vec3, pole: Vec3) -> bool {
        let last = points.len() - 1;
        let root = points[0];
        let total: f32 = lengths.iter().sum();
        let axis = direction_or(points[last] - root, Vec3::X);
        let offset = points[middle] - root;
        if (offset - axis * offset.dot(axis)).length() >= POLE_BIAS * total {
            return false;
        }

        let upper: f32 = lengths[..middle].iter().sum();
        let lower = total - upper;
        let to_target = target - root;
        let dist = to_target.length();
        if upper < DEGENERATE_EPSILON || lower < DEGENERATE_EPSILON || dist < DEGENERATE_EPSILON {
            return false;
        }
        let dir = to_target / dist;
        let side = pole - dir * pole.dot(dir);
        if side.length() < DEGENERATE_EPSILON {
            return false;
        }

        let along = ((upper * upper - lower * lower + dist * dist) / (2.0 * dist)).clamp(-upper, upper);
        let height = (upper * upper - along * along).max(0.0).sqrt();
        let elbow = root + dir * along + side.normalize() * height;
        let end = elbow + direction_or(target - elbow, dir) * lower;

        let mut covered = 0.0;
        for i in 1..=last {
            covered += lengths[i - 1];
            points[i] = if i <= middle {
                root.lerp(elbow, covered / upper)
            } else {
                elbow.lerp(end, (covered - upper) / lower)
            };
        }
        true
    }

    /// 按求得的关节位置逐段换算骨骼旋转
    fn apply_positions(
        pose: &mut ChainPose,
        points: &[Vec3],
        bones: &BoneSet,
        constraints: &ConstraintSet,
    ) {
        for i in 0..pose.len() - 1 {
            let worlds = pose.world_matrices();
            let joint = worlds[i].col(3).truncate();
            let child = worlds[i + 1].col(3).truncate();
            let current = child - joint;
            let desired = points[i + 1] - joint;
            if current.length() < DEGENERATE_EPSILON || desired.length() < DEGENERATE_EPSILON {
                continue;
            }
            let delta = Quat::from_rotation_arc(current.normalize(), desired.normalize());
            pose.rotate_world(&worlds, i, delta);
            pose.constrain(i, bones, constraints);
        }
    }
}

impl ChainSolver for FabrikSolver {
    fn solve(
        &self,
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
    ) -> IkResult {
        let mut pose = ChainPose::capture(bones, chain);
        let mut points = pose.positions();
        let lengths = &chain.segment_lengths;
        let root = points[0];
        let total = chain.total_len();
        let last = points.len() - 1;

        let pole = goal
            .pole
            .or_else(|| constraints.for_bone(bones, chain.middle).and_then(|c| c.pole));

        let to_target = goal.position - root;
        let reachable = to_target.length() <= total + self.tolerance;
        let mut iterations = 0;

        if !reachable {
            // 不可达：沿目标方向伸直
            let dir = direction_or(to_target, direction_or(points[last] - root, Vec3::X));
            for i in 0..last {
                points[i + 1] = points[i] + dir * lengths[i];
            }
            iterations = 1;
        } else {
            let mut seeded = pole.is_some_and(|pole| {
                Self::seed_bend(&mut points, chain.middle_link, lengths, goal.position, pole)
            });
            while iterations < self.max_iterations {
                // 改写过的初始位置至少走一趟前后向
                if !seeded && points[last].distance(goal.position) <= self.tolerance {
                    break;
                }
                seeded = false;
                Self::forward_pass(&mut points, lengths, goal.position);
                Self::backward_pass(&mut points, lengths, root);
                iterations += 1;
            }
            if let Some(pole) = pole {
                Self::align_to_pole(&mut points, chain.middle_link, pole);
            }
        }

        Self::apply_positions(&mut pose, &points, bones, constraints);

        let error = pose.effector_position().distance(goal.position);
        IkResult {
            success: reachable && error <= self.tolerance,
            iterations,
            error,
            rotations: pose.into_rotations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::bone_chain::Limb;
    use crate::skeleton::bone_set::tests::t_pose_descs;

    fn left_arm() -> (BoneSet, BoneChain) {
        let set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let chain = BoneChain::from_limb(&set, Limb::LeftArm).unwrap();
        (set, chain)
    }

    #[test]
    fn test_converges_on_reachable_target() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.25, -0.2, 0.1));
        let solver = FabrikSolver::default();
        let result = solver.solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success, "error {}", result.error);
        assert!(result.iterations <= solver.max_iterations);
    }

    #[test]
    fn test_unreachable_target_straightens_chain() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.0, 0.0, 3.0));
        let result = FabrikSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(!result.success);

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let hand = posed.get_bone(chain.effector).unwrap().position();
        let elbow = posed.get_bone(chain.middle).unwrap().position();
        assert!((hand - (shoulder + Vec3::new(0.0, 0.0, 0.6))).length() < 1e-4);
        assert!((elbow - (shoulder + Vec3::new(0.0, 0.0, 0.3))).length() < 1e-4);
    }

    #[test]
    fn test_pole_selects_bend_side() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.4, 0.0, 0.0)).with_pole(Vec3::Y);
        let result = FabrikSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success);

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let elbow = posed.get_bone(chain.middle).unwrap().position();
        assert!(elbow.y > shoulder.y + 0.1);
    }

    #[test]
    fn test_goal_at_current_hand_with_pole() {
        let (set, chain) = left_arm();
        let hand = set.get_bone(chain.effector).unwrap().position();
        let goal = IkGoal::new(hand).with_pole(Vec3::new(0.0, -1.0, -1.0));
        let result = FabrikSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());
        assert!(result.success, "error {}", result.error);
        assert!(result.iterations >= 1);

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let reached = posed.get_bone(chain.effector).unwrap().position();
        assert!((reached - hand).length() < 2e-3);
    }

    #[test]
    fn test_near_full_reach_and_deep_fold_converge() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let solver = FabrikSolver::default();
        for dist in [0.59, 0.599, 0.1] {
            let goal = IkGoal::new(shoulder + Vec3::new(dist, 0.0, 0.0)).with_pole(Vec3::NEG_Y);
            let result = solver.solve(&set, &chain, &goal, &ConstraintSet::none());
            assert!(result.success, "dist {} error {}", dist, result.error);

            let mut posed = set.clone();
            posed.apply_ik_result(&result, 1.0);
            let elbow = posed.get_bone(chain.middle).unwrap().position();
            if dist < 0.5 {
                assert!(elbow.y < shoulder.y - 0.1);
            }
        }
    }

    #[test]
    fn test_segment_lengths_preserved() {
        let (set, chain) = left_arm();
        let shoulder = set.get_bone(chain.root).unwrap().position();
        let goal = IkGoal::new(shoulder + Vec3::new(0.1, -0.3, 0.2));
        let result = FabrikSolver::default().solve(&set, &chain, &goal, &ConstraintSet::none());

        let mut posed = set.clone();
        posed.apply_ik_result(&result, 1.0);
        let elbow = posed.get_bone(chain.middle).unwrap().position();
        let hand = posed.get_bone(chain.effector).unwrap().position();
        assert!((elbow.distance(shoulder) - chain.upper_len).abs() < 1e-4);
        assert!((hand.distance(elbow) - chain.lower_len).abs() < 1e-4);
    }
}
