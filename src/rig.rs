//! 表演者骨架 - 每帧入口
//!
//! 单线程、帧驱动。`tick(dt)` 按固定顺序执行：
//! 姿态混合 → 左右手臂各自 IK → 按权重应用 → 手腕旋转 → 头部注视 → 刷新矩阵。
//! 缩放与重建骨骼链只能在两次 tick 之间调用。

use glam::{Quat, Vec3};

use crate::animation::{BodyPose, HandPose, PoseBlender, RetargetedClip};
use crate::config::{get_config, EngineConfig};
use crate::error::Result;
use crate::motion::PropState;
use crate::skeleton::{
    BoneChain, BoneDesc, BoneName, BoneSet, ConstraintSet, IkAlgorithm, IkGoal, IkResult,
    IkSolver, Limb, Side,
};

/// 单帧输出
#[derive(Clone, Debug, PartialEq)]
pub struct RigFrame {
    /// 本帧组合后的姿态
    pub pose: BodyPose,
    /// 缺少手臂骨骼链时为 None
    pub left: Option<IkResult>,
    pub right: Option<IkResult>,
}

impl RigFrame {
    pub fn result(&self, side: Side) -> Option<&IkResult> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

/// 表演者骨架
#[derive(Clone, Debug)]
pub struct PerformerRig {
    bones: BoneSet,
    left_arm: Option<BoneChain>,
    right_arm: Option<BoneChain>,
    blender: PoseBlender,
    solver: IkSolver,
    constraints: ConstraintSet,
    /// 肘部极向量（世界空间）
    pub arm_pole: Vec3,
    debug_log: bool,
}

impl PerformerRig {
    /// 使用全局配置快照创建
    pub fn new(descs: &[BoneDesc]) -> Result<Self> {
        Self::with_config(descs, &get_config())
    }

    pub fn with_config(descs: &[BoneDesc], config: &EngineConfig) -> Result<Self> {
        let bones = BoneSet::from_descs(descs)?;
        let mut rig = Self {
            bones,
            left_arm: None,
            right_arm: None,
            blender: PoseBlender::from_config(config),
            solver: IkSolver::from_config(config),
            constraints: ConstraintSet::none(),
            arm_pole: config.arm_pole,
            debug_log: config.debug_log,
        };
        rig.rebuild_chains();

        // 初始目标放在绑定姿态的手上，避免第一帧手臂被拉向原点
        let mut rest = BodyPose::default();
        for side in [Side::Left, Side::Right] {
            if let Some(chain) = rig.arm(side) {
                let hand = rig.bones.get_bone(chain.effector).map(|b| b.position());
                rest.hand_mut(side).target_position = hand.unwrap_or(Vec3::ZERO);
            }
        }
        rig.blender.snap_to(rest);

        if rig.debug_log {
            log::info!(
                "[Rig] 创建完成: {} 根骨骼, 左臂={}, 右臂={}, 算法={:?}",
                rig.bones.len(),
                rig.left_arm.is_some(),
                rig.right_arm.is_some(),
                rig.solver.algorithm
            );
        }
        Ok(rig)
    }

    // ========================================
    // 访问
    // ========================================

    pub fn bones(&self) -> &BoneSet {
        &self.bones
    }

    pub fn arm(&self, side: Side) -> Option<&BoneChain> {
        match side {
            Side::Left => self.left_arm.as_ref(),
            Side::Right => self.right_arm.as_ref(),
        }
    }

    pub fn blender(&self) -> &PoseBlender {
        &self.blender
    }

    pub fn blender_mut(&mut self) -> &mut PoseBlender {
        &mut self.blender
    }

    pub fn solver(&self) -> &IkSolver {
        &self.solver
    }

    pub fn set_algorithm(&mut self, algorithm: IkAlgorithm) {
        self.solver.algorithm = algorithm;
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn set_constraints(&mut self, constraints: ConstraintSet) {
        self.constraints = constraints;
    }

    // ========================================
    // 缩放
    // ========================================

    /// 按当前模型缩放重建手臂骨骼链
    fn rebuild_chains(&mut self) {
        self.left_arm = BoneChain::from_limb(&self.bones, Limb::LeftArm);
        self.right_arm = BoneChain::from_limb(&self.bones, Limb::RightArm);
        for (side, chain) in [(Side::Left, &self.left_arm), (Side::Right, &self.right_arm)] {
            if chain.is_none() {
                log::warn!("[Rig] 缺少 {:?} 手臂骨骼，该侧不做 IK", side);
            }
        }
    }

    pub fn set_model_scale(&mut self, scale: f32) {
        self.bones.set_model_scale(scale);
        self.rebuild_chains();
    }

    /// 缩放到表演者身高，返回使用的缩放值
    pub fn scale_to_height(&mut self, height: f32) -> f32 {
        let scale = self.bones.scale_to_height(height);
        self.rebuild_chains();
        if self.debug_log {
            log::info!("[Rig] 按身高 {:.3} 缩放: scale={:.4}", height, scale);
        }
        scale
    }

    // ========================================
    // 目标
    // ========================================

    /// 设置目标姿态（由混合器逐帧逼近）
    pub fn set_target(&mut self, pose: BodyPose) {
        self.blender.set_target(pose);
    }

    pub fn set_hand_target(&mut self, side: Side, hand: HandPose) {
        let mut target = *self.blender.target();
        *target.hand_mut(side) = hand;
        self.blender.set_target(target);
    }

    /// 用道具状态驱动某只手：位置跟随道具，手腕跟随道具旋转
    pub fn set_prop_target(&mut self, side: Side, prop: &PropState) {
        let mut target = *self.blender.target();
        let hand = target.hand_mut(side);
        hand.target_position = prop.world_position;
        hand.wrist_rotation = Some(prop.world_rotation);
        self.blender.set_target(target);
    }

    pub fn set_head_look(&mut self, target: Option<Vec3>) {
        let mut pose = *self.blender.target();
        pose.head_look = target;
        self.blender.set_target(pose);
    }

    /// 在指定时间采样重定向后的腿部片段
    pub fn apply_leg_clip(&mut self, clip: &RetargetedClip, time: f32) {
        clip.apply(&mut self.bones, time);
    }

    // ========================================
    // 每帧
    // ========================================

    /// 推进一帧
    pub fn tick(&mut self, dt: f32) -> RigFrame {
        let pose = self.blender.tick(dt);

        let left = self.solve_arm(Side::Left, pose.hand(Side::Left));
        let right = self.solve_arm(Side::Right, pose.hand(Side::Right));

        if let Some(target) = pose.head_look {
            self.aim_head(target);
        }
        self.bones.update_global_transforms();

        if self.debug_log {
            log::debug!(
                "[Rig] tick dt={:.4} left={:?} right={:?}",
                dt,
                left.as_ref().map(|r| (r.success, r.error)),
                right.as_ref().map(|r| (r.success, r.error))
            );
        }

        RigFrame { pose, left, right }
    }

    fn solve_arm(&mut self, side: Side, hand: &HandPose) -> Option<IkResult> {
        let chain = self.arm(side)?;
        let effector = chain.effector;
        let goal = IkGoal::new(hand.target_position).with_pole(self.arm_pole);
        let result = self.solver.solve(&self.bones, chain, &goal, &self.constraints);

        // 不可达时仍然应用尽力而为的结果
        self.bones.apply_ik_result(&result, hand.weight);

        if let Some(world_rotation) = hand.wrist_rotation {
            let parent = self.bones.parent_world_rotation(effector);
            let local = (parent.inverse() * world_rotation).normalize();
            let weight = hand.weight.clamp(0.0, 1.0);
            if let Some(bone) = self.bones.get_bone(effector) {
                let blended = bone.local_rotation().slerp(local, weight);
                self.bones.set_local_rotation(effector, blended);
                self.bones.update_global_transform_recursive(effector);
            }
        }
        Some(result)
    }

    /// 头部朝向目标点（表演者面向 +Z）
    fn aim_head(&mut self, target: Vec3) {
        let Some(head) = self.bones.canonical_index(BoneName::Head) else {
            return;
        };
        let Some(bone) = self.bones.get_bone(head) else {
            return;
        };
        let to_target = target - bone.position();
        if to_target.length() < 1.0e-6 {
            return;
        }

        let bind_rotation = bone.bind.rotation;
        let (_, bind_world, _) = self.bones.bind_world_matrix(head).to_scale_rotation_translation();
        // 头骨骼本地空间中的"正前方"
        let forward_local = bind_world.inverse() * Vec3::Z;
        let parent = self.bones.parent_world_rotation(head);
        let rotation = Quat::from_rotation_arc(
            bind_rotation * forward_local,
            parent.inverse() * to_target.normalize(),
        ) * bind_rotation;
        self.bones.set_local_rotation(head, rotation.normalize());
    }
}
