//! IK 求解器接口
//!
//! 设计原则：
//! - 三种算法实现同一个 `ChainSolver` 接口，由调用方用枚举选择
//! - 求解只读骨骼数据，在局部副本上迭代，结果一次性返回
//! - 目标不可达不是错误：`success = false`，仍返回尽力而为的旋转

use glam::{Mat4, Quat, Vec3};

use crate::config::EngineConfig;

use super::bone_chain::BoneChain;
use super::bone_set::BoneSet;
use super::ccd::CcdSolver;
use super::constraint::ConstraintSet;
use super::fabrik::FabrikSolver;
use super::two_bone::TwoBoneSolver;

// ============================================================================
// 结果类型
// ============================================================================

/// 单根骨骼的求解结果（完整本地旋转）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneRotation {
    pub bone: usize,
    pub rotation: Quat,
}

/// 单次求解结果
#[derive(Clone, Debug, PartialEq)]
pub struct IkResult {
    /// 目标在可达范围内且已收敛
    pub success: bool,
    /// 实际迭代次数（解析解为 1）
    pub iterations: u32,
    /// 末端到目标的剩余距离
    pub error: f32,
    /// 从根到末端排列的骨骼旋转
    pub rotations: Vec<BoneRotation>,
}

impl IkResult {
    /// 查找某根骨骼的旋转
    pub fn rotation_of(&self, bone: usize) -> Option<Quat> {
        self.rotations.iter().find(|r| r.bone == bone).map(|r| r.rotation)
    }
}

/// 求解目标
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkGoal {
    /// 世界空间目标位置
    pub position: Vec3,
    /// 世界空间极向量（中间关节弯曲朝向）
    pub pole: Option<Vec3>,
}

impl IkGoal {
    pub fn new(position: Vec3) -> Self {
        Self { position, pole: None }
    }

    pub fn with_pole(mut self, pole: Vec3) -> Self {
        self.pole = Some(pole);
        self
    }
}

// ============================================================================
// 求解接口
// ============================================================================

/// IK 算法接口
pub trait ChainSolver {
    fn solve(
        &self,
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
    ) -> IkResult;
}

/// IK 算法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum IkAlgorithm {
    /// 解析两骨骼（默认）
    #[default]
    TwoBone,
    /// 循环坐标下降
    Ccd,
    /// 前后向到达
    Fabrik,
}

/// IK 求解器（按枚举分发到具体算法）
#[derive(Clone, Debug)]
pub struct IkSolver {
    pub algorithm: IkAlgorithm,
    /// 迭代算法最大迭代次数
    pub max_iterations: u32,
    /// 收敛距离
    pub tolerance: f32,
    /// CCD 单步最大旋转角
    pub max_step: f32,
}

impl IkSolver {
    /// 创建新的 IK 求解器
    pub fn new(algorithm: IkAlgorithm) -> Self {
        Self::from_config(&EngineConfig {
            ik_algorithm: algorithm,
            ..EngineConfig::default()
        })
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            algorithm: config.ik_algorithm,
            max_iterations: config.ik_max_iterations.max(1),
            tolerance: config.ik_tolerance,
            max_step: config.ccd_max_step,
        }
    }

    /// 求解 IK
    pub fn solve(
        &self,
        bones: &BoneSet,
        chain: &BoneChain,
        goal: &IkGoal,
        constraints: &ConstraintSet,
    ) -> IkResult {
        let result = match self.algorithm {
            IkAlgorithm::TwoBone => TwoBoneSolver {
                tolerance: self.tolerance,
            }
            .solve(bones, chain, goal, constraints),
            IkAlgorithm::Ccd => CcdSolver {
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
                max_step: self.max_step,
            }
            .solve(bones, chain, goal, constraints),
            IkAlgorithm::Fabrik => FabrikSolver {
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
            }
            .solve(bones, chain, goal, constraints),
        };

        log::debug!(
            "[IK] {:?}: success={} iterations={} error={:.5}",
            self.algorithm,
            result.success,
            result.iterations,
            result.error
        );
        result
    }
}

impl Default for IkSolver {
    fn default() -> Self {
        Self::new(IkAlgorithm::default())
    }
}

// ============================================================================
// 链姿态副本（求解用局部临时数据）
// ============================================================================

/// 骨骼链的局部姿态副本，正向运动学在其上计算
#[derive(Clone, Debug)]
pub(crate) struct ChainPose {
    /// 根骨骼父级的世界矩阵
    pub base: Mat4,
    pub bones: Vec<usize>,
    pub translations: Vec<Vec3>,
    pub scales: Vec<Vec3>,
    /// 当前本地旋转
    pub rotations: Vec<Quat>,
    /// 绑定本地旋转
    pub bind_rotations: Vec<Quat>,
}

impl ChainPose {
    /// 从骨骼集合的当前姿态截取
    pub fn capture(bones: &BoneSet, chain: &BoneChain) -> Self {
        let mut pose = Self {
            base: bones.parent_world_matrix(chain.root),
            bones: chain.links.clone(),
            translations: Vec::with_capacity(chain.links.len()),
            scales: Vec::with_capacity(chain.links.len()),
            rotations: Vec::with_capacity(chain.links.len()),
            bind_rotations: Vec::with_capacity(chain.links.len()),
        };
        for &idx in &chain.links {
            let (translation, scale, rotation, bind_rotation) = match bones.get_bone(idx) {
                Some(b) => (b.bind.translation, b.bind.scale, b.local_rotation(), b.bind.rotation),
                None => (Vec3::ZERO, Vec3::ONE, Quat::IDENTITY, Quat::IDENTITY),
            };
            pose.translations.push(translation);
            pose.scales.push(scale);
            pose.rotations.push(rotation);
            pose.bind_rotations.push(bind_rotation);
        }
        pose
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// 各节点世界矩阵
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut worlds = Vec::with_capacity(self.len());
        let mut parent = self.base;
        for i in 0..self.len() {
            let local = Mat4::from_scale_rotation_translation(
                self.scales[i],
                self.rotations[i],
                self.translations[i],
            );
            parent *= local;
            worlds.push(parent);
        }
        worlds
    }

    /// 各节点世界位置
    pub fn positions(&self) -> Vec<Vec3> {
        self.world_matrices()
            .iter()
            .map(|m| m.col(3).truncate())
            .collect()
    }

    /// 末端世界位置
    pub fn effector_position(&self) -> Vec3 {
        self.positions().last().copied().unwrap_or(Vec3::ZERO)
    }

    /// 第 i 个节点父级的世界旋转
    pub fn parent_rotation(&self, worlds: &[Mat4], i: usize) -> Quat {
        let m = if i == 0 { self.base } else { worlds[i - 1] };
        let (_, rotation, _) = m.to_scale_rotation_translation();
        rotation
    }

    /// 在世界空间对第 i 个节点施加增量旋转（换算回本地）
    pub fn rotate_world(&mut self, worlds: &[Mat4], i: usize, delta: Quat) {
        let parent = self.parent_rotation(worlds, i);
        self.rotations[i] = (parent.inverse() * delta * parent * self.rotations[i]).normalize();
    }

    /// 对第 i 个节点套用关节约束
    pub fn constrain(&mut self, i: usize, bones: &BoneSet, constraints: &ConstraintSet) {
        if let Some(c) = constraints.for_bone(bones, self.bones[i]) {
            self.rotations[i] = c.clamp_local(self.bind_rotations[i], self.rotations[i]);
        }
    }

    /// 输出除末端外所有节点的旋转
    pub fn into_rotations(self) -> Vec<BoneRotation> {
        let n = self.len().saturating_sub(1);
        self.bones
            .into_iter()
            .zip(self.rotations)
            .take(n)
            .map(|(bone, rotation)| BoneRotation { bone, rotation })
            .collect()
    }
}
