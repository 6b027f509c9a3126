//! 骨骼链 - 根 / 中 / 末端三骨骼（例如 肩-肘-手）
//!
//! 长度与静止方向都来自加载时缓存的绑定姿态，
//! 运行时绝不从已摆姿态的骨骼重新测量，否则解析解会整体偏移。
//! 缩放变化后调用 `rebuild` 重新生成。

use glam::Vec3;

use super::bone_name::{BoneName, Side};
use super::bone_set::BoneSet;
use super::direction_or;

/// 肢体
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limb {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl Limb {
    pub const ALL: [Limb; 4] = [Limb::LeftArm, Limb::RightArm, Limb::LeftLeg, Limb::RightLeg];

    /// 根 / 中 / 末端规范名
    pub fn joints(self) -> (BoneName, BoneName, BoneName) {
        match self {
            Limb::LeftArm => (BoneName::LeftUpperArm, BoneName::LeftLowerArm, BoneName::LeftHand),
            Limb::RightArm => (BoneName::RightUpperArm, BoneName::RightLowerArm, BoneName::RightHand),
            Limb::LeftLeg => (BoneName::LeftUpperLeg, BoneName::LeftLowerLeg, BoneName::LeftFoot),
            Limb::RightLeg => (BoneName::RightUpperLeg, BoneName::RightLowerLeg, BoneName::RightFoot),
        }
    }

    pub fn side(self) -> Side {
        match self {
            Limb::LeftArm | Limb::LeftLeg => Side::Left,
            Limb::RightArm | Limb::RightLeg => Side::Right,
        }
    }

    pub fn arm(side: Side) -> Limb {
        match side {
            Side::Left => Limb::LeftArm,
            Side::Right => Limb::RightArm,
        }
    }
}

/// 骨骼链
#[derive(Clone, Debug, PartialEq)]
pub struct BoneChain {
    /// 来源肢体（手动构建时为 None）
    pub limb: Option<Limb>,
    /// 从根到末端的完整父子路径（可能包含扭转骨骼）
    pub links: Vec<usize>,
    pub root: usize,
    pub middle: usize,
    pub effector: usize,
    /// 中间骨骼在 links 中的位置
    pub middle_link: usize,
    /// 根 → 中 长度（已缩放）
    pub upper_len: f32,
    /// 中 → 末端 长度（已缩放）
    pub lower_len: f32,
    /// 相邻 links 之间的长度（已缩放）
    pub segment_lengths: Vec<f32>,
    /// 根骨骼本地空间中指向中间骨骼的单位向量
    pub root_rest_dir: Vec3,
    /// 中间骨骼本地空间中指向末端的单位向量
    pub middle_rest_dir: Vec3,
    /// 构建时的模型缩放
    pub scale: f32,
}

impl BoneChain {
    /// 按肢体规范名构建；缺少任一骨骼时返回 None
    pub fn from_limb(bones: &BoneSet, limb: Limb) -> Option<Self> {
        let (root, middle, effector) = limb.joints();
        let chain = Self::build(
            bones,
            bones.canonical_index(root)?,
            bones.canonical_index(middle)?,
            bones.canonical_index(effector)?,
        )?;
        Some(Self {
            limb: Some(limb),
            ..chain
        })
    }

    /// 由三根骨骼构建；三者不在同一条父子路径上时返回 None
    pub fn build(bones: &BoneSet, root: usize, middle: usize, effector: usize) -> Option<Self> {
        let links = Self::parent_path(bones, root, effector)?;
        let middle_link = links.iter().position(|&i| i == middle)?;
        if middle_link == 0 || middle_link == links.len() - 1 {
            return None;
        }

        let scale = bones.model_scale();
        let bind_pos = |i: usize| bones.get_bone(i).map(|b| b.initial_position).unwrap_or(Vec3::ZERO);

        let segment_lengths: Vec<f32> = links
            .windows(2)
            .map(|w| bind_pos(w[0]).distance(bind_pos(w[1])) * scale)
            .collect();

        let upper_len = bind_pos(root).distance(bind_pos(middle)) * scale;
        let lower_len = bind_pos(middle).distance(bind_pos(effector)) * scale;

        // 静止方向在骨骼自身绑定坐标系中计算，与统一缩放无关
        let root_rest_dir = Self::rest_direction(bones, root, middle);
        let middle_rest_dir = Self::rest_direction(bones, middle, effector);

        Some(Self {
            limb: None,
            links,
            root,
            middle,
            effector,
            middle_link,
            upper_len,
            lower_len,
            segment_lengths,
            root_rest_dir,
            middle_rest_dir,
            scale,
        })
    }

    /// 缩放变化后重建（仍然只读取绑定缓存）
    pub fn rebuild(&self, bones: &BoneSet) -> Option<Self> {
        let chain = Self::build(bones, self.root, self.middle, self.effector)?;
        Some(Self {
            limb: self.limb,
            ..chain
        })
    }

    /// 最大伸展长度
    #[inline]
    pub fn max_reach(&self) -> f32 {
        self.upper_len + self.lower_len
    }

    /// 最小可达距离
    #[inline]
    pub fn min_reach(&self) -> f32 {
        (self.upper_len - self.lower_len).abs()
    }

    /// 所有分段长度之和
    pub fn total_len(&self) -> f32 {
        self.segment_lengths.iter().sum()
    }

    /// 从末端向上走到根，得到根 → 末端路径
    fn parent_path(bones: &BoneSet, root: usize, effector: usize) -> Option<Vec<usize>> {
        let mut path = vec![effector];
        let mut current = effector;
        while current != root {
            current = bones.get_bone(current)?.parent_id()?;
            path.push(current);
            if path.len() > bones.len() {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }

    /// 绑定姿态下 from 骨骼本地空间中指向 to 的单位向量
    fn rest_direction(bones: &BoneSet, from: usize, to: usize) -> Vec3 {
        let inv = bones.unscaled_bind_world(from).inverse();
        let target = bones.get_bone(to).map(|b| b.initial_position).unwrap_or(Vec3::ZERO);
        direction_or(inv.transform_point3(target), Vec3::X)
    }
}
