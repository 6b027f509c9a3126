//! 骨骼集合 - 管理骨骼层次结构
//!
//! 加载时一次性完成：
//! - 层次校验与拓扑排序（父骨骼先于子骨骼更新）
//! - 绑定姿态世界矩阵与包围盒缓存
//! - 规范骨骼名解析（结果存为按规范名索引的数组）
//!
//! 缩放只改模型根矩阵，绑定数据永远不会从已摆姿态的骨骼重新测量。

use glam::{Mat4, Quat, Vec3};

use crate::config::get_config;
use crate::error::{EngineError, Result};

use super::bone_link::{BoneDesc, BoneFlags, BoneLink};
use super::bone_name::{is_finger_name, normalize_bone_name, BoneName};
use super::ik_solver::IkResult;

/// 骨骼集合
#[derive(Clone, Debug)]
pub struct BoneSet {
    bones: Vec<BoneLink>,
    /// 子骨骼缓存
    children_cache: Vec<Vec<usize>>,
    /// 更新顺序（父先子后）
    transform_order: Vec<usize>,
    /// 规范名 → 骨骼索引
    canonical: [Option<usize>; BoneName::COUNT],
    /// 绑定姿态世界矩阵（模型缩放为 1）
    bind_world: Vec<Mat4>,
    /// 绑定姿态包围盒
    bind_min: Vec3,
    bind_max: Vec3,
    /// 统一模型缩放
    model_scale: f32,
}

impl BoneSet {
    /// 从原始层次构建
    pub fn from_descs(descs: &[BoneDesc]) -> Result<Self> {
        if descs.is_empty() {
            return Err(EngineError::EmptySkeleton);
        }

        let count = descs.len();
        let mut bones: Vec<BoneLink> = Vec::with_capacity(count);
        let mut children_cache = vec![Vec::new(); count];

        for (i, desc) in descs.iter().enumerate() {
            if desc.parent >= count as i32 || desc.parent == i as i32 || desc.parent < -1 {
                return Err(EngineError::InvalidParent {
                    bone: desc.name.clone(),
                    parent: desc.parent,
                });
            }
            let bone = BoneLink::from_desc(desc);
            if desc.parent >= 0 {
                children_cache[desc.parent as usize].push(i);
            }
            bones.push(bone);
        }

        for (i, children) in children_cache.iter().enumerate() {
            bones[i].is_leaf = children.is_empty();
        }

        let transform_order = Self::topological_order(&bones, &children_cache)?;

        let mut set = Self {
            bones,
            children_cache,
            transform_order,
            canonical: [None; BoneName::COUNT],
            bind_world: vec![Mat4::IDENTITY; count],
            bind_min: Vec3::ZERO,
            bind_max: Vec3::ZERO,
            model_scale: 1.0,
        };

        set.capture_bind_pose();
        set.resolve_canonical_names();
        set.update_global_transforms();

        if get_config().debug_log {
            let resolved = set.canonical.iter().filter(|c| c.is_some()).count();
            log::info!(
                "[Skeleton] 骨骼加载: {} 根骨骼, 规范名解析 {}/{}",
                count,
                resolved,
                BoneName::COUNT
            );
        }

        Ok(set)
    }

    /// 拓扑排序，同时检测环
    fn topological_order(bones: &[BoneLink], children: &[Vec<usize>]) -> Result<Vec<usize>> {
        let mut order = Vec::with_capacity(bones.len());
        let mut stack: Vec<usize> = bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_root())
            .map(|(i, _)| i)
            .rev()
            .collect();

        while let Some(idx) = stack.pop() {
            order.push(idx);
            for &child in children[idx].iter().rev() {
                stack.push(child);
            }
        }

        if order.len() != bones.len() {
            // 没有从任何根到达的骨骼必然处于环中
            let mut visited = vec![false; bones.len()];
            for &i in &order {
                visited[i] = true;
            }
            let bone = visited
                .iter()
                .position(|v| !v)
                .map(|i| bones[i].name.clone())
                .unwrap_or_default();
            return Err(EngineError::HierarchyCycle { bone });
        }
        Ok(order)
    }

    /// 记录绑定姿态（只在加载时调用）
    fn capture_bind_pose(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);

        for &idx in &self.transform_order {
            let local = self.bones[idx].bind.to_matrix();
            let world = match self.bones[idx].parent_id() {
                Some(p) => self.bind_world[p] * local,
                None => local,
            };
            self.bind_world[idx] = world;

            let position = world.col(3).truncate();
            self.bones[idx].initial_position = position;
            min = min.min(position);
            max = max.max(position);
        }

        self.bind_min = min;
        self.bind_max = max;
    }

    /// 规范名解析：先精确匹配，再子串匹配；每根骨骼最多对应一个规范名
    fn resolve_canonical_names(&mut self) {
        let normalized: Vec<String> = self
            .bones
            .iter()
            .map(|b| normalize_bone_name(&b.name))
            .collect();

        for (i, name) in normalized.iter().enumerate() {
            if is_finger_name(name) {
                self.bones[i].flags.insert(BoneFlags::FINGER);
            }
        }

        let mut assigned = vec![false; self.bones.len()];

        // 第一遍：精确匹配
        for bone_name in BoneName::ALL {
            let found = self.transform_order.iter().copied().find(|&i| {
                !assigned[i]
                    && !self.bones[i].is_finger()
                    && bone_name.aliases().iter().any(|a| *a == normalized[i])
            });
            if let Some(i) = found {
                self.assign_canonical(bone_name, i);
                assigned[i] = true;
            }
        }

        // 第二遍：子串匹配
        for bone_name in BoneName::ALL {
            if self.canonical[bone_name.index()].is_some() {
                continue;
            }
            let found = self.transform_order.iter().copied().find(|&i| {
                !assigned[i] && !self.bones[i].is_finger() && bone_name.substring_match(&normalized[i])
            });
            if let Some(i) = found {
                self.assign_canonical(bone_name, i);
                assigned[i] = true;
            }
        }
    }

    fn assign_canonical(&mut self, bone_name: BoneName, idx: usize) {
        self.canonical[bone_name.index()] = Some(idx);
        let bone = &mut self.bones[idx];
        bone.canonical = Some(bone_name);
        if bone_name.is_arm() {
            bone.flags.insert(BoneFlags::ARM);
        }
        if bone_name.is_leg() {
            bone.flags.insert(BoneFlags::LEG);
        }
    }

    // ========================================
    // 查询
    // ========================================

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    pub fn get_bone(&self, idx: usize) -> Option<&BoneLink> {
        self.bones.get(idx)
    }

    #[inline]
    pub fn get_bone_mut(&mut self, idx: usize) -> Option<&mut BoneLink> {
        self.bones.get_mut(idx)
    }

    pub fn bones(&self) -> &[BoneLink] {
        &self.bones
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        self.children_cache.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按规范名查找
    #[inline]
    pub fn canonical_index(&self, name: BoneName) -> Option<usize> {
        self.canonical[name.index()]
    }

    /// 绑定姿态世界矩阵（包含当前模型缩放）
    pub fn bind_world_matrix(&self, idx: usize) -> Mat4 {
        self.root_matrix() * self.bind_world[idx]
    }

    /// 绑定姿态世界矩阵（模型缩放为 1）
    pub(crate) fn unscaled_bind_world(&self, idx: usize) -> Mat4 {
        self.bind_world[idx]
    }

    /// 父骨骼的世界矩阵；根骨骼返回模型根矩阵
    pub fn parent_world_matrix(&self, idx: usize) -> Mat4 {
        match self.bones[idx].parent_id() {
            Some(p) => self.bones[p].local_to_world,
            None => self.root_matrix(),
        }
    }

    /// 父骨骼的世界旋转
    pub fn parent_world_rotation(&self, idx: usize) -> Quat {
        let (_, rotation, _) = self.parent_world_matrix(idx).to_scale_rotation_translation();
        rotation
    }

    // ========================================
    // 缩放
    // ========================================

    #[inline]
    pub fn model_scale(&self) -> f32 {
        self.model_scale
    }

    /// 模型根矩阵
    #[inline]
    pub fn root_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.model_scale))
    }

    /// 绑定姿态高度（模型缩放为 1）
    pub fn bind_height(&self) -> f32 {
        self.bind_max.y - self.bind_min.y
    }

    /// 设置统一缩放；调用方需重建骨骼链
    pub fn set_model_scale(&mut self, scale: f32) {
        if !(scale > 0.0 && scale.is_finite()) {
            log::warn!("[Skeleton] 忽略非法缩放: {}", scale);
            return;
        }
        self.model_scale = scale;
        self.update_global_transforms();
    }

    /// 缩放到指定身高，返回使用的缩放值
    ///
    /// 基于加载时缓存的绑定包围盒计算，不测量当前姿态。
    pub fn scale_to_height(&mut self, height: f32) -> f32 {
        let bind_height = self.bind_height();
        if bind_height <= f32::EPSILON {
            log::warn!("[Skeleton] 绑定姿态高度为 0，无法按身高缩放");
            return self.model_scale;
        }
        self.set_model_scale(height / bind_height);
        self.model_scale
    }

    // ========================================
    // 姿态
    // ========================================

    /// 设置动画旋转（叠加在绑定旋转之上）
    pub fn set_bone_rotation(&mut self, idx: usize, rotation: Quat) {
        if let Some(bone) = self.bones.get_mut(idx) {
            bone.animation_rotate = rotation;
            bone.compute_local_transform();
        }
    }

    /// 以完整本地旋转覆盖骨骼（IK 通道）
    pub fn set_local_rotation(&mut self, idx: usize, rotation: Quat) {
        if let Some(bone) = self.bones.get_mut(idx) {
            bone.ik_rotate = rotation;
            bone.set_enable_ik(true);
            bone.compute_local_transform();
        }
    }

    /// 应用 IK 结果，weight 为与当前本地旋转的混合权重
    pub fn apply_ik_result(&mut self, result: &IkResult, weight: f32) {
        let weight = weight.clamp(0.0, 1.0);
        if weight <= 0.0 {
            return;
        }
        for r in &result.rotations {
            if let Some(bone) = self.bones.get_mut(r.bone) {
                let current = bone.local_rotation();
                bone.ik_rotate = if weight >= 1.0 {
                    r.rotation
                } else {
                    current.slerp(r.rotation, weight)
                };
                bone.set_enable_ik(true);
                bone.compute_local_transform();
            }
        }
        self.update_global_transforms();
    }

    /// 清除所有动画与 IK 覆盖，回到绑定姿态
    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_animation();
            bone.compute_local_transform();
        }
        self.update_global_transforms();
    }

    /// 按拓扑顺序更新全部全局变换
    pub fn update_global_transforms(&mut self) {
        let root = self.root_matrix();
        for i in 0..self.transform_order.len() {
            let idx = self.transform_order[i];
            let parent_world = match self.bones[idx].parent_id() {
                Some(p) => self.bones[p].local_to_world,
                None => root,
            };
            let bone = &mut self.bones[idx];
            bone.compute_local_transform();
            bone.local_to_world = parent_world * bone.local_to_parent;
        }
    }

    /// 递归更新单根骨骼及其子树
    pub fn update_global_transform_recursive(&mut self, idx: usize) {
        if idx >= self.bones.len() {
            return;
        }
        let parent_world = self.parent_world_matrix(idx);
        let bone = &mut self.bones[idx];
        bone.compute_local_transform();
        bone.local_to_world = parent_world * bone.local_to_parent;

        for i in 0..self.children_cache[idx].len() {
            let child = self.children_cache[idx][i];
            self.update_global_transform_recursive(child);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 测试用 T 姿态骨骼：手臂沿 ±X，上臂 / 前臂各 0.3
    pub(crate) fn t_pose_descs() -> Vec<BoneDesc> {
        vec![
            BoneDesc::new("mixamorig:Hips", -1, Vec3::new(0.0, 1.0, 0.0)),
            BoneDesc::new("mixamorig:Spine", 0, Vec3::new(0.0, 0.2, 0.0)),
            BoneDesc::new("mixamorig:Neck", 1, Vec3::new(0.0, 0.3, 0.0)),
            BoneDesc::new("mixamorig:Head", 2, Vec3::new(0.0, 0.1, 0.0)),
            BoneDesc::new("mixamorig:LeftShoulder", 1, Vec3::new(0.05, 0.25, 0.0)),
            BoneDesc::new("mixamorig:LeftArm", 4, Vec3::new(0.1, 0.0, 0.0)),
            BoneDesc::new("mixamorig:LeftForeArm", 5, Vec3::new(0.3, 0.0, 0.0)),
            BoneDesc::new("mixamorig:LeftHand", 6, Vec3::new(0.3, 0.0, 0.0)),
            BoneDesc::new("mixamorig:LeftHandIndex1", 7, Vec3::new(0.05, 0.0, 0.0)),
            BoneDesc::new("mixamorig:RightShoulder", 1, Vec3::new(-0.05, 0.25, 0.0)),
            BoneDesc::new("mixamorig:RightArm", 9, Vec3::new(-0.1, 0.0, 0.0)),
            BoneDesc::new("mixamorig:RightForeArm", 10, Vec3::new(-0.3, 0.0, 0.0)),
            BoneDesc::new("mixamorig:RightHand", 11, Vec3::new(-0.3, 0.0, 0.0)),
            BoneDesc::new("mixamorig:LeftUpLeg", 0, Vec3::new(0.1, -0.1, 0.0)),
            BoneDesc::new("mixamorig:LeftLeg", 13, Vec3::new(0.0, -0.45, 0.0)),
            BoneDesc::new("mixamorig:LeftFoot", 14, Vec3::new(0.0, -0.45, 0.0)),
            BoneDesc::new("mixamorig:RightUpLeg", 0, Vec3::new(-0.1, -0.1, 0.0)),
            BoneDesc::new("mixamorig:RightLeg", 16, Vec3::new(0.0, -0.45, 0.0)),
            BoneDesc::new("mixamorig:RightFoot", 17, Vec3::new(0.0, -0.45, 0.0)),
        ]
    }

    #[test]
    fn test_load_resolves_canonical_names() {
        let set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        assert_eq!(set.canonical_index(BoneName::LeftUpperArm), Some(5));
        assert_eq!(set.canonical_index(BoneName::LeftLowerArm), Some(6));
        assert_eq!(set.canonical_index(BoneName::LeftHand), Some(7));
        assert_eq!(set.canonical_index(BoneName::LeftClavicle), Some(4));
        assert_eq!(set.canonical_index(BoneName::RightLowerLeg), Some(17));
        assert!(set.get_bone(8).unwrap().is_finger());
        assert_eq!(set.get_bone(8).unwrap().canonical, None);
        assert_eq!(set.canonical_index(BoneName::LeftToes), None);
    }

    #[test]
    fn test_bind_positions() {
        let set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let hand = set.get_bone(7).unwrap();
        assert!((hand.initial_position - Vec3::new(0.75, 1.45, 0.0)).length() < 1e-5);
        assert!((hand.position() - hand.initial_position).length() < 1e-5);
        assert!((set.bind_height() - 1.6).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_hierarchies() {
        assert!(matches!(BoneSet::from_descs(&[]), Err(EngineError::EmptySkeleton)));

        let bad_parent = vec![BoneDesc::new("a", 3, Vec3::ZERO)];
        assert!(matches!(
            BoneSet::from_descs(&bad_parent),
            Err(EngineError::InvalidParent { .. })
        ));

        let cycle = vec![
            BoneDesc::new("root", -1, Vec3::ZERO),
            BoneDesc::new("a", 2, Vec3::ZERO),
            BoneDesc::new("b", 1, Vec3::ZERO),
        ];
        assert!(matches!(
            BoneSet::from_descs(&cycle),
            Err(EngineError::HierarchyCycle { .. })
        ));
    }

    #[test]
    fn test_scale_to_height_uses_bind_bounds() {
        let mut set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        // 先摆一个姿态，缩放不应受影响
        set.set_local_rotation(5, Quat::from_rotation_z(-1.2));
        set.update_global_transforms();
        let scale = set.scale_to_height(3.2);
        assert!((scale - 2.0).abs() < 1e-5);
        let head = set.get_bone(3).unwrap().position();
        assert!((head.y - 3.2).abs() < 1e-4);
    }

    #[test]
    fn test_apply_ik_result_with_weight() {
        use crate::skeleton::ik_solver::BoneRotation;

        let mut set = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let target = Quat::from_rotation_z(-1.0);
        let result = IkResult {
            success: true,
            iterations: 1,
            error: 0.0,
            rotations: vec![BoneRotation { bone: 5, rotation: target }],
        };
        set.apply_ik_result(&result, 0.5);
        let applied = set.get_bone(5).unwrap().local_rotation();
        assert!((applied.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-4);

        set.reset_pose();
        assert!(!set.get_bone(5).unwrap().enable_ik());
    }
}
