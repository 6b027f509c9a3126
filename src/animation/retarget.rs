//! 腿部动画重定向
//!
//! 外部片段的骨骼名按与骨骼加载相同的别名 / 前缀规则解析为规范名，
//! 只保留腿部骨骼的旋转轨道。平移轨道一律丢弃，避免引入外部根运动。

use glam::Vec3;

use crate::skeleton::{BoneName, BoneSet};

use super::motion_track::{split_frame, AnimationClip, BoneMotionTrack};

/// 重定向后的单条轨道
#[derive(Debug, Clone, PartialEq)]
pub struct RetargetedTrack {
    /// 目标骨骼索引
    pub bone: usize,
    pub canonical: BoneName,
    /// 只含旋转（平移已清零）
    pub track: BoneMotionTrack,
}

/// 重定向结果
#[derive(Debug, Clone)]
pub struct RetargetedClip {
    pub name: String,
    pub fps: f32,
    pub tracks: Vec<RetargetedTrack>,
    /// 无法解析到本骨骼的源轨道名
    pub unmatched: Vec<String>,
}

impl RetargetedClip {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn duration(&self) -> f32 {
        let max = self
            .tracks
            .iter()
            .map(|t| t.track.max_frame_index())
            .max()
            .unwrap_or(0);
        max as f32 / self.fps
    }

    /// 在指定时间采样，写入骨骼的动画旋转通道并刷新全局变换
    pub fn apply(&self, bones: &mut BoneSet, time: f32) {
        let (frame, amount) = split_frame(time, self.fps);
        for t in &self.tracks {
            let transform = t.track.seek_precisely(frame, amount);
            bones.set_bone_rotation(t.bone, transform.orientation);
        }
        bones.update_global_transforms();
    }
}

/// 把片段重定向到骨骼的腿部
pub fn retarget_leg_clip(clip: &AnimationClip, bones: &BoneSet) -> RetargetedClip {
    let mut tracks = Vec::new();
    let mut unmatched = Vec::new();

    for (name, track) in clip.tracks() {
        let Some(canonical) = BoneName::resolve(name) else {
            unmatched.push(name.to_string());
            continue;
        };
        if !canonical.is_leg() {
            continue;
        }
        let Some(bone) = bones.canonical_index(canonical) else {
            unmatched.push(name.to_string());
            continue;
        };

        let mut rotation_only = track.clone();
        for kf in rotation_only.keyframes.values_mut() {
            kf.translation = Vec3::ZERO;
        }
        tracks.push(RetargetedTrack {
            bone,
            canonical,
            track: rotation_only,
        });
    }

    // HashMap 迭代顺序不固定，按骨骼索引排序保证结果确定
    tracks.sort_by_key(|t| t.bone);
    unmatched.sort();

    if !unmatched.is_empty() {
        log::warn!(
            "[Retarget] 片段 '{}' 有 {} 条轨道无法匹配: {:?}",
            clip.name,
            unmatched.len(),
            unmatched
        );
    }
    if crate::config::get_config().debug_log {
        log::info!("[Retarget] 片段 '{}': 保留 {} 条腿部旋转轨道", clip.name, tracks.len());
    }

    RetargetedClip {
        name: clip.name.clone(),
        fps: clip.fps,
        tracks,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::motion_track::BoneKeyframe;
    use crate::skeleton::t_pose_descs;
    use glam::Quat;

    fn clip() -> AnimationClip {
        let mut clip = AnimationClip::new("kick", 30.0).unwrap();
        // 不同命名体系的骨骼名
        clip.insert_keyframe("Bip01 L Thigh", BoneKeyframe::new(0, Quat::IDENTITY));
        clip.insert_keyframe(
            "Bip01 L Thigh",
            BoneKeyframe::new(30, Quat::from_rotation_x(-1.0)).with_translation(Vec3::new(0.0, 5.0, 0.0)),
        );
        clip.insert_keyframe("DEF-shin.R", BoneKeyframe::new(0, Quat::from_rotation_x(0.5)));
        clip.insert_keyframe("mixamorig:LeftArm", BoneKeyframe::new(0, Quat::from_rotation_z(1.0)));
        clip.insert_keyframe("tail_01", BoneKeyframe::new(0, Quat::IDENTITY));
        clip
    }

    #[test]
    fn test_only_leg_rotation_tracks_kept() {
        let bones = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let retargeted = retarget_leg_clip(&clip(), &bones);

        let names: Vec<BoneName> = retargeted.tracks.iter().map(|t| t.canonical).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&BoneName::LeftUpperLeg));
        assert!(names.contains(&BoneName::RightLowerLeg));
        assert_eq!(retargeted.unmatched, vec!["tail_01".to_string()]);

        for t in &retargeted.tracks {
            assert!(t.track.keyframes.values().all(|kf| kf.translation == Vec3::ZERO));
        }
    }

    #[test]
    fn test_apply_writes_leg_bones_only() {
        let mut bones = BoneSet::from_descs(&t_pose_descs()).unwrap();
        let retargeted = retarget_leg_clip(&clip(), &bones);
        let hips_before = bones.get_bone(0).unwrap().position();
        let arm = bones.canonical_index(BoneName::LeftUpperArm).unwrap();

        retargeted.apply(&mut bones, 0.5);

        let thigh = bones.canonical_index(BoneName::LeftUpperLeg).unwrap();
        let rotation = bones.get_bone(thigh).unwrap().local_rotation();
        assert!((rotation.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-3);
        assert_eq!(bones.get_bone(0).unwrap().position(), hips_before);
        assert_eq!(bones.get_bone(arm).unwrap().local_rotation(), Quat::IDENTITY);
        assert!((retargeted.duration() - 1.0).abs() < 1e-6);
    }
}
