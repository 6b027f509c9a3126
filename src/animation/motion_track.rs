//! 动画轨道 - 按帧索引存储单根骨骼的关键帧
//!
//! 两关键帧之间的插值曲线由后一帧的 `interpolation` 决定。

use std::collections::{BTreeMap, HashMap};

use glam::{Quat, Vec3};

use crate::error::{EngineError, Result};

use super::easing::Easing;

/// 骨骼关键帧
#[derive(Debug, Clone, PartialEq)]
pub struct BoneKeyframe {
    pub frame_index: u32,
    /// 相对绑定姿态的平移
    pub translation: Vec3,
    /// 相对绑定姿态的旋转
    pub orientation: Quat,
    /// 从上一关键帧到本帧的插值曲线
    pub interpolation: Easing,
}

impl BoneKeyframe {
    pub fn new(frame_index: u32, orientation: Quat) -> Self {
        Self {
            frame_index,
            translation: Vec3::ZERO,
            orientation,
            interpolation: Easing::Linear,
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Easing) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// 骨骼帧变换结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneFrameTransform {
    pub translation: Vec3,
    pub orientation: Quat,
}

impl Default for BoneFrameTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl BoneFrameTransform {
    pub fn lerp(&self, other: &BoneFrameTransform, amount: f32) -> BoneFrameTransform {
        BoneFrameTransform {
            translation: self.translation.lerp(other.translation, amount),
            orientation: self.orientation.slerp(other.orientation, amount),
        }
    }
}

/// 帧间插值系数
#[inline]
fn coefficient(prev_frame: u32, next_frame: u32, frame: u32) -> f32 {
    let interval = next_frame.saturating_sub(prev_frame);
    if interval == 0 {
        1.0
    } else {
        (frame.saturating_sub(prev_frame)) as f32 / interval as f32
    }
}

/// 骨骼动画轨道
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneMotionTrack {
    /// 关键帧映射（帧索引 -> 关键帧）
    pub keyframes: BTreeMap<u32, BoneKeyframe>,
}

impl BoneMotionTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入关键帧，返回被替换的旧关键帧
    pub fn insert_keyframe(&mut self, keyframe: BoneKeyframe) -> Option<BoneKeyframe> {
        self.keyframes.insert(keyframe.frame_index, keyframe)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// 最大帧索引
    pub fn max_frame_index(&self) -> u32 {
        self.keyframes.keys().next_back().copied().unwrap_or(0)
    }

    /// 查找最近的前后关键帧（前一帧包含 frame_index 本身）
    fn search_closest_keyframes(&self, frame_index: u32) -> (Option<&BoneKeyframe>, Option<&BoneKeyframe>) {
        let prev = self.keyframes.range(..=frame_index).next_back().map(|(_, kf)| kf);
        let next = self
            .keyframes
            .range(frame_index.saturating_add(1)..)
            .next()
            .map(|(_, kf)| kf);
        (prev, next)
    }

    /// 求值整数帧
    pub fn seek(&self, frame_index: u32) -> BoneFrameTransform {
        match self.search_closest_keyframes(frame_index) {
            (Some(prev), Some(next)) => {
                let coef = coefficient(prev.frame_index, next.frame_index, frame_index);
                let t = next.interpolation.apply(coef);
                BoneFrameTransform {
                    translation: prev.translation.lerp(next.translation, t),
                    orientation: prev.orientation.slerp(next.orientation, t),
                }
            }
            (Some(kf), None) | (None, Some(kf)) => BoneFrameTransform {
                translation: kf.translation,
                orientation: kf.orientation,
            },
            (None, None) => BoneFrameTransform::default(),
        }
    }

    /// 精确求值（支持帧间插值，amount ∈ [0, 1)）
    pub fn seek_precisely(&self, frame_index: u32, amount: f32) -> BoneFrameTransform {
        let f0 = self.seek(frame_index);
        if amount > 0.0 {
            let f1 = self.seek(frame_index.saturating_add(1));
            f0.lerp(&f1, amount)
        } else {
            f0
        }
    }
}

/// 动画片段：骨骼名 → 轨道
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// 每秒帧数
    pub fps: f32,
    tracks: HashMap<String, BoneMotionTrack>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, fps: f32) -> Result<Self> {
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(EngineError::InvalidClip(format!("fps must be positive, got {}", fps)));
        }
        Ok(Self {
            name: name.into(),
            fps,
            tracks: HashMap::new(),
        })
    }

    /// 添加整条轨道；空轨道视为非法
    pub fn insert_track(&mut self, bone_name: impl Into<String>, track: BoneMotionTrack) -> Result<()> {
        let bone_name = bone_name.into();
        if track.is_empty() {
            return Err(EngineError::InvalidClip(format!("track '{}' has no keyframes", bone_name)));
        }
        self.tracks.insert(bone_name, track);
        Ok(())
    }

    /// 向某骨骼的轨道追加关键帧
    pub fn insert_keyframe(&mut self, bone_name: &str, keyframe: BoneKeyframe) {
        self.tracks
            .entry(bone_name.to_string())
            .or_default()
            .insert_keyframe(keyframe);
    }

    pub fn track(&self, bone_name: &str) -> Option<&BoneMotionTrack> {
        self.tracks.get(bone_name)
    }

    pub fn tracks(&self) -> impl Iterator<Item = (&str, &BoneMotionTrack)> {
        self.tracks.iter().map(|(name, track)| (name.as_str(), track))
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn max_frame_index(&self) -> u32 {
        self.tracks
            .values()
            .map(BoneMotionTrack::max_frame_index)
            .max()
            .unwrap_or(0)
    }

    /// 时长（秒）
    pub fn duration(&self) -> f32 {
        self.max_frame_index() as f32 / self.fps
    }

    /// 时间 → (整数帧, 帧内小数)
    pub fn frame_at(&self, time: f32) -> (u32, f32) {
        split_frame(time, self.fps)
    }
}

/// 时间 → (整数帧, 帧内小数)
pub(crate) fn split_frame(time: f32, fps: f32) -> (u32, f32) {
    let frame = time.max(0.0) * fps;
    let index = frame.floor();
    (index as u32, frame - index)
}
