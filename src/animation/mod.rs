//! 动画系统
//!
//! - easing: 过渡与关键帧共用的缓动曲线
//! - pose: 手部 / 全身姿态
//! - blender: 平滑、定时过渡与图层叠加
//! - motion_track: 按帧索引的骨骼关键帧片段
//! - retarget: 外部片段到腿部骨骼的重定向

mod blender;
mod easing;
mod motion_track;
mod pose;
mod retarget;

pub use blender::{AnimationLayer, BlendMode, PoseBlender, PoseTransition};
pub use easing::{BezierCurve, Curve, Easing};
pub use motion_track::{AnimationClip, BoneFrameTransform, BoneKeyframe, BoneMotionTrack};
pub use pose::{BodyPose, GripTag, HandPose};
pub use retarget::{retarget_leg_clip, RetargetedClip, RetargetedTrack};
