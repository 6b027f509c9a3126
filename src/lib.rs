//! Choreo Engine - 由二维编排数据驱动表演者手臂与道具的运行时
//!
//! 数据流：
//! 编排数据 → 运动规律 + 平面映射 → 道具状态插值 → 手部目标
//! → 姿态混合（平滑/过渡/图层）→ IK 求解 → 骨骼旋转
//!
//! 整个核心为单线程、帧驱动，由调用方显式调用 `PerformerRig::tick`。

pub mod animation;
pub mod config;
pub mod error;
pub mod motion;
pub mod rig;
pub mod skeleton;

pub use error::{EngineError, Result};

pub use animation::{
    retarget_leg_clip, AnimationClip, AnimationLayer, BlendMode, BodyPose, BoneKeyframe,
    BoneMotionTrack, Easing, GripTag, HandPose, PoseBlender, RetargetedClip,
};
pub use config::{get_config, reset_config, set_config, EngineConfig};
pub use motion::{
    Location, LocationLookup, LocationTable, MotionSpec, MotionType, Orientation, Plane,
    PropEvaluator, PropState, RotationDirection,
};
pub use rig::{PerformerRig, RigFrame};
pub use skeleton::{
    BoneChain, BoneDesc, BoneName, BoneSet, ConstraintSet, IkAlgorithm, IkGoal, IkResult,
    IkSolver, JointConstraint, Limb, Side,
};
