//! 手部 / 身体姿态
//!
//! "当前"与"目标"是两个独立持有的值，平滑时只插值当前姿态。

use glam::{Quat, Vec3};

use crate::skeleton::Side;

/// 手型标签（离散值，插值时在中点切换）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GripTag {
    /// 张开
    #[default]
    Open,
    /// 放松半握
    Relaxed,
    /// 握住道具手柄
    Grip,
    /// 指尖捏住
    Pinch,
}

/// 单手姿态
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandPose {
    /// 手的世界空间目标位置
    pub target_position: Vec3,
    /// 手骨骼的世界旋转（None 时保持 IK 结果）
    pub wrist_rotation: Option<Quat>,
    pub grip: GripTag,
    /// IK 混合权重 [0, 1]
    pub weight: f32,
}

impl Default for HandPose {
    fn default() -> Self {
        Self {
            target_position: Vec3::ZERO,
            wrist_rotation: None,
            grip: GripTag::Open,
            weight: 1.0,
        }
    }
}

impl HandPose {
    pub fn at(target_position: Vec3) -> Self {
        Self {
            target_position,
            ..Self::default()
        }
    }

    pub fn with_wrist(mut self, rotation: Quat) -> Self {
        self.wrist_rotation = Some(rotation);
        self
    }

    pub fn with_grip(mut self, grip: GripTag) -> Self {
        self.grip = grip;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    /// 向 other 插值；离散字段与单边存在的可选字段在 t = 0.5 处切换
    pub fn lerp(&self, other: &HandPose, t: f32) -> HandPose {
        let take_other = t >= 0.5;
        let wrist_rotation = match (self.wrist_rotation, other.wrist_rotation) {
            (Some(a), Some(b)) => Some(a.slerp(b, t)),
            (a, b) => {
                if take_other {
                    b
                } else {
                    a
                }
            }
        };
        HandPose {
            target_position: self.target_position.lerp(other.target_position, t),
            wrist_rotation,
            grip: if take_other { other.grip } else { self.grip },
            weight: self.weight + (other.weight - self.weight) * t,
        }
    }
}

/// 全身姿态（每帧组合）
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct BodyPose {
    pub left_hand: HandPose,
    pub right_hand: HandPose,
    /// 头部注视的世界空间目标
    pub head_look: Option<Vec3>,
    /// 秒
    pub timestamp: f32,
}

impl BodyPose {
    pub fn new(left_hand: HandPose, right_hand: HandPose) -> Self {
        Self {
            left_hand,
            right_hand,
            head_look: None,
            timestamp: 0.0,
        }
    }

    pub fn hand(&self, side: Side) -> &HandPose {
        match side {
            Side::Left => &self.left_hand,
            Side::Right => &self.right_hand,
        }
    }

    pub fn hand_mut(&mut self, side: Side) -> &mut HandPose {
        match side {
            Side::Left => &mut self.left_hand,
            Side::Right => &mut self.right_hand,
        }
    }

    pub fn with_head_look(mut self, target: Vec3) -> Self {
        self.head_look = Some(target);
        self
    }

    pub fn lerp(&self, other: &BodyPose, t: f32) -> BodyPose {
        let head_look = match (self.head_look, other.head_look) {
            (Some(a), Some(b)) => Some(a.lerp(b, t)),
            (a, b) => {
                if t >= 0.5 {
                    b
                } else {
                    a
                }
            }
        };
        BodyPose {
            left_hand: self.left_hand.lerp(&other.left_hand, t),
            right_hand: self.right_hand.lerp(&other.right_hand, t),
            head_look,
            timestamp: self.timestamp + (other.timestamp - self.timestamp) * t,
        }
    }
}
