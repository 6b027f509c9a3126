//! 道具运动 - 从符号化的编排描述求出道具的三维位置与朝向
//!
//! - angle: 标量角度归一化与插值
//! - orientation: 道具朝向 → 相对路径切线的角度
//! - motion_law: 运动类型 → 结束时的旋转角
//! - plane: 二维角度 → 三维位置 / 旋转
//! - prop_state: 组合以上部分，对任意进度求值

pub mod angle;
mod motion_law;
mod orientation;
mod plane;
mod prop_state;

pub use motion_law::{target_spin_angle, MotionLaw};
pub use orientation::orientation_to_angle;
pub use plane::{Plane, PlaneBasis};
pub use prop_state::{Location, LocationLookup, LocationTable, PropEvaluator, PropState};

// ============================================================================
// 编排数据类型
// ============================================================================

/// 运动类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MotionType {
    /// 道具随路径同向旋转
    Pro,
    /// 道具逆路径旋转
    Anti,
    /// 原地，仅按圈数旋转
    Static,
    /// 直线穿过中心
    Dash,
    /// 不旋转
    Float,
}

/// 旋转方向
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RotationDirection {
    Cw,
    Ccw,
    #[default]
    None,
}

impl RotationDirection {
    /// 圈数旋转的符号：CCW ≡ -1，其余为 +1
    #[inline]
    pub fn turn_sign(self) -> f32 {
        match self {
            RotationDirection::Ccw => -1.0,
            _ => 1.0,
        }
    }
}

/// 道具朝向
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    In,
    Out,
    Clock,
    Counter,
}

/// 单个道具单步的运动描述（由编排层提供，只读）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSpec {
    pub plane: Plane,
    pub start_location: Location,
    pub end_location: Location,
    pub motion_type: MotionType,
    pub rotation_direction: RotationDirection,
    /// 圈数，非负，可为半圈
    pub turns: f32,
    pub start_orientation: Orientation,
    pub end_orientation: Orientation,
}
