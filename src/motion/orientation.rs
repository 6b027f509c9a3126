//! 道具朝向映射

use std::f32::consts::{FRAC_PI_2, PI};

use super::angle::normalize;
use super::Orientation;

/// 将道具朝向映射为绝对旋转角，结果归一化到 [0, 2π)
///
/// IN 指向中心，OUT 背离中心，CLOCK / COUNTER 沿切线。
pub fn orientation_to_angle(orientation: Orientation, path_angle: f32) -> f32 {
    let angle = match orientation {
        Orientation::In => path_angle + PI,
        Orientation::Out => path_angle,
        Orientation::Clock => path_angle + FRAC_PI_2,
        Orientation::Counter => path_angle - FRAC_PI_2,
    };
    normalize(angle)
}
