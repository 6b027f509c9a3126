//! 角度工具
//!
//! 所有角度均为弧度。`normalize` 归一化到 [0, 2π)，
//! `normalize_signed` 归一化到 (-π, π]。

use std::f32::consts::{PI, TAU};

use super::RotationDirection;

/// 归一化到 [0, 2π)
#[inline]
pub fn normalize(angle: f32) -> f32 {
    let r = angle.rem_euclid(TAU);
    // rem_euclid 对极小的负数可能返回 TAU
    if r >= TAU {
        0.0
    } else {
        r
    }
}

/// 归一化到 (-π, π]
#[inline]
pub fn normalize_signed(angle: f32) -> f32 {
    let r = normalize(angle);
    if r > PI {
        r - TAU
    } else {
        r
    }
}

/// 普通线性插值（不处理周期）
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 沿 ≤ π 的短弧插值，结果归一化到 [0, 2π)
pub fn lerp_shortest(a: f32, b: f32, t: f32) -> f32 {
    let delta = normalize_signed(b - a);
    normalize(a + delta * t)
}

/// 按指定方向插值
///
/// `None` 时等同于 `lerp_shortest`；否则强制差值符号与方向一致，
/// 必要时加减一整圈，即使因此走长弧。CW 为角度递减方向。
/// 只用于旋转角，路径位置始终走短弧。
pub fn lerp_directional(start: f32, end: f32, direction: RotationDirection, t: f32) -> f32 {
    let mut delta = end - start;
    match direction {
        RotationDirection::None => return lerp_shortest(start, end, t),
        RotationDirection::Cw => {
            if delta > 0.0 {
                delta -= TAU;
            }
        }
        RotationDirection::Ccw => {
            if delta < 0.0 {
                delta += TAU;
            }
        }
    }
    normalize(start + delta * t)
}
