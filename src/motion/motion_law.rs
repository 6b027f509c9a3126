//! 运动规律 - 求运动结束时道具的目标旋转角
//!
//! 符号约定：CCW ≡ -1，CW / NONE ≡ +1。翻转符号会让所有道具反向旋转。

use std::f32::consts::PI;

use super::angle::normalize_signed;
use super::orientation::orientation_to_angle;
use super::{MotionSpec, MotionType};

/// 一次运动的旋转角计算结果
///
/// `target_spin` 不做归一化，多圈旋转依赖完整的差值。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionLaw {
    /// 路径中心移动量，始终取短弧，(-π, π]
    pub center_movement: f32,
    /// 圈数带来的旋转量
    pub spin_from_turns: f32,
    /// 起始旋转角
    pub start_spin: f32,
    /// 目标旋转角（未归一化）
    pub target_spin: f32,
}

impl MotionLaw {
    /// 计算目标旋转角
    pub fn evaluate(spec: &MotionSpec, start_spin: f32, start_path: f32, end_path: f32) -> Self {
        let center_movement = normalize_signed(end_path - start_path);
        let spin_from_turns = spec.rotation_direction.turn_sign() * spec.turns * PI;

        let target_spin = match spec.motion_type {
            MotionType::Pro => start_spin + center_movement + spin_from_turns,
            MotionType::Anti => start_spin - center_movement + spin_from_turns,
            MotionType::Static | MotionType::Dash => {
                if spec.turns > 0.0 {
                    start_spin + spin_from_turns
                } else {
                    // 无圈数时直接取结束朝向，按短弧接到起始角上
                    let end_spin = orientation_to_angle(spec.end_orientation, end_path);
                    start_spin + normalize_signed(end_spin - start_spin)
                }
            }
            MotionType::Float => start_spin,
        };

        Self {
            center_movement,
            spin_from_turns,
            start_spin,
            target_spin,
        }
    }
}

/// 便捷函数：只返回目标旋转角
pub fn target_spin_angle(spec: &MotionSpec, start_spin: f32, start_path: f32, end_path: f32) -> f32 {
    MotionLaw::evaluate(spec, start_spin, start_path, end_path).target_spin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{Location, Orientation, Plane, RotationDirection};
    use std::f32::consts::FRAC_PI_2;

    fn spec(motion_type: MotionType, direction: RotationDirection, turns: f32) -> MotionSpec {
        MotionSpec {
            plane: Plane::Wall,
            start_location: Location::N,
            end_location: Location::E,
            motion_type,
            rotation_direction: direction,
            turns,
            start_orientation: Orientation::In,
            end_orientation: Orientation::Out,
        }
    }

    #[test]
    fn test_pro_without_path_movement_keeps_spin() {
        let s = spec(MotionType::Pro, RotationDirection::Cw, 0.0);
        let target = target_spin_angle(&s, 1.25, 2.0, 2.0);
        assert!((target - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_pro_and_anti_are_mirrored() {
        let pro = MotionLaw::evaluate(&spec(MotionType::Pro, RotationDirection::Cw, 1.0), 0.0, 0.0, FRAC_PI_2);
        let anti = MotionLaw::evaluate(&spec(MotionType::Anti, RotationDirection::Cw, 1.0), 0.0, 0.0, FRAC_PI_2);
        assert!((pro.target_spin - (FRAC_PI_2 + PI)).abs() < 1e-5);
        assert!((anti.target_spin - (-FRAC_PI_2 + PI)).abs() < 1e-5);
    }

    #[test]
    fn test_ccw_turns_are_negative() {
        let law = MotionLaw::evaluate(&spec(MotionType::Static, RotationDirection::Ccw, 2.0), 0.5, 0.0, 0.0);
        assert!((law.spin_from_turns + 2.0 * PI).abs() < 1e-5);
        assert!((law.target_spin - (0.5 - 2.0 * PI)).abs() < 1e-5);
    }

    #[test]
    fn test_float_never_spins() {
        for turns in [0.0, 0.5, 1.0, 3.0] {
            for dir in [RotationDirection::Cw, RotationDirection::Ccw, RotationDirection::None] {
                let target = target_spin_angle(&spec(MotionType::Float, dir, turns), 0.7, 0.0, 2.5);
                assert_eq!(target, 0.7);
            }
        }
    }

    #[test]
    fn test_static_zero_turns_uses_end_orientation() {
        let s = spec(MotionType::Static, RotationDirection::None, 0.0);
        // 结束朝向 OUT，路径角 π/2
        let target = target_spin_angle(&s, 0.0, FRAC_PI_2, FRAC_PI_2);
        assert!((target - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_center_movement_is_shortest() {
        let law = MotionLaw::evaluate(&spec(MotionType::Pro, RotationDirection::Cw, 0.0), 0.0, 0.1, 6.2);
        assert!(law.center_movement < 0.0);
        assert!(law.center_movement.abs() < PI);
    }
}
