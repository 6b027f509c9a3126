//! 道具状态插值
//!
//! `PropEvaluator::evaluate(spec, progress)` 是 (MotionSpec, progress) 的纯函数，
//! 每次调用返回新的 `PropState`。

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Quat, Vec3};

use crate::config::EngineConfig;

use super::angle::{lerp, lerp_shortest, normalize};
use super::motion_law::MotionLaw;
use super::orientation::orientation_to_angle;
use super::plane::Plane;
use super::{MotionSpec, MotionType};

const DEGENERATE_RADIUS: f32 = 1.0e-6;

// ============================================================================
// 网格位置
// ============================================================================

/// 网格位置（八方位）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Location {
    pub const ALL: [Location; 8] = [
        Location::N,
        Location::NE,
        Location::E,
        Location::SE,
        Location::S,
        Location::SW,
        Location::W,
        Location::NW,
    ];

    /// 默认罗盘角（Y 向下画布，顺时针递增）
    pub fn compass_angle(self) -> f32 {
        match self {
            Location::E => 0.0,
            Location::SE => FRAC_PI_4,
            Location::S => FRAC_PI_2,
            Location::SW => 3.0 * FRAC_PI_4,
            Location::W => PI,
            Location::NW => 5.0 * FRAC_PI_4,
            Location::N => 3.0 * FRAC_PI_2,
            Location::NE => 7.0 * FRAC_PI_4,
        }
    }
}

/// 网格位置 → 路径角查询（由编排层提供）
pub trait LocationLookup {
    fn path_angle(&self, location: Location) -> f32;
}

/// 默认位置表，可逐项覆盖
#[derive(Clone, Debug, Default)]
pub struct LocationTable {
    overrides: HashMap<Location, f32>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖某个位置的路径角
    pub fn with_angle(mut self, location: Location, angle: f32) -> Self {
        self.overrides.insert(location, normalize(angle));
        self
    }
}

impl LocationLookup for LocationTable {
    fn path_angle(&self, location: Location) -> f32 {
        self.overrides
            .get(&location)
            .copied()
            .unwrap_or_else(|| location.compass_angle())
    }
}

// ============================================================================
// 道具状态
// ============================================================================

/// 道具在某一进度下的状态（派生值，每帧重新计算）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropState {
    pub plane: Plane,
    /// 路径角，[0, 2π)
    pub path_angle: f32,
    /// 瞬时半径，DASH 经过中心时接近 0
    pub radius: f32,
    /// 旋转角，未归一化以保留多圈累积量
    pub spin_angle: f32,
    pub world_position: Vec3,
    pub world_rotation: Quat,
}

/// 道具状态求值器
#[derive(Clone, Debug)]
pub struct PropEvaluator<L = LocationTable> {
    /// 网格位置表
    pub locations: L,
    /// 路径半径
    pub radius: f32,
    /// 路径中心（世界空间）
    pub center: Vec3,
}

impl PropEvaluator<LocationTable> {
    /// 使用默认位置表
    pub fn new(radius: f32, center: Vec3) -> Self {
        Self::with_locations(LocationTable::default(), radius, center)
    }

    /// 半径取配置中的 `prop_radius`
    pub fn from_config(config: &EngineConfig, center: Vec3) -> Self {
        Self::new(config.prop_radius, center)
    }
}

impl<L: LocationLookup> PropEvaluator<L> {
    pub fn with_locations(locations: L, radius: f32, center: Vec3) -> Self {
        Self {
            locations,
            radius,
            center,
        }
    }

    /// 求运动规律（起止路径角与旋转角）
    pub fn motion_law(&self, spec: &MotionSpec) -> MotionLaw {
        let start_path = self.locations.path_angle(spec.start_location);
        let end_path = self.locations.path_angle(spec.end_location);
        let start_spin = orientation_to_angle(spec.start_orientation, start_path);
        MotionLaw::evaluate(spec, start_spin, start_path, end_path)
    }

    /// 对进度 [0, 1] 求道具状态
    pub fn evaluate(&self, spec: &MotionSpec, progress: f32) -> PropState {
        let t = progress.clamp(0.0, 1.0);
        let start_path = self.locations.path_angle(spec.start_location);
        let end_path = self.locations.path_angle(spec.end_location);
        let law = self.motion_law(spec);

        let (path_angle, radius) = if spec.motion_type == MotionType::Dash {
            self.dash_path(start_path, end_path, t)
        } else {
            (lerp_shortest(start_path, end_path, t), self.radius)
        };

        // 旋转角线性插值到未归一化的目标值，多圈旋转不会被折叠
        let spin_angle = lerp(law.start_spin, law.target_spin, t);

        let offset = spec.plane.angle_to_position(path_angle, radius);
        PropState {
            plane: spec.plane,
            path_angle,
            radius,
            spin_angle,
            world_position: self.center + offset,
            world_rotation: spec.plane.prop_rotation(spin_angle),
        }
    }

    /// DASH：在平面二维坐标中走直线穿过中心
    fn dash_path(&self, start_path: f32, end_path: f32, t: f32) -> (f32, f32) {
        let (sx, sy) = (start_path.cos() * self.radius, start_path.sin() * self.radius);
        let (ex, ey) = (end_path.cos() * self.radius, end_path.sin() * self.radius);
        let x = lerp(sx, ex, t);
        let y = lerp(sy, ey, t);
        let radius = (x * x + y * y).sqrt();

        if radius < DEGENERATE_RADIUS {
            // 正好在中心，角度无意义，沿用较近一端
            let angle = if t < 0.5 { start_path } else { end_path };
            return (normalize(angle), radius);
        }
        (normalize(y.atan2(x)), radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::angle::normalize_signed;
    use crate::motion::{Orientation, RotationDirection};

    fn wall_spec(motion_type: MotionType, start: Location, end: Location) -> MotionSpec {
        MotionSpec {
            plane: Plane::Wall,
            start_location: start,
            end_location: end,
            motion_type,
            rotation_direction: RotationDirection::Cw,
            turns: 1.0,
            start_orientation: Orientation::In,
            end_orientation: Orientation::Out,
        }
    }

    #[test]
    fn test_dash_passes_through_center() {
        let evaluator = PropEvaluator::new(1.0, Vec3::ZERO);
        let spec = wall_spec(MotionType::Dash, Location::N, Location::S);
        let mid = evaluator.evaluate(&spec, 0.5);
        assert!(mid.radius < 1e-4);
        assert!(mid.world_position.length() < 1e-4);
        // 其它进度半径先缩小后增大
        let quarter = evaluator.evaluate(&spec, 0.25);
        assert!((quarter.radius - 0.5).abs() < 1e-4);
        let end = evaluator.evaluate(&spec, 1.0);
        assert!((end.radius - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_pro_end_to_end_on_wall() {
        let evaluator = PropEvaluator::new(1.0, Vec3::ZERO);
        let spec = wall_spec(MotionType::Pro, Location::N, Location::S);
        let law = evaluator.motion_law(&spec);

        let s0 = evaluator.evaluate(&spec, 0.0);
        let s1 = evaluator.evaluate(&spec, 0.5);
        let s2 = evaluator.evaluate(&spec, 1.0);

        // 路径角沿同一方向等步前进
        let step_a = normalize_signed(s1.path_angle - s0.path_angle);
        let step_b = normalize_signed(s2.path_angle - s1.path_angle);
        assert!((step_a - step_b).abs() < 1e-4);
        assert!(step_a.abs() > 0.0);
        assert!((step_a * 2.0 - law.center_movement).abs() < 1e-4);

        // 旋转角总量 = 中心移动量 + π
        let sweep = s2.spin_angle - s0.spin_angle;
        assert!((sweep - (law.center_movement + PI)).abs() < 1e-4);

        // 起止位置分别在上方与下方
        assert!((s0.world_position - Vec3::Y).length() < 1e-4);
        assert!((s2.world_position - Vec3::NEG_Y).length() < 1e-4);
    }

    #[test]
    fn test_multi_turn_spin_not_collapsed() {
        let evaluator = PropEvaluator::new(1.0, Vec3::ZERO);
        let mut spec = wall_spec(MotionType::Static, Location::E, Location::E);
        spec.turns = 3.0;
        let s0 = evaluator.evaluate(&spec, 0.0);
        let s2 = evaluator.evaluate(&spec, 1.0);
        assert!((s2.spin_angle - s0.spin_angle - 3.0 * PI).abs() < 1e-4);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let evaluator = PropEvaluator::new(0.8, Vec3::new(0.0, 1.4, 0.3));
        let spec = wall_spec(MotionType::Anti, Location::NE, Location::SW);
        let a = evaluator.evaluate(&spec, 0.37);
        let b = evaluator.evaluate(&spec, 0.37);
        assert_eq!(a, b);
    }

    #[test]
    fn test_radius_from_config() {
        let config = EngineConfig {
            prop_radius: 0.5,
            ..EngineConfig::default()
        };
        let center = Vec3::new(0.0, 1.5, 0.3);
        let evaluator = PropEvaluator::from_config(&config, center);
        let spec = wall_spec(MotionType::Pro, Location::E, Location::W);
        let state = evaluator.evaluate(&spec, 0.0);
        assert!((state.radius - 0.5).abs() < 1e-6);
        assert!((state.world_position.distance(center) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_location_override() {
        let table = LocationTable::new().with_angle(Location::N, -FRAC_PI_2);
        assert!((table.path_angle(Location::N) - 3.0 * FRAC_PI_2).abs() < 1e-5);
        assert_eq!(table.path_angle(Location::E), 0.0);
    }
}
