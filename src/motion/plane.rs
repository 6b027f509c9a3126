//! 平面坐标映射 - 二维路径角 → 三维位置 / 旋转
//!
//! 二维约定：Y 轴向下的画布，角度增加为顺时针，E = 0，S = π/2。
//! 三维约定：Y 轴向上的右手坐标系，表演者面向 +Z。
//!
//! 每个平面定义 normal / up(N) / right(E) 三个基向量，满足 right × up = normal。
//! 新增平面时必须补齐三个基向量，并实际旋转标记验证时针方向一致。

use glam::{Mat3, Quat, Vec3};

/// 三个规范平面
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    /// 正面平面（XY）
    Wall,
    /// 侧面平面（YZ）
    Wheel,
    /// 水平平面（XZ）
    Floor,
}

/// 平面基向量
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneBasis {
    /// 平面法线
    pub normal: Vec3,
    /// 二维 N 方向
    pub up: Vec3,
    /// 二维 E 方向
    pub right: Vec3,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Wall, Plane::Wheel, Plane::Floor];

    /// 平面基向量
    pub fn basis(self) -> PlaneBasis {
        match self {
            Plane::Wall => PlaneBasis {
                normal: Vec3::Z,
                up: Vec3::Y,
                right: Vec3::X,
            },
            Plane::Wheel => PlaneBasis {
                normal: Vec3::X,
                up: Vec3::Y,
                right: Vec3::NEG_Z,
            },
            Plane::Floor => PlaneBasis {
                normal: Vec3::Y,
                up: Vec3::NEG_Z,
                right: Vec3::X,
            },
        }
    }

    /// 把 XY 平面上的平面物体放到该平面上的固定旋转
    ///
    /// 物体局部 X → right，Y → up，Z → normal。
    pub fn base_rotation(self) -> Quat {
        let b = self.basis();
        Quat::from_mat3(&Mat3::from_cols(b.right, b.up, b.normal)).normalize()
    }

    /// 路径角 + 半径 → 平面内三维偏移
    ///
    /// 二维 Y 向下，三维 up 向上，因此 sin 分量取反。
    pub fn angle_to_position(self, angle: f32, radius: f32) -> Vec3 {
        let b = self.basis();
        let x = angle.cos() * radius;
        let y = angle.sin() * radius;
        b.right * x - b.up * y
    }

    /// 道具旋转 = 平面基础旋转 ∘ 绕法线旋转 -spin
    ///
    /// 二维正角为顺时针，三维绕同一轴的正旋转为逆时针，所以取负。
    pub fn prop_rotation(self, spin_angle: f32) -> Quat {
        self.base_rotation() * Quat::from_rotation_z(-spin_angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_basis_is_right_handed() {
        for plane in Plane::ALL {
            let b = plane.basis();
            assert!(approx(b.right.cross(b.up), b.normal), "{:?}", plane);
        }
    }

    #[test]
    fn test_compass_points_on_wall() {
        let p = Plane::Wall;
        assert!(approx(p.angle_to_position(0.0, 1.0), Vec3::X));
        // 二维 S（π/2）在三维里向下
        assert!(approx(p.angle_to_position(FRAC_PI_2, 1.0), Vec3::NEG_Y));
        // 二维 N（3π/2）在三维里向上
        assert!(approx(p.angle_to_position(3.0 * FRAC_PI_2, 2.0), Vec3::Y * 2.0));
    }

    #[test]
    fn test_prop_rotation_matches_position() {
        // 道具局部 X 轴旋转后应指向同角度的路径方向
        for plane in Plane::ALL {
            for i in 0..8 {
                let a = i as f32 * PI / 4.0;
                let forward = plane.prop_rotation(a) * Vec3::X;
                assert!(approx(forward, plane.angle_to_position(a, 1.0)), "{:?} {}", plane, a);
            }
        }
    }

    #[test]
    fn test_base_rotation_maps_normal() {
        for plane in Plane::ALL {
            let b = plane.basis();
            assert!(approx(plane.base_rotation() * Vec3::Z, b.normal));
        }
    }
}
