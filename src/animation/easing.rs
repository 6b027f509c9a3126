//! 缓动曲线
//!
//! 过渡与关键帧插值共用：输入归一化进度 [0, 1]，输出插值系数。
//! 自定义曲线使用三次贝塞尔，按采样点线性查找。

use glam::Vec2;

/// 曲线 trait
pub trait Curve {
    fn value(&self, v: f32) -> f32;
}

/// 三次贝塞尔曲线（端点固定为 (0,0) 与 (1,1)）
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    /// 预计算的曲线采样点（按 X 排序）
    points: Vec<Vec2>,
    /// 控制点1
    c0: Vec2,
    /// 控制点2
    c1: Vec2,
}

impl BezierCurve {
    const P0: Vec2 = Vec2::ZERO;
    const P1: Vec2 = Vec2::ONE;

    /// 默认采样间隔数
    pub const DEFAULT_INTERVAL: u32 = 64;

    /// 创建新的贝塞尔曲线
    ///
    /// # 参数
    /// - `c0`: 控制点1 (0-1 范围)
    /// - `c1`: 控制点2 (0-1 范围)
    /// - `interval`: 采样间隔数
    pub fn new(c0: Vec2, c1: Vec2, interval: u32) -> Self {
        let c0 = c0.clamp(Vec2::ZERO, Vec2::ONE);
        let c1 = c1.clamp(Vec2::ZERO, Vec2::ONE);
        let interval = interval.max(1);
        let mut points = Vec::with_capacity((interval + 1) as usize);
        let interval_f = interval as f32;

        for i in 0..=interval {
            let t = i as f32 / interval_f;
            let it = 1.0 - t;
            // B(t) = (1-t)³P₀ + 3(1-t)²tC₀ + 3(1-t)t²C₁ + t³P₁
            let point = Self::P0 * it.powi(3)
                + c0 * 3.0 * it.powi(2) * t
                + c1 * 3.0 * it * t.powi(2)
                + Self::P1 * t.powi(3);
            points.push(point);
        }

        // 按 X 排序以便查找
        points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));

        Self { points, c0, c1 }
    }

    /// CSS 风格的四参数构造 (x1, y1, x2, y2)
    pub fn from_control_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(Vec2::new(x1, y1), Vec2::new(x2, y2), Self::DEFAULT_INTERVAL)
    }

    pub fn control_points(&self) -> (Vec2, Vec2) {
        (self.c0, self.c1)
    }
}

impl Curve for BezierCurve {
    /// 使用预计算的采样点进行线性插值查找
    fn value(&self, v: f32) -> f32 {
        let mut n = (self.points[0], self.points[1]);
        for point in &self.points[2..] {
            if n.1.x > v {
                break;
            }
            n = (n.1, *point);
        }
        if n.0.x == n.1.x {
            n.0.y
        } else {
            n.0.y + (v - n.0.x) * (n.1.y - n.0.y) / (n.1.x - n.0.x)
        }
    }
}

/// 缓动类型
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// 自定义三次贝塞尔
    Bezier(BezierCurve),
}

impl Easing {
    /// 对归一化进度求缓动系数，输入先钳制到 [0, 1]
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Easing::Bezier(curve) => curve.value(t).clamp(0.0, 1.0),
        }
    }
}

impl Curve for Easing {
    fn value(&self, v: f32) -> f32 {
        self.apply(v)
    }
}
