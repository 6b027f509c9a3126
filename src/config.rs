//! 引擎配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! `PerformerRig` 创建时读取一次快照，之后修改不会影响已有实例。

use std::f32::consts::FRAC_PI_4;
use std::sync::RwLock;

use glam::Vec3;
use once_cell::sync::Lazy;

use crate::skeleton::IkAlgorithm;

/// 引擎配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // ========== IK ==========
    /// 默认 IK 算法，默认解析两骨骼
    pub ik_algorithm: IkAlgorithm,
    /// 迭代算法（CCD / FABRIK）的最大迭代次数，默认 16
    pub ik_max_iterations: u32,
    /// 末端到目标的收敛距离，默认 1e-3
    pub ik_tolerance: f32,
    /// CCD 单根骨骼单步最大旋转角（弧度），默认 π/4
    pub ccd_max_step: f32,
    /// 默认肘部极向量（世界空间，朝下并略向后）
    pub arm_pole: Vec3,

    // ========== 姿态混合 ==========
    /// 连续平滑系数，取值 (0, 1]，1.0 等价于直接模式
    pub smoothing_factor: f32,

    // ========== 道具 ==========
    /// 道具路径半径，默认 1.0
    pub prop_radius: f32,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // ====== IK ======
            // 两骨骼手臂使用解析解：O(1)、确定、精确
            ik_algorithm: IkAlgorithm::TwoBone,
            // 短链 FABRIK 通常 3~5 次即可收敛，CCD 需要更多
            ik_max_iterations: 16,
            ik_tolerance: 1.0e-3,
            ccd_max_step: FRAC_PI_4,
            // 表演者面向 +Z，肘部自然朝下、朝后
            arm_pole: Vec3::new(0.0, -1.0, -1.0),

            // ====== 姿态混合 ======
            smoothing_factor: 0.25,

            // ====== 道具 ======
            prop_radius: 1.0,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static ENGINE_CONFIG: Lazy<RwLock<EngineConfig>> =
    Lazy::new(|| RwLock::new(EngineConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> EngineConfig {
    ENGINE_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: EngineConfig) {
    *ENGINE_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *ENGINE_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = EngineConfig::default();
}
