//! 姿态混合器
//!
//! 每帧三种互斥模式之一：
//! - 直接：current := target
//! - 连续平滑：current += (target - current) * factor
//! - 定时过渡：按 dt / duration 推进，结束后回到直接 / 平滑模式
//!
//! 平滑或过渡之后按插入顺序叠加动画图层（顺序相关，不可交换）。

use crate::config::EngineConfig;

use super::easing::Easing;
use super::pose::BodyPose;

/// 基础混合模式
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlendMode {
    Direct,
    /// 指数逼近，factor ∈ (0, 1]
    Smooth { factor: f32 },
}

/// 定时过渡
#[derive(Clone, Debug, PartialEq)]
pub struct PoseTransition {
    pub from: BodyPose,
    pub to: BodyPose,
    /// 秒
    pub duration: f32,
    pub easing: Easing,
    /// [0, 1]
    pub progress: f32,
}

/// 动画图层
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationLayer {
    pub id: String,
    /// [0, 1]
    pub weight: f32,
    pub pose: BodyPose,
}

impl AnimationLayer {
    pub fn new(id: impl Into<String>, weight: f32, pose: BodyPose) -> Self {
        Self {
            id: id.into(),
            weight: weight.clamp(0.0, 1.0),
            pose,
        }
    }
}

/// 姿态混合器
#[derive(Clone, Debug)]
pub struct PoseBlender {
    mode: BlendMode,
    current: BodyPose,
    target: BodyPose,
    transition: Option<PoseTransition>,
    layers: Vec<AnimationLayer>,
    /// 上一帧组合结果
    output: BodyPose,
    debug_log: bool,
}

impl PoseBlender {
    pub fn new(mode: BlendMode) -> Self {
        Self {
            mode: Self::sanitize(mode),
            current: BodyPose::default(),
            target: BodyPose::default(),
            transition: None,
            layers: Vec::new(),
            output: BodyPose::default(),
            debug_log: false,
        }
    }

    /// 使用配置中的平滑系数
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut blender = Self::new(BlendMode::Smooth {
            factor: config.smoothing_factor,
        });
        blender.debug_log = config.debug_log;
        blender
    }

    fn sanitize(mode: BlendMode) -> BlendMode {
        match mode {
            BlendMode::Smooth { factor } if !(factor > 0.0) => BlendMode::Direct,
            BlendMode::Smooth { factor } => BlendMode::Smooth {
                factor: factor.min(1.0),
            },
            BlendMode::Direct => BlendMode::Direct,
        }
    }

    // ========================================
    // 状态
    // ========================================

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BlendMode) {
        self.mode = Self::sanitize(mode);
    }

    pub fn current(&self) -> &BodyPose {
        &self.current
    }

    pub fn target(&self) -> &BodyPose {
        &self.target
    }

    /// 上一帧组合了图层后的结果
    pub fn output(&self) -> &BodyPose {
        &self.output
    }

    pub fn transition(&self) -> Option<&PoseTransition> {
        self.transition.as_ref()
    }

    /// 设置目标姿态（平滑 / 直接模式下逐帧逼近）
    pub fn set_target(&mut self, target: BodyPose) {
        self.target = target;
    }

    /// 立即跳到指定姿态，丢弃进行中的过渡
    pub fn snap_to(&mut self, pose: BodyPose) {
        self.transition = None;
        self.current = pose;
        self.target = pose;
        self.output = pose;
    }

    /// 从当前姿态开始定时过渡；覆盖进行中的过渡
    pub fn start_transition(&mut self, to: BodyPose, duration: f32, easing: Easing) {
        if !(duration > 0.0) {
            self.snap_to(to);
            return;
        }
        if self.debug_log {
            log::info!("[Blend] 开始过渡: {:.3}s {:?}", duration, easing);
        }
        self.target = to;
        self.transition = Some(PoseTransition {
            from: self.current,
            to,
            duration,
            easing,
            progress: 0.0,
        });
    }

    /// 放弃过渡，保持当前姿态
    pub fn cancel_transition(&mut self) {
        self.transition = None;
    }

    // ========================================
    // 图层
    // ========================================

    pub fn layers(&self) -> &[AnimationLayer] {
        &self.layers
    }

    /// 添加图层；同 id 已存在时原位替换，保持顺序
    pub fn add_layer(&mut self, layer: AnimationLayer) {
        match self.layers.iter_mut().find(|l| l.id == layer.id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    pub fn remove_layer(&mut self, id: &str) -> Option<AnimationLayer> {
        let pos = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(pos))
    }

    /// 更新图层权重，图层不存在时返回 false
    pub fn set_layer_weight(&mut self, id: &str, weight: f32) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.weight = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn set_layer_pose(&mut self, id: &str, pose: BodyPose) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.pose = pose;
                true
            }
            None => false,
        }
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    // ========================================
    // 更新
    // ========================================

    /// 推进一帧，返回组合后的姿态
    pub fn tick(&mut self, dt: f32) -> BodyPose {
        let dt = dt.max(0.0);

        if let Some(transition) = self.transition.as_mut() {
            transition.progress = (transition.progress + dt / transition.duration).min(1.0);
            let t = transition.easing.apply(transition.progress);
            self.current = transition.from.lerp(&transition.to, t);

            if transition.progress >= 1.0 {
                self.current = transition.to;
                self.target = transition.to;
                self.transition = None;
                if self.debug_log {
                    log::info!("[Blend] 过渡完成，回到 {:?}", self.mode);
                }
            }
        } else {
            self.current = match self.mode {
                BlendMode::Direct => self.target,
                BlendMode::Smooth { factor } => self.current.lerp(&self.target, factor),
            };
        }

        let mut composed = self.current;
        for layer in &self.layers {
            if layer.weight > 0.0 {
                composed = composed.lerp(&layer.pose, layer.weight);
            }
        }
        self.output = composed;
        composed
    }
}

impl Default for PoseBlender {
    fn default() -> Self {
        Self::new(BlendMode::Direct)
    }
}
