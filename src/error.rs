//! 引擎错误类型
//!
//! 只有加载期操作（构建骨骼、构建动画片段）会返回错误；
//! 每帧的求解与混合永远不会失败。

use thiserror::Error;

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 骨骼层次为空
    #[error("skeleton has no bones")]
    EmptySkeleton,

    /// 父骨骼索引越界或指向自身
    #[error("bone '{bone}' has invalid parent index {parent}")]
    InvalidParent { bone: String, parent: i32 },

    /// 骨骼层次存在环
    #[error("bone hierarchy contains a cycle at '{bone}'")]
    HierarchyCycle { bone: String },

    /// 动画片段数据非法
    #[error("invalid animation clip: {0}")]
    InvalidClip(String),
}

/// 引擎结果类型
pub type Result<T> = std::result::Result<T, EngineError>;
