//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::message::NodeId;
use thiserror::Error;

/// The primary error type for the flood defense library.
/// 洪泛防御库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The mitigation policy or source configuration is unusable. Raised at
    /// initialization only; the engine refuses to start rather than run with
    /// undefined rate semantics.
    ///
    /// 缓解策略或源配置不可用。仅在初始化时抛出；引擎拒绝启动，
    /// 而不是在速率语义未定义的情况下运行。
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No feedback lane has been registered for the directive's target.
    /// 指令的目标没有注册任何反馈通道。
    #[error("no feedback lane registered for {0}")]
    UnknownSource(NodeId),

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// 用于任务间通信的内部通道意外关闭。
    #[error("internal channel is broken")]
    ChannelClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
