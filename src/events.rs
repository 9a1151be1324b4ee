//! 缓解核心对外发出的可观测事件与统计快照。
//! Observability events and statistics snapshots emitted by the mitigation
//! core.
//!
//! The core itself performs no persistence or formatting; these types exist
//! for an external metrics collaborator to consume.
//!
//! 核心本身不做任何持久化或格式化；这些类型供外部指标收集方消费。

use crate::message::NodeId;
use tokio::time::Instant;

/// An event of interest to an external metrics collaborator.
/// 外部指标收集方关心的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitigationEvent {
    /// A source transitioned into the `Enforced` state.
    /// 某个源进入了 `Enforced` 状态。
    SourceEnforced { source: NodeId, at: Instant },
    /// A source was released back to `Normal` after recovery.
    /// 某个源在恢复后被解除回 `Normal` 状态。
    SourceReleased { source: NodeId, at: Instant },
    /// A control message was admitted into downstream processing.
    /// 一条控制消息被准入进入后续处理。
    MessageAdmitted { source: NodeId },
    /// A control message from an enforced source was dropped at admission.
    /// 来自被执法源的一条控制消息在准入阶段被丢弃。
    MessageDropped { source: NodeId },
    /// A control message carried a stale timestamp and was ignored.
    /// 一条控制消息携带过期时间戳，被忽略。
    StaleIgnored { source: NodeId },
}

/// A point-in-time snapshot of the controller's session counters.
/// 控制器会话计数器的即时快照。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MitigationStats {
    /// Control messages received, including those later dropped or ignored.
    /// 收到的控制消息总数，包括之后被丢弃或忽略的。
    pub control_rx: u64,
    /// Total payload bytes across received control messages.
    /// 收到的控制消息载荷字节总数。
    pub control_bytes_rx: u64,
    /// Control messages admitted into downstream processing.
    /// 被准入进入后续处理的控制消息数。
    pub control_admitted: u64,
    /// Control messages dropped by admission enforcement.
    /// 被准入执法丢弃的控制消息数。
    pub control_dropped: u64,
    /// Control messages ignored for carrying a stale timestamp.
    /// 因时间戳过期而被忽略的控制消息数。
    pub stale_ignored: u64,
    /// Transitions into the `Enforced` state over the session.
    /// 会话期间进入 `Enforced` 状态的次数。
    pub enforce_transitions: u64,
    /// Releases back to `Normal` over the session.
    /// 会话期间解除回 `Normal` 状态的次数。
    pub release_transitions: u64,
    /// Sources currently in the `Enforced` state.
    /// 当前处于 `Enforced` 状态的源数量。
    pub currently_enforced: u64,
}
