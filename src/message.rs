//! 定义了在根节点与流量源之间流动的消息类型。
//! Defines the message types that flow between the root and the traffic
//! sources.

use bytes::Bytes;
use std::fmt;
use tokio::time::Instant;

/// The opaque address of a mesh node. Unique key for all per-source state.
/// 网状网络节点的不透明地址。所有按源状态的唯一键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// A routing control message (DAO-equivalent) sent upward to the root.
/// This is the unit being rate-limited.
///
/// 向根节点上行发送的路由控制消息（等同于DAO）。这是被限速的单位。
#[derive(Debug, Clone)]
pub struct ControlMessage {
    /// The originating node.
    /// 发出消息的节点。
    pub source: NodeId,
    /// The message payload. Only its length matters to the defense core.
    /// 消息载荷。防御核心只关心它的长度。
    pub payload: Bytes,
    /// When the network layer received the message, if it conveys one.
    /// Absent a stamp, the defense actor uses its own processing time, and
    /// the stale-timestamp guard can only see queueing delay.
    ///
    /// 网络层接收该消息的时刻（若有）。没有时间戳时，防御 actor 使用自身的
    /// 处理时刻，过期时间戳防护便只能看到排队延迟。
    pub received_at: Option<Instant>,
}

impl ControlMessage {
    pub fn new(source: NodeId, payload: Bytes) -> Self {
        Self {
            source,
            payload,
            received_at: None,
        }
    }

    /// A message carrying the network layer's receive time.
    /// 携带网络层接收时刻的消息。
    pub fn stamped(source: NodeId, payload: Bytes, received_at: Instant) -> Self {
        Self {
            source,
            payload,
            received_at: Some(received_at),
        }
    }
}

/// The action carried by a feedback directive.
/// 反馈指令携带的动作。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectiveAction {
    /// Ask the source to scale its send rate down to the given value, in
    /// control messages per second. Best-effort: a non-compliant source may
    /// ignore it; receiver-side admission drop remains authoritative.
    ///
    /// 要求源将其发送速率降至给定值（每秒控制消息数）。尽力而为：
    /// 不合作的源可以无视它；接收端的准入丢弃仍然是权威手段。
    ThrottleTo(f64),
    /// Lift the throttle; the source restores its nominal behavior.
    /// 解除限速；源恢复其标称行为。
    Release,
}

/// A one-way message from the mitigation controller to a source's adaptive
/// model. Delivery is assumed reliable and ordered per target; there are no
/// retry semantics at this layer.
///
/// 从缓解控制器发往某个源自适应模型的单向消息。假定投递对每个目标可靠且有序；
/// 本层没有重试语义。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackDirective {
    /// The source the directive applies to.
    /// 指令作用的源。
    pub target: NodeId,
    /// The requested action.
    /// 请求的动作。
    pub action: DirectiveAction,
}
