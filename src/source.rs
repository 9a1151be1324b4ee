//! 被调控的端点：自适应流量源模型。
//! The regulated endpoint: the adaptive traffic source model.
//!
//! Represents any traffic source subject to enforcement — the attacker
//! surrogate or a legitimate node, since the mechanism makes no
//! authentication distinction. Without feedback it sends at its configured
//! nominal rate; a throttle directive scales its rate down (and, in the
//! cooperative variant, raises a local drop fraction) and a release
//! directive restores nominal behavior.
//!
//! 代表任何受执法约束的流量源——攻击者替身或正常节点，因为该机制不做任何
//! 认证区分。没有反馈时它按配置的标称速率发送；限速指令会压低其速率
//! （在合作变体中还会抬高本地丢弃比例），解除指令则恢复标称行为。

use crate::config::SourceConfig;
use crate::message::{DirectiveAction, FeedbackDirective, NodeId};
use crate::root::RootGuardHandle;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The adaptive source model for one node.
/// 单个节点的自适应源模型。
#[derive(Debug)]
pub struct AdaptiveSource {
    id: NodeId,
    nominal_rate: f64,
    current_rate: f64,
    /// Probability of suppressing an emission locally. Zero unless the
    /// cooperative sender-side drop variant is configured.
    /// 本地抑制一次发送的概率。除非配置了合作的发送端丢弃变体，否则为零。
    local_drop_fraction: f64,
    /// The drop fraction this endpoint adopts when throttled, if it
    /// cooperates with the sender-side variant.
    /// 若端点配合发送端变体，被限速时采用的丢弃比例。
    local_drop_on_throttle: f64,
    payload_len: usize,
}

impl AdaptiveSource {
    pub fn new(id: NodeId, config: &SourceConfig) -> Self {
        Self {
            id,
            nominal_rate: config.nominal_rate,
            current_rate: config.nominal_rate,
            local_drop_fraction: 0.0,
            local_drop_on_throttle: config.local_drop_on_throttle,
            payload_len: config.payload_len,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn local_drop_fraction(&self) -> f64 {
        self.local_drop_fraction
    }

    /// The gap between consecutive emissions at the current rate.
    /// 当前速率下相邻两次发送之间的间隔。
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.current_rate)
    }

    /// Mutates the send behavior according to a received directive.
    /// 根据收到的指令改变发送行为。
    pub fn apply(&mut self, directive: &FeedbackDirective) {
        if directive.target != self.id {
            warn!(source = %self.id, addressee = %directive.target, "directive for another node ignored");
            return;
        }
        match directive.action {
            DirectiveAction::ThrottleTo(rate) => {
                self.current_rate = rate;
                self.local_drop_fraction = self.local_drop_on_throttle;
                debug!(source = %self.id, rate, "throttle applied");
            }
            DirectiveAction::Release => {
                self.current_rate = self.nominal_rate;
                self.local_drop_fraction = 0.0;
                debug!(source = %self.id, rate = self.nominal_rate, "released to nominal rate");
            }
        }
    }

    /// Whether the next emission should be suppressed locally. Bernoulli
    /// over the current local drop fraction.
    /// 下一次发送是否应被本地抑制。按当前本地丢弃比例做伯努利抽样。
    pub fn should_suppress(&self) -> bool {
        self.local_drop_fraction > 0.0 && rand::random::<f64>() < self.local_drop_fraction
    }

    fn next_payload(&self) -> Bytes {
        Bytes::from(vec![0u8; self.payload_len])
    }

    /// Drives the source: paces control messages toward the root at the
    /// current rate and reacts to feedback directives as they arrive.
    /// Returns when either channel closes.
    ///
    /// 驱动该源：按当前速率向根节点发送控制消息，并在反馈指令到达时作出
    /// 反应。任一通道关闭时返回。
    pub async fn run(
        mut self,
        root: RootGuardHandle,
        mut directives: mpsc::Receiver<FeedbackDirective>,
    ) {
        let mut pacer = tokio::time::interval(self.interval());
        loop {
            tokio::select! {
                maybe_directive = directives.recv() => {
                    match maybe_directive {
                        Some(directive) => {
                            self.apply(&directive);
                            // Re-pace at the new rate.
                            pacer = tokio::time::interval(self.interval());
                            pacer.reset();
                        }
                        None => break,
                    }
                }
                _ = pacer.tick() => {
                    if self.should_suppress() {
                        continue;
                    }
                    if root.control_message(self.id, self.next_payload()).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
