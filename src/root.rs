//! 运行在路由树根节点的防御 actor。
//! The defense actor running at the routing tree's root.
//!
//! The actor owns the mitigation controller and is driven by a single
//! `select!` loop over its command channel and the periodic recovery clock,
//! so all arrivals and ticks are processed strictly in time order and no
//! per-source locking exists anywhere. Feedback directives leave through a
//! pluggable [`DirectiveTransport`], and observability events fan out to an
//! optional metrics channel.
//!
//! 该 actor 拥有缓解控制器，由一个 `select!` 循环驱动，循环监听命令通道和
//! 周期性恢复时钟，因此所有到达与滴答都严格按时间顺序处理，任何地方都不
//! 存在按源加锁。反馈指令经由可插拔的 [`DirectiveTransport`] 发出，
//! 可观测事件则扇出到可选的指标通道。

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{MitigationEvent, MitigationStats};
use crate::message::{ControlMessage, FeedbackDirective, NodeId};
use crate::mitigation::{ArrivalOutcome, MitigationController};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{trace, warn};


/// How many commands may queue at the root before senders are backpressured.
/// 根节点命令队列在发送方被反压之前可容纳的命令数。
const COMMAND_CHANNEL_CAPACITY: usize = 128;

/// A command for the root actor.
/// 发给根节点 actor 的命令。
#[derive(Debug)]
pub enum RootCommand {
    /// A control message arrived from the network layer.
    /// 网络层送达的一条控制消息。
    Control(ControlMessage),
    /// Registers the feedback lane for a source.
    /// 注册某个源的反馈通道。
    Register {
        source: NodeId,
        lane: mpsc::Sender<FeedbackDirective>,
    },
    /// Requests a snapshot of the session counters.
    /// 请求会话计数器的快照。
    Stats(oneshot::Sender<MitigationStats>),
}

/// The outgoing feedback channel, abstracted so tests can observe directive
/// delivery without wiring real sources.
///
/// Delivery is assumed reliable and in order per target; a failure is
/// treated as transient and is never retried, because receiver-side
/// admission drop stays authoritative whether or not the source ever hears
/// the directive.
///
/// 对外的反馈通道抽象，便于测试在不接入真实源的情况下观察指令投递。
///
/// 假定对每个目标的投递可靠且有序；投递失败被视为瞬态且从不重试，
/// 因为无论源是否收到指令，接收端的准入丢弃都保持权威。
#[async_trait]
pub trait DirectiveTransport: Send + 'static {
    /// Delivers one directive to its target.
    async fn deliver(&mut self, directive: FeedbackDirective) -> Result<()>;

    /// Attaches the lane over which `source` receives directives.
    /// 挂接 `source` 接收指令所用的通道。
    fn attach(&mut self, source: NodeId, lane: mpsc::Sender<FeedbackDirective>);
}

/// The default transport: one mpsc lane per registered source.
/// 默认传输：每个已注册的源一条 mpsc 通道。
#[derive(Debug, Default)]
pub struct MpscDirectiveTransport {
    lanes: HashMap<NodeId, mpsc::Sender<FeedbackDirective>>,
}

#[async_trait]
impl DirectiveTransport for MpscDirectiveTransport {
    async fn deliver(&mut self, directive: FeedbackDirective) -> Result<()> {
        match self.lanes.get(&directive.target) {
            Some(lane) => lane
                .send(directive)
                .await
                .map_err(|_| Error::ChannelClosed),
            None => Err(Error::UnknownSource(directive.target)),
        }
    }

    fn attach(&mut self, source: NodeId, lane: mpsc::Sender<FeedbackDirective>) {
        self.lanes.insert(source, lane);
    }
}

/// A cloneable handle for talking to a running [`RootGuard`].
/// 与运行中的 [`RootGuard`] 通信的可克隆句柄。
#[derive(Debug, Clone)]
pub struct RootGuardHandle {
    commands: mpsc::Sender<RootCommand>,
}

impl RootGuardHandle {
    /// Submits one received control message. The arrival timestamp is taken
    /// when the actor processes the command, preserving time order.
    ///
    /// 提交一条收到的控制消息。到达时间戳在 actor 处理命令时获取，
    /// 以保持时间顺序。
    pub async fn control_message(&self, source: NodeId, payload: Bytes) -> Result<()> {
        self.commands
            .send(RootCommand::Control(ControlMessage::new(source, payload)))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Submits a control message stamped with the network layer's receive
    /// time, so the stale-timestamp guard sees the original arrival rather
    /// than the moment the actor dequeues the command.
    ///
    /// 提交一条带有网络层接收时刻的控制消息，使过期时间戳防护看到的是
    /// 原始到达时刻，而非 actor 取出命令的时刻。
    pub async fn control_message_at(
        &self,
        source: NodeId,
        payload: Bytes,
        received_at: Instant,
    ) -> Result<()> {
        self.commands
            .send(RootCommand::Control(ControlMessage::stamped(
                source,
                payload,
                received_at,
            )))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Registers the feedback lane for a source model.
    /// 注册某个源模型的反馈通道。
    pub async fn register_source(
        &self,
        source: NodeId,
        lane: mpsc::Sender<FeedbackDirective>,
    ) -> Result<()> {
        self.commands
            .send(RootCommand::Register { source, lane })
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Fetches a snapshot of the session counters.
    /// 获取会话计数器的快照。
    pub async fn stats(&self) -> Result<MitigationStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(RootCommand::Stats(reply_tx))
            .await
            .map_err(|_| Error::ChannelClosed)?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)
    }
}

/// The root defense actor.
/// 根节点防御 actor。
pub struct RootGuard<T: DirectiveTransport> {
    controller: MitigationController,
    transport: T,
    commands: mpsc::Receiver<RootCommand>,
    metrics: Option<mpsc::UnboundedSender<MitigationEvent>>,
    recovery_period: Duration,
}

impl RootGuard<MpscDirectiveTransport> {
    /// Creates a root guard with the default per-source mpsc transport.
    /// 使用默认的按源 mpsc 传输创建根守卫。
    pub fn new(config: &Config) -> Result<(Self, RootGuardHandle)> {
        Self::with_transport(config, MpscDirectiveTransport::default())
    }
}

impl<T: DirectiveTransport> RootGuard<T> {
    /// Creates a root guard over a custom directive transport. Fails if the
    /// configuration is outside the recognized ranges.
    ///
    /// 基于自定义指令传输创建根守卫。配置超出可识别范围时失败。
    pub fn with_transport(config: &Config, transport: T) -> Result<(Self, RootGuardHandle)> {
        let controller = MitigationController::new(config)?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let guard = Self {
            controller,
            transport,
            commands: command_rx,
            metrics: None,
            recovery_period: config.mitigation.recovery_period(),
        };
        Ok((guard, RootGuardHandle { commands: command_tx }))
    }

    /// Opens the metrics channel. Events are dropped, not buffered
    /// indefinitely, once the receiver goes away.
    ///
    /// 打开指标通道。接收端消失后事件被丢弃，而不会无限缓冲。
    pub fn metrics_channel(&mut self) -> mpsc::UnboundedReceiver<MitigationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.metrics = Some(tx);
        rx
    }

    /// Runs the actor until every handle is dropped.
    /// 运行 actor，直到所有句柄都被释放。
    pub async fn run(mut self) {
        let start = Instant::now();
        let mut recovery =
            tokio::time::interval_at(start + self.recovery_period, self.recovery_period);

        loop {
            tokio::select! {
                maybe_command = self.commands.recv() => {
                    match maybe_command {
                        Some(RootCommand::Control(message)) => {
                            self.handle_control(message).await;
                        }
                        Some(RootCommand::Register { source, lane }) => {
                            self.transport.attach(source, lane);
                        }
                        Some(RootCommand::Stats(reply)) => {
                            let _ = reply.send(self.controller.stats());
                        }
                        None => break,
                    }
                }
                _ = recovery.tick() => {
                    self.handle_recovery_tick().await;
                }
            }
        }
    }

    async fn handle_control(&mut self, message: ControlMessage) {
        let at = message.received_at.unwrap_or_else(Instant::now);
        let (outcome, directive) =
            self.controller
                .on_control_message(message.source, at, message.payload.len());

        match outcome {
            ArrivalOutcome::Admitted { windowed_count } => {
                trace!(source = %message.source, windowed_count, "control message admitted");
                self.emit(MitigationEvent::MessageAdmitted {
                    source: message.source,
                });
            }
            ArrivalOutcome::Dropped => {
                self.emit(MitigationEvent::MessageDropped {
                    source: message.source,
                });
            }
            ArrivalOutcome::Stale => {
                self.emit(MitigationEvent::StaleIgnored {
                    source: message.source,
                });
            }
        }

        if let Some(directive) = directive {
            self.emit(MitigationEvent::SourceEnforced {
                source: message.source,
                at,
            });
            self.deliver(directive).await;
        }
    }

    async fn handle_recovery_tick(&mut self) {
        let now = Instant::now();
        for directive in self.controller.on_recovery_tick(now) {
            self.emit(MitigationEvent::SourceReleased {
                source: directive.target,
                at: now,
            });
            self.deliver(directive).await;
        }
    }

    async fn deliver(&mut self, directive: FeedbackDirective) {
        // Transient by contract: enforcement state at the receiver stays
        // authoritative whether or not this arrives.
        if let Err(e) = self.transport.deliver(directive).await {
            warn!(node = %directive.target, error = %e, "feedback directive not delivered");
        }
    }

    fn emit(&self, event: MitigationEvent) {
        if let Some(metrics) = &self.metrics {
            let _ = metrics.send(event);
        }
    }
}
