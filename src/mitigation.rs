//! 缓解控制器：每个源的状态机、准入执法与恢复评估。
//! The mitigation controller: per-source state machines, admission
//! enforcement and recovery evaluation.
//!
//! The controller owns all per-source state in a plain map; records are
//! created lazily on first observation and retained for the monitoring
//! session. Nothing here is shared or static, and no method blocks: the
//! controller is driven by one logic task that feeds it arrivals and
//! recovery ticks in time order.
//!
//! 控制器在一个普通映射中拥有全部按源状态；记录在首次观察时惰性创建，
//! 并在整个监控会话内保留。这里没有共享或静态状态，也没有阻塞方法：
//! 控制器由单个逻辑任务按时间顺序馈入到达事件和恢复滴答来驱动。

use crate::config::{Config, MitigationConfig};
use crate::error::Result;
use crate::events::MitigationStats;
use crate::message::{DirectiveAction, FeedbackDirective, NodeId};
use crate::rate::{classify, windowed_rate, RateClass};
use crate::window::SlidingWindow;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, trace, warn};


/// Tolerance for representation error in the admission credit. The
/// per-arrival increment `1 - enforced_drop_fraction` is not exact in
/// binary floating point (ten increments of `1.0 - 0.9` sum to just under
/// `1.0`), so a full credit is recognized at `1 - ε`.
/// 准入额度的表示误差容差。每次到达累积的 `1 - enforced_drop_fraction`
/// 在二进制浮点下并不精确（`1.0 - 0.9` 累加十次略小于 `1.0`），
/// 因此满额度按 `1 - ε` 判定。
const ADMIT_CREDIT_EPSILON: f64 = 1e-9;

/// The enforcement state of one source.
/// 单个源的执法状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// The source behaves; its messages are admitted untouched.
    /// 源行为正常；其消息原样准入。
    Normal,
    /// The source exceeded the rate threshold; admission dropping applies
    /// and a throttle directive has been issued.
    /// 源超过了速率阈值；准入丢弃生效，并且已发出限速指令。
    Enforced,
}

/// The classification of one control-message arrival.
/// 单次控制消息到达的处理结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// The message was admitted; `windowed_count` is the arrival-log length
    /// after insertion.
    /// 消息被准入；`windowed_count` 是插入后的到达日志长度。
    Admitted { windowed_count: usize },
    /// The message was dropped by admission enforcement.
    /// 消息被准入执法丢弃。
    Dropped,
    /// The message carried a stale timestamp and was ignored.
    /// 消息携带过期时间戳，被忽略。
    Stale,
}

/// All session state the controller keeps for one source.
/// 控制器为单个源保存的全部会话状态。
#[derive(Debug)]
struct SourceRecord {
    /// Arrival log of admitted control messages. Dropped messages never
    /// enter it, so the recovery evaluation reads the post-drop rate.
    /// 已准入控制消息的到达日志。被丢弃的消息不会进入，
    /// 因此恢复评估读到的是丢弃后的速率。
    window: SlidingWindow,
    state: SourceState,
    /// Recovery evaluations in a row where the admitted rate stayed at or
    /// below threshold while enforced.
    /// 执法期间已准入速率连续不超过阈值的恢复评估次数。
    consecutive_clear_windows: u32,
    /// When the source last entered `Enforced`. Diagnostics only.
    /// 源最近一次进入 `Enforced` 的时刻。仅用于诊断。
    enforced_since: Option<Instant>,
    /// Fractional admission credit. Each arrival while enforced earns
    /// `1 - enforced_drop_fraction`; a message is admitted when a whole
    /// credit has accumulated, so exactly that fraction passes, evenly
    /// spread, with no randomness on the hot path.
    /// 小数准入额度。执法期间每次到达累积 `1 - enforced_drop_fraction`；
    /// 累积满一个整额度时准入一条消息，因此恰好该比例的消息被放行，
    /// 分布均匀，热路径上没有随机性。
    admit_credit: f64,
}

impl SourceRecord {
    fn new(policy: &MitigationConfig) -> Self {
        Self {
            window: SlidingWindow::new(policy.window_duration),
            state: SourceState::Normal,
            consecutive_clear_windows: 0,
            enforced_since: None,
            admit_credit: 0.0,
        }
    }
}

/// The mitigation controller running at the routing tree's root.
///
/// Consumes "a control message arrived from source S at time T" events and
/// periodic recovery ticks; produces admission verdicts, feedback directives
/// and session counters. It performs no I/O itself.
///
/// 运行在路由树根节点的缓解控制器。
///
/// 它消费“时刻 T 从源 S 收到一条控制消息”事件和周期性恢复滴答；
/// 产出准入结论、反馈指令和会话计数。它本身不做任何 I/O。
#[derive(Debug)]
pub struct MitigationController {
    policy: MitigationConfig,
    /// The throttle target handed out on enforcement:
    /// `nominal_rate * feedback_scale_factor`.
    /// 执法时下发的限速目标：`nominal_rate * feedback_scale_factor`。
    throttle_rate: f64,
    sources: HashMap<NodeId, SourceRecord>,
    stats: MitigationStats,
}

impl MitigationController {
    /// Creates a controller for one monitoring session. Fails if the
    /// configuration is outside the recognized ranges.
    ///
    /// 为一次监控会话创建控制器。配置超出可识别范围时失败。
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: config.mitigation.clone(),
            throttle_rate: config.source.nominal_rate * config.mitigation.feedback_scale_factor,
            sources: HashMap::new(),
            stats: MitigationStats::default(),
        })
    }

    /// Processes one control-message arrival.
    ///
    /// Never panics and never returns an error: every per-event anomaly is
    /// classified into the outcome and counted. The directive, when present,
    /// is the at-most-once throttle issued on the transition into
    /// `Enforced`.
    ///
    /// 处理一次控制消息到达。
    ///
    /// 不会 panic 也不返回错误：每个事件级异常都被归类进结论并计数。
    /// 返回的指令（若有）是进入 `Enforced` 时至多发出一次的限速指令。
    pub fn on_control_message(
        &mut self,
        source: NodeId,
        at: Instant,
        payload_len: usize,
    ) -> (ArrivalOutcome, Option<FeedbackDirective>) {
        self.stats.control_rx += 1;
        self.stats.control_bytes_rx += payload_len as u64;

        let record = self
            .sources
            .entry(source)
            .or_insert_with(|| SourceRecord::new(&self.policy));

        if record.window.is_stale(at) {
            self.stats.stale_ignored += 1;
            warn!(%source, "stale control message ignored");
            return (ArrivalOutcome::Stale, None);
        }

        if record.state == SourceState::Enforced {
            record.admit_credit += 1.0 - self.policy.enforced_drop_fraction;
            if record.admit_credit < 1.0 - ADMIT_CREDIT_EPSILON {
                self.stats.control_dropped += 1;
                trace!(%source, "control message dropped at admission");
                return (ArrivalOutcome::Dropped, None);
            }
            // A sub-epsilon shortfall is rounding error, not real credit;
            // it must not carry into the next accumulation cycle.
            record.admit_credit = (record.admit_credit - 1.0).max(0.0);
        }

        let windowed_count = record.window.observe(at);
        self.stats.control_admitted += 1;

        let mut directive = None;
        if record.state == SourceState::Normal
            && classify(windowed_count, self.policy.window_duration, self.policy.rate_threshold)
                == RateClass::Exceeded
        {
            record.state = SourceState::Enforced;
            record.enforced_since = Some(at);
            record.consecutive_clear_windows = 0;
            record.admit_credit = 0.0;
            self.stats.enforce_transitions += 1;
            debug!(
                %source,
                rate = windowed_rate(windowed_count, self.policy.window_duration),
                threshold = self.policy.rate_threshold,
                "source enforced"
            );
            directive = Some(FeedbackDirective {
                target: source,
                action: DirectiveAction::ThrottleTo(self.throttle_rate),
            });
        }

        (ArrivalOutcome::Admitted { windowed_count }, directive)
    }

    /// Runs one periodic recovery evaluation across all enforced sources.
    ///
    /// Each enforced source's admitted windowed rate is recomputed at `now`;
    /// a source with no traffic since the last tick reads as rate zero. A
    /// rate above threshold resets the source's clear streak; otherwise the
    /// streak grows, and once it reaches `recovery_windows_required` the
    /// source returns to `Normal` and a `Release` directive is produced.
    ///
    /// 对所有被执法的源执行一次周期性恢复评估。
    ///
    /// 在 `now` 时刻重新计算每个被执法源的已准入窗口速率；自上次滴答以来
    /// 没有流量的源读出速率为零。超过阈值会清零该源的连续达标计数；
    /// 否则计数增长，达到 `recovery_windows_required` 时源回到 `Normal`
    /// 并产出一条 `Release` 指令。
    pub fn on_recovery_tick(&mut self, now: Instant) -> Vec<FeedbackDirective> {
        let mut released = Vec::new();
        for (source, record) in &mut self.sources {
            if record.state != SourceState::Enforced {
                continue;
            }
            let count = record.window.refresh(now);
            match classify(count, self.policy.window_duration, self.policy.rate_threshold) {
                RateClass::Exceeded => {
                    record.consecutive_clear_windows = 0;
                    trace!(
                        %source,
                        rate = windowed_rate(count, self.policy.window_duration),
                        "recovery tick: admitted rate still above threshold"
                    );
                }
                RateClass::Within => {
                    record.consecutive_clear_windows += 1;
                    trace!(
                        %source,
                        clear_windows = record.consecutive_clear_windows,
                        "recovery tick: admitted rate within threshold"
                    );
                    if record.consecutive_clear_windows >= self.policy.recovery_windows_required {
                        record.state = SourceState::Normal;
                        record.consecutive_clear_windows = 0;
                        record.enforced_since = None;
                        record.admit_credit = 0.0;
                        self.stats.release_transitions += 1;
                        debug!(%source, "source released");
                        released.push(FeedbackDirective {
                            target: *source,
                            action: DirectiveAction::Release,
                        });
                    }
                }
            }
        }
        released
    }

    /// The current enforcement state of a source, if it has ever been seen.
    /// 某个源当前的执法状态（若它曾被观察到）。
    pub fn state_of(&self, source: NodeId) -> Option<SourceState> {
        self.sources.get(&source).map(|record| record.state)
    }

    pub fn is_enforced(&self, source: NodeId) -> bool {
        self.state_of(source) == Some(SourceState::Enforced)
    }

    /// A snapshot of the session counters.
    /// 会话计数器的快照。
    pub fn stats(&self) -> MitigationStats {
        let mut stats = self.stats.clone();
        stats.currently_enforced = self
            .sources
            .values()
            .filter(|record| record.state == SourceState::Enforced)
            .count() as u64;
        stats
    }

    /// The number of distinct sources observed this session.
    /// 本会话观察到的不同源数量。
    pub fn known_sources(&self) -> usize {
        self.sources.len()
    }

    #[cfg(test)]
    pub(crate) fn window_len(&self, source: NodeId) -> usize {
        self.sources
            .get(&source)
            .map(|record| record.window.len())
            .unwrap_or(0)
    }
}
