//! 定义了缓解策略和源模型的可配置参数。
//! Defines configurable parameters for the mitigation policy and the
//! source model.

use crate::error::{Error, Result};
use std::time::Duration;

/// A structure containing all configurable parameters for a monitoring
/// session.
///
/// 包含一次监控会话所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// Mitigation policy parameters, immutable after initialization.
    /// 缓解策略参数，初始化后不可变。
    pub mitigation: MitigationConfig,

    /// Parameters of the regulated traffic source model.
    /// 被调控的流量源模型的参数。
    pub source: SourceConfig,
}

/// Mitigation policy parameters.
///
/// 缓解策略参数。
#[derive(Debug, Clone)]
pub struct MitigationConfig {
    /// The trailing window over which per-source arrival rates are computed.
    /// 计算每个源到达速率所使用的尾随窗口。
    pub window_duration: Duration,
    /// The rate, in control messages per second, above which (strictly) a
    /// source is classified as anomalous.
    /// 以每秒控制消息数计的速率，（严格）超过该值的源被判定为异常。
    pub rate_threshold: f64,
    /// The factor applied to a source's nominal rate when a throttle
    /// directive is issued.
    /// 发出限速指令时应用于源标称速率的因子。
    pub feedback_scale_factor: f64,
    /// The fraction of an enforced source's control messages dropped at
    /// admission, before they count toward downstream processing.
    /// 被执法源的控制消息在准入阶段被丢弃的比例，丢弃的消息不计入后续处理。
    pub enforced_drop_fraction: f64,
    /// The number of consecutive clear recovery evaluations required before
    /// an enforced source is released.
    /// 被执法的源在被解除之前所需的连续无异常恢复评估次数。
    pub recovery_windows_required: u32,
    /// The period of the recovery evaluation clock. `None` follows
    /// `window_duration`.
    /// 恢复评估时钟的周期。`None` 时跟随 `window_duration`。
    pub recovery_period: Option<Duration>,
}

impl MitigationConfig {
    /// The effective recovery clock period.
    /// 恢复时钟的实际周期。
    pub fn recovery_period(&self) -> Duration {
        self.recovery_period.unwrap_or(self.window_duration)
    }
}

/// Traffic source model parameters.
///
/// 流量源模型参数。
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// The source's configured send rate, in control messages per second.
    /// This is the rate it returns to when released.
    /// 源配置的发送速率（每秒控制消息数）。这也是它被解除执法后恢复的速率。
    pub nominal_rate: f64,
    /// The payload size of each control message, in bytes.
    /// 每条控制消息的载荷大小（字节）。
    pub payload_len: usize,
    /// The local drop fraction a cooperative endpoint applies to its own
    /// traffic upon receiving a throttle directive. Zero disables the
    /// sender-side variant; receiver-side admission drop applies regardless.
    ///
    /// 合作端点在收到限速指令后对自身流量应用的本地丢弃比例。
    /// 为零时关闭发送端变体；接收端准入丢弃无论如何都会生效。
    pub local_drop_on_throttle: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mitigation: MitigationConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_secs(1),
            rate_threshold: 20.0,
            feedback_scale_factor: 0.1,
            enforced_drop_fraction: 0.9,
            recovery_windows_required: 1,
            recovery_period: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            nominal_rate: 1000.0,
            payload_len: 120,
            local_drop_on_throttle: 0.0,
        }
    }
}

impl Config {
    /// Validates the configuration against the recognized option ranges.
    ///
    /// Rejection here is fatal by design: running with a non-positive window
    /// or threshold would leave the rate semantics undefined.
    ///
    /// 按可识别的选项范围验证配置。
    ///
    /// 这里的拒绝是致命的：使用非正的窗口或阈值运行会使速率语义未定义。
    pub fn validate(&self) -> Result<()> {
        let m = &self.mitigation;
        let window = m.window_duration.as_secs_f64();
        if !(0.5..=5.0).contains(&window) {
            return Err(Error::InvalidConfig(format!(
                "window_duration {window}s outside recognized range 0.5..=5.0"
            )));
        }
        if !(5.0..=50.0).contains(&m.rate_threshold) {
            return Err(Error::InvalidConfig(format!(
                "rate_threshold {}/s outside recognized range 5..=50",
                m.rate_threshold
            )));
        }
        if !(m.feedback_scale_factor > 0.0 && m.feedback_scale_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "feedback_scale_factor {} outside (0, 1]",
                m.feedback_scale_factor
            )));
        }
        if !(0.0..1.0).contains(&m.enforced_drop_fraction) {
            return Err(Error::InvalidConfig(format!(
                "enforced_drop_fraction {} outside [0, 1)",
                m.enforced_drop_fraction
            )));
        }
        if m.recovery_windows_required < 1 {
            return Err(Error::InvalidConfig(
                "recovery_windows_required must be >= 1".to_string(),
            ));
        }
        if let Some(period) = m.recovery_period {
            let period = period.as_secs_f64();
            if !(0.1..=10.0).contains(&period) {
                return Err(Error::InvalidConfig(format!(
                    "recovery_period {period}s outside recognized range 0.1..=10.0"
                )));
            }
        }
        let s = &self.source;
        if !(s.nominal_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "nominal_rate {} must be positive",
                s.nominal_rate
            )));
        }
        if !(0.0..1.0).contains(&s.local_drop_on_throttle) {
            return Err(Error::InvalidConfig(format!(
                "local_drop_on_throttle {} outside [0, 1)",
                s.local_drop_on_throttle
            )));
        }
        Ok(())
    }
}
