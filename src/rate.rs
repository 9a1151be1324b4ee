//! 窗口化速率的计算与分类。
//! Computation and classification of windowed rates.

use std::time::Duration;

/// The verdict of a single rate evaluation.
/// 单次速率评估的结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateClass {
    /// The rate is at or below the threshold.
    /// 速率不超过阈值。
    Within,
    /// The rate is strictly above the threshold.
    /// 速率严格高于阈值。
    Exceeded,
}

/// The instantaneous rate implied by `count` arrivals over one window.
/// `count` 次到达在一个窗口内隐含的瞬时速率。
pub fn windowed_rate(count: usize, window: Duration) -> f64 {
    count as f64 / window.as_secs_f64()
}

/// Classifies a windowed count against a threshold in messages per second.
///
/// Classification is a hard cut over the window itself, with no smoothing or
/// decay, and uses strict greater-than: a rate exactly at the threshold is
/// not anomalous.
///
/// 将窗口计数按每秒消息数阈值进行分类。
///
/// 分类是对窗口本身的硬切分，没有平滑或衰减，并使用严格大于：
/// 恰好等于阈值的速率不算异常。
pub fn classify(count: usize, window: Duration, threshold: f64) -> RateClass {
    if windowed_rate(count, window) > threshold {
        RateClass::Exceeded
    } else {
        RateClass::Within
    }
}
