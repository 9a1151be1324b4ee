//! 每个源的滑动窗口到达日志。
//! The per-source sliding-window arrival log.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// A bounded history of recent arrival timestamps for one source.
///
/// Entries are kept in insertion order, which equals time order because
/// arrivals for a given source are time-ordered. Eviction is lazy: it runs
/// on the next access for this source, so memory is bounded by the source's
/// own recent traffic, not by global traffic. After eviction every entry
/// lies within `(now - duration, now]`. Duplicate timestamps are permitted.
///
/// 单个源最近到达时间戳的有界历史。
///
/// 条目按插入顺序保存，由于同一源的到达按时间有序，插入顺序即时间顺序。
/// 驱逐是惰性的：在该源的下一次访问时执行，因此内存由该源自身的近期流量
/// 而非全局流量决定上界。驱逐后所有条目都位于 `(now - duration, now]` 内。
/// 允许重复的时间戳。
#[derive(Debug)]
pub struct SlidingWindow {
    duration: Duration,
    log: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            log: VecDeque::new(),
        }
    }

    /// Whether an arrival at `at` is more than one window behind the most
    /// recent observation. Such arrivals guard against clock skew or
    /// replayed timestamps and must not be inserted.
    ///
    /// 判断时刻 `at` 的到达是否落后于最近一次观察超过一个窗口。
    /// 这类到达用于防范时钟偏移或重放的时间戳，不得被插入。
    pub fn is_stale(&self, at: Instant) -> bool {
        match self.log.back() {
            Some(latest) => at + self.duration < *latest,
            None => false,
        }
    }

    /// Records an arrival: evicts entries older than one window behind `at`,
    /// appends `at`, and returns the resulting log length.
    ///
    /// 记录一次到达：驱逐早于 `at` 一个窗口之前的条目，追加 `at`，
    /// 并返回日志的最终长度。
    pub fn observe(&mut self, at: Instant) -> usize {
        self.evict(at);
        self.log.push_back(at);
        self.log.len()
    }

    /// Evicts against `now` without recording an arrival and returns the
    /// remaining count. Used by the periodic recovery evaluation, where a
    /// silent source must still read as rate zero.
    ///
    /// 以 `now` 为基准只做驱逐、不记录到达，返回剩余条目数。
    /// 供周期性恢复评估使用：静默的源也必须被读出速率为零。
    pub fn refresh(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.log.len()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The effective window is half-open, `(now - duration, now]`: an entry
    /// exactly one window old is evicted. This keeps a perfectly periodic
    /// stream at exactly `duration × rate` messages in the window, so the
    /// strict-greater-than threshold comparison stays meaningful.
    fn evict(&mut self, now: Instant) {
        let Some(horizon) = now.checked_sub(self.duration) else {
            return;
        };
        while let Some(front) = self.log.front() {
            if *front <= horizon {
                self.log.pop_front();
            } else {
                break;
            }
        }
    }
}
