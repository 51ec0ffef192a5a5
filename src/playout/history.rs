//! 延迟历史环形缓冲区
//!
//! 固定 60 格，只服务于长期时钟漂移估计，
//! 与控制回路的 min/max/积分器状态完全独立

/// 历史缓冲区长度（每格一次 stats 调用的延迟读数）
pub const HISTORY_LEN: usize = 60;

/// 固定长度的延迟读数环形缓冲区
///
/// 游标按模推进；游标第一次绕回 0 时置位 wrapped 标志，
/// 此后每次 push 被替换的读数都恰好来自 60 次调用之前
pub struct LatencyHistory {
    slots: [u64; HISTORY_LEN],
    cursor: usize,
    wrapped: bool,
}

impl LatencyHistory {
    pub fn new() -> Self {
        Self {
            slots: [0; HISTORY_LEN],
            cursor: 0,
            wrapped: false,
        }
    }

    /// 写入一个延迟读数
    ///
    /// 返回被替换的旧读数，以及是否已完成至少一整圈。
    /// 注意：绕圈判定发生在游标推进之后，所以第 60 次 push 即报告完成
    pub fn push(&mut self, latency_us: u64) -> (u64, bool) {
        let displaced = self.slots[self.cursor];
        self.slots[self.cursor] = latency_us;
        self.cursor = (self.cursor + 1) % HISTORY_LEN;
        if self.cursor == 0 && !self.wrapped {
            self.wrapped = true;
        }
        (displaced, self.wrapped)
    }

    /// 是否已完成至少一整圈
    #[inline]
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }
}

impl Default for LatencyHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_flag_timing() {
        let mut hist = LatencyHistory::new();

        // 前 59 次：未完成一圈
        for i in 0..HISTORY_LEN - 1 {
            let (_, wrapped) = hist.push(i as u64);
            assert!(!wrapped, "should not wrap at push #{}", i + 1);
        }

        // 第 60 次：游标绕回 0，报告完成
        let (_, wrapped) = hist.push(59);
        assert!(wrapped, "should wrap at push #60");
        assert!(hist.wrapped());
    }

    #[test]
    fn test_displaced_value_is_60_pushes_old() {
        let mut hist = LatencyHistory::new();

        for i in 0..HISTORY_LEN {
            // 初始格子都是 0
            let (displaced, _) = hist.push(1000 + i as u64);
            assert_eq!(displaced, 0);
        }

        // 第二圈：被替换的读数来自恰好 60 次之前
        for i in 0..HISTORY_LEN {
            let (displaced, wrapped) = hist.push(2000 + i as u64);
            assert_eq!(displaced, 1000 + i as u64);
            assert!(wrapped);
        }
    }
}
