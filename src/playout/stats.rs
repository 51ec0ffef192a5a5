//! 播出统计记录
//!
//! 每次 report_stats 产出一条记录：
//! - 区间字段（延迟极值、修正计数）每次报告后清零
//! - 漂移估计只在历史缓冲区完成第一整圈后出现

use std::fmt;

/// 长期时钟漂移估计
///
/// 单位假设：延迟读数为微秒，名义时钟 48 kHz。
/// 换算中的 1e6 除数依赖这个假设，不能改
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftEstimate {
    /// 每次报告的延迟变化量（微秒/次）
    pub rate: f64,
    /// 按漂移折算的有效采样率（Hz）
    pub estimated_sample_rate: f64,
}

/// 一个统计区间的诊断记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayoutStats {
    /// 区间内观测到的最小延迟（微秒；区间内无包时为 u64::MAX）
    pub min_latency: u64,
    /// 区间内观测到的最大延迟（微秒）
    pub max_latency: u64,
    /// 积分器当前值（跨区间持续状态）
    pub accumulator: f64,
    /// 区间内插值补样次数
    pub padded: u32,
    /// 区间内丢样次数
    pub dropped: u32,
    /// 漂移估计（历史未满一圈时为 None）
    pub drift: Option<DriftEstimate>,
}

impl fmt::Display for PlayoutStats {
    /// 固定宽度单行输出，字段顺序和宽度是外部监控脚本依赖的格式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:7} {:7} {:11.1} +{:<3} -{:<3}",
            self.min_latency, self.max_latency, self.accumulator, self.padded, self.dropped
        )?;

        if let Some(drift) = self.drift {
            write!(f, " {:8.3} {:11.5}", drift.rate, drift.estimated_sample_rate)?;
        }

        Ok(())
    }
}
