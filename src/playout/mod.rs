//! 自适应播出速率控制器
//!
//! 闭环控制回路，让实测网络延迟跟踪配置目标：
//! - 软拐点误差整形：压制包间抖动，放行持续漂移
//! - 带泄漏的积分器：防积分饱和
//! - 冷却计数器：修正后的迟滞，防止振荡式连续修正
//! - 边界样本插值：补样取上一包末样本与本包首样本的中点
//!
//! 每包最多增删一个样本，不做分数倍率重采样。
//! 所有延迟值的单位为微秒，与漂移估计里的 1e6 换算耦合

pub mod history;
pub mod stats;

use log::debug;
use thiserror::Error;

use crate::audio::pcm::{self, PacketError};
use self::history::{LatencyHistory, HISTORY_LEN};
use self::stats::{DriftEstimate, PlayoutStats};

/// 积分器触发阈值倍数（相对目标延迟）
const ACCUM_TRIGGER_MULT: f64 = 12.0;
/// 修正后的积分器卸放倍数
///
/// 比触发阈值少一个目标单位：修正后留下残量，保证同一包内不会背靠背触发
const ACCUM_DISCHARGE_MULT: f64 = 11.0;
/// 积分器泄漏系数，每包应用一次
const LEAK_FACTOR: f64 = 0.9999;
/// 修正后的冷却包数
const HOLDOFF_PACKETS: u32 = 10;
/// 名义时钟采样率（Hz），用于漂移折算
const NOMINAL_SAMPLE_RATE: f64 = 48_000.0;
/// 微秒/秒，漂移率换算的单位假设
const MICROS_PER_SEC: f64 = 1e6;

/// 播出控制错误
#[derive(Debug, Error)]
pub enum PlayoutError {
    /// 解码后样本数为零：丢样/插值都无法定义，快速失败
    #[error("empty packet: at least one decoded sample is required")]
    EmptyPacket,
    /// 线路格式错误
    #[error("packet decode failed: {0}")]
    Packet(#[from] PacketError),
}

/// 两个相邻样本的算术中点
#[inline]
fn interpolate_sample(prev: f32, next: f32) -> f32 {
    (prev + next) / 2.0
}

/// 播出速率控制器
///
/// 每条音频流一个实例，由所属调用方独占；
/// 两个操作必须严格串行调用（单线程契约，无内部同步）
pub struct PlayoutController {
    /// 目标稳态延迟（微秒）
    target_latency: f64,
    /// 强压制误差带的半宽（微秒）
    tolerance: f64,
    /// 整形误差积分器
    accum: f64,
    /// 冷却计数器：大于零时不做新修正
    holdoff: u32,
    /// 本统计区间的丢样次数
    dropped: u32,
    /// 本统计区间的补样次数
    padded: u32,
    /// 本统计区间的延迟极值
    min_latency: u64,
    max_latency: u64,
    /// 上一包最后发出的样本（插值左端点；开始前视为静音）
    last_sample: f32,
    /// 延迟历史，只服务于漂移估计
    latency_history: LatencyHistory,
    /// 预留的快速模式开关，当前无行为语义，仅保持接口对齐
    pub fast: bool,
}

impl PlayoutController {
    /// 创建控制器
    ///
    /// `target_us` / `tolerance_us` 单位为微秒，与每包的延迟读数一致。
    /// `tolerance_us = 0` 表示不压制小偏差：整形因子恒为 1
    pub fn new(target_us: u64, tolerance_us: u64) -> Self {
        Self {
            target_latency: target_us as f64,
            tolerance: tolerance_us as f64,
            accum: 0.0,
            holdoff: 0,
            dropped: 0,
            padded: 0,
            min_latency: u64::MAX,
            max_latency: 0,
            last_sample: 0.0,
            latency_history: LatencyHistory::new(),
            fast: false,
        }
    }

    /// 处理一个数据包
    ///
    /// 输入为 big-endian f32 线路字节和该包的实测延迟（微秒）。
    /// 输出样本数为 N-1（丢样）、N（直通）或 N+1（补样），三者取其一。
    /// 格式错误和空包直接返回错误，不改动任何控制状态
    pub fn process_packet(
        &mut self,
        raw: &[u8],
        latency_us: u64,
    ) -> Result<Vec<f32>, PlayoutError> {
        let mut out = pcm::decode(raw)?;
        if out.is_empty() {
            return Err(PlayoutError::EmptyPacket);
        }

        if latency_us < self.min_latency {
            self.min_latency = latency_us;
        }
        if latency_us > self.max_latency {
            self.max_latency = latency_us;
        }

        // 软拐点整形：|err| << tolerance 时因子约为 |err|/tolerance，强压制抖动；
        // |err| >> tolerance 时因子趋近 1，持续漂移几乎原样通过。
        // err == 0 时短路，避免 tolerance == 0 情况下的 0/0
        let raw_err = latency_us as f64 - self.target_latency;
        let shaped = if raw_err == 0.0 {
            0.0
        } else {
            raw_err * (raw_err.abs() / (self.tolerance + raw_err.abs()))
        };

        self.accum += shaped;

        if self.holdoff > 0 {
            self.holdoff -= 1;
        } else if self.accum > ACCUM_TRIGGER_MULT * self.target_latency {
            // 丢掉首样本，收缩有效延迟
            out.remove(0);
            self.dropped += 1;
            self.accum -= ACCUM_DISCHARGE_MULT * self.target_latency;
            self.holdoff = HOLDOFF_PACKETS;
            debug!(
                "dropped one sample (latency {} us, accum {:.1})",
                latency_us, self.accum
            );
        } else if self.accum < -(ACCUM_TRIGGER_MULT * self.target_latency) {
            // 在包头插入中点样本，扩张有效延迟
            let samp = interpolate_sample(self.last_sample, out[0]);
            out.insert(0, samp);
            self.padded += 1;
            self.accum += ACCUM_DISCHARGE_MULT * self.target_latency;
            self.holdoff = HOLDOFF_PACKETS;
            debug!(
                "padded one sample (latency {} us, accum {:.1})",
                latency_us, self.accum
            );
        }

        // 积分器泄漏：不论走哪个分支都衰减，保证瞬时扰动最终被遗忘
        self.accum *= LEAK_FACTOR;

        // 单样本包被丢样后输出为空，此时沿用上一包的末样本
        if let Some(&last) = out.last() {
            self.last_sample = last;
        }

        Ok(out)
    }

    /// 产出一条统计记录并重置区间字段
    ///
    /// `latency_us` 既作为一次延迟观测计入极值，也写入漂移历史。
    /// 极值与修正计数随每次报告清零；积分器、冷却计数、
    /// 末样本和漂移历史是长期状态，不清
    pub fn report_stats(&mut self, latency_us: u64) -> PlayoutStats {
        if latency_us < self.min_latency {
            self.min_latency = latency_us;
        }
        if latency_us > self.max_latency {
            self.max_latency = latency_us;
        }

        // 被替换的读数来自恰好 60 次报告之前；无符号回绕减法
        let (displaced, wrapped) = self.latency_history.push(latency_us);
        let drift_raw = latency_us.wrapping_sub(displaced) as i64;

        let drift = if wrapped {
            let rate = drift_raw as f64 / HISTORY_LEN as f64;
            Some(DriftEstimate {
                rate,
                estimated_sample_rate: (1.0 + rate / MICROS_PER_SEC) * NOMINAL_SAMPLE_RATE,
            })
        } else {
            None
        };

        let report = PlayoutStats {
            min_latency: self.min_latency,
            max_latency: self.max_latency,
            accumulator: self.accum,
            padded: self.padded,
            dropped: self.dropped,
            drift,
        };

        self.min_latency = u64::MAX;
        self.max_latency = 0;
        self.padded = 0;
        self.dropped = 0;

        report
    }

    /// 积分器当前值
    #[inline]
    pub fn accumulator(&self) -> f64 {
        self.accum
    }

    /// 剩余冷却包数
    #[inline]
    pub fn holdoff(&self) -> u32 {
        self.holdoff
    }

    /// 上一包最后发出的样本
    #[inline]
    pub fn last_sample(&self) -> f32 {
        self.last_sample
    }

    /// 配置的目标延迟（微秒）
    #[inline]
    pub fn target_latency(&self) -> f64 {
        self.target_latency
    }
}
