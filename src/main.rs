//! Stream Playout - 自适应播出速率控制器
//!
//! 模拟器入口：生成带抖动/偏斜的合成延迟流，
//! 驱动控制回路并周期性打印统计行。
//! 真实部署中数据包来自网络接收端，这里用确定性模拟代替

#![allow(dead_code)]

mod audio;
mod playout;

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::pcm;
use crate::playout::PlayoutController;

/// Stream Playout - adaptive playout-rate controller simulator
#[derive(Parser)]
#[command(name = "stream-playout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target latency in microseconds
    #[arg(short, long, default_value = "20000")]
    target_us: u64,

    /// Tolerance band half-width in microseconds
    #[arg(long, default_value = "1000")]
    tolerance_us: u64,

    /// Samples per packet
    #[arg(short, long, default_value = "480")]
    packet_samples: usize,

    /// Number of packets to simulate (0 = run until Ctrl+C)
    #[arg(short = 'n', long, default_value = "0")]
    packets: u64,

    /// Uniform latency jitter amplitude in microseconds
    #[arg(short, long, default_value = "500")]
    jitter_us: u64,

    /// Per-packet latency ramp in microseconds (simulated clock skew)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    skew_us: f64,

    /// Print a stats line every N packets
    #[arg(long, default_value = "100")]
    stats_every: u64,

    /// RNG seed for reproducible jitter
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    println!(
        "Stream Playout - target {} us, tolerance {} us, {} samples/packet",
        cli.target_us, cli.tolerance_us, cli.packet_samples
    );
    if cli.packets == 0 {
        println!("Press Ctrl+C to stop.\n");
    }
    println!("{:>7} {:>7} {:>11} {:>4} {:>4}", "min", "max", "accum", "pad", "drop");

    let mut controller = PlayoutController::new(cli.target_us, cli.tolerance_us);
    let mut rng = StdRng::seed_from_u64(cli.seed);

    // 合成一个 440 Hz 正弦包并编码为线路字节（每包内容相同即可）
    let tone: Vec<f32> = (0..cli.packet_samples)
        .map(|i| {
            let t = i as f32 / 48000.0;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect();
    let wire = pcm::encode(&tone);

    let mut emitted: u64 = 0;
    let mut packet_idx: u64 = 0;
    let mut latest_latency = cli.target_us;

    while running.load(Ordering::SeqCst) {
        if cli.packets > 0 && packet_idx >= cli.packets {
            break;
        }

        latest_latency = synth_latency(&cli, &mut rng, packet_idx);

        let out = controller.process_packet(&wire, latest_latency)?;
        emitted += out.len() as u64;
        packet_idx += 1;

        if packet_idx % cli.stats_every == 0 {
            println!("{}", controller.report_stats(latest_latency));
            io::stdout().flush()?;
        }
    }

    // 收尾：最后一条统计 + 总结
    println!("{}", controller.report_stats(latest_latency));
    println!(
        "\n{} packets in, {} samples out ({} nominal)",
        packet_idx,
        emitted,
        packet_idx * cli.packet_samples as u64
    );

    Ok(())
}

/// 合成一包的实测延迟：目标 + 线性偏斜 + 均匀抖动
///
/// 偏斜为负时延迟会逐渐走低，饱和在 0（u64 下限）
fn synth_latency(cli: &Cli, rng: &mut StdRng, packet_idx: u64) -> u64 {
    let base = cli.target_us as f64 + cli.skew_us * packet_idx as f64;
    let jitter = if cli.jitter_us > 0 {
        rng.gen_range(-(cli.jitter_us as f64)..=cli.jitter_us as f64)
    } else {
        0.0
    };
    (base + jitter).max(0.0) as u64
}
