//! PCM 线路格式编解码
//!
//! 线路契约（与上游解码器/下游编码器共享，不可更改）：
//! - 每个样本为 32-bit IEEE-754 浮点
//! - big-endian 字节序，紧密排列
//! - 样本数 = 字节数 / 4

use thiserror::Error;

/// 每个线路样本占用的字节数
pub const BYTES_PER_SAMPLE: usize = 4;

/// 数据包解码错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// 字节长度不是 4 的整数倍，无法对齐样本边界
    #[error("packet length {len} is not a multiple of {BYTES_PER_SAMPLE} bytes")]
    Truncated { len: usize },
}

/// 将原始字节解码为 f32 样本
///
/// 纯边界操作，不含任何控制逻辑。
/// 长度不对齐时直接拒绝：静默丢弃尾部字节会移动后续所有样本边界
pub fn decode(raw: &[u8]) -> Result<Vec<f32>, PacketError> {
    if raw.len() % BYTES_PER_SAMPLE != 0 {
        return Err(PacketError::Truncated { len: raw.len() });
    }

    let samples = raw
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(samples)
}

/// 将 f32 样本编码回线路字节（decode 的逆操作）
pub fn encode(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        out.extend_from_slice(&sample.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_pattern() {
        // 1.0f32 的 big-endian 表示是 3F 80 00 00
        let raw = [0x3F, 0x80, 0x00, 0x00];
        let samples = decode(&raw).unwrap();
        assert_eq!(samples, vec![1.0]);

        // -2.0f32 = C0 00 00 00
        let raw = [0xC0, 0x00, 0x00, 0x00];
        let samples = decode(&raw).unwrap();
        assert_eq!(samples, vec![-2.0]);
    }

    #[test]
    fn test_roundtrip() {
        let input = vec![0.0f32, 0.5, -0.25, 1.0, -1.0];
        let bytes = encode(&input);
        assert_eq!(bytes.len(), input.len() * BYTES_PER_SAMPLE);

        let output = decode(&bytes).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_truncated_rejected() {
        // 5 字节：不是 4 的倍数
        let raw = [0u8; 5];
        assert_eq!(decode(&raw), Err(PacketError::Truncated { len: 5 }));

        // 空缓冲区是合法的（0 个样本），由上层决定是否接受
        assert_eq!(decode(&[]).unwrap().len(), 0);
    }
}
