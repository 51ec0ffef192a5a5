//! 音频边界模块
//!
//! 包含：
//! - Pcm: PCM 线路格式编解码（big-endian f32）

pub mod pcm;

pub use self::pcm::PacketError;
