//! Stream Playout Library
//!
//! Adaptive playout-rate control for streamed audio.

#![allow(dead_code)]

pub mod audio;
pub mod playout;

pub use crate::playout::{PlayoutController, PlayoutError};
