//! Encoder capability, the encoding preference list, and its implementations.

pub mod encoder;
pub mod ffmpeg;
