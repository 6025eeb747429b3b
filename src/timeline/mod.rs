//! Scene timing and camera motion. Both are pure functions of their inputs.

pub mod builder;
pub mod motion;
