//! The two callers of the Frame Renderer: a looping preview and a frame-stepped capture.

pub mod capture;
pub mod preview;
pub mod ticker;
