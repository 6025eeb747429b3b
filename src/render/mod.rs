//! Drawing capability, its software implementation, and the Frame Renderer.

pub mod cpu;
pub mod frame;
pub mod post;
pub mod surface;
