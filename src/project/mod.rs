//! Host-facing project inputs.
//!
//! These are the values the excluded UI layer supplies: text fields, enum choices and raw media
//! bytes. The engine never mutates them.

pub mod file;
pub mod model;
